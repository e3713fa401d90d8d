pub mod catalog;
pub mod run;
