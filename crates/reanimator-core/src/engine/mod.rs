//! # Engine Module
//!
//! The stage components of the reanimation pipeline and the state they share.
//!
//! ## Overview
//!
//! Each stage is a small struct borrowing what it needs (the catalog, one
//! collaborator) and acting on a [`job::Job`]. Stages know nothing about their
//! order; sequencing and failure containment belong to
//! [`crate::workflows::reanimate`].
//!
//! ## Architecture
//!
//! - **Job State** ([`job`], [`config`], [`warnings`]) - Configuration, stage machine, per-job warning buffer
//! - **Stages** ([`validation`], [`covalent`], [`constraints`], [`placement`], [`checkpoint`],
//!   [`minimization`], [`scoring`]) - One component per pipeline step
//! - **Boundaries** ([`collaborators`], [`hooks`]) - Traits for external systems and user extension points
//! - **Reporting** ([`progress`], [`error`]) - Progress callbacks and the failure taxonomy

pub mod checkpoint;
pub mod collaborators;
pub mod config;
pub mod constraints;
pub mod covalent;
pub mod error;
pub mod hooks;
pub mod job;
pub mod minimization;
pub mod placement;
pub mod progress;
pub mod scoring;
pub mod validation;
pub mod warnings;
