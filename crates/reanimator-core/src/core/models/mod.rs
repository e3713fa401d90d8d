//! # Core Models Module
//!
//! Data structures used to represent the molecules handled by a reanimation job:
//! the candidate ligand, the reference fragments, the positioned pose and the
//! receptor fragments extracted for covalent attachment.
//!
//! ## Key Components
//!
//! - [`atom`] - Individual atom with element, coordinates and optional residue membership
//! - [`molecule`] - Molecular graph with index-stable atom ordering
//! - [`topology`] - Bond connectivity and bond orders
//! - [`locator`] - PDB-style residue addresses such as `145A`

pub mod atom;
pub mod locator;
pub mod molecule;
pub mod topology;
