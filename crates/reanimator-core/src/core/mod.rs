//! # Core Module
//!
//! Stateless building blocks shared by every stage of the pipeline.
//!
//! ## Overview
//!
//! Nothing in this module performs a pipeline step or talks to an external
//! collaborator. It describes the data those steps exchange and the text
//! formats they persist:
//!
//! - **Molecular Representation** ([`models`]) - Atoms, bonds and the molecule graph, residue locators
//! - **File I/O** ([`io`]) - PDB and MDL molfile readers/writers behind the [`io::traits::MolecularFile`] trait
//! - **Connectivity Strings** ([`chem`]) - Topology-only parsing of connectivity strings and attachment markers
//! - **Definitions** ([`catalog`]) - Warhead and covalent-residue catalog shared read-only by all jobs
//! - **Naming** ([`utils`]) - Reserved identifiers, file-name slugs and PDB name padding

pub mod catalog;
pub mod chem;
pub mod io;
pub mod models;
pub mod utils;
