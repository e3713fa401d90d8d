//! Provides input/output functionality for molecular file formats.
//!
//! Structures cross the pipeline as PDB text (receptor, merged complex, poses)
//! and MDL molfiles (ligand artifacts). Both formats implement the
//! [`traits::MolecularFile`] interface for single molecules; [`pdb::PdbStructure`]
//! additionally handles multi-residue record sets.

pub mod mol;
pub mod pdb;
pub mod traits;
