//! Connectivity-string handling.
//!
//! Only topology is read here: which atoms exist, which are aromatic or
//! attachment placeholders, and how they are bonded. Perception of charges,
//! stereochemistry or implicit hydrogens is left to the external collaborators.

pub mod smiles;
