use crate::core::chem::smiles::{self, SmilesError};
use crate::core::models::molecule::Molecule;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DefinitionError {
    #[error("Pattern '{pattern}' cannot be parsed: {source}")]
    InvalidPattern {
        pattern: String,
        source: SmilesError,
    },
    #[error("Pattern '{pattern}' has {atoms} atoms but {names} atom names were given")]
    NameCount {
        pattern: String,
        atoms: usize,
        names: usize,
    },
    #[error("Pattern '{pattern}' has no attachment marker bonded to a real atom")]
    MissingAttachment { pattern: String },
}

/// Atom names around the attachment marker of a covalent fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedSite {
    /// The atom bonded to the marker (e.g. `CX` on a warhead, `SG` on cysteine).
    pub attached: String,
    /// The atom one bond further in, when the fragment has one.
    pub neighbour: Option<String>,
}

/// A reactive group that can bond the candidate to the receptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WarheadDefinition {
    pub name: String,
    /// Reacted form, with `*` standing for the receptor atom.
    pub covalent: String,
    pub covalent_atomnames: Vec<String>,
    /// Unreacted form.
    pub noncovalent: String,
    pub noncovalent_atomnames: Vec<String>,
    /// Restraint text copied verbatim into the constraint file when this warhead is selected.
    #[serde(default)]
    pub constraint: Option<String>,
}

impl WarheadDefinition {
    pub fn validate(&self) -> Result<(), DefinitionError> {
        check_names(&self.covalent, &self.covalent_atomnames)?;
        check_names(&self.noncovalent, &self.noncovalent_atomnames)?;
        self.site().map(|_| ())
    }

    /// Names of the ligand atom that bonds to the receptor and its neighbour.
    pub fn site(&self) -> Result<NamedSite, DefinitionError> {
        named_site(&self.covalent, &self.covalent_atomnames)
    }
}

/// A receptor residue type able to accept a covalent ligand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CovalentResidueDefinition {
    /// Three-letter residue code.
    pub residue: String,
    /// The reactive atom and its neighbour, with `*` standing for the ligand.
    pub smiles: String,
    pub atomnames: Vec<String>,
}

impl CovalentResidueDefinition {
    pub fn validate(&self) -> Result<(), DefinitionError> {
        self.site().map(|_| ())
    }

    /// Names of the reactive receptor atom and its neighbour.
    pub fn site(&self) -> Result<NamedSite, DefinitionError> {
        named_site(&self.smiles, &self.atomnames)
    }

    pub fn reactive_atom_name(&self) -> Result<String, DefinitionError> {
        self.site().map(|site| site.attached)
    }
}

fn check_names(pattern: &str, names: &[String]) -> Result<Molecule, DefinitionError> {
    let graph = smiles::parse(pattern).map_err(|source| DefinitionError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })?;
    if graph.len() != names.len() {
        return Err(DefinitionError::NameCount {
            pattern: pattern.to_string(),
            atoms: graph.len(),
            names: names.len(),
        });
    }
    Ok(graph)
}

fn named_site(pattern: &str, names: &[String]) -> Result<NamedSite, DefinitionError> {
    let graph = check_names(pattern, names)?;
    let site = smiles::attachment_site(&graph).ok_or_else(|| DefinitionError::MissingAttachment {
        pattern: pattern.to_string(),
    })?;
    Ok(NamedSite {
        attached: names[site.attached].clone(),
        neighbour: site.neighbour.map(|i| names[i].clone()),
    })
}
