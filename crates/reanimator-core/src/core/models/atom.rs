use nalgebra::Point3;
use serde::{Deserialize, Serialize};

/// Element symbols that mark an attachment placeholder rather than a real atom.
const PLACEHOLDER_ELEMENTS: [&str; 3] = ["*", "R", "R#"];

/// Residue membership of an atom, as carried by PDB-style records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResidueInfo {
    /// Three-letter residue code (e.g. "LIG", "CYS").
    pub name: String,
    /// Residue sequence number.
    pub number: isize,
    /// Single-character chain identifier.
    pub chain_id: char,
}

impl ResidueInfo {
    pub fn new(name: &str, number: isize, chain_id: char) -> Self {
        Self {
            name: name.to_string(),
            number,
            chain_id,
        }
    }
}

/// Represents an atom of a small molecule or of a receptor fragment.
///
/// Atoms are stored by position inside a [`Molecule`](super::molecule::Molecule);
/// any per-atom data kept elsewhere (provenance, spread statistics) is aligned
/// with that ordering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Atom {
    /// The name of the atom (e.g. "CX", "SG", "C1").
    pub name: String,
    /// The element symbol, `*` for an attachment placeholder.
    pub element: String,
    /// The 3D coordinates of the atom in Angstroms.
    pub position: Point3<f64>,
    /// Residue membership, if the source format carried one.
    #[serde(default)]
    pub residue: Option<ResidueInfo>,
}

impl Atom {
    /// Creates a new `Atom` without residue information.
    ///
    /// # Arguments
    ///
    /// * `name` - The name of the atom.
    /// * `element` - The element symbol.
    /// * `position` - The 3D coordinates of the atom.
    pub fn new(name: &str, element: &str, position: Point3<f64>) -> Self {
        Self {
            name: name.to_string(),
            element: element.to_string(),
            position,
            residue: None,
        }
    }

    pub fn with_residue(mut self, residue: ResidueInfo) -> Self {
        self.residue = Some(residue);
        self
    }

    /// Whether this atom is an attachment placeholder (dummy atom).
    pub fn is_placeholder(&self) -> bool {
        PLACEHOLDER_ELEMENTS.contains(&self.element.trim())
    }

    /// The residue code of this atom, if known.
    pub fn residue_name(&self) -> Option<&str> {
        self.residue.as_ref().map(|r| r.name.as_str())
    }
}
