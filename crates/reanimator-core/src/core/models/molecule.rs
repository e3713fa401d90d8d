use super::atom::Atom;
use super::topology::{Bond, BondOrder};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoleculeError {
    #[error("Atom index {index} is out of range for a molecule of {len} atoms")]
    AtomIndexOutOfRange { index: usize, len: usize },
    #[error("An atom cannot be bonded to itself (index {0})")]
    SelfBond(usize),
    #[error("{names} atom names were given for {atoms} matched atoms")]
    NameCountMismatch { names: usize, atoms: usize },
}

/// A molecular graph with 3D coordinates.
///
/// Atom order is significant: it is the index space shared with bonds and with
/// any per-atom annotation produced by placement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawMolecule")]
pub struct Molecule {
    /// Identifier stored with the structure (e.g. a hit name).
    pub name: Option<String>,
    atoms: Vec<Atom>,
    bonds: Vec<Bond>,
}

/// Unchecked wire form; bonds are re-added through [`Molecule::add_bond`].
#[derive(Deserialize)]
struct RawMolecule {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    atoms: Vec<Atom>,
    #[serde(default)]
    bonds: Vec<Bond>,
}

impl TryFrom<RawMolecule> for Molecule {
    type Error = MoleculeError;

    fn try_from(raw: RawMolecule) -> Result<Self, Self::Error> {
        let mut molecule = Molecule {
            name: raw.name,
            atoms: raw.atoms,
            bonds: Vec::with_capacity(raw.bonds.len()),
        };
        for bond in raw.bonds {
            molecule.add_bond(bond.atom1, bond.atom2, bond.order)?;
        }
        Ok(molecule)
    }
}

impl Molecule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(name: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            ..Self::default()
        }
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    pub fn atoms_mut(&mut self) -> &mut [Atom] {
        &mut self.atoms
    }

    pub fn bonds(&self) -> &[Bond] {
        &self.bonds
    }

    pub fn atom(&self, index: usize) -> Option<&Atom> {
        self.atoms.get(index)
    }

    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    /// The stored identifier, if present and not blank.
    pub fn display_name(&self) -> Option<&str> {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }

    /// Appends an atom and returns its index.
    pub fn add_atom(&mut self, atom: Atom) -> usize {
        self.atoms.push(atom);
        self.atoms.len() - 1
    }

    pub fn add_bond(&mut self, a: usize, b: usize, order: BondOrder) -> Result<(), MoleculeError> {
        self.check_index(a)?;
        self.check_index(b)?;
        if a == b {
            return Err(MoleculeError::SelfBond(a));
        }
        self.bonds.push(Bond::new(a, b, order));
        Ok(())
    }

    /// Indices of the atoms bonded to `index`, in bond insertion order.
    pub fn neighbors(&self, index: usize) -> Vec<usize> {
        self.bonds.iter().filter_map(|b| b.partner(index)).collect()
    }

    pub fn bond_between(&self, a: usize, b: usize) -> Option<&Bond> {
        self.bonds.iter().find(|bond| bond.joins(a, b))
    }

    pub fn bond_between_mut(&mut self, a: usize, b: usize) -> Option<&mut Bond> {
        self.bonds.iter_mut().find(|bond| bond.joins(a, b))
    }

    /// Finds the first atom whose trimmed name equals the trimmed `name`.
    pub fn find_atom_by_name(&self, name: &str) -> Option<usize> {
        let name = name.trim();
        self.atoms.iter().position(|a| a.name.trim() == name)
    }

    /// Renames the atoms at `indices` to the corresponding entries of `names`.
    ///
    /// Applying the same renaming twice yields the same molecule.
    pub fn rename_atoms(&mut self, indices: &[usize], names: &[String]) -> Result<(), MoleculeError> {
        if indices.len() != names.len() {
            return Err(MoleculeError::NameCountMismatch {
                names: names.len(),
                atoms: indices.len(),
            });
        }
        for &index in indices {
            self.check_index(index)?;
        }
        for (&index, name) in indices.iter().zip(names) {
            self.atoms[index].name = name.clone();
        }
        Ok(())
    }

    /// Returns a copy without placeholder atoms, with bonds re-indexed.
    pub fn without_placeholders(&self) -> Molecule {
        let mut remap = vec![None; self.atoms.len()];
        let mut result = Molecule {
            name: self.name.clone(),
            ..Molecule::default()
        };
        for (i, atom) in self.atoms.iter().enumerate() {
            if !atom.is_placeholder() {
                remap[i] = Some(result.add_atom(atom.clone()));
            }
        }
        for bond in &self.bonds {
            if let (Some(a), Some(b)) = (remap[bond.atom1], remap[bond.atom2]) {
                result.bonds.push(Bond::new(a, b, bond.order));
            }
        }
        result
    }

    fn check_index(&self, index: usize) -> Result<(), MoleculeError> {
        if index < self.atoms.len() {
            Ok(())
        } else {
            Err(MoleculeError::AtomIndexOutOfRange {
                index,
                len: self.atoms.len(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;

    fn chloroacetamide_like() -> Molecule {
        let mut mol = Molecule::with_name("frag");
        let c1 = mol.add_atom(Atom::new("C1", "C", Point3::new(0.0, 0.0, 0.0)));
        let o1 = mol.add_atom(Atom::new("O1", "O", Point3::new(1.2, 0.0, 0.0)));
        let c2 = mol.add_atom(Atom::new("C2", "C", Point3::new(-0.8, 1.2, 0.0)));
        let r = mol.add_atom(Atom::new("R", "*", Point3::new(-0.8, 2.6, 0.0)));
        mol.add_bond(c1, o1, BondOrder::Double).unwrap();
        mol.add_bond(c1, c2, BondOrder::Single).unwrap();
        mol.add_bond(c2, r, BondOrder::Single).unwrap();
        mol
    }

    #[test]
    fn add_bond_rejects_out_of_range_and_self_bonds() {
        let mut mol = chloroacetamide_like();
        assert_eq!(
            mol.add_bond(0, 9, BondOrder::Single),
            Err(MoleculeError::AtomIndexOutOfRange { index: 9, len: 4 })
        );
        assert_eq!(
            mol.add_bond(1, 1, BondOrder::Single),
            Err(MoleculeError::SelfBond(1))
        );
    }

    #[test]
    fn neighbors_follow_bond_insertion_order() {
        let mol = chloroacetamide_like();
        assert_eq!(mol.neighbors(0), vec![1, 2]);
        assert_eq!(mol.neighbors(2), vec![0, 3]);
    }

    #[test]
    fn rename_atoms_is_idempotent() {
        let mut mol = chloroacetamide_like();
        let names: Vec<String> = ["CY", "OY", "CX"].iter().map(|s| s.to_string()).collect();
        mol.rename_atoms(&[0, 1, 2], &names).unwrap();
        let once = mol.clone();
        mol.rename_atoms(&[0, 1, 2], &names).unwrap();
        assert_eq!(once, mol);
        assert_eq!(mol.find_atom_by_name(" CX "), Some(2));
    }

    #[test]
    fn rename_atoms_rejects_mismatched_lengths() {
        let mut mol = chloroacetamide_like();
        let names = vec!["CX".to_string()];
        assert!(matches!(
            mol.rename_atoms(&[0, 1], &names),
            Err(MoleculeError::NameCountMismatch { .. })
        ));
    }

    #[test]
    fn without_placeholders_drops_dummy_atoms_and_their_bonds() {
        let mol = chloroacetamide_like();
        let stripped = mol.without_placeholders();
        assert_eq!(stripped.len(), 3);
        assert_eq!(stripped.bonds().len(), 2);
        assert!(stripped.atoms().iter().all(|a| !a.is_placeholder()));
        assert_eq!(stripped.name.as_deref(), Some("frag"));
    }

    #[test]
    fn deserializing_checks_bond_indices() {
        let mut mol = Molecule::new();
        mol.add_atom(Atom::new("C1", "C", Point3::origin()));
        let mut json = serde_json::to_value(&mol).unwrap();
        json["bonds"] = serde_json::json!([{"atom1": 0, "atom2": 7, "order": "single"}]);
        let err = serde_json::from_value::<Molecule>(json).unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn serialized_molecule_deserializes_unchanged() {
        let mol = chloroacetamide_like();
        let json = serde_json::to_string(&mol).unwrap();
        assert_eq!(serde_json::from_str::<Molecule>(&json).unwrap(), mol);
    }

    #[test]
    fn display_name_ignores_blank_identifiers() {
        let mut mol = Molecule::with_name("   ");
        assert_eq!(mol.display_name(), None);
        mol.name = Some(" x0434 ".to_string());
        assert_eq!(mol.display_name(), Some("x0434"));
    }
}
