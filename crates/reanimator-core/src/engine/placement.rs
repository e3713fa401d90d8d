use crate::core::io::pdb::{PdbAtomRecord, PdbStructure};
use crate::core::models::atom::{Atom, ResidueInfo};
use crate::core::models::locator::ResidueLocator;
use crate::core::models::molecule::Molecule;
use crate::core::utils::identifiers::{
    PLACEHOLDER_ATOM_NAME, UNSPECIFIED_LIGAND_CODE, is_connection_atom, pad_atom_name,
};
use tracing::debug;

pub const DEFAULT_RECEPTOR_CHAIN: char = 'A';
pub const DEFAULT_LIGAND_CHAIN: char = 'B';

/// Both ends of the covalent bond, as written in the `LINK` record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkAtoms {
    pub receptor_atom: String,
    pub receptor_resn: String,
    pub ligand_atom: String,
}

/// Merges the positioned ligand into the receptor's coordinate frame.
#[derive(Debug, Clone)]
pub struct SpatialPlacer {
    ligand_resn: String,
    ligand: ResidueLocator,
    covalent: Option<ResidueLocator>,
}

impl SpatialPlacer {
    /// Missing chain letters default to `A` on the receptor side and `B` on the ligand side.
    pub fn new(ligand_resn: &str, ligand: ResidueLocator, covalent: Option<ResidueLocator>) -> Self {
        Self {
            ligand_resn: ligand_resn.to_string(),
            ligand: ligand.resolved(DEFAULT_LIGAND_CHAIN),
            covalent: covalent.map(|c| c.resolved(DEFAULT_RECEPTOR_CHAIN)),
        }
    }

    /// Returns the merged complex as PDB text, prefixed by a `LINK` record when `link` is given.
    pub fn merge(
        &self,
        receptor: &PdbStructure,
        positioned: &Molecule,
        link: Option<&LinkAtoms>,
    ) -> String {
        let fallback = ResidueInfo::new(
            &self.ligand_resn,
            self.ligand.number,
            self.ligand.chain_or(DEFAULT_LIGAND_CHAIN),
        );
        let mut ligand = PdbStructure::from_molecule(positioned, &fallback);
        for record in &mut ligand.records {
            record.residue_number = self.ligand.number;
            record.chain_id = self.ligand.chain_or(DEFAULT_LIGAND_CHAIN);
        }

        let mut merged = receptor.clone();
        merged.extend(ligand);
        let before = merged.records.len();
        merged.retain(|record| !is_stripped(record));
        merged.renumber();
        debug!(
            removed = before - merged.records.len(),
            "Placeholder, connection and unmatched atoms stripped."
        );

        let body = merged.to_pdb_string();
        match (link, self.covalent) {
            (Some(link), Some(covalent)) => self.link_record(link, covalent) + &body,
            _ => body,
        }
    }

    fn link_record(&self, link: &LinkAtoms, covalent: ResidueLocator) -> String {
        format!(
            "LINK         {:<4}{} {} {:>3}                {} {} {} {:>3}     1555   1555  1.8\n",
            link.receptor_atom.trim(),
            link.receptor_resn,
            covalent.chain_or(DEFAULT_RECEPTOR_CHAIN),
            covalent.number,
            pad_atom_name(&link.ligand_atom),
            self.ligand_resn,
            self.ligand.chain_or(DEFAULT_LIGAND_CHAIN),
            self.ligand.number,
        )
    }
}

fn is_stripped(record: &PdbAtomRecord) -> bool {
    let name = record.name.trim();
    name == PLACEHOLDER_ATOM_NAME
        || matches!(record.element.trim(), "*" | "R" | "R#")
        || is_connection_atom(name)
        || record.residue_name.trim() == UNSPECIFIED_LIGAND_CODE
}

/// The receptor atom the ligand bonds to, as an [`Atom`] for the fragment placer.
pub fn receptor_attachment(
    receptor: &PdbStructure,
    locator: &ResidueLocator,
    atom_name: &str,
) -> Option<Atom> {
    receptor.find_atom(locator, atom_name).map(|record| {
        Atom::new(&record.name, &record.element, record.position).with_residue(ResidueInfo::new(
            &record.residue_name,
            record.residue_number,
            record.chain_id,
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::topology::BondOrder;
    use nalgebra::Point3;

    const RECEPTOR: &str = "\
ATOM      1  CA  CYS A 145      11.000  11.500  12.500  1.00  0.00           C
ATOM      2  SG  CYS A 145      13.000  12.500  13.500  1.00  0.00           S
END
";

    fn positioned() -> Molecule {
        let lig = ResidueInfo::new("LIG", 1, 'X');
        let unl = ResidueInfo::new("UNL", 1, 'X');
        let mut mol = Molecule::new();
        let cy = mol.add_atom(Atom::new("CY", "C", Point3::new(14.0, 13.0, 14.0)).with_residue(lig.clone()));
        let cx = mol.add_atom(Atom::new("CX", "C", Point3::new(14.5, 13.0, 14.0)).with_residue(lig.clone()));
        let conn = mol.add_atom(Atom::new("CONN1", "C", Point3::new(13.0, 12.5, 13.5)).with_residue(lig.clone()));
        mol.add_atom(Atom::new("R", "*", Point3::new(13.0, 12.5, 13.5)).with_residue(lig));
        mol.add_atom(Atom::new("C9", "C", Point3::new(20.0, 20.0, 20.0)).with_residue(unl));
        mol.add_bond(cy, cx, BondOrder::Single).unwrap();
        mol.add_bond(cx, conn, BondOrder::Single).unwrap();
        mol
    }

    fn placer() -> SpatialPlacer {
        SpatialPlacer::new("LIG", "1".parse().unwrap(), Some("145".parse().unwrap()))
    }

    #[test]
    fn merge_relabels_and_strips_the_ligand() {
        let receptor = PdbStructure::parse(RECEPTOR).unwrap();
        let text = placer().merge(&receptor, &positioned(), None);
        let merged = PdbStructure::parse(&text).unwrap();

        assert_eq!(merged.records.len(), 4);
        assert!(!merged.contains_residue_name(UNSPECIFIED_LIGAND_CODE));
        assert!(merged.records.iter().all(|r| !is_connection_atom(&r.name) && r.name != "R"));
        let cx = merged.find_atom(&"1B".parse().unwrap(), "CX").unwrap();
        assert_eq!(cx.serial, 4);
        assert_eq!(merged.bonds(), &[(2, 3)]);
        assert!(!text.starts_with("LINK"));
    }

    #[test]
    fn covalent_merge_prepends_a_fixed_width_link_record() {
        let receptor = PdbStructure::parse(RECEPTOR).unwrap();
        let link = LinkAtoms {
            receptor_atom: "SG".into(),
            receptor_resn: "CYS".into(),
            ligand_atom: "CX".into(),
        };
        let text = placer().merge(&receptor, &positioned(), Some(&link));
        let first = text.lines().next().unwrap();
        assert_eq!(
            first,
            "LINK         SG  CYS A 145                 CX  LIG B   1     1555   1555  1.8"
        );
    }

    #[test]
    fn merge_is_deterministic() {
        let receptor = PdbStructure::parse(RECEPTOR).unwrap();
        let a = placer().merge(&receptor, &positioned(), None);
        let b = placer().merge(&receptor, &positioned(), None);
        assert_eq!(a, b);
    }

    #[test]
    fn receptor_attachment_honours_the_chain() {
        let receptor = PdbStructure::parse(RECEPTOR).unwrap();
        let sg = receptor_attachment(&receptor, &"145A".parse().unwrap(), "SG").unwrap();
        assert_eq!(sg.element, "S");
        assert_eq!(sg.residue_name(), Some("CYS"));
        assert!(receptor_attachment(&receptor, &"145B".parse().unwrap(), "SG").is_none());
        assert!(receptor_attachment(&receptor, &"145".parse().unwrap(), "SG").is_some());
    }
}
