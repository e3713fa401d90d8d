use super::collaborators::PlacementResult;
use crate::core::catalog::definitions::NamedSite;
use crate::core::models::locator::ResidueLocator;
use crate::core::utils::identifiers::is_connection_atom;
use std::fmt::Write;
use tracing::debug;

/// Equilibrium length (Å) and tolerance of the covalent bond restraint.
const BOND_LENGTH: (f64, f64) = (1.80, 0.20);
/// Tetrahedral angle (radians) and tolerance around the covalent bond.
const BOND_ANGLE: (f64, f64) = (1.91, 0.35);
/// Added to every positional spread so that no coordinate restraint is tighter than 1 Å.
const MIN_COORDINATE_WIDTH: f64 = 1.0;

/// Restraint text for one job.
///
/// The text only grows: covalent lines are rendered at construction and
/// everything else (warhead template, caller text, coordinate restraints) is
/// appended in that order.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintSpec {
    text: String,
    ligand_res: ResidueLocator,
    target_res: Option<ResidueLocator>,
}

impl ConstraintSpec {
    /// A spec carrying only caller-supplied text.
    pub fn custom(ligand_res: ResidueLocator, target_res: Option<ResidueLocator>) -> Self {
        Self {
            text: String::new(),
            ligand_res,
            target_res,
        }
    }

    /// A spec seeded with the bond and angle restraints of a covalent attachment.
    pub fn covalent(
        ligand: &NamedSite,
        residue: &NamedSite,
        ligand_res: ResidueLocator,
        target_res: ResidueLocator,
    ) -> Self {
        let mut spec = Self::custom(ligand_res, Some(target_res));
        let (length, length_sd) = BOND_LENGTH;
        let (angle, angle_sd) = BOND_ANGLE;
        let _ = writeln!(
            spec.text,
            "AtomPair {} {} {} {} HARMONIC {:.2} {:.2}",
            residue.attached, target_res, ligand.attached, ligand_res, length, length_sd
        );
        if let Some(neighbour) = &residue.neighbour {
            let _ = writeln!(
                spec.text,
                "Angle {} {} {} {} {} {} HARMONIC {:.2} {:.2}",
                neighbour, target_res, residue.attached, target_res, ligand.attached, ligand_res,
                angle, angle_sd
            );
        }
        if let Some(neighbour) = &ligand.neighbour {
            let _ = writeln!(
                spec.text,
                "Angle {} {} {} {} {} {} HARMONIC {:.2} {:.2}",
                residue.attached, target_res, ligand.attached, ligand_res, neighbour, ligand_res,
                angle, angle_sd
            );
        }
        spec
    }

    /// Appends a block of restraint lines, keeping blocks on separate lines.
    pub fn append(&mut self, block: &str) {
        if block.is_empty() {
            return;
        }
        if !self.text.is_empty() && !self.text.ends_with('\n') {
            self.text.push('\n');
        }
        self.text.push_str(block);
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn ligand_res(&self) -> ResidueLocator {
        self.ligand_res
    }

    pub fn target_res(&self) -> Option<ResidueLocator> {
        self.target_res
    }
}

/// Derives coordinate restraints from placement provenance.
pub struct ConstraintBuilder {
    ligand: ResidueLocator,
    anchor: ResidueLocator,
}

impl ConstraintBuilder {
    /// `anchor` is the residue whose `CA` the restraints are expressed against.
    pub fn new(ligand: ResidueLocator, anchor: ResidueLocator) -> Self {
        Self { ligand, anchor }
    }

    /// One harmonic restraint per inherited, real ligand atom, in atom order.
    pub fn coordinate_lines(&self, placement: &PlacementResult) -> String {
        let mut lines = String::new();
        let mut count = 0;
        for (i, atom) in placement.positioned().atoms().iter().enumerate() {
            if !placement.is_inherited(i) || atom.is_placeholder() || is_connection_atom(&atom.name) {
                continue;
            }
            let width = placement.stdev()[i].max(0.0) + MIN_COORDINATE_WIDTH;
            let _ = writeln!(
                lines,
                "CoordinateConstraint {} {} CA {} {:.3} {:.3} {:.3} HARMONIC 0 {:.3}",
                atom.name.trim(),
                self.ligand,
                self.anchor,
                atom.position.x,
                atom.position.y,
                atom.position.z,
                width
            );
            count += 1;
        }
        debug!(restraints = count, "Coordinate restraints derived.");
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::atom::Atom;
    use crate::core::models::molecule::Molecule;
    use nalgebra::Point3;

    fn site(attached: &str, neighbour: Option<&str>) -> NamedSite {
        NamedSite {
            attached: attached.to_string(),
            neighbour: neighbour.map(String::from),
        }
    }

    fn placement(stdev: Vec<f64>, origins: Vec<Vec<String>>) -> PlacementResult {
        let mut mol = Molecule::new();
        mol.add_atom(Atom::new("CY", "C", Point3::new(1.0, 2.0, 3.0)));
        mol.add_atom(Atom::new("CX", "C", Point3::new(2.0, 2.0, 3.0)));
        mol.add_atom(Atom::new("CONN1", "C", Point3::new(3.0, 2.0, 3.0)));
        mol.add_atom(Atom::new("R", "*", Point3::new(4.0, 2.0, 3.0)));
        PlacementResult::new(mol.clone(), mol.clone(), mol, origins, stdev).unwrap()
    }

    fn all_inherited() -> Vec<Vec<String>> {
        (0..4).map(|i| vec![format!("x0107.{}", i)]).collect()
    }

    #[test]
    fn covalent_spec_renders_bond_then_angles() {
        let spec = ConstraintSpec::covalent(
            &site("CX", Some("CY")),
            &site("SG", Some("CB")),
            "1B".parse().unwrap(),
            "145A".parse().unwrap(),
        );
        let lines: Vec<&str> = spec.text().lines().collect();
        assert_eq!(
            lines,
            [
                "AtomPair SG 145A CX 1B HARMONIC 1.80 0.20",
                "Angle CB 145A SG 145A CX 1B HARMONIC 1.91 0.35",
                "Angle SG 145A CX 1B CY 1B HARMONIC 1.91 0.35",
            ]
        );
    }

    #[test]
    fn appended_blocks_never_share_a_line() {
        let mut spec = ConstraintSpec::custom("1B".parse().unwrap(), None);
        spec.append("AtomPair A 1B B 2A HARMONIC 3 1");
        spec.append("");
        spec.append("AtomPair C 1B D 2A HARMONIC 3 1\n");
        assert_eq!(spec.text().lines().count(), 2);
        assert!(spec.text().starts_with("AtomPair A"));
    }

    #[test]
    fn coordinate_lines_skip_connection_and_placeholder_atoms() {
        let builder = ConstraintBuilder::new("1B".parse().unwrap(), "145A".parse().unwrap());
        let text = builder.coordinate_lines(&placement(vec![0.5; 4], all_inherited()));
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[0],
            "CoordinateConstraint CY 1B CA 145A 1.000 2.000 3.000 HARMONIC 0 1.500"
        );
        assert!(lines[1].starts_with("CoordinateConstraint CX "));
    }

    #[test]
    fn coordinate_lines_skip_non_inherited_atoms() {
        let mut origins = all_inherited();
        origins[0].clear();
        let builder = ConstraintBuilder::new("1B".parse().unwrap(), "145A".parse().unwrap());
        let text = builder.coordinate_lines(&placement(vec![0.5; 4], origins));
        assert_eq!(text.lines().count(), 1);
        assert!(!text.contains(" CY "));
    }

    #[test]
    fn width_never_drops_below_one() {
        let builder = ConstraintBuilder::new("1B".parse().unwrap(), "1A".parse().unwrap());
        let text = builder.coordinate_lines(&placement(
            vec![-3.0, f64::NAN, 0.0, 0.0],
            all_inherited(),
        ));
        for line in text.lines() {
            let width: f64 = line.rsplit(' ').next().unwrap().parse().unwrap();
            assert!(width >= 1.0, "{}", line);
        }
    }
}
