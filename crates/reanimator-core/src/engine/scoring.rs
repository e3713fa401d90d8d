use super::collaborators::{DeviationCalculator, MinimizerSession};
use super::error::{CollaboratorError, PipelineError};
use super::job::Job;
use crate::core::models::molecule::Molecule;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

/// Final energetics and deviation metrics of a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreReport {
    #[serde(rename = "Energy")]
    pub energy: f64,
    #[serde(rename = "mRMSD")]
    pub mrmsd: f64,
    /// One deviation per reference fragment, in fragment order.
    #[serde(rename = "RMSDs")]
    pub rmsds: Vec<f64>,
}

pub struct ScoreReporter<'a> {
    deviation: &'a dyn DeviationCalculator,
}

impl<'a> ScoreReporter<'a> {
    pub fn new(deviation: &'a dyn DeviationCalculator) -> Self {
        Self { deviation }
    }

    /// Scores the minimized pose and stores the recovered ligand and report on the job.
    #[instrument(skip_all, fields(job = %job.long_name()))]
    pub fn report(
        &self,
        job: &mut Job,
        session: &dyn MinimizerSession,
    ) -> Result<ScoreReport, PipelineError> {
        let energy = session
            .ligand_score()
            .map_err(PipelineError::collaborator("minimizer"))?;
        let pose_ligand = session
            .ligand_from_pose()
            .map_err(PipelineError::collaborator("minimizer"))?;
        let template = job
            .candidate()
            .ok_or_else(|| PipelineError::Internal("scoring before parameterization".into()))?
            .without_placeholders();
        let ligand = recover_bond_orders(&template, &pose_ligand)?;

        let positioned = job
            .placement
            .as_ref()
            .ok_or_else(|| PipelineError::Internal("scoring before placement".into()))?
            .positioned()
            .clone();
        let hits = job.config().hits.clone();
        let deviation = self
            .deviation
            .deviation(&ligand, &hits, &positioned, &mut job.warnings)
            .map_err(PipelineError::collaborator("deviation calculator"))?;
        if deviation.rmsds.len() != hits.len() {
            return Err(PipelineError::collaborator("deviation calculator")(
                CollaboratorError::new(format!(
                    "returned {} deviations for {} reference fragments",
                    deviation.rmsds.len(),
                    hits.len()
                )),
            ));
        }

        let report = ScoreReport {
            energy,
            mrmsd: deviation.mrmsd,
            rmsds: deviation.rmsds,
        };
        info!(energy = report.energy, mrmsd = report.mrmsd, "Minimised pose scored.");
        job.minimised_ligand = Some(ligand);
        job.score = Some(report.clone());
        Ok(report)
    }
}

/// Assigns elements and bond orders to a ligand read back from a pose.
///
/// Atoms are matched to `template` by trimmed name. Every pose atom and every
/// pose bond must exist in the template. A pose without any bonds takes the
/// template's bonds between the matched atoms.
pub fn recover_bond_orders(template: &Molecule, pose: &Molecule) -> Result<Molecule, PipelineError> {
    let mut mapping = Vec::with_capacity(pose.len());
    let mut ligand = Molecule::new();
    ligand.name = pose.name.clone().or_else(|| template.name.clone());
    for atom in pose.atoms() {
        let index = template.find_atom_by_name(&atom.name).ok_or_else(|| {
            PipelineError::BondRecovery(format!(
                "pose atom '{}' has no counterpart in the template",
                atom.name.trim()
            ))
        })?;
        let mut recovered = atom.clone();
        recovered.element = template.atoms()[index].element.clone();
        ligand.add_atom(recovered);
        mapping.push(index);
    }

    if pose.bonds().is_empty() {
        for bond in template.bonds() {
            let a = mapping.iter().position(|&t| t == bond.atom1);
            let b = mapping.iter().position(|&t| t == bond.atom2);
            if let (Some(a), Some(b)) = (a, b) {
                ligand.add_bond(a, b, bond.order)?;
            }
        }
        return Ok(ligand);
    }

    for bond in pose.bonds() {
        let (Some(&ta), Some(&tb)) = (mapping.get(bond.atom1), mapping.get(bond.atom2)) else {
            return Err(PipelineError::BondRecovery(format!(
                "pose bond {}-{} refers to an atom outside the pose",
                bond.atom1, bond.atom2
            )));
        };
        let order = template
            .bond_between(ta, tb)
            .map(|b| b.order)
            .ok_or_else(|| {
                PipelineError::BondRecovery(format!(
                    "pose bond {}-{} has no counterpart in the template",
                    template.atoms()[ta].name.trim(),
                    template.atoms()[tb].name.trim()
                ))
            })?;
        ligand.add_bond(bond.atom1, bond.atom2, order)?;
    }
    Ok(ligand)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::atom::Atom;
    use crate::core::models::topology::BondOrder;
    use crate::engine::error::ErrorKind;
    use nalgebra::Point3;

    fn template() -> Molecule {
        let mut mol = Molecule::new();
        let c = mol.add_atom(Atom::new("CY", "C", Point3::origin()));
        let o = mol.add_atom(Atom::new("OY", "O", Point3::origin()));
        let x = mol.add_atom(Atom::new("CX", "C", Point3::origin()));
        mol.add_bond(c, o, BondOrder::Double).unwrap();
        mol.add_bond(c, x, BondOrder::Single).unwrap();
        mol
    }

    fn pose(names: &[&str], bonds: &[(usize, usize)]) -> Molecule {
        let mut mol = Molecule::new();
        for (i, name) in names.iter().enumerate() {
            mol.add_atom(Atom::new(&format!(" {} ", name), "X", Point3::new(i as f64, 0.0, 0.0)));
        }
        for &(a, b) in bonds {
            mol.add_bond(a, b, BondOrder::Single).unwrap();
        }
        mol
    }

    #[test]
    fn bond_orders_and_elements_come_from_the_template() {
        let ligand = recover_bond_orders(&template(), &pose(&["OY", "CY", "CX"], &[(0, 1), (1, 2)])).unwrap();
        assert_eq!(ligand.bond_between(0, 1).unwrap().order, BondOrder::Double);
        assert_eq!(ligand.atoms()[0].element, "O");
        assert_eq!(ligand.atoms()[2].position.x, 2.0);
    }

    #[test]
    fn pose_without_bonds_takes_template_connectivity() {
        let ligand = recover_bond_orders(&template(), &pose(&["CX", "CY", "OY"], &[])).unwrap();
        assert_eq!(ligand.bonds().len(), 2);
        assert_eq!(ligand.bond_between(1, 2).unwrap().order, BondOrder::Double);
    }

    #[test]
    fn unknown_atom_is_a_bond_recovery_error() {
        let err = recover_bond_orders(&template(), &pose(&["CY", "NZ"], &[])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BondRecovery);
    }

    #[test]
    fn extra_bond_is_a_bond_recovery_error() {
        let err =
            recover_bond_orders(&template(), &pose(&["OY", "CY", "CX"], &[(0, 2)])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BondRecovery);
        assert!(err.to_string().contains("OY-CX"));
    }

    #[test]
    fn report_serializes_with_published_keys() {
        let report = ScoreReport {
            energy: -12.5,
            mrmsd: 0.8,
            rmsds: vec![0.7, 0.9],
        };
        let json: serde_json::Value = serde_json::to_value(&report).unwrap();
        assert_eq!(json["Energy"], -12.5);
        assert_eq!(json["mRMSD"], 0.8);
        assert_eq!(json["RMSDs"].as_array().unwrap().len(), 2);
    }
}
