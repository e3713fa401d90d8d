use super::collaborators::Minimizer;
use super::error::PipelineError;
use super::job::Job;
use crate::core::io::mol::MolFile;
use crate::core::io::pdb::PdbFile;
use crate::core::io::traits::MolecularFile;
use crate::core::models::molecule::Molecule;
use crate::core::utils::identifiers::hit_file_stem;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

/// Every file a job may write, keyed by the job's slugified name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Artifact {
    Params,
    HoloUnminimised,
    Constraint,
    HitPdb(String),
    HitMol(String),
    ParamsTemplatePdb,
    ParamsTemplateMol,
    ParamsTestPdb,
    ParamsTestScore,
    Scaffold,
    Chimera,
    Positioned,
    Provenance,
    HoloMinimised,
    MinimisedMol,
    MinimisedScore,
}

impl Artifact {
    pub fn file_name(&self, long_name: &str) -> String {
        let suffix = match self {
            Self::HitPdb(hit) => return format!("{}.pdb", hit),
            Self::HitMol(hit) => return format!("{}.mol", hit),
            Self::Params => "params",
            Self::HoloUnminimised => "holo_unminimised.pdb",
            Self::Constraint => "con",
            Self::ParamsTemplatePdb => "params_template.pdb",
            Self::ParamsTemplateMol => "params_template.mol",
            Self::ParamsTestPdb => "params_test.pdb",
            Self::ParamsTestScore => "params_test.score",
            Self::Scaffold => "scaffold.mol",
            Self::Chimera => "chimera.mol",
            Self::Positioned => "positioned.mol",
            Self::Provenance => "fragmenstein.json",
            Self::HoloMinimised => "holo_minimised.pdb",
            Self::MinimisedMol => "minimised.mol",
            Self::MinimisedScore => "minimised.json",
        };
        format!("{}.{}", long_name, suffix)
    }
}

/// Paths the minimizer is pointed at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prerequisites {
    pub params: PathBuf,
    pub holo: PathBuf,
    /// Absent when the job has no constraint spec.
    pub constraint: Option<PathBuf>,
}

#[derive(Serialize)]
struct ProvenanceRecord<'a> {
    smiles: &'a str,
    origin: &'a [Vec<String>],
    stdev: &'a [f64],
}

/// Persists a job's artifacts under `<work_path>/<long_name>/`.
///
/// Checkpoints only ever add or overwrite files; nothing written by an
/// earlier checkpoint is removed by a later one.
#[derive(Debug, Clone)]
pub struct CheckpointManager {
    long_name: String,
    directory: PathBuf,
}

impl CheckpointManager {
    pub fn new(work_path: &Path, long_name: &str) -> Self {
        Self {
            long_name: long_name.to_string(),
            directory: work_path.join(long_name),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn path(&self, artifact: &Artifact) -> PathBuf {
        self.directory.join(artifact.file_name(&self.long_name))
    }

    /// Creates the job directory. An existing directory is reported as a warning.
    pub fn create_directory(&self, job: &mut Job) -> Result<(), PipelineError> {
        if self.directory.is_dir() {
            job.warnings
                .push(format!("Folder {} exists.", self.directory.display()));
            return Ok(());
        }
        fs::create_dir_all(&self.directory).map_err(|source| PipelineError::Artifact {
            path: self.directory.display().to_string(),
            source,
        })
    }

    /// Placement outputs, provenance, and the minimizer's input files.
    #[instrument(skip_all, fields(job = %self.long_name))]
    pub fn checkpoint_placement(&self, job: &mut Job) -> Result<Prerequisites, PipelineError> {
        job.warnings.flush(&self.long_name);
        let placement = job
            .placement
            .as_ref()
            .ok_or_else(|| PipelineError::Internal("placement checkpoint before placement".into()))?;

        debug!("Saving placement molecules.");
        self.write_mol(&Artifact::Scaffold, placement.scaffold())?;
        self.write_mol(&Artifact::Chimera, placement.chimera())?;
        self.write_mol(&Artifact::Positioned, placement.positioned())?;
        let provenance = serde_json::to_string(&ProvenanceRecord {
            smiles: job.smiles(),
            origin: placement.origins(),
            stdev: placement.stdev(),
        })?;
        self.write_text(&Artifact::Provenance, &provenance)?;

        debug!("Saving params, unminimised complex and constraints.");
        let params = job
            .params
            .as_ref()
            .ok_or_else(|| PipelineError::Internal("placement checkpoint before parameterization".into()))?;
        let params_path = self.write_text(&Artifact::Params, &params.content)?;
        let holo = job
            .unminimised_pdb
            .as_deref()
            .ok_or_else(|| PipelineError::Internal("placement checkpoint before merging".into()))?;
        let holo_path = self.write_text(&Artifact::HoloUnminimised, holo)?;
        let constraint_path = match &job.constraint {
            Some(spec) => Some(self.write_text(&Artifact::Constraint, spec.text())?),
            None => None,
        };

        job.warnings.flush(&self.long_name);
        Ok(Prerequisites {
            params: params_path,
            holo: holo_path,
            constraint: constraint_path,
        })
    }

    /// Reference fragments, the parameterization template, and a standalone params check.
    #[instrument(skip_all, fields(job = %self.long_name))]
    pub fn checkpoint_references(
        &self,
        job: &mut Job,
        minimizer: &dyn Minimizer,
    ) -> Result<(), PipelineError> {
        job.warnings.flush(&self.long_name);
        for (index, hit) in job.hits().iter().enumerate() {
            let stem = hit_file_stem(hit.name.as_deref(), index);
            self.write_pdb(&Artifact::HitPdb(stem.clone()), hit)?;
            self.write_mol(&Artifact::HitMol(stem), hit)?;
        }

        let params = job.params.as_ref().ok_or_else(|| {
            PipelineError::Internal("reference checkpoint before parameterization".into())
        })?;
        self.write_pdb(&Artifact::ParamsTemplatePdb, &params.template)?;
        self.write_mol(&Artifact::ParamsTemplateMol, &params.template)?;

        debug!("Checking the params file loads on its own.");
        let residue_name = params.name.clone();
        let test = minimizer
            .test_params(&self.path(&Artifact::Params), &residue_name, &mut job.warnings)
            .map_err(PipelineError::collaborator("minimizer"))?;
        self.write_text(&Artifact::ParamsTestPdb, &test.pdb)?;
        self.write_text(&Artifact::ParamsTestScore, &test.score.to_string())?;

        job.warnings.flush(&self.long_name);
        Ok(())
    }

    /// The minimized complex, written as soon as minimization returns.
    #[instrument(skip_all, fields(job = %self.long_name))]
    pub fn checkpoint_minimised_complex(&self, job: &mut Job) -> Result<(), PipelineError> {
        job.warnings.flush(&self.long_name);
        let minimised = job
            .minimised_pdb
            .as_deref()
            .ok_or_else(|| PipelineError::Internal("minimised checkpoint before minimization".into()))?;
        self.write_text(&Artifact::HoloMinimised, minimised)?;
        Ok(())
    }

    /// The recovered ligand and its score.
    #[instrument(skip_all, fields(job = %self.long_name))]
    pub fn checkpoint_score(&self, job: &mut Job) -> Result<(), PipelineError> {
        job.warnings.flush(&self.long_name);
        let ligand = job
            .minimised_ligand
            .as_ref()
            .ok_or_else(|| PipelineError::Internal("score checkpoint before scoring".into()))?;
        self.write_mol(&Artifact::MinimisedMol, ligand)?;
        if let Some(score) = &job.score {
            self.write_text(&Artifact::MinimisedScore, &serde_json::to_string(score)?)?;
        }
        job.warnings.flush(&self.long_name);
        Ok(())
    }

    pub fn write_text(&self, artifact: &Artifact, content: &str) -> Result<PathBuf, PipelineError> {
        let path = self.path(artifact);
        fs::write(&path, content).map_err(|source| PipelineError::Artifact {
            path: path.display().to_string(),
            source,
        })?;
        debug!(path = %path.display(), "Artifact written.");
        Ok(path)
    }

    fn write_mol(&self, artifact: &Artifact, molecule: &Molecule) -> Result<PathBuf, PipelineError> {
        self.write_text(artifact, &MolFile::write_to_string(molecule)?)
    }

    fn write_pdb(&self, artifact: &Artifact, molecule: &Molecule) -> Result<PathBuf, PipelineError> {
        self.write_text(artifact, &PdbFile::write_to_string(molecule)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::config::JobConfigBuilder;
    use tempfile::tempdir;

    fn job() -> Job {
        Job::new(
            JobConfigBuilder::new()
                .smiles("CCO")
                .hit(Molecule::with_name("x0107"))
                .receptor_pdb("END\n")
                .long_name("ethanol")
                .build()
                .unwrap(),
        )
    }

    #[test]
    fn file_names_follow_the_artifact_set() {
        assert_eq!(Artifact::Params.file_name("lig"), "lig.params");
        assert_eq!(Artifact::Provenance.file_name("lig"), "lig.fragmenstein.json");
        assert_eq!(Artifact::MinimisedScore.file_name("lig"), "lig.minimised.json");
        assert_eq!(Artifact::HitMol("x0107".into()).file_name("lig"), "x0107.mol");
    }

    #[test]
    fn existing_directory_warns_and_keeps_files() {
        let dir = tempdir().unwrap();
        let manager = CheckpointManager::new(dir.path(), "ethanol");
        let mut job = job();

        manager.create_directory(&mut job).unwrap();
        assert!(job.warnings.is_empty());
        let kept = manager.write_text(&Artifact::Params, "NAME LIG\n").unwrap();

        manager.create_directory(&mut job).unwrap();
        assert_eq!(job.warnings.len(), 1);
        assert!(job.warnings.pending()[0].contains("exists"));
        assert_eq!(fs::read_to_string(kept).unwrap(), "NAME LIG\n");
    }

    #[test]
    fn minimised_checkpoints_require_their_inputs() {
        let dir = tempdir().unwrap();
        let manager = CheckpointManager::new(dir.path(), "ethanol");
        let mut job = job();
        manager.create_directory(&mut job).unwrap();
        let err = manager.checkpoint_minimised_complex(&mut job).unwrap_err();
        assert!(matches!(err, PipelineError::Internal(_)));
        let err = manager.checkpoint_score(&mut job).unwrap_err();
        assert!(matches!(err, PipelineError::Internal(_)));
    }

    #[test]
    fn write_into_missing_directory_is_an_artifact_error() {
        let dir = tempdir().unwrap();
        let manager = CheckpointManager::new(&dir.path().join("absent"), "ethanol");
        let err = manager.write_text(&Artifact::Params, "").unwrap_err();
        assert_eq!(err.kind(), crate::engine::error::ErrorKind::Artifact);
    }
}
