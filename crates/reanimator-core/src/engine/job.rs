use super::collaborators::{Parameterization, PlacementResult};
use super::config::JobConfig;
use super::constraints::ConstraintSpec;
use super::error::ErrorKind;
use super::scoring::ScoreReport;
use super::warnings::WarningBuffer;
use crate::core::catalog::definitions::{CovalentResidueDefinition, WarheadDefinition};
use crate::core::chem::smiles;
use crate::core::io::pdb::{PdbError, PdbStructure};
use crate::core::models::molecule::Molecule;
use crate::core::utils::identifiers::slugify;
use serde::Serialize;
use std::cell::OnceCell;
use std::fmt;
use std::sync::Arc;

/// Progress of a job through the pipeline. Stages only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum JobStage {
    Created,
    Validated,
    Parameterised,
    AttachmentResolved,
    Placed,
    Restrained,
    Checkpointed,
    Minimised,
    Failed,
}

impl JobStage {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Minimised | Self::Failed)
    }
}

impl fmt::Display for JobStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Created => "created",
            Self::Validated => "validated",
            Self::Parameterised => "parameterised",
            Self::AttachmentResolved => "attachment_resolved",
            Self::Placed => "placed",
            Self::Restrained => "restrained",
            Self::Checkpointed => "checkpointed",
            Self::Minimised => "minimised",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// What identifies a job in logs and failure reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobIdentity {
    /// Slugified job name, also the artifact directory name.
    pub long_name: String,
    pub smiles: String,
}

impl fmt::Display for JobIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.long_name, self.smiles)
    }
}

/// One pipeline run for one candidate.
///
/// Created from a [`JobConfig`] and filled in place as stages complete. The
/// fields written by stages are public so that stage hooks can inspect and
/// adjust them.
#[derive(Debug)]
pub struct Job {
    config: JobConfig,
    long_name: String,
    is_covalent: bool,
    stage: JobStage,
    receptor: OnceCell<PdbStructure>,

    pub params: Option<Parameterization>,
    /// Catalog entries selected for this job; shared with the catalog.
    pub warhead: Option<Arc<WarheadDefinition>>,
    pub covalent_residue: Option<Arc<CovalentResidueDefinition>>,
    pub constraint: Option<ConstraintSpec>,
    pub placement: Option<PlacementResult>,
    pub unminimised_pdb: Option<String>,
    pub minimised_pdb: Option<String>,
    /// The minimized ligand with bond orders recovered from the template.
    pub minimised_ligand: Option<Molecule>,
    pub score: Option<ScoreReport>,
    pub warnings: WarningBuffer,
}

impl Job {
    pub fn new(config: JobConfig) -> Self {
        let long_name = slugify(&config.long_name);
        let is_covalent = smiles::has_attachment_marker(&config.smiles);
        Self {
            config,
            long_name,
            is_covalent,
            stage: JobStage::Created,
            receptor: OnceCell::new(),
            params: None,
            warhead: None,
            covalent_residue: None,
            constraint: None,
            placement: None,
            unminimised_pdb: None,
            minimised_pdb: None,
            minimised_ligand: None,
            score: None,
            warnings: WarningBuffer::new(),
        }
    }

    pub fn config(&self) -> &JobConfig {
        &self.config
    }

    pub fn long_name(&self) -> &str {
        &self.long_name
    }

    pub fn smiles(&self) -> &str {
        &self.config.smiles
    }

    pub fn hits(&self) -> &[Molecule] {
        &self.config.hits
    }

    /// True iff the connectivity string carries an attachment marker.
    pub fn is_covalent(&self) -> bool {
        self.is_covalent
    }

    pub fn stage(&self) -> JobStage {
        self.stage
    }

    pub fn identity(&self) -> JobIdentity {
        JobIdentity {
            long_name: self.long_name.clone(),
            smiles: self.config.smiles.clone(),
        }
    }

    /// The candidate as parameterized, once parameterization has run.
    pub fn candidate(&self) -> Option<&Molecule> {
        self.params.as_ref().map(|p| &p.template)
    }

    /// The receptor, parsed on first use.
    pub fn receptor(&self) -> Result<&PdbStructure, PdbError> {
        if let Some(receptor) = self.receptor.get() {
            return Ok(receptor);
        }
        let parsed = PdbStructure::parse(&self.config.receptor_pdb)?;
        Ok(self.receptor.get_or_init(|| parsed))
    }

    /// Runs `f` with shared access to the job and exclusive access to its warnings.
    pub fn with_warnings<T>(&mut self, f: impl FnOnce(&Job, &mut WarningBuffer) -> T) -> T {
        let mut warnings = std::mem::take(&mut self.warnings);
        let result = f(self, &mut warnings);
        self.warnings = warnings;
        result
    }

    /// Emits buffered warnings into the job log, tagged with the job name.
    pub fn flush_warnings(&mut self) -> usize {
        self.warnings.flush(&self.long_name)
    }

    /// Moves the job forward. Backward moves and moves out of a terminal stage are ignored.
    pub(crate) fn advance(&mut self, next: JobStage) {
        if !self.stage.is_terminal() && next > self.stage {
            self.stage = next;
        }
    }
}

/// A job that stopped with an error.
#[derive(Debug)]
pub struct JobFailure {
    pub identity: JobIdentity,
    pub kind: ErrorKind,
    pub message: String,
    /// Last stage completed before the fault.
    pub stage: JobStage,
    pub job: Box<Job>,
}

/// Terminal result of a pipeline run.
#[derive(Debug)]
pub enum JobOutcome {
    Success(Box<Job>),
    Failed(JobFailure),
}

impl JobOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn job(&self) -> &Job {
        match self {
            Self::Success(job) => job,
            Self::Failed(failure) => &failure.job,
        }
    }

    pub fn failure(&self) -> Option<&JobFailure> {
        match self {
            Self::Success(_) => None,
            Self::Failed(failure) => Some(failure),
        }
    }
}
