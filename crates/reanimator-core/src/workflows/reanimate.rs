use crate::core::catalog::DefinitionCatalog;
use crate::core::models::atom::Atom;
use crate::core::models::locator::ResidueLocator;
use crate::engine::checkpoint::{CheckpointManager, Prerequisites};
use crate::engine::collaborators::{Collaborators, ParameterizationRequest, PlacementRequest};
use crate::engine::config::JobConfig;
use crate::engine::constraints::ConstraintBuilder;
use crate::engine::covalent::CovalentAttachmentResolver;
use crate::engine::error::{CollaboratorError, ErrorKind, PipelineError};
use crate::engine::hooks::run_stage_hook;
use crate::engine::job::{Job, JobFailure, JobOutcome, JobStage};
use crate::engine::minimization::MinimizationCoordinator;
use crate::engine::placement::{LinkAtoms, SpatialPlacer, receptor_attachment};
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::scoring::ScoreReporter;
use crate::engine::validation::InputValidator;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use tracing::{debug, error, info, instrument};

/// Anchor residue for coordinate restraints when nothing better is known.
const FALLBACK_ANCHOR: ResidueLocator = ResidueLocator {
    number: 1,
    chain: Some('A'),
};

/// Shared, read-only resources for running jobs.
pub struct PipelineContext<'a> {
    pub catalog: &'a DefinitionCatalog,
    pub collaborators: Collaborators<'a>,
    /// Parent of the per-job artifact directories.
    pub work_path: PathBuf,
    pub reporter: &'a ProgressReporter<'a>,
}

impl<'a> PipelineContext<'a> {
    pub fn new(
        catalog: &'a DefinitionCatalog,
        collaborators: Collaborators<'a>,
        work_path: impl Into<PathBuf>,
        reporter: &'a ProgressReporter<'a>,
    ) -> Self {
        Self {
            catalog,
            collaborators,
            work_path: work_path.into(),
            reporter,
        }
    }
}

/// Runs one candidate through the whole pipeline.
///
/// Never panics and never returns an error: any stage fault, including a
/// panic inside a collaborator or hook, is logged with the job's identity and
/// reported as [`JobOutcome::Failed`].
#[instrument(skip_all, name = "reanimate_workflow")]
pub fn run(config: JobConfig, context: &PipelineContext) -> JobOutcome {
    let mut job = Job::new(config);
    let result = panic::catch_unwind(AssertUnwindSafe(|| execute(&mut job, context)));

    let (kind, message) = match result {
        Ok(Ok(())) => {
            info!(job = %job.long_name(), "Completed.");
            return JobOutcome::Success(Box::new(job));
        }
        Ok(Err(err)) => (err.kind(), err.to_string()),
        Err(payload) => (ErrorKind::Internal, panic_message(payload.as_ref())),
    };

    let stage = job.stage();
    job.flush_warnings();
    error!(
        job = %job.long_name(),
        kind = %kind,
        stage = %stage,
        "{} - {}: {}",
        job.long_name(),
        kind,
        message
    );
    job.advance(JobStage::Failed);
    context.reporter.report(Progress::Message(format!(
        "{} failed: {}",
        job.long_name(),
        message
    )));
    JobOutcome::Failed(JobFailure {
        identity: job.identity(),
        kind,
        message,
        stage,
        job: Box::new(job),
    })
}

fn execute(job: &mut Job, context: &PipelineContext) -> Result<(), PipelineError> {
    let reporter = context.reporter;
    let collaborators = context.collaborators;

    // === Phase 0: Validation ===
    reporter.phase("Validation", || validate(job, context))?;
    let checkpoints = CheckpointManager::new(&context.work_path, job.long_name());
    checkpoints.create_directory(job)?;

    // === Phase 1: Parameterization and covalent attachment ===
    let attachment = reporter.phase("Parameterization", || {
        parameterize(job, collaborators)?;
        CovalentAttachmentResolver::new(context.catalog, collaborators.matcher).resolve(job)?;
        let attachment = attachment_atom(job)?;
        job.advance(JobStage::AttachmentResolved);
        job.flush_warnings();
        Ok::<_, PipelineError>(attachment)
    })?;
    run_stage_hook(job, |hooks| &hooks.post_params)?;

    // === Phase 2: Placement and merging ===
    reporter.phase("Placement", || {
        place(job, collaborators, attachment.as_ref())?;
        merge(job)?;
        restrain(job)
    })?;

    // === Phase 3: Checkpoints before minimization ===
    let prerequisites: Prerequisites = reporter.phase("Checkpoint", || {
        let prerequisites = checkpoints.checkpoint_placement(job)?;
        run_stage_hook(job, |hooks| &hooks.post_placement)?;
        checkpoints.checkpoint_references(job, collaborators.minimizer)?;
        job.advance(JobStage::Checkpointed);
        Ok::<_, PipelineError>(prerequisites)
    })?;

    // === Phase 4: Minimization and scoring ===
    reporter.phase("Minimization", || {
        let session = MinimizationCoordinator::new(collaborators.minimizer).run(job, &prerequisites)?;
        checkpoints.checkpoint_minimised_complex(job)?;
        run_stage_hook(job, |hooks| &hooks.post_minimisation)?;
        ScoreReporter::new(collaborators.deviation).report(job, session.as_ref())?;
        drop(session);
        checkpoints.checkpoint_score(job)?;
        job.advance(JobStage::Minimised);
        Ok(())
    })
}

fn validate(job: &mut Job, context: &PipelineContext) -> Result<(), PipelineError> {
    let residue = InputValidator::new(context.catalog).validate(job)?;
    if job.is_covalent() {
        job.covalent_residue = residue;
    }
    job.advance(JobStage::Validated);
    info!(job = %job.long_name(), "Starting work.");
    job.flush_warnings();
    Ok(())
}

fn parameterize(job: &mut Job, collaborators: Collaborators) -> Result<(), PipelineError> {
    debug!(job = %job.long_name(), "Starting parameterisation.");
    let params = job
        .with_warnings(|job, warnings| {
            let request = ParameterizationRequest {
                smiles: job.smiles(),
                name: job.long_name(),
                residue_name: &job.config().ligand_resn,
            };
            collaborators.parameterizer.parameterize(&request, warnings)
        })
        .map_err(PipelineError::collaborator("parameterizer"))?;
    job.params = Some(params);
    job.advance(JobStage::Parameterised);
    Ok(())
}

/// The receptor atom the ligand bonds to; covalent jobs only.
fn attachment_atom(job: &mut Job) -> Result<Option<Atom>, PipelineError> {
    let (Some(residue), Some(locator)) = (job.covalent_residue.clone(), job.config().covalent_resi)
    else {
        return Ok(None);
    };
    if !job.is_covalent() {
        return Ok(None);
    }
    let atom_name = residue.reactive_atom_name()?;
    let atom = receptor_attachment(job.receptor()?, &locator, &atom_name);
    if atom.is_none() {
        job.warnings.push(format!(
            "Receptor has no atom {} at residue {}; placing without an attachment",
            atom_name, locator
        ));
    }
    Ok(atom)
}

fn place(
    job: &mut Job,
    collaborators: Collaborators,
    attachment: Option<&Atom>,
) -> Result<(), PipelineError> {
    debug!(job = %job.long_name(), "Starting placement.");
    let placement = job.with_warnings(|job, warnings| {
        let template = job
            .candidate()
            .ok_or_else(|| PipelineError::Internal("placement before parameterization".into()))?;
        let request = PlacementRequest {
            template,
            hits: job.hits(),
            attachment,
        };
        collaborators
            .placer
            .place(&request, warnings)
            .map_err(PipelineError::collaborator("fragment placer"))
    })?;
    job.placement = Some(placement);
    Ok(())
}

fn merge(job: &mut Job) -> Result<(), PipelineError> {
    let config = job.config();
    let placer = SpatialPlacer::new(&config.ligand_resn, config.ligand_resi, config.covalent_resi);
    let link = if job.is_covalent() {
        let residue = job.covalent_residue.as_ref().ok_or_else(|| {
            PipelineError::Internal("covalent merge without a covalent residue".into())
        })?;
        let ligand_atom = job
            .params
            .as_ref()
            .and_then(|p| p.attachment_atom_name())
            .ok_or_else(|| {
                PipelineError::collaborator("parameterizer")(CollaboratorError::new(
                    "no connection point declared for a covalent candidate",
                ))
            })?;
        Some(LinkAtoms {
            receptor_atom: residue.reactive_atom_name()?,
            receptor_resn: residue.residue.clone(),
            ligand_atom: ligand_atom.to_string(),
        })
    } else {
        None
    };
    let placement = job
        .placement
        .as_ref()
        .ok_or_else(|| PipelineError::Internal("merge before placement".into()))?;
    let merged = placer.merge(job.receptor()?, placement.positioned(), link.as_ref());
    job.unminimised_pdb = Some(merged);
    job.advance(JobStage::Placed);
    Ok(())
}

/// Appends coordinate restraints to an existing constraint spec.
fn restrain(job: &mut Job) -> Result<(), PipelineError> {
    if job.constraint.is_some() {
        let anchor = match job.config().covalent_resi {
            Some(locator) => locator,
            None => job.receptor()?.first_residue().unwrap_or(FALLBACK_ANCHOR),
        };
        let placement = job
            .placement
            .as_ref()
            .ok_or_else(|| PipelineError::Internal("restraints before placement".into()))?;
        let lines = ConstraintBuilder::new(job.config().ligand_resi, anchor).coordinate_lines(placement);
        if let Some(spec) = job.constraint.as_mut() {
            spec.append(&lines);
        }
    }
    job.advance(JobStage::Restrained);
    Ok(())
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("panic: {}", message)
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("panic: {}", message)
    } else {
        "panic with a non-string payload".to_string()
    }
}
