use super::checkpoint::Prerequisites;
use super::collaborators::{KeyResidue, Minimizer, MinimizerInput, MinimizerSession};
use super::error::PipelineError;
use super::job::Job;
use tracing::{debug, instrument};

/// Hands the merged complex to the minimizer and drives the working pose.
pub struct MinimizationCoordinator<'a> {
    minimizer: &'a dyn Minimizer,
}

impl<'a> MinimizationCoordinator<'a> {
    pub fn new(minimizer: &'a dyn Minimizer) -> Self {
        Self { minimizer }
    }

    /// Builds the pose, applies the pose hook, minimizes, and records both
    /// structures on the job.
    ///
    /// The returned session is needed for scoring and must be dropped before
    /// the next checkpoint.
    #[instrument(skip_all, fields(job = %job.long_name()))]
    pub fn run(
        &self,
        job: &mut Job,
        prerequisites: &Prerequisites,
    ) -> Result<Box<dyn MinimizerSession>, PipelineError> {
        let key_residue = match job.config().covalent_resi {
            Some(locator) => KeyResidue::Residue(locator),
            None => KeyResidue::None,
        };
        let pdb = job
            .unminimised_pdb
            .clone()
            .ok_or_else(|| PipelineError::Internal("minimization before merging".into()))?;
        let input = MinimizerInput {
            pdb: &pdb,
            params_file: &prerequisites.params,
            constraint_file: prerequisites.constraint.as_deref(),
            ligand: job.config().ligand_resi,
            key_residues: vec![key_residue],
        };
        debug!(
            constraint_file = %input.constraint_file_arg(),
            key_residue = %key_residue,
            "Setting up minimizer."
        );
        let mut session = self
            .minimizer
            .prepare(&input, &mut job.warnings)
            .map_err(PipelineError::collaborator("minimizer"))?;

        let pose_hook = job
            .config()
            .pose_fx
            .clone()
            .or_else(|| job.config().hooks.pose_mod.clone());
        if let Some(hook) = pose_hook {
            debug!("Running pose modification.");
            hook(session.as_mut()).map_err(PipelineError::collaborator("pose hook"))?;
        }

        // Store the round-tripped pose so the unminimised structure matches what was minimized.
        job.unminimised_pdb = Some(
            session
                .pose_pdb()
                .map_err(PipelineError::collaborator("minimizer"))?,
        );
        debug!("Minimising.");
        session
            .minimise(&mut job.warnings)
            .map_err(PipelineError::collaborator("minimizer"))?;
        job.minimised_pdb = Some(
            session
                .pose_pdb()
                .map_err(PipelineError::collaborator("minimizer"))?,
        );
        Ok(session)
    }
}
