use super::collaborators::MinimizerSession;
use super::error::{CollaboratorError, PipelineError};
use super::job::Job;
use std::fmt;
use std::sync::Arc;

/// Callback invoked with the job at a fixed stage boundary.
pub type StageHook = Arc<dyn Fn(&mut Job) -> Result<(), PipelineError> + Send + Sync>;

/// Callback that may alter the minimizer's working pose before minimization.
pub type PoseHook =
    Arc<dyn Fn(&mut dyn MinimizerSession) -> Result<(), CollaboratorError> + Send + Sync>;

/// Optional extension points of the pipeline. An absent hook is a no-op.
#[derive(Clone, Default)]
pub struct StageHooks {
    /// After parameterization and covalent resolution, before placement.
    pub post_params: Option<StageHook>,
    /// After the placement and prerequisite artifacts are written.
    pub post_placement: Option<StageHook>,
    /// Default pose modification; skipped when the job carries its own pose hook.
    pub pose_mod: Option<PoseHook>,
    /// After minimization, before scoring.
    pub post_minimisation: Option<StageHook>,
}

impl StageHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn post_params(
        mut self,
        hook: impl Fn(&mut Job) -> Result<(), PipelineError> + Send + Sync + 'static,
    ) -> Self {
        self.post_params = Some(Arc::new(hook));
        self
    }

    pub fn post_placement(
        mut self,
        hook: impl Fn(&mut Job) -> Result<(), PipelineError> + Send + Sync + 'static,
    ) -> Self {
        self.post_placement = Some(Arc::new(hook));
        self
    }

    pub fn pose_mod(
        mut self,
        hook: impl Fn(&mut dyn MinimizerSession) -> Result<(), CollaboratorError>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        self.pose_mod = Some(Arc::new(hook));
        self
    }

    pub fn post_minimisation(
        mut self,
        hook: impl Fn(&mut Job) -> Result<(), PipelineError> + Send + Sync + 'static,
    ) -> Self {
        self.post_minimisation = Some(Arc::new(hook));
        self
    }
}

impl fmt::Debug for StageHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StageHooks")
            .field("post_params", &self.post_params.is_some())
            .field("post_placement", &self.post_placement.is_some())
            .field("pose_mod", &self.pose_mod.is_some())
            .field("post_minimisation", &self.post_minimisation.is_some())
            .finish()
    }
}

/// Runs a stage hook if one is set.
///
/// The hook is cloned out first because it lives inside the job it mutates.
pub(crate) fn run_stage_hook(
    job: &mut Job,
    select: impl Fn(&StageHooks) -> &Option<StageHook>,
) -> Result<(), PipelineError> {
    let hook = select(&job.config().hooks).clone();
    match hook {
        Some(hook) => hook(job),
        None => Ok(()),
    }
}
