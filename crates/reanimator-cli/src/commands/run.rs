use crate::adapters::ProcessCollaborators;
use crate::cli::RunArgs;
use crate::config::JobFile;
use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use reanimator::engine::job::JobOutcome;
use reanimator::engine::progress::ProgressReporter;
use reanimator::workflows::reanimate::{self, PipelineContext};
use std::path::Path;
use tracing::info;

pub fn run(args: RunArgs) -> Result<()> {
    let base = args
        .config
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or(Path::new("."))
        .to_path_buf();
    let settings = JobFile::from_file(&args.config)?.merge_with_cli(&args, &base)?;
    info!(
        "Loaded job with {} hit(s); catalog has {} warhead(s).",
        settings.config.hits.len(),
        settings.catalog.warheads().len()
    );

    let collaborators = ProcessCollaborators::new(&settings.collaborators);
    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());
    let context = PipelineContext::new(
        &settings.catalog,
        collaborators.as_collaborators(),
        &settings.work_path,
        &reporter,
    );

    println!("Starting job '{}'...", settings.config.long_name);
    info!("Invoking the reanimation workflow...");
    match reanimate::run(settings.config, &context) {
        JobOutcome::Success(job) => {
            let directory = settings.work_path.join(job.long_name());
            match &job.score {
                Some(score) => println!(
                    "✓ Minimised (Energy: {:.4}, mRMSD: {:.3}); artifacts in: {}",
                    score.energy,
                    score.mrmsd,
                    directory.display()
                ),
                None => println!("✓ Minimised; artifacts in: {}", directory.display()),
            }
            Ok(())
        }
        JobOutcome::Failed(failure) => Err(CliError::JobFailed {
            name: failure.identity.long_name,
            kind: failure.kind,
            message: failure.message,
        }),
    }
}
