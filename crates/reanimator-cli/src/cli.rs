use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    name = "reanimate",
    version,
    about = "Reanimator CLI - places a candidate ligand on its parent fragment hits, derives covalent and coordinate restraints, and minimises the complex.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one candidate through placement, restraint derivation and minimisation.
    Run(RunArgs),
    /// Print the warhead and covalent-residue catalog in matching order.
    Catalog(CatalogArgs),
}

/// Arguments for the `run` subcommand.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Path to the job file in TOML format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub config: PathBuf,

    /// Override the directory under which the job directory is created.
    #[arg(short, long, value_name = "DIR")]
    pub work_path: Option<PathBuf>,

    /// Override the job name used for the job directory and artifact files.
    #[arg(short, long, value_name = "NAME")]
    pub name: Option<String>,
}

/// Arguments for the `catalog` subcommand.
#[derive(Args, Debug)]
pub struct CatalogArgs {
    /// Catalog file to print instead of the built-in definitions.
    #[arg(short, long, value_name = "PATH")]
    pub file: Option<PathBuf>,
}
