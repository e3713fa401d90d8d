use crate::cli::RunArgs;
use crate::error::{CliError, Result};
use reanimator::core::catalog::DefinitionCatalog;
use reanimator::core::io::mol::MolFile;
use reanimator::core::io::traits::MolecularFile;
use reanimator::core::models::locator::ResidueLocator;
use reanimator::core::models::molecule::Molecule;
use reanimator::engine::config::{JobConfig, JobConfigBuilder};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

const DEFAULT_WORK_PATH: &str = "output";

/// An external executable and its fixed arguments.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct CommandSpec {
    pub program: PathBuf,
    #[serde(default)]
    pub args: Vec<String>,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct CollaboratorCommands {
    pub parameterizer: CommandSpec,
    pub matcher: CommandSpec,
    pub placer: CommandSpec,
    pub minimizer: CommandSpec,
    pub deviation: CommandSpec,
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialJobSection {
    name: Option<String>,
    smiles: String,
    hits: Vec<PathBuf>,
    work_path: Option<PathBuf>,
    ligand_resn: Option<String>,
    ligand_resi: Option<ResidueLocator>,
    covalent_resn: Option<String>,
    covalent_resi: Option<ResidueLocator>,
    extra_constraint: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct PartialReceptorSection {
    pdb: PathBuf,
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub struct JobFile {
    catalog: Option<PathBuf>,
    job: PartialJobSection,
    receptor: PartialReceptorSection,
    collaborators: CollaboratorCommands,
}

/// Everything the `run` command needs, with paths resolved and inputs loaded.
pub struct RunSettings {
    pub config: JobConfig,
    pub work_path: PathBuf,
    pub catalog: DefinitionCatalog,
    pub collaborators: CollaboratorCommands,
}

impl JobFile {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading job file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    /// Applies command-line overrides and loads the referenced files.
    ///
    /// Relative paths in the job file are taken relative to `base`, the job
    /// file's directory; command-line paths are used as given.
    pub fn merge_with_cli(self, args: &RunArgs, base: &Path) -> Result<RunSettings> {
        let job = self.job;

        let catalog = match &self.catalog {
            Some(path) => DefinitionCatalog::load(&resolve_path(base, path))?,
            None => DefinitionCatalog::builtin(),
        };

        let receptor_path = resolve_path(base, &self.receptor.pdb);
        debug!("Reading receptor from {:?}", receptor_path);
        let receptor = std::fs::read_to_string(&receptor_path)?;

        let hits = job
            .hits
            .iter()
            .map(|path| read_hit(&resolve_path(base, path)))
            .collect::<Result<Vec<_>>>()?;

        let mut builder = JobConfigBuilder::new()
            .smiles(&job.smiles)
            .hits(hits)
            .receptor_pdb(receptor);
        if let Some(name) = args.name.as_ref().or(job.name.as_ref()) {
            builder = builder.long_name(name);
        }
        if let Some(code) = &job.ligand_resn {
            builder = builder.ligand_resn(code);
        }
        if let Some(locator) = job.ligand_resi {
            builder = builder.ligand_resi(locator);
        }
        if let Some(code) = &job.covalent_resn {
            builder = builder.covalent_resn(code);
        }
        if let Some(locator) = job.covalent_resi {
            builder = builder.covalent_resi(locator);
        }
        if let Some(text) = &job.extra_constraint {
            builder = builder.extra_constraint(text);
        }
        let config = builder.build().map_err(|e| CliError::Config(e.to_string()))?;

        let work_path = match (&args.work_path, &job.work_path) {
            (Some(path), _) => path.clone(),
            (None, Some(path)) => resolve_path(base, path),
            (None, None) => base.join(DEFAULT_WORK_PATH),
        };

        let collaborators = CollaboratorCommands {
            parameterizer: resolve_command(base, self.collaborators.parameterizer),
            matcher: resolve_command(base, self.collaborators.matcher),
            placer: resolve_command(base, self.collaborators.placer),
            minimizer: resolve_command(base, self.collaborators.minimizer),
            deviation: resolve_command(base, self.collaborators.deviation),
        };

        Ok(RunSettings {
            config,
            work_path,
            catalog,
            collaborators,
        })
    }
}

fn resolve_path(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// Bare program names are looked up on `PATH`; anything with a separator is a path.
fn resolve_command(base: &Path, command: CommandSpec) -> CommandSpec {
    let is_path = command
        .program
        .to_str()
        .is_none_or(|program| program.contains(['/', '\\']));
    if is_path {
        CommandSpec {
            program: resolve_path(base, &command.program),
            ..command
        }
    } else {
        command
    }
}

/// Reads a reference fragment, naming it after its file when the title is blank.
fn read_hit(path: &Path) -> Result<Molecule> {
    debug!("Reading hit from {:?}", path);
    let mut hit = MolFile::read_from_path(path).map_err(|e| CliError::FileParsing {
        path: path.to_path_buf(),
        source: e.into(),
    })?;
    if hit.display_name().is_none() {
        hit.name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned());
    }
    Ok(hit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;
    use nalgebra::Point3;
    use reanimator::core::models::atom::Atom;
    use std::fs;
    use tempfile::TempDir;

    const RECEPTOR: &str = "\
ATOM      1  CA  CYS A 145      11.000  11.500  12.500  1.00  0.00           C
END
";

    const COLLABORATORS: &str = r#"
[collaborators]
parameterizer = { program = "bin/params.py", args = ["--quiet"] }
matcher = { program = "matcher" }
placer = { program = "/opt/placer" }
minimizer = { program = "minimizer" }
deviation = { program = "deviation" }
"#;

    fn write_inputs(dir: &TempDir) {
        let mut hit = Molecule::new();
        hit.add_atom(Atom::new("C1", "C", Point3::new(1.0, 2.0, 3.0)));
        fs::write(dir.path().join("x0107.mol"), MolFile::write_to_string(&hit).unwrap()).unwrap();
        fs::write(dir.path().join("receptor.pdb"), RECEPTOR).unwrap();
    }

    fn write_job_file(dir: &TempDir, job: &str) -> PathBuf {
        let path = dir.path().join("job.toml");
        let content = format!("{}\n[receptor]\npdb = \"receptor.pdb\"\n{}", job, COLLABORATORS);
        fs::write(&path, content).unwrap();
        path
    }

    fn run_args(config: &Path, extra: &[&str]) -> RunArgs {
        let mut argv = vec!["reanimate", "run", "-c", config.to_str().unwrap()];
        argv.extend_from_slice(extra);
        match Cli::parse_from(argv).command {
            Commands::Run(args) => args,
            _ => panic!("Expected 'run' subcommand"),
        }
    }

    #[test]
    fn job_file_is_loaded_with_defaults_and_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        write_inputs(&dir);
        let path = write_job_file(
            &dir,
            r#"
[job]
name = "x0107 amide"
smiles = "CC(=O)NC"
hits = ["x0107.mol"]
"#,
        );
        let args = run_args(&path, &[]);
        let settings = JobFile::from_file(&path)
            .unwrap()
            .merge_with_cli(&args, dir.path())
            .unwrap();

        assert_eq!(settings.config.long_name, "x0107 amide");
        assert_eq!(settings.config.ligand_resn, "LIG");
        assert_eq!(settings.config.hits.len(), 1);
        assert_eq!(settings.config.hits[0].display_name(), Some("x0107"));
        assert_eq!(settings.config.receptor_pdb, RECEPTOR);
        assert_eq!(settings.work_path, dir.path().join("output"));
        assert_eq!(settings.catalog.warheads().len(), 4);
        assert_eq!(
            settings.collaborators.parameterizer.program,
            dir.path().join("bin/params.py")
        );
        assert_eq!(settings.collaborators.parameterizer.args, ["--quiet"]);
        assert_eq!(settings.collaborators.matcher.program, PathBuf::from("matcher"));
        assert_eq!(settings.collaborators.placer.program, PathBuf::from("/opt/placer"));
    }

    #[test]
    fn cli_overrides_take_precedence() {
        let dir = tempfile::tempdir().unwrap();
        write_inputs(&dir);
        let path = write_job_file(
            &dir,
            r#"
[job]
name = "from-file"
smiles = "*CC(=O)N"
hits = ["x0107.mol"]
work-path = "runs"
covalent-resi = "145A"
ligand-resn = "drg"
"#,
        );
        let args = run_args(&path, &["--name", "from-cli", "--work-path", "/tmp/elsewhere"]);
        let settings = JobFile::from_file(&path)
            .unwrap()
            .merge_with_cli(&args, dir.path())
            .unwrap();

        assert_eq!(settings.config.long_name, "from-cli");
        assert_eq!(settings.config.ligand_resn, "DRG");
        assert_eq!(settings.config.covalent_resi.unwrap().to_string(), "145A");
        assert_eq!(settings.work_path, PathBuf::from("/tmp/elsewhere"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_job_file(
            &dir,
            r#"
[job]
smiles = "CC"
hits = []
temperature = 300
"#,
        );
        let result = JobFile::from_file(&path);
        assert!(matches!(result, Err(CliError::FileParsing { .. })));
    }

    #[test]
    fn malformed_locator_is_rejected_when_parsing() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_job_file(
            &dir,
            r#"
[job]
smiles = "CC"
hits = ["x0107.mol"]
covalent-resi = "A145"
"#,
        );
        let err = JobFile::from_file(&path).unwrap_err();
        assert!(err.to_string().contains("A145"));
    }

    #[test]
    fn missing_hit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        write_inputs(&dir);
        let path = write_job_file(
            &dir,
            r#"
[job]
smiles = "CC"
hits = ["absent.mol"]
"#,
        );
        let args = run_args(&path, &[]);
        let result = JobFile::from_file(&path)
            .unwrap()
            .merge_with_cli(&args, dir.path());
        assert!(matches!(result, Err(CliError::FileParsing { .. })));
    }
}
