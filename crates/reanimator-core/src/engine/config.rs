use super::hooks::{PoseHook, StageHooks};
use crate::core::models::locator::ResidueLocator;
use crate::core::models::molecule::Molecule;
use std::fmt;
use thiserror::Error;

pub const DEFAULT_LONG_NAME: &str = "ligand";
pub const DEFAULT_LIGAND_RESN: &str = "LIG";
pub const DEFAULT_COVALENT_RESN: &str = "CYS";
pub const DEFAULT_LIGAND_RESI: ResidueLocator = ResidueLocator {
    number: 1,
    chain: Some('B'),
};

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
}

/// Everything needed to run one candidate through the pipeline.
#[derive(Clone)]
pub struct JobConfig {
    /// Connectivity string of the candidate, `*` marking a covalent attachment.
    pub smiles: String,
    /// Reference fragments.
    pub hits: Vec<Molecule>,
    /// Receptor structure as PDB text.
    pub receptor_pdb: String,
    /// Human-readable job name, slugified for use on disk.
    pub long_name: String,
    pub ligand_resn: String,
    pub ligand_resi: ResidueLocator,
    pub covalent_resn: String,
    pub covalent_resi: Option<ResidueLocator>,
    /// Extra restraint lines appended after any warhead-derived ones.
    pub extra_constraint: Option<String>,
    /// Replaces [`StageHooks::pose_mod`] for this job when set.
    pub pose_fx: Option<PoseHook>,
    pub hooks: StageHooks,
}

impl fmt::Debug for JobConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobConfig")
            .field("smiles", &self.smiles)
            .field("hits", &self.hits.len())
            .field("receptor_pdb", &format_args!("{} bytes", self.receptor_pdb.len()))
            .field("long_name", &self.long_name)
            .field("ligand_resn", &self.ligand_resn)
            .field("ligand_resi", &self.ligand_resi)
            .field("covalent_resn", &self.covalent_resn)
            .field("covalent_resi", &self.covalent_resi)
            .field("extra_constraint", &self.extra_constraint)
            .field("pose_fx", &self.pose_fx.is_some())
            .field("hooks", &self.hooks)
            .finish()
    }
}

#[derive(Default)]
pub struct JobConfigBuilder {
    smiles: Option<String>,
    hits: Option<Vec<Molecule>>,
    receptor_pdb: Option<String>,
    long_name: Option<String>,
    ligand_resn: Option<String>,
    ligand_resi: Option<ResidueLocator>,
    covalent_resn: Option<String>,
    covalent_resi: Option<ResidueLocator>,
    extra_constraint: Option<String>,
    pose_fx: Option<PoseHook>,
    hooks: StageHooks,
}

impl JobConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn smiles(mut self, smiles: &str) -> Self {
        self.smiles = Some(smiles.to_string());
        self
    }
    pub fn hits(mut self, hits: Vec<Molecule>) -> Self {
        self.hits = Some(hits);
        self
    }
    pub fn hit(mut self, hit: Molecule) -> Self {
        self.hits.get_or_insert_with(Vec::new).push(hit);
        self
    }
    pub fn receptor_pdb(mut self, pdb: impl Into<String>) -> Self {
        self.receptor_pdb = Some(pdb.into());
        self
    }
    pub fn long_name(mut self, name: &str) -> Self {
        self.long_name = Some(name.to_string());
        self
    }
    pub fn ligand_resn(mut self, code: &str) -> Self {
        self.ligand_resn = Some(code.to_string());
        self
    }
    pub fn ligand_resi(mut self, locator: ResidueLocator) -> Self {
        self.ligand_resi = Some(locator);
        self
    }
    pub fn covalent_resn(mut self, code: &str) -> Self {
        self.covalent_resn = Some(code.to_string());
        self
    }
    pub fn covalent_resi(mut self, locator: ResidueLocator) -> Self {
        self.covalent_resi = Some(locator);
        self
    }
    pub fn extra_constraint(mut self, text: &str) -> Self {
        self.extra_constraint = Some(text.to_string());
        self
    }
    pub fn pose_fx(mut self, hook: PoseHook) -> Self {
        self.pose_fx = Some(hook);
        self
    }
    pub fn hooks(mut self, hooks: StageHooks) -> Self {
        self.hooks = hooks;
        self
    }

    /// Assembles the configuration. Residue codes are upper-cased; value checks
    /// are left to the input validator so that they run inside the job.
    pub fn build(self) -> Result<JobConfig, ConfigError> {
        Ok(JobConfig {
            smiles: self.smiles.ok_or(ConfigError::MissingParameter("smiles"))?,
            hits: self.hits.ok_or(ConfigError::MissingParameter("hits"))?,
            receptor_pdb: self
                .receptor_pdb
                .ok_or(ConfigError::MissingParameter("receptor_pdb"))?,
            long_name: self
                .long_name
                .unwrap_or_else(|| DEFAULT_LONG_NAME.to_string()),
            ligand_resn: self
                .ligand_resn
                .as_deref()
                .unwrap_or(DEFAULT_LIGAND_RESN)
                .to_uppercase(),
            ligand_resi: self.ligand_resi.unwrap_or(DEFAULT_LIGAND_RESI),
            covalent_resn: self
                .covalent_resn
                .as_deref()
                .unwrap_or(DEFAULT_COVALENT_RESN)
                .to_uppercase(),
            covalent_resi: self.covalent_resi,
            extra_constraint: self.extra_constraint.filter(|text| !text.is_empty()),
            pose_fx: self.pose_fx,
            hooks: self.hooks,
        })
    }
}
