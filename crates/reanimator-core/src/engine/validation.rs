use super::error::PipelineError;
use super::job::Job;
use crate::core::catalog::DefinitionCatalog;
use crate::core::catalog::definitions::CovalentResidueDefinition;
use crate::core::utils::identifiers::UNSPECIFIED_LIGAND_CODE;
use std::sync::Arc;
use tracing::debug;

/// Structural preconditions checked before any side effect.
pub struct InputValidator<'a> {
    catalog: &'a DefinitionCatalog,
}

impl<'a> InputValidator<'a> {
    pub fn new(catalog: &'a DefinitionCatalog) -> Self {
        Self { catalog }
    }

    /// Runs every check in order and stops at the first failure.
    ///
    /// On success returns the catalog entry for the declared covalent residue
    /// code, if one was declared.
    pub fn validate(
        &self,
        job: &Job,
    ) -> Result<Option<Arc<CovalentResidueDefinition>>, PipelineError> {
        let config = job.config();
        let name = job.long_name();

        if name.chars().all(|c| c == '-') {
            return Err(PipelineError::Configuration(format!(
                "job name '{}' leaves nothing to name its directory with",
                config.long_name
            )));
        }
        if config.ligand_resn.chars().count() != 3 {
            return Err(PipelineError::Configuration(format!(
                "{} - ligand residue code '{}' is not 3 characters long",
                name, config.ligand_resn
            )));
        }
        if config.ligand_resn == UNSPECIFIED_LIGAND_CODE {
            return Err(PipelineError::Configuration(format!(
                "{} - ligand residue code cannot be {}, it is reserved for unspecified residues",
                name, UNSPECIFIED_LIGAND_CODE
            )));
        }
        if config.hits.is_empty() {
            return Err(PipelineError::Configuration(format!(
                "{} - no reference fragments to build from",
                name
            )));
        }
        if job.is_covalent() && config.covalent_resi.is_none() {
            return Err(PipelineError::Configuration(format!(
                "{} - is covalent but no covalent residue locator was given",
                name
            )));
        }

        if config.covalent_resn.is_empty() {
            return Ok(None);
        }
        let residue = self.catalog.residue(&config.covalent_resn).ok_or_else(|| {
            PipelineError::Configuration(format!(
                "{} - unrecognised covalent residue type {}",
                name, config.covalent_resn
            ))
        })?;
        debug!(job = name, residue = %residue.residue, "Inputs validated.");
        Ok(Some(Arc::clone(residue)))
    }
}
