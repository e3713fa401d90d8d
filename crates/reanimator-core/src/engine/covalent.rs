use super::collaborators::SubstructureMatcher;
use super::constraints::ConstraintSpec;
use super::error::PipelineError;
use super::job::Job;
use crate::core::catalog::DefinitionCatalog;
use std::sync::Arc;
use tracing::debug;

/// Decides how the candidate bonds to the receptor and seeds the job's restraints.
pub struct CovalentAttachmentResolver<'a> {
    catalog: &'a DefinitionCatalog,
    matcher: &'a dyn SubstructureMatcher,
}

impl<'a> CovalentAttachmentResolver<'a> {
    pub fn new(catalog: &'a DefinitionCatalog, matcher: &'a dyn SubstructureMatcher) -> Self {
        Self { catalog, matcher }
    }

    /// Sets `job.constraint` and, for covalent jobs, `job.warhead`.
    ///
    /// Covalent jobs take the first warhead, in catalog order, whose reacted
    /// form is found in the parameterized candidate. The matched atoms are
    /// renamed after the warhead's atom names.
    pub fn resolve(&self, job: &mut Job) -> Result<(), PipelineError> {
        let ligand_res = job.config().ligand_resi;
        let target_res = job.config().covalent_resi;
        let extra = job.config().extra_constraint.clone();

        if !job.is_covalent() {
            debug!(job = job.long_name(), "Candidate is not covalent.");
            job.constraint = extra.map(|text| {
                let mut spec = ConstraintSpec::custom(ligand_res, target_res);
                spec.append(&text);
                spec
            });
            return Ok(());
        }

        debug!(job = job.long_name(), "Candidate is covalent.");
        let target_res = target_res.ok_or_else(|| {
            PipelineError::Configuration(format!(
                "{} - is covalent but no covalent residue locator was given",
                job.long_name()
            ))
        })?;
        let residue = job.covalent_residue.clone().ok_or_else(|| {
            PipelineError::Configuration(format!(
                "{} - is covalent but no covalent residue definition was selected",
                job.long_name()
            ))
        })?;
        let long_name = job.long_name().to_string();
        let params = job.params.as_mut().ok_or_else(|| {
            PipelineError::Internal("covalent resolution requires a parameterized candidate".into())
        })?;

        for warhead in self.catalog.warheads() {
            let found = self
                .matcher
                .find_match(&params.template, &warhead.covalent, &mut job.warnings)
                .map_err(PipelineError::collaborator("substructure matcher"))?;
            let Some(indices) = found else {
                continue;
            };
            params
                .template
                .rename_atoms(&indices, &warhead.covalent_atomnames)?;
            debug!(job = %long_name, warhead = %warhead.name, "Warhead identified.");

            let mut spec =
                ConstraintSpec::covalent(&warhead.site()?, &residue.site()?, ligand_res, target_res);
            if let Some(template) = &warhead.constraint {
                spec.append(template);
            }
            if let Some(text) = &extra {
                spec.append(text);
            }
            job.warhead = Some(Arc::clone(warhead));
            job.constraint = Some(spec);
            return Ok(());
        }

        Err(PipelineError::UnknownWarhead {
            smiles: job.smiles().to_string(),
        })
    }
}
