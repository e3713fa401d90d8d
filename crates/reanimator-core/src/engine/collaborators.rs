//! Interfaces to the external systems the pipeline coordinates.
//!
//! None of the chemistry lives in this crate: parameterization, substructure
//! matching, fragment placement, minimization and deviation measurement are all
//! supplied by implementations of these traits. Every call receives the job's
//! [`WarningBuffer`] so that non-fatal diagnostics reach the job log.

use super::error::CollaboratorError;
use super::warnings::WarningBuffer;
use crate::core::models::atom::Atom;
use crate::core::models::locator::ResidueLocator;
use crate::core::models::molecule::Molecule;
use std::any::Any;
use std::fmt;
use std::path::Path;

/// Output of the parameterization step.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameterization {
    /// Residue name declared in the parameter file.
    pub name: String,
    /// Parameter file content; opaque to the pipeline.
    pub content: String,
    /// The candidate as seen by the parameterizer, placeholder atoms included.
    pub template: Molecule,
    /// Template atom indices declared as connection points, in file order.
    pub attachments: Vec<usize>,
}

impl Parameterization {
    /// Name of the ligand atom that carries the first declared connection.
    pub fn attachment_atom_name(&self) -> Option<&str> {
        let index = *self.attachments.first()?;
        self.template.atom(index).map(|atom| atom.name.trim())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ParameterizationRequest<'a> {
    pub smiles: &'a str,
    pub name: &'a str,
    /// Three-letter residue code to assign.
    pub residue_name: &'a str,
}

pub trait Parameterizer: Send + Sync {
    fn parameterize(
        &self,
        request: &ParameterizationRequest<'_>,
        warnings: &mut WarningBuffer,
    ) -> Result<Parameterization, CollaboratorError>;
}

pub trait SubstructureMatcher: Send + Sync {
    /// Finds `pattern` in `molecule`.
    ///
    /// On a match, returns the molecule atom indices aligned with the atoms of
    /// `pattern` in their written order.
    fn find_match(
        &self,
        molecule: &Molecule,
        pattern: &str,
        warnings: &mut WarningBuffer,
    ) -> Result<Option<Vec<usize>>, CollaboratorError>;
}

#[derive(Debug, Clone, Copy)]
pub struct PlacementRequest<'a> {
    pub template: &'a Molecule,
    pub hits: &'a [Molecule],
    /// Receptor atom the ligand bonds to, for covalent jobs.
    pub attachment: Option<&'a Atom>,
}

/// Geometry produced by the fragment placer.
///
/// `origins` and `stdev` are aligned one-to-one with the atoms of `positioned`.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacementResult {
    scaffold: Molecule,
    chimera: Molecule,
    positioned: Molecule,
    origins: Vec<Vec<String>>,
    stdev: Vec<f64>,
}

impl PlacementResult {
    pub fn new(
        scaffold: Molecule,
        chimera: Molecule,
        positioned: Molecule,
        origins: Vec<Vec<String>>,
        stdev: Vec<f64>,
    ) -> Result<Self, CollaboratorError> {
        if origins.len() != positioned.len() || stdev.len() != positioned.len() {
            return Err(CollaboratorError::new(format!(
                "placement annotations are misaligned: {} atoms, {} origins, {} spreads",
                positioned.len(),
                origins.len(),
                stdev.len()
            )));
        }
        Ok(Self {
            scaffold,
            chimera,
            positioned,
            origins,
            stdev,
        })
    }

    pub fn scaffold(&self) -> &Molecule {
        &self.scaffold
    }

    pub fn chimera(&self) -> &Molecule {
        &self.chimera
    }

    pub fn positioned(&self) -> &Molecule {
        &self.positioned
    }

    /// Reference atoms each positioned atom inherited its position from.
    pub fn origins(&self) -> &[Vec<String>] {
        &self.origins
    }

    pub fn stdev(&self) -> &[f64] {
        &self.stdev
    }

    pub fn is_inherited(&self, index: usize) -> bool {
        self.origins.get(index).is_some_and(|o| !o.is_empty())
    }
}

pub trait FragmentPlacer: Send + Sync {
    fn place(
        &self,
        request: &PlacementRequest<'_>,
        warnings: &mut WarningBuffer,
    ) -> Result<PlacementResult, CollaboratorError>;
}

/// A residue the minimizer must treat as flexible and bonded to the ligand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyResidue {
    Residue(ResidueLocator),
    None,
}

impl fmt::Display for KeyResidue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Residue(locator) => write!(f, "{}", locator),
            Self::None => f.write_str("none"),
        }
    }
}

/// Everything the minimizer needs to build a working pose.
#[derive(Debug, Clone)]
pub struct MinimizerInput<'a> {
    pub pdb: &'a str,
    pub params_file: &'a Path,
    /// `None` when the job has no constraint file.
    pub constraint_file: Option<&'a Path>,
    pub ligand: ResidueLocator,
    pub key_residues: Vec<KeyResidue>,
}

impl MinimizerInput<'_> {
    /// The constraint file path as passed to the minimizer, empty when absent.
    pub fn constraint_file_arg(&self) -> String {
        self.constraint_file
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParamsTest {
    pub pdb: String,
    pub score: f64,
}

pub trait Minimizer: Send + Sync {
    fn prepare(
        &self,
        input: &MinimizerInput<'_>,
        warnings: &mut WarningBuffer,
    ) -> Result<Box<dyn MinimizerSession>, CollaboratorError>;

    /// Loads a parameter file on its own and scores the resulting residue.
    fn test_params(
        &self,
        params_file: &Path,
        residue_name: &str,
        warnings: &mut WarningBuffer,
    ) -> Result<ParamsTest, CollaboratorError>;
}

/// A working pose held by the minimizer for the duration of one job.
pub trait MinimizerSession: Send {
    fn pose_pdb(&self) -> Result<String, CollaboratorError>;

    fn minimise(&mut self, warnings: &mut WarningBuffer) -> Result<(), CollaboratorError>;

    fn ligand_score(&self) -> Result<f64, CollaboratorError>;

    /// The ligand residue extracted from the pose, without reliable bond orders.
    fn ligand_from_pose(&self) -> Result<Molecule, CollaboratorError>;

    /// Access to the concrete session type for pose-mutation hooks.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Deviation {
    /// Aggregate deviation across all reference fragments.
    pub mrmsd: f64,
    /// One value per reference fragment, in fragment order.
    pub rmsds: Vec<f64>,
}

pub trait DeviationCalculator: Send + Sync {
    fn deviation(
        &self,
        ligand: &Molecule,
        hits: &[Molecule],
        positioned: &Molecule,
        warnings: &mut WarningBuffer,
    ) -> Result<Deviation, CollaboratorError>;
}

/// The full set of collaborators a pipeline run needs.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub parameterizer: &'a dyn Parameterizer,
    pub matcher: &'a dyn SubstructureMatcher,
    pub placer: &'a dyn FragmentPlacer,
    pub minimizer: &'a dyn Minimizer,
    pub deviation: &'a dyn DeviationCalculator,
}
