use crate::core::catalog::definitions::DefinitionError;
use crate::core::io::mol::MolFileError;
use crate::core::io::pdb::PdbError;
use crate::core::models::molecule::MoleculeError;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Fault reported by an external collaborator (parameterizer, placer, minimizer, ...).
#[derive(Debug, Error)]
#[error("{message}")]
pub struct CollaboratorError {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl CollaboratorError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("No warhead definition matches '{smiles}'")]
    UnknownWarhead { smiles: String },

    #[error("Bond order recovery failed: {0}")]
    BondRecovery(String),

    #[error("{collaborator} failed: {source}")]
    Collaborator {
        collaborator: &'static str,
        #[source]
        source: CollaboratorError,
    },

    #[error("Failed to write artifact '{path}': {source}")]
    Artifact {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("PDB handling failed: {0}")]
    Pdb(#[from] PdbError),

    #[error("Molfile handling failed: {0}")]
    MolFile(#[from] MolFileError),

    #[error("Invalid molecule edit: {0}")]
    Molecule(#[from] MoleculeError),

    #[error("Invalid catalog definition: {0}")]
    Definition(#[from] DefinitionError),

    #[error("Internal logic error: {0}")]
    Internal(String),
}

impl PipelineError {
    pub fn collaborator(collaborator: &'static str) -> impl FnOnce(CollaboratorError) -> Self {
        move |source| Self::Collaborator {
            collaborator,
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::UnknownWarhead { .. } => ErrorKind::UnknownWarhead,
            Self::BondRecovery(_) => ErrorKind::BondRecovery,
            Self::Collaborator { .. } => ErrorKind::Collaborator,
            Self::Artifact { .. } | Self::Serialization(_) | Self::Pdb(_) | Self::MolFile(_) => {
                ErrorKind::Artifact
            }
            Self::Molecule(_) | Self::Definition(_) | Self::Internal(_) => ErrorKind::Internal,
        }
    }
}

/// Coarse classification of a job failure, as reported in the job log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    Configuration,
    UnknownWarhead,
    BondRecovery,
    Collaborator,
    Artifact,
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Configuration => "ConfigurationError",
            Self::UnknownWarhead => "UnknownWarheadError",
            Self::BondRecovery => "BondRecoveryError",
            Self::Collaborator => "CollaboratorError",
            Self::Artifact => "ArtifactError",
            Self::Internal => "InternalError",
        };
        f.write_str(name)
    }
}
