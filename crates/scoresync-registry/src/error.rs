//! Registry-specific errors.

use scoresync_model::{error::ComponentError, UniversalId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("universal ID {new} shares a 4-hex-char filename prefix with existing ID {existing}; re-salt and re-derive")]
    PrefixCollision {
        new: UniversalId,
        existing: UniversalId,
    },

    #[error("universal ID {0} already registered")]
    DuplicateId(UniversalId),

    #[error("no entry found for universal ID {0}")]
    NotFound(UniversalId),

    #[error("failed to persist registry to {path}: {reason}")]
    Persist { path: String, reason: String },

    #[error("failed to load registry from {path}: {reason}")]
    Load { path: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ComponentError for RegistryError {
    fn code(&self) -> &'static str {
        match self {
            RegistryError::PrefixCollision { .. } => "REGISTRY_PREFIX_COLLISION",
            RegistryError::DuplicateId(_) => "REGISTRY_DUPLICATE_ID",
            RegistryError::NotFound(_) => "REGISTRY_NOT_FOUND",
            RegistryError::Persist { .. } => "REGISTRY_PERSIST",
            RegistryError::Load { .. } => "REGISTRY_LOAD",
            RegistryError::Io(_) => "REGISTRY_IO",
            RegistryError::Json(_) => "REGISTRY_JSON",
        }
    }

    fn category(&self) -> &'static str {
        "registry"
    }
}
