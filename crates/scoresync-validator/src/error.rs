//! Integrity error kinds the final validator can report (spec.md §4.I, §7 kind 6).

use scoresync_model::error::ComponentError;
use scoresync_model::UniversalId;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IntegrityError {
    #[error("entry {id} is missing its artifact row for stage '{stage}'")]
    MissingArtifactRow { id: UniversalId, stage: String },

    #[error("artifact file '{path}' declared in the manifest does not exist")]
    MissingArtifactFile { path: String },

    #[error("artifact file '{path}' exists but is empty")]
    EmptyArtifactFile { path: String },

    #[error("sub-ID '{sub_id}' does not resolve to any known ornament group")]
    UnresolvedSubId { sub_id: String },

    #[error("filename prefix '{prefix}' is shared by more than one entry")]
    DuplicatePrefix { prefix: String },

    #[error("entry {id} has confidence {confidence} outside [0.0, 1.0]")]
    ConfidenceOutOfRange { id: UniversalId, confidence: f64 },
}

impl ComponentError for IntegrityError {
    fn code(&self) -> &'static str {
        match self {
            IntegrityError::MissingArtifactRow { .. } => "VALIDATE_MISSING_ARTIFACT_ROW",
            IntegrityError::MissingArtifactFile { .. } => "VALIDATE_MISSING_ARTIFACT_FILE",
            IntegrityError::EmptyArtifactFile { .. } => "VALIDATE_EMPTY_ARTIFACT_FILE",
            IntegrityError::UnresolvedSubId { .. } => "VALIDATE_UNRESOLVED_SUB_ID",
            IntegrityError::DuplicatePrefix { .. } => "VALIDATE_DUPLICATE_PREFIX",
            IntegrityError::ConfidenceOutOfRange { .. } => "VALIDATE_CONFIDENCE_OUT_OF_RANGE",
        }
    }

    fn category(&self) -> &'static str {
        "validator"
    }
}
