//! Scheduler and executor errors.

use scoresync_model::error::ComponentError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StageError {
    #[error("failed to spawn stage '{stage}' executable '{executable}': {reason}")]
    SpawnFailed {
        stage: String,
        executable: String,
        reason: String,
    },

    #[error("stage '{stage}' exceeded its {timeout_secs}s timeout and was killed")]
    Timeout { stage: String, timeout_secs: u64 },

    #[error("stage '{stage}' exited with code {code}: {stderr}")]
    NonZeroExit {
        stage: String,
        code: i32,
        stderr: String,
    },

    #[error("stage '{stage}' did not write a manifest.json in its output directory")]
    ManifestMissing { stage: String },

    #[error("stage '{stage}' manifest.json is invalid: {reason}")]
    ManifestInvalid { stage: String, reason: String },

    #[error("stage '{stage}' artifact {path} hash mismatch: expected {expected}, got {actual}")]
    HashMismatch {
        stage: String,
        path: String,
        expected: String,
        actual: String,
    },

    #[error("stage '{stage}' artifact {path} is missing from disk")]
    ArtifactMissing { stage: String, path: String },

    #[error("the DAG contains a cycle touching stage '{stage}'")]
    CyclicDag { stage: String },

    #[error("circuit breaker open for stage '{stage}'; refusing to run")]
    CircuitOpen { stage: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ComponentError for StageError {
    fn code(&self) -> &'static str {
        match self {
            StageError::SpawnFailed { .. } => "STAGE_SPAWN_FAILED",
            StageError::Timeout { .. } => "STAGE_TIMEOUT",
            StageError::NonZeroExit { .. } => "STAGE_NON_ZERO_EXIT",
            StageError::ManifestMissing { .. } => "STAGE_MANIFEST_MISSING",
            StageError::ManifestInvalid { .. } => "STAGE_MANIFEST_INVALID",
            StageError::HashMismatch { .. } => "STAGE_HASH_MISMATCH",
            StageError::ArtifactMissing { .. } => "STAGE_ARTIFACT_MISSING",
            StageError::CyclicDag { .. } => "STAGE_CYCLIC_DAG",
            StageError::CircuitOpen { .. } => "STAGE_CIRCUIT_OPEN",
            StageError::Io(_) => "STAGE_IO",
        }
    }

    fn category(&self) -> &'static str {
        "scheduler"
    }
}
