//! Aggregate error type shared across the pipeline's crates (spec.md §7).

use thiserror::Error;

/// The six error categories named in spec.md §7, each carrying enough context
/// to print a useful diagnostic and to decide the process exit code.
#[derive(Debug, Error)]
pub enum ScoreSyncError {
    #[error("failed to parse score file {path}: {reason}")]
    ScoreParse { path: String, reason: String },

    #[error("failed to parse performance file {path}: {reason}")]
    PerformanceParse { path: String, reason: String },

    #[error("matching could not resolve {unmatched_count} score note(s) within the configured window")]
    MatchingIncomplete { unmatched_count: usize },

    #[error("relationship conflict: {0}")]
    RelationshipConflict(String),

    #[error("registry integrity violation: {0}")]
    RegistryIntegrity(String),

    #[error("stage '{stage}' failed: {reason}")]
    StageExecution { stage: String, reason: String },

    #[error("final validation failed with {error_count} error(s)")]
    ValidationFailed { error_count: usize },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Implemented by per-crate error enums so a caller can surface a stable code
/// and category regardless of which crate raised it (mirrors the BackendError
/// seam used elsewhere in this codebase for cross-crate error reporting).
pub trait ComponentError: std::error::Error {
    fn code(&self) -> &'static str;
    fn category(&self) -> &'static str;
}
