//! Final end-to-end registry integrity checks (spec.md §4.I).

pub mod error;
pub mod report;

pub use error::IntegrityError;
pub use report::{validate, StageRequirements, ValidationReport};
