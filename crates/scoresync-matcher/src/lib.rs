//! Matches a score's notes to a performance's events by pitch and
//! tempo-derived tentative time, producing confidence-tiered
//! [`scoresync_model::RegistryEntry`] values (spec.md §4.B).

pub mod config;
pub mod correspondence;
pub mod matcher;

pub use config::MatcherConfig;
pub use correspondence::TrackCorrespondence;
pub use matcher::{match_notes, MatchOutcome};
