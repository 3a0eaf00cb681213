//! scoresync canonical entity types, universal identity, and validation.
//!
//! This crate provides the shared vocabulary every other scoresync crate
//! builds on: the immutable [`entities::ScoreNote`] / [`entities::PerformanceEvent`]
//! pair extracted by the parsers, the [`ids::UniversalId`] bound to a matched
//! pair, the [`registry_entry::RegistryEntry`] that records a match, the
//! [`groups::TiedGroup`] / [`groups::OrnamentGroup`] relationship types, the
//! pedal-extension model, the stage output [`manifest::Manifest`] contract, and
//! the aggregate [`error::ScoreSyncError`].
//!
//! # Modules
//!
//! - [`ids`]: universal identity and group identity
//! - [`entities`]: score-side and performance-side primitive types
//! - [`registry_entry`]: the matched tuple and its confidence tier
//! - [`groups`]: tied-note and ornament relationship groups
//! - [`pedal`]: sustain-pedal duration extension
//! - [`manifest`]: per-stage artifact manifest contract
//! - [`validation`]: structural invariant helpers
//! - [`error`]: aggregate error type

pub mod entities;
pub mod error;
pub mod groups;
pub mod ids;
pub mod manifest;
pub mod pedal;
pub mod registry_entry;
pub mod validation;

pub use entities::{
    OrnamentAnnotation, OrnamentKind, PedalEvent, PerformanceEvent, Pitch, ScoreNote, TieRole,
};
pub use error::ScoreSyncError;
pub use groups::{AnimationStrategy, OrnamentGroup, TiedGroup, TiedMember};
pub use ids::{GroupId, UniversalId};
pub use manifest::{ArtifactRecord, Manifest};
pub use pedal::PedalExtension;
pub use registry_entry::{EntryKind, MatchMethod, RegistryEntry};
