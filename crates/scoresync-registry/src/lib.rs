//! The persistent registry: a collision-checked store of matched entries,
//! relationship groups, and artifact records, with atomic on-disk persistence
//! and a content-addressed stage cache (spec.md §4.D, SPEC_FULL.md §9.2).

pub mod cache;
pub mod error;
pub mod persistence;
pub mod registry;

pub use cache::{CacheKey, StageCache};
pub use error::RegistryError;
pub use persistence::{load, save_atomic};
pub use registry::Registry;
