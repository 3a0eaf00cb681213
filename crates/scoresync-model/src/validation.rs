//! Structural invariant helpers shared by the registry and validator crates
//! (spec.md §3.2, §4.D, §4.I).

use crate::ids::UniversalId;
use std::collections::HashMap;

/// Checks a batch of universal IDs for 4-hex-character filename-prefix collisions
/// (spec.md §3.2: filenames are addressed by `prefix4()`, not the full ID).
///
/// Returns the set of IDs that share a prefix with at least one other ID in the
/// batch; the matcher re-salts and re-derives these before committing them to
/// the registry.
pub fn find_prefix_collisions(ids: &[UniversalId]) -> Vec<UniversalId> {
    let mut by_prefix: HashMap<String, Vec<UniversalId>> = HashMap::new();
    for id in ids {
        by_prefix.entry(id.prefix4()).or_default().push(*id);
    }
    by_prefix
        .into_values()
        .filter(|group| group.len() > 1)
        .flatten()
        .collect()
}

/// True if `candidate` is a syntactically valid expansion sub-ID: `{32 hex}_expansion_{NN}`.
pub fn is_valid_sub_id_format(candidate: &str) -> bool {
    let Some((prefix, suffix)) = candidate.rsplit_once("_expansion_") else {
        return false;
    };
    prefix.len() == 32
        && prefix.chars().all(|c| c.is_ascii_hexdigit())
        && suffix.len() == 2
        && suffix.chars().all(|c| c.is_ascii_digit())
}
