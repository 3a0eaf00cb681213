//! The per-stage output manifest contract: every stage writes a `manifest.json`
//! naming the artifacts it produced, keyed by universal ID (spec.md §4.F, §6.2).

use crate::ids::UniversalId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// One artifact a stage produced for a given universal ID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactRecord {
    /// Path relative to the stage's `--output-dir`.
    pub path: PathBuf,
    /// BLAKE3 hash of the artifact's bytes at write time, used to detect a stage
    /// silently skipping work on a re-run (spec.md §4.F(iii)).
    pub content_hash: String,
    pub byte_size: u64,
}

/// The manifest a stage subprocess writes to `{output_dir}/manifest.json` on exit.
/// The scheduler reads this back to verify the stage's claimed outputs actually
/// exist and hash-match before marking it complete (spec.md §4.F).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Manifest {
    pub stage_name: String,
    /// Universal ID (hex) -> artifacts produced for that ID by this stage.
    pub artifacts: BTreeMap<String, Vec<ArtifactRecord>>,
}

impl Manifest {
    pub fn new(stage_name: impl Into<String>) -> Self {
        Self {
            stage_name: stage_name.into(),
            artifacts: BTreeMap::new(),
        }
    }

    pub fn record(&mut self, id: UniversalId, artifact: ArtifactRecord) {
        self.artifacts.entry(id.to_hex()).or_default().push(artifact);
    }

    pub fn artifacts_for(&self, id: &UniversalId) -> &[ArtifactRecord] {
        self.artifacts
            .get(&id.to_hex())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn total_artifact_count(&self) -> usize {
        self.artifacts.values().map(Vec::len).sum()
    }

    pub fn covers_all(&self, ids: &[UniversalId]) -> bool {
        ids.iter().all(|id| !self.artifacts_for(id).is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_and_lookup_round_trips() {
        let mut manifest = Manifest::new("render-svg");
        let id = UniversalId::derive("note", 0);
        manifest.record(
            id,
            ArtifactRecord {
                path: PathBuf::from("frames/0001.svg"),
                content_hash: "deadbeef".into(),
                byte_size: 2048,
            },
        );
        assert_eq!(manifest.artifacts_for(&id).len(), 1);
        assert_eq!(manifest.total_artifact_count(), 1);
    }

    #[test]
    fn covers_all_is_false_when_an_id_has_no_artifacts() {
        let manifest = Manifest::new("render-svg");
        let id = UniversalId::derive("missing", 0);
        assert!(!manifest.covers_all(&[id]));
    }
}
