//! Builds a [`ValidationReport`] from a finished registry (spec.md §4.I).

use crate::error::IntegrityError;
use scoresync_model::{EntryKind, UniversalId};
use scoresync_registry::Registry;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// Which stages are expected to have produced an artifact for an entry of a
/// given kind. Tied members and ornament expansions don't stand alone in
/// every lane: a tied member shares its primary's audio, and an ornament
/// expansion shares its primary's visual notehead (spec.md §4.C).
#[derive(Debug, Clone)]
pub struct StageRequirements {
    requirements: HashMap<EntryKind, Vec<String>>,
}

impl StageRequirements {
    pub fn new(all_stages: Vec<String>) -> Self {
        let audio_and_visual = all_stages;
        let mut requirements = HashMap::new();
        requirements.insert(EntryKind::Plain, audio_and_visual.clone());
        requirements.insert(EntryKind::TiedPrimary, audio_and_visual.clone());
        requirements.insert(EntryKind::OrnamentPrimary, audio_and_visual.clone());
        requirements.insert(
            EntryKind::TiedMember,
            audio_and_visual
                .iter()
                .filter(|s| s.as_str() == "render_visual")
                .cloned()
                .collect(),
        );
        requirements.insert(
            EntryKind::OrnamentExpansion,
            audio_and_visual
                .iter()
                .filter(|s| s.as_str() == "render_audio")
                .cloned()
                .collect(),
        );
        Self { requirements }
    }

    pub fn for_kind(&self, kind: EntryKind) -> &[String] {
        self.requirements.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }
}

#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub integrity_errors: Vec<IntegrityError>,
    /// Counts of entries per [`scoresync_model::MatchMethod`] tier.
    pub confidence_histogram: BTreeMap<String, usize>,
    pub fallback_matches: Vec<UniversalId>,
}

impl ValidationReport {
    /// A run is successful iff zero integrity errors were found (spec.md §4.I, §7).
    pub fn is_successful(&self) -> bool {
        self.integrity_errors.is_empty()
    }
}

/// Runs every §4.I check against `registry`, resolving artifact paths under
/// `artifact_root`.
pub fn validate(
    registry: &Registry,
    requirements: &StageRequirements,
    artifact_root: &Path,
) -> ValidationReport {
    let mut report = ValidationReport::default();

    check_artifact_rows(registry, requirements, &mut report.integrity_errors);
    check_artifact_files(registry, artifact_root, &mut report.integrity_errors);
    check_sub_ids(registry, &mut report.integrity_errors);
    check_duplicate_prefixes(registry, &mut report.integrity_errors);

    for entry in registry.entries() {
        if !(0.0..=1.0).contains(&entry.match_confidence) {
            report.integrity_errors.push(IntegrityError::ConfidenceOutOfRange {
                id: entry.universal_id,
                confidence: entry.match_confidence,
            });
        }
        let bucket = format!("{:?}", entry.match_method);
        *report.confidence_histogram.entry(bucket).or_insert(0) += 1;
        if matches!(entry.match_method, scoresync_model::MatchMethod::Fallback) {
            report.fallback_matches.push(entry.universal_id);
        }
    }

    report
}

fn check_artifact_rows(
    registry: &Registry,
    requirements: &StageRequirements,
    errors: &mut Vec<IntegrityError>,
) {
    for entry in registry.entries() {
        let required = requirements.for_kind(entry.kind);
        // Artifact records don't carry a stage label, so completeness is judged
        // by count: one record per required stage, in stage order.
        let produced_count = registry.artifacts_for(&entry.universal_id).len();
        if produced_count < required.len() {
            for stage in required.iter().skip(produced_count) {
                errors.push(IntegrityError::MissingArtifactRow {
                    id: entry.universal_id,
                    stage: stage.clone(),
                });
            }
        }
    }
}

fn check_artifact_files(registry: &Registry, artifact_root: &Path, errors: &mut Vec<IntegrityError>) {
    for entry in registry.entries() {
        for artifact in registry.artifacts_for(&entry.universal_id) {
            let full_path = artifact_root.join(&artifact.path);
            match std::fs::metadata(&full_path) {
                Ok(meta) if meta.len() == 0 => {
                    errors.push(IntegrityError::EmptyArtifactFile {
                        path: artifact.path.display().to_string(),
                    });
                }
                Ok(_) => {}
                Err(_) => {
                    errors.push(IntegrityError::MissingArtifactFile {
                        path: artifact.path.display().to_string(),
                    });
                }
            }
        }
    }
}

fn check_sub_ids(registry: &Registry, errors: &mut Vec<IntegrityError>) {
    for entry in registry.entries() {
        if entry.kind != EntryKind::OrnamentExpansion {
            continue;
        }
        let Some(group_id) = &entry.ornament_group_id else {
            errors.push(IntegrityError::UnresolvedSubId {
                sub_id: entry.universal_id.to_hex(),
            });
            continue;
        };
        let owning_group_exists = registry
            .ornament_groups()
            .iter()
            .any(|g| &g.group_id == group_id);
        if !owning_group_exists {
            errors.push(IntegrityError::UnresolvedSubId {
                sub_id: group_id.to_string(),
            });
        }
    }
}

fn check_duplicate_prefixes(registry: &Registry, errors: &mut Vec<IntegrityError>) {
    let mut seen: BTreeMap<String, usize> = BTreeMap::new();
    for entry in registry.entries() {
        *seen.entry(entry.universal_id.prefix4()).or_insert(0) += 1;
    }
    for (prefix, count) in seen {
        if count > 1 {
            errors.push(IntegrityError::DuplicatePrefix { prefix });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_rational::Ratio;
    use scoresync_model::{ArtifactRecord, MatchMethod, PerformanceEvent, Pitch, RegistryEntry, ScoreNote, TieRole};

    fn default_requirements() -> StageRequirements {
        StageRequirements::new(vec!["render_visual".into(), "render_audio".into()])
    }

    fn plain_entry(id: UniversalId) -> RegistryEntry {
        let note = ScoreNote {
            part_id: "P1".into(),
            voice: 1,
            measure: 1,
            beat: Ratio::new(0, 1),
            pitch: Pitch::new('A', 0, 4),
            duration_divisions: 4,
            tie_role: TieRole::None,
            ornaments: vec![],
        };
        let event = PerformanceEvent {
            track: 0,
            channel: 0,
            midi_pitch: 69,
            velocity: 76,
            start_time: 0.0,
            end_time: 0.5,
            instrument: None,
        };
        RegistryEntry::plain(id, note, event, 1.0, MatchMethod::Exact)
    }

    #[test]
    fn complete_entry_with_all_artifacts_present_passes() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("note.svg"), b"<svg/>").unwrap();
        std::fs::write(dir.path().join("note.wav"), b"RIFF").unwrap();

        let mut registry = Registry::new();
        let id = UniversalId::derive("x", 0);
        registry.register(plain_entry(id)).unwrap();
        registry.update_artifact(
            id,
            ArtifactRecord {
                path: "note.svg".into(),
                content_hash: "a".into(),
                byte_size: 6,
            },
        );
        registry.update_artifact(
            id,
            ArtifactRecord {
                path: "note.wav".into(),
                content_hash: "b".into(),
                byte_size: 4,
            },
        );

        let report = validate(&registry, &default_requirements(), dir.path());
        assert!(report.is_successful());
        assert_eq!(report.confidence_histogram["Exact"], 1);
    }

    #[test]
    fn missing_artifact_file_is_an_integrity_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = Registry::new();
        let id = UniversalId::derive("x", 0);
        registry.register(plain_entry(id)).unwrap();
        registry.update_artifact(
            id,
            ArtifactRecord {
                path: "missing.svg".into(),
                content_hash: "a".into(),
                byte_size: 6,
            },
        );

        let report = validate(&registry, &default_requirements(), dir.path());
        assert!(!report.is_successful());
        assert!(report
            .integrity_errors
            .iter()
            .any(|e| matches!(e, IntegrityError::MissingArtifactFile { .. })));
    }

    #[test]
    fn incomplete_artifact_row_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = Registry::new();
        let id = UniversalId::derive("x", 0);
        registry.register(plain_entry(id)).unwrap();

        let report = validate(&registry, &default_requirements(), dir.path());
        assert!(!report.is_successful());
        assert_eq!(
            report
                .integrity_errors
                .iter()
                .filter(|e| matches!(e, IntegrityError::MissingArtifactRow { .. }))
                .count(),
            2
        );
    }

    #[test]
    fn fallback_matches_are_flagged_but_do_not_fail_the_run() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("note.svg"), b"x").unwrap();
        std::fs::write(dir.path().join("note.wav"), b"x").unwrap();

        let mut registry = Registry::new();
        let id = UniversalId::derive("x", 0);
        let mut entry = plain_entry(id);
        entry.match_method = MatchMethod::Fallback;
        entry.match_confidence = 0.8;
        registry.register(entry).unwrap();
        registry.update_artifact(
            id,
            ArtifactRecord {
                path: "note.svg".into(),
                content_hash: "a".into(),
                byte_size: 1,
            },
        );
        registry.update_artifact(
            id,
            ArtifactRecord {
                path: "note.wav".into(),
                content_hash: "a".into(),
                byte_size: 1,
            },
        );

        let report = validate(&registry, &default_requirements(), dir.path());
        assert!(report.is_successful());
        assert_eq!(report.fallback_matches, vec![id]);
    }
}
