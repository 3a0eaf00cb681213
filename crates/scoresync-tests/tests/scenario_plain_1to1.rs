//! Scenario A — plain 1:1 (spec.md §8): one score-note, one performance
//! event, exact match, and a registered artifact addressable by the
//! universal ID's 4-char filename prefix.

use num_rational::Ratio;
use scoresync_matcher::{match_notes, MatcherConfig};
use scoresync_model::{ArtifactRecord, MatchMethod};
use scoresync_registry::Registry;
use scoresync_tests::fixtures::{performance_event, plain_note};

#[test]
fn plain_note_matches_exactly_and_is_addressable_by_prefix() {
    let notes = vec![plain_note("P1", 1, Ratio::new(0, 1))];
    let events = vec![performance_event(0, 69, 0.000, 0.500)];

    let outcome = match_notes(&notes, &events, &MatcherConfig::default());
    assert_eq!(outcome.entries.len(), 1);
    assert!(outcome.unmatched.is_empty());

    let entry = &outcome.entries[0];
    assert_eq!(entry.match_method, MatchMethod::Exact);
    assert_eq!(entry.match_confidence, 1.0);

    let mut registry = Registry::new();
    let id = entry.universal_id;
    registry.register(entry.clone()).unwrap();

    let prefix = id.prefix4();
    let artifact_path = format!("audio/{prefix}_note.wav");
    registry.update_artifact(
        id,
        ArtifactRecord {
            path: artifact_path.clone().into(),
            content_hash: blake3::hash(b"fake audio bytes").to_hex().to_string(),
            byte_size: 17,
        },
    );

    assert!(registry.artifacts_for(&id)[0].path.to_str().unwrap().contains(&prefix));
    let matches = registry.lookup_by_filename_prefix(&prefix);
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].universal_id, id);
}
