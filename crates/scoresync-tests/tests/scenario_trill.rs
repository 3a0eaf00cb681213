//! Scenario C — trill (spec.md §8): a Trill-annotated score note matched to
//! an anchor performance event, fused with six alternating-pitch orphan
//! events into one `OrnamentGroup`.

use num_rational::Ratio;
use scoresync_model::{MatchMethod, OrnamentKind, RegistryEntry, UniversalId};
use scoresync_relationships::{ornament::FUSION_THRESHOLD, process};
use scoresync_tests::fixtures::{ornamented_note, performance_event, trill_expansion_events};

#[test]
fn trill_annotation_fuses_with_alternating_orphan_cluster() {
    let note = ornamented_note("P1", 5, Ratio::new(3, 1), OrnamentKind::Trill);
    let anchor = performance_event(0, 69, 7.45, 7.55);
    let entry = RegistryEntry::plain(UniversalId::derive("trill-anchor", 0), note, anchor, 1.0, MatchMethod::Exact);

    let orphans = trill_expansion_events();
    assert_eq!(orphans.len(), 6);

    let outcome = process(vec![entry], vec![], orphans, &[]);

    assert!(outcome.unmatched_notes.is_empty());
    assert!(outcome.tied_groups.is_empty());
    assert_eq!(outcome.ornament_groups.len(), 1);

    let group = &outcome.ornament_groups[0];
    assert_eq!(group.ornament_kind, OrnamentKind::Trill);
    assert_eq!(group.expansion_events.len(), 6);
    assert!(group.match_confidence >= FUSION_THRESHOLD);

    // One OrnamentPrimary + 6 OrnamentExpansion rows, each sub-ID addressed.
    assert_eq!(outcome.entries.len(), 7);
    let sub_ids: Vec<String> = (0..6).map(|k| group.sub_id(k)).collect();
    for (k, sub_id) in sub_ids.iter().enumerate() {
        assert_eq!(*sub_id, format!("{}_expansion_{:02}", group.group_id, k));
    }
}
