//! The four boundary behaviors from spec.md §8 (items 10-13).

use num_rational::Ratio;
use scoresync_matcher::{match_notes, MatcherConfig};
use scoresync_model::{MatchMethod, OrnamentKind, RegistryEntry, TieRole, UniversalId};
use scoresync_relationships::ornament::{try_detect_ornament, FUSION_THRESHOLD};
use scoresync_relationships::tied::detect_tied_groups;
use scoresync_tests::fixtures::{ornamented_note, performance_event, plain_note, tied_note};

/// 10. T_window = 0 accepts only exact matches: Δt <= 10ms still yields
/// confidence 1.0, but anything past it yields no match at all.
#[test]
fn zero_window_still_accepts_exact_threshold_matches() {
    let config = MatcherConfig {
        t_window_ms: 0.0,
        ..Default::default()
    };

    let notes = vec![plain_note("P1", 1, Ratio::new(0, 1))];
    let within_exact = vec![performance_event(0, 69, 0.009, 0.5)];
    let outcome = match_notes(&notes, &within_exact, &config);
    assert_eq!(outcome.entries.len(), 1);
    assert_eq!(outcome.entries[0].match_method, MatchMethod::Exact);
    assert_eq!(outcome.entries[0].match_confidence, 1.0);

    let notes = vec![plain_note("P1", 1, Ratio::new(0, 1))];
    let past_exact = vec![performance_event(0, 69, 0.011, 0.5)];
    let outcome = match_notes(&notes, &past_exact, &config);
    assert!(outcome.entries.is_empty());
    assert_eq!(outcome.unmatched.len(), 1);
}

/// 11. A length-1 "tie" (no continuation/stop following it) is legal and
/// simply treated as a plain entry, not collapsed into a TiedGroup.
#[test]
fn degenerate_length_one_tie_is_treated_as_plain() {
    let note = tied_note("P1", 1, Ratio::new(0, 1), 4, TieRole::Start);
    let event = performance_event(0, 69, 0.0, 0.5);
    let entry = RegistryEntry::plain(
        UniversalId::derive(&note.evidence_key(), 0),
        note,
        event,
        1.0,
        MatchMethod::Exact,
    );

    let (surviving, groups, leftover) = detect_tied_groups(vec![entry], vec![]);
    assert_eq!(surviving.len(), 1, "a lone tie-start with no follower stays plain");
    assert!(groups.is_empty());
    assert!(leftover.is_empty());
}

/// 12. An ornament whose detected cluster cardinality doesn't match the
/// expected range falls through to no fusion (1:1 treatment of whatever's
/// left), rather than being forced into a group.
#[test]
fn cardinality_mismatch_falls_through_to_no_fusion() {
    let note = ornamented_note("P1", 1, Ratio::new(0, 1), OrnamentKind::Trill); // expects 6..=8
    let anchor = performance_event(0, 69, 0.0, 0.1);
    let entry = RegistryEntry::plain(
        UniversalId::derive("boundary-12", 0),
        note,
        anchor,
        1.0,
        MatchMethod::Exact,
    );

    // Only 2 orphans: below the trill's expected cardinality of 6-8.
    let orphans: Vec<_> = (0..2)
        .map(|i| performance_event(0, if i % 2 == 0 { 69 } else { 71 }, i as f64 * 0.05, i as f64 * 0.05 + 0.04))
        .collect();

    let result = try_detect_ornament(&entry, &orphans);
    assert!(result.is_none(), "2 orphans can't satisfy a 6-8 cardinality trill");
}

#[test]
fn cardinality_in_range_still_requires_the_fusion_threshold() {
    let note = ornamented_note("P1", 1, Ratio::new(0, 1), OrnamentKind::Trill);
    let anchor = performance_event(0, 69, 0.0, 0.1);
    let entry = RegistryEntry::plain(
        UniversalId::derive("boundary-12b", 0),
        note,
        anchor,
        1.0,
        MatchMethod::Exact,
    );

    // 6 events in range, but monotone (not alternating) pitch: weak pitch_pattern
    // score. With cardinality + time-proximity + annotation still contributing,
    // this is a case where the total may or may not clear FUSION_THRESHOLD; the
    // invariant under test is that the gate is the threshold itself, not the
    // cardinality check alone.
    let orphans: Vec<_> = (0..6)
        .map(|i| performance_event(0, 69, i as f64 * 0.05, i as f64 * 0.05 + 0.04))
        .collect();

    let result = try_detect_ornament(&entry, &orphans);
    match result {
        Some((group, _)) => assert!(group.match_confidence >= FUSION_THRESHOLD),
        None => {} // fell through, which is exactly the boundary this guards
    }
}

/// 13. A pedal-on with no later pedal-off on the same channel introduces no
/// extension (it's not mistaken for an indefinite hold).
#[test]
fn pedal_on_with_no_later_off_yields_no_extension() {
    use scoresync_model::PedalEvent;

    let pedal_events = vec![PedalEvent {
        channel: 0,
        time: 0.1,
        down: true,
    }];
    let extended = scoresync_model::pedal::resolve_extended_end_time(0.25, 0, &pedal_events);
    assert_eq!(extended, 0.25, "no pedal-off on this channel means no extension");
}
