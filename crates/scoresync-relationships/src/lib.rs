//! Refines a matcher's flat [`scoresync_model::RegistryEntry`] list into
//! Registry v2: tied-note chains collapsed into groups, ornament expansions
//! detected and attached, and pedal-extended durations recorded (spec.md
//! §4.C). Pure function: Registry v1 -> Registry v2, no I/O.

pub mod ornament;
pub mod pedal;
pub mod tied;

use scoresync_model::{
    OrnamentGroup, PedalEvent, PedalExtension, PerformanceEvent, RegistryEntry, ScoreNote, TiedGroup,
};

/// The refined registry produced by one [`process`] call.
#[derive(Debug, Default)]
pub struct RelationshipOutcome {
    pub entries: Vec<RegistryEntry>,
    pub tied_groups: Vec<TiedGroup>,
    pub ornament_groups: Vec<OrnamentGroup>,
    pub pedal_extensions: Vec<PedalExtension>,
    /// Score notes still unmatched after tie-chain absorption (spec.md §4.B:
    /// a tie continuation/stop note is deferred here rather than matched
    /// directly; one with no tie-start primary to join stays unmatched).
    pub unmatched_notes: Vec<ScoreNote>,
}

/// Runs tied-group detection, then ornament detection, then pedal-extension
/// synthesis over a matcher's plain entries.
///
/// `unmatched_notes` are score notes the matcher left unmatched (candidates
/// for tie-chain absorption). `orphan_events` are performance events the
/// matcher left unclaimed; they are the only candidates ornament detection
/// can draw expansion events from.
pub fn process(
    plain_entries: Vec<RegistryEntry>,
    unmatched_notes: Vec<ScoreNote>,
    orphan_events: Vec<PerformanceEvent>,
    pedal_events: &[PedalEvent],
) -> RelationshipOutcome {
    let (post_tie_entries, tied_groups, unmatched_notes) =
        tied::detect_tied_groups(plain_entries, unmatched_notes);

    let mut orphans = orphan_events;
    let mut ornament_groups = Vec::new();
    let mut final_plain = Vec::new();

    for entry in post_tie_entries {
        match ornament::try_detect_ornament(&entry, &orphans) {
            Some((group, mut claimed_indices)) => {
                claimed_indices.sort_unstable_by(|a, b| b.cmp(a));
                for idx in claimed_indices {
                    orphans.remove(idx);
                }
                ornament_groups.push(group);
            }
            None => final_plain.push(entry),
        }
    }

    // Remaining orphans are claimed by no score annotation at all; classify
    // them purely from the performance side before giving up on them
    // (spec.md §4.C(ii) — previously these were silently dropped).
    for (group, mut claimed_indices) in
        ornament::detect_performance_side_ornaments(&final_plain, &orphans)
    {
        claimed_indices.sort_unstable_by(|a, b| b.cmp(a));
        for idx in claimed_indices {
            orphans.remove(idx);
        }
        ornament_groups.push(group);
    }

    let mut all_entries = final_plain;
    for group in &tied_groups {
        all_entries.extend(tied::group_to_entries(group));
    }
    for group in &ornament_groups {
        all_entries.extend(ornament::group_to_entries(group));
    }

    let pedal_extensions = pedal::synthesize_pedal_extensions(&all_entries, pedal_events);

    RelationshipOutcome {
        entries: all_entries,
        tied_groups,
        ornament_groups,
        pedal_extensions,
        unmatched_notes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_rational::Ratio;
    use scoresync_model::{MatchMethod, Pitch, ScoreNote, TieRole, UniversalId};

    fn plain_entry() -> RegistryEntry {
        let note = ScoreNote {
            part_id: "P1".into(),
            voice: 1,
            measure: 1,
            beat: Ratio::new(0, 1),
            pitch: Pitch::new('C', 0, 4),
            duration_divisions: 4,
            tie_role: TieRole::None,
            ornaments: vec![],
        };
        let event = PerformanceEvent {
            track: 0,
            channel: 0,
            midi_pitch: 60,
            velocity: 80,
            start_time: 0.0,
            end_time: 0.5,
            instrument: None,
        };
        RegistryEntry::plain(
            UniversalId::derive("x", 0),
            note,
            event,
            1.0,
            MatchMethod::Exact,
        )
    }

    #[test]
    fn untouched_plain_entry_passes_through() {
        let outcome = process(vec![plain_entry()], vec![], vec![], &[]);
        assert_eq!(outcome.entries.len(), 1);
        assert!(outcome.unmatched_notes.is_empty());
        assert!(outcome.tied_groups.is_empty());
        assert!(outcome.ornament_groups.is_empty());
        assert!(outcome.pedal_extensions.is_empty());
    }
}
