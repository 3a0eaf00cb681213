//! Builders for the score-note / performance-event pairs used throughout
//! spec.md §8's end-to-end scenarios.

use num_rational::Ratio;
use scoresync_model::{
    OrnamentAnnotation, OrnamentKind, PedalEvent, PerformanceEvent, Pitch, RegistryEntry, ScoreNote,
    TieRole,
};

/// A quarter-note A4 at the given measure/beat, untied, unornamented.
pub fn plain_note(part_id: &str, measure: u32, beat: Ratio<i64>) -> ScoreNote {
    ScoreNote {
        part_id: part_id.to_string(),
        voice: 1,
        measure,
        beat,
        pitch: Pitch::new('A', 0, 4),
        duration_divisions: 4,
        tie_role: TieRole::None,
        ornaments: vec![],
    }
}

pub fn tied_note(
    part_id: &str,
    measure: u32,
    beat: Ratio<i64>,
    duration_divisions: u32,
    tie_role: TieRole,
) -> ScoreNote {
    ScoreNote {
        duration_divisions,
        tie_role,
        ..plain_note(part_id, measure, beat)
    }
}

pub fn ornamented_note(part_id: &str, measure: u32, beat: Ratio<i64>, kind: OrnamentKind) -> ScoreNote {
    ScoreNote {
        ornaments: vec![OrnamentAnnotation { kind }],
        ..plain_note(part_id, measure, beat)
    }
}

pub fn performance_event(track: usize, pitch: u8, start: f64, end: f64) -> PerformanceEvent {
    PerformanceEvent {
        track,
        channel: 0,
        midi_pitch: pitch,
        velocity: 76,
        start_time: start,
        end_time: end,
        instrument: None,
    }
}

pub fn pedal_on(channel: u8, time: f64) -> PedalEvent {
    PedalEvent {
        channel,
        time,
        down: true,
    }
}

pub fn pedal_off(channel: u8, time: f64) -> PedalEvent {
    PedalEvent {
        channel,
        time,
        down: false,
    }
}

/// Six alternating-pitch performance events bracketing a trill anchor, per
/// spec.md §8 Scenario C (7.50, 7.62, ... 8.12).
pub fn trill_expansion_events() -> Vec<PerformanceEvent> {
    (0..6)
        .map(|i| {
            let start = 7.50 + i as f64 * 0.125;
            performance_event(0, if i % 2 == 0 { 69 } else { 71 }, start, start + 0.1)
        })
        .collect()
}

/// The performance events the matcher left unclaimed: every event not
/// referenced by one of `matched_entries`' performance events. Mirrors the
/// CLI's own orphan computation (the relationship processor's ornament
/// detection only ever sees events the matcher didn't already claim).
pub fn unclaimed_events(
    all_events: &[PerformanceEvent],
    matched_entries: &[RegistryEntry],
) -> Vec<PerformanceEvent> {
    let claimed: std::collections::HashSet<(usize, u8, u64)> = matched_entries
        .iter()
        .filter_map(|e| e.performance_event.as_ref())
        .map(|e| (e.track, e.midi_pitch, e.start_time.to_bits()))
        .collect();
    all_events
        .iter()
        .filter(|e| !claimed.contains(&(e.track, e.midi_pitch, e.start_time.to_bits())))
        .cloned()
        .collect()
}
