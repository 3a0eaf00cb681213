//! The matching pass: score notes -> performance events (spec.md §4.B).
//!
//! 1. Estimate each score note's tentative absolute time from its measure/beat.
//! 2. Bucket performance events by (track, pitch).
//! 3. For each note, within its candidate tracks (from [`TrackCorrespondence`]
//!    or an operator override), claim the nearest unclaimed same-pitch event
//!    inside the matching window; ties break toward the later start time.
//! 4. Any note still unmatched gets a fallback pass: same pitch, any track,
//!    still inside the window.
//! 5. Notes that remain unmatched are reported, not silently dropped.

use crate::config::MatcherConfig;
use crate::correspondence::TrackCorrespondence;
use scoresync_model::{MatchMethod, PerformanceEvent, RegistryEntry, ScoreNote, UniversalId};
use std::collections::HashMap;

/// Result of a full matching pass.
#[derive(Debug, Default)]
pub struct MatchOutcome {
    pub entries: Vec<RegistryEntry>,
    /// Score notes that found no performance event within the window, in any track.
    pub unmatched: Vec<ScoreNote>,
}

struct Bucket {
    // (start_time, event_index), kept sorted by start_time.
    events: Vec<(f64, usize)>,
}

fn estimate_tentative_time(note: &ScoreNote, config: &MatcherConfig) -> f64 {
    config
        .tempo_map
        .seconds_for_beat(note.measure, note.beat, config.beats_per_measure)
}

/// Runs the full matching pass over a score's notes and a performance's events.
pub fn match_notes(
    notes: &[ScoreNote],
    events: &[PerformanceEvent],
    config: &MatcherConfig,
) -> MatchOutcome {
    let part_ids: Vec<String> = {
        let mut seen = std::collections::HashSet::new();
        notes
            .iter()
            .map(|n| n.part_id.clone())
            .filter(|p| seen.insert(p.clone()))
            .collect()
    };
    let track_names: HashMap<usize, String> = events
        .iter()
        .filter_map(|e| e.instrument.clone().map(|name| (e.track, name)))
        .collect();
    let correspondence = TrackCorrespondence::infer(&part_ids, &track_names, &config.track_overrides);

    let mut buckets: HashMap<(usize, u8), Bucket> = HashMap::new();
    for (idx, event) in events.iter().enumerate() {
        buckets
            .entry((event.track, event.midi_pitch))
            .or_insert_with(|| Bucket { events: Vec::new() })
            .events
            .push((event.start_time, idx));
    }
    for bucket in buckets.values_mut() {
        bucket.events.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap());
    }

    let mut claimed = vec![false; events.len()];
    let exact_s = config.exact_threshold_ms / 1000.0;
    // The exact threshold is a floor on the candidate-gathering radius: even a
    // zero matching window still accepts a Δt <= exact_threshold_ms match.
    let window_s = (config.t_window_ms / 1000.0).max(exact_s);

    let mut outcome = MatchOutcome::default();

    let all_tracks: Vec<usize> = {
        let mut t: Vec<usize> = events.iter().map(|e| e.track).collect();
        t.sort_unstable();
        t.dedup();
        t
    };

    for note in notes {
        let tentative = estimate_tentative_time(note, config);
        let pitch = note.pitch.midi_pitch() as u8;

        let preferred_tracks: Vec<usize> = correspondence
            .candidates_for(&note.part_id)
            .map(|c| c.to_vec())
            .unwrap_or_else(|| all_tracks.clone());

        if let Some((event_idx, delta)) =
            claim_nearest(&buckets, &claimed, &preferred_tracks, pitch, tentative, window_s)
        {
            claimed[event_idx] = true;
            let method = if delta <= exact_s {
                MatchMethod::Exact
            } else {
                MatchMethod::Fuzzy
            };
            push_entry(&mut outcome, note, &events[event_idx], method);
            continue;
        }

        // Fallback: same pitch, any track.
        if let Some((event_idx, _delta)) =
            claim_nearest(&buckets, &claimed, &all_tracks, pitch, tentative, window_s)
        {
            claimed[event_idx] = true;
            push_entry(&mut outcome, note, &events[event_idx], MatchMethod::Fallback);
            continue;
        }

        outcome.unmatched.push(note.clone());
    }

    outcome
}

/// Finds the nearest unclaimed event of `pitch` across `tracks` to `tentative`,
/// within `window_s`. Ties (identical delta) break toward the later start time.
fn claim_nearest(
    buckets: &HashMap<(usize, u8), Bucket>,
    claimed: &[bool],
    tracks: &[usize],
    pitch: u8,
    tentative: f64,
    window_s: f64,
) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64, f64)> = None; // (event_idx, delta, start_time)
    for &track in tracks {
        let Some(bucket) = buckets.get(&(track, pitch)) else {
            continue;
        };
        for &(start_time, idx) in &bucket.events {
            if claimed[idx] {
                continue;
            }
            let delta = (start_time - tentative).abs();
            if delta > window_s {
                continue;
            }
            match &best {
                None => best = Some((idx, delta, start_time)),
                Some((_, best_delta, best_start)) => {
                    if delta < *best_delta
                        || ((delta - *best_delta).abs() < 1e-12 && start_time > *best_start)
                    {
                        best = Some((idx, delta, start_time));
                    }
                }
            }
        }
    }
    best.map(|(idx, delta, _)| (idx, delta))
}

fn push_entry(
    outcome: &mut MatchOutcome,
    note: &ScoreNote,
    event: &PerformanceEvent,
    method: MatchMethod,
) {
    let evidence = format!("{}|{}", note.evidence_key(), event.evidence_key());
    let id = UniversalId::derive(&evidence, 0);
    outcome.entries.push(RegistryEntry::plain(
        id,
        note.clone(),
        event.clone(),
        method.default_confidence(),
        method,
    ));
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_rational::Ratio;
    use scoresync_model::{Pitch, TieRole};

    fn note(measure: u32, beat: i64) -> ScoreNote {
        ScoreNote {
            part_id: "P1".into(),
            voice: 1,
            measure,
            beat: Ratio::new(beat, 1),
            pitch: Pitch::new('C', 0, 4),
            duration_divisions: 4,
            tie_role: TieRole::None,
            ornaments: vec![],
        }
    }

    fn event(track: usize, start: f64) -> PerformanceEvent {
        PerformanceEvent {
            track,
            channel: 0,
            midi_pitch: 60,
            velocity: 80,
            start_time: start,
            end_time: start + 0.5,
            instrument: None,
        }
    }

    #[test]
    fn matches_within_window_as_exact() {
        let notes = vec![note(1, 0)];
        let events = vec![event(0, 0.002)];
        let config = MatcherConfig::default();
        let outcome = match_notes(&notes, &events, &config);
        assert_eq!(outcome.entries.len(), 1);
        assert_eq!(outcome.entries[0].match_method, MatchMethod::Exact);
    }

    #[test]
    fn outside_window_is_unmatched() {
        let notes = vec![note(1, 0)];
        let events = vec![event(0, 5.0)];
        let config = MatcherConfig::default();
        let outcome = match_notes(&notes, &events, &config);
        assert!(outcome.entries.is_empty());
        assert_eq!(outcome.unmatched.len(), 1);
    }

    #[test]
    fn fuzzy_match_within_window_but_outside_exact_threshold() {
        let notes = vec![note(1, 0)];
        let events = vec![event(0, 0.05)];
        let config = MatcherConfig::default();
        let outcome = match_notes(&notes, &events, &config);
        assert_eq!(outcome.entries[0].match_method, MatchMethod::Fuzzy);
    }

    #[test]
    fn tie_breaks_toward_later_start_time() {
        let notes = vec![note(1, 0)];
        // Both events equidistant from tentative time 0.0: -0.01 and +0.01.
        let events = vec![event(0, -0.01), event(0, 0.01)];
        let config = MatcherConfig::default();
        let outcome = match_notes(&notes, &events, &config);
        assert_eq!(outcome.entries[0].performance_event.as_ref().unwrap().start_time, 0.01);
    }

    #[test]
    fn fallback_matches_same_pitch_on_a_different_track() {
        let mut config = MatcherConfig::default();
        let mut overrides = HashMap::new();
        overrides.insert("P1".to_string(), 9usize); // a track with no events
        config.track_overrides = overrides;
        let notes = vec![note(1, 0)];
        let events = vec![event(0, 0.0)];
        let outcome = match_notes(&notes, &events, &config);
        assert_eq!(outcome.entries.len(), 1);
        assert_eq!(outcome.entries[0].match_method, MatchMethod::Fallback);
    }
}
