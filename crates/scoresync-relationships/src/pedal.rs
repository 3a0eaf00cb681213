//! Synthesizes [`PedalExtension`]s for every matched entry whose sounding
//! duration the sustain pedal lengthens (spec.md §4.C(iii)).

use scoresync_model::{
    pedal::{active_pedal_on_time, resolve_extended_end_time},
    PedalEvent, PedalExtension, RegistryEntry,
};

/// Computes a [`PedalExtension`] for each entry that owns a performance event
/// and whose raw end time is extended by the pedal stream on its channel.
/// `synthetic_on_offset`/`synthetic_off_offset` are recorded relative to the
/// note's own start time so the renderer can emit synthetic sustain-pedal
/// control events without re-deriving them from the raw pedal stream
/// (spec.md §4.C: Pedal extensions).
pub fn synthesize_pedal_extensions(
    entries: &[RegistryEntry],
    pedal_events: &[PedalEvent],
) -> Vec<PedalExtension> {
    entries
        .iter()
        .filter_map(|entry| {
            let event = entry.performance_event.as_ref()?;
            let extended = resolve_extended_end_time(event.end_time, event.channel, pedal_events);
            if extended > event.end_time {
                let sustain_on = active_pedal_on_time(event.end_time, event.channel, pedal_events)
                    .unwrap_or(event.start_time);
                Some(PedalExtension {
                    universal_id: entry.universal_id,
                    raw_end_time: event.end_time,
                    extended_end_time: extended,
                    synthetic_on_offset: (sustain_on - event.start_time).max(0.0),
                    synthetic_off_offset: extended - event.start_time,
                })
            } else {
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_rational::Ratio;
    use scoresync_model::{MatchMethod, PerformanceEvent, Pitch, ScoreNote, TieRole, UniversalId};

    #[test]
    fn extends_only_entries_whose_channel_is_sustained() {
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
            end_time: 1.0,
            instrument: None,
        };
        let entry = RegistryEntry::plain(
            UniversalId::derive("x", 0),
            note,
            event,
            1.0,
            MatchMethod::Exact,
        );
        let pedal_events = vec![
            PedalEvent {
                channel: 0,
                time: 0.0,
                down: true,
            },
            PedalEvent {
                channel: 0,
                time: 2.0,
                down: false,
            },
        ];
        let extensions = synthesize_pedal_extensions(&[entry], &pedal_events);
        assert_eq!(extensions.len(), 1);
        assert_eq!(extensions[0].extended_end_time, 2.0);
        assert_eq!(extensions[0].synthetic_on_offset, 0.0);
        assert_eq!(extensions[0].synthetic_off_offset, 2.0);
    }
}
