//! Walks a standard MIDI file's tracks and produces the canonical
//! [`PerformanceEvent`] and [`PedalEvent`] streams (spec.md §4.A).

use crate::diagnostics::ParseDiagnostics;
use crate::error::MidiError;
use crate::tempo::{TempoChange, TempoMap};
use midly::{MetaMessage, MidiMessage, Smf, Timing, TrackEventKind};
use scoresync_model::{PedalEvent, PerformanceEvent};
use std::collections::HashMap;

const SUSTAIN_CONTROLLER: u8 = 64;
const SUSTAIN_THRESHOLD: u8 = 64;

/// Parses already-read SMF bytes into performance and pedal event streams,
/// plus the tempo map used to derive their times (needed downstream by the
/// matcher to estimate a score note's tentative time, spec.md §4.B step 1/2).
pub fn parse_bytes(
    bytes: &[u8],
) -> Result<(Vec<PerformanceEvent>, Vec<PedalEvent>, TempoMap, ParseDiagnostics), MidiError> {
    let smf = Smf::parse(bytes).map_err(|err| MidiError::Smf {
        path: String::new(),
        reason: err.to_string(),
    })?;

    let ticks_per_quarter = match smf.header.timing {
        Timing::Metrical(n) => n.as_int() as u32,
        // SMPTE timecode files are rare in this pipeline's inputs; fall back to a
        // nominal 25fps/40-subframe resolution so ticks still advance monotonically.
        Timing::Timecode(fps, subframe) => (fps.as_int() as u32).max(1) * subframe as u32,
    };

    let mut tempo_changes = Vec::new();
    for track in &smf.tracks {
        let mut abs_tick: u64 = 0;
        for event in track {
            abs_tick += event.delta.as_int() as u64;
            if let TrackEventKind::Meta(MetaMessage::Tempo(t)) = event.kind {
                tempo_changes.push(TempoChange {
                    tick: abs_tick,
                    micros_per_quarter: t.as_int(),
                });
            }
        }
    }
    let tempo_map = TempoMap::new(tempo_changes, ticks_per_quarter);

    let mut events = Vec::new();
    let mut pedal_events = Vec::new();
    let mut diagnostics = ParseDiagnostics::default();

    for (track_index, track) in smf.tracks.iter().enumerate() {
        let mut abs_tick: u64 = 0;
        // FIFO per (channel, pitch): the earliest open note-on is closed first.
        let mut open_notes: HashMap<(u8, u8), Vec<u64>> = HashMap::new();
        let mut current_instrument: Option<String> = None;

        for event in track {
            abs_tick += event.delta.as_int() as u64;
            match event.kind {
                TrackEventKind::Meta(MetaMessage::InstrumentName(name))
                | TrackEventKind::Meta(MetaMessage::TrackName(name)) => {
                    if current_instrument.is_none() {
                        current_instrument = Some(String::from_utf8_lossy(name).to_string());
                    }
                }
                TrackEventKind::Midi { channel, message } => {
                    let channel = channel.as_int();
                    match message {
                        MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => {
                            open_notes
                                .entry((channel, key.as_int()))
                                .or_default()
                                .push(abs_tick);
                        }
                        MidiMessage::NoteOn { key, vel } | MidiMessage::NoteOff { key, vel } => {
                            close_note(
                                &mut open_notes,
                                &tempo_map,
                                &mut events,
                                track_index,
                                channel,
                                key.as_int(),
                                vel.as_int(),
                                abs_tick,
                                current_instrument.clone(),
                                &mut diagnostics,
                            );
                        }
                        MidiMessage::Controller { controller, value }
                            if controller.as_int() == SUSTAIN_CONTROLLER =>
                        {
                            pedal_events.push(PedalEvent {
                                channel,
                                time: tempo_map.ticks_to_seconds(abs_tick),
                                down: value.as_int() >= SUSTAIN_THRESHOLD,
                            });
                        }
                        _ => {}
                    }
                }
                _ => {}
            }
        }

        for ((channel, pitch), starts) in open_notes {
            if !starts.is_empty() {
                diagnostics.push(
                    track_index,
                    format!(
                        "{} note-on(s) for channel {channel} pitch {pitch} never received a note-off",
                        starts.len()
                    ),
                );
            }
        }
    }

    events.sort_by(|a, b| a.start_time.partial_cmp(&b.start_time).unwrap());
    pedal_events.sort_by(|a, b| a.time.partial_cmp(&b.time).unwrap());

    Ok((events, pedal_events, tempo_map, diagnostics))
}

#[allow(clippy::too_many_arguments)]
fn close_note(
    open_notes: &mut HashMap<(u8, u8), Vec<u64>>,
    tempo_map: &TempoMap,
    events: &mut Vec<PerformanceEvent>,
    track: usize,
    channel: u8,
    pitch: u8,
    velocity: u8,
    end_tick: u64,
    instrument: Option<String>,
    diagnostics: &mut ParseDiagnostics,
) {
    let key = (channel, pitch);
    match open_notes.get_mut(&key).and_then(|stack| {
        if stack.is_empty() {
            None
        } else {
            Some(stack.remove(0))
        }
    }) {
        Some(start_tick) => {
            events.push(PerformanceEvent {
                track,
                channel,
                midi_pitch: pitch,
                velocity,
                start_time: tempo_map.ticks_to_seconds(start_tick),
                end_time: tempo_map.ticks_to_seconds(end_tick),
                instrument,
            });
        }
        None => {
            diagnostics.push(
                track,
                format!("note-off for channel {channel} pitch {pitch} with no open note-on"),
            );
        }
    }
}
