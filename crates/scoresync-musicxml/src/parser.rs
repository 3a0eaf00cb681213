//! Streaming MusicXML walk: parts, measures, and notes in document order
//! (spec.md §4.A). Produces the canonical [`ScoreNote`] stream plus
//! [`ParseDiagnostics`] for anything irregular but non-fatal.

use crate::diagnostics::ParseDiagnostics;
use crate::error::MusicXmlError;
use num_rational::Ratio;
use quick_xml::events::Event;
use quick_xml::Reader;
use scoresync_model::{OrnamentAnnotation, OrnamentKind, Pitch, ScoreNote, TieRole};
use std::collections::HashMap;

#[derive(Default, Clone)]
struct NoteBuilder {
    voice: u8,
    is_rest: bool,
    is_chord: bool,
    is_grace: bool,
    grace_slash: bool,
    duration: Option<u32>,
    step: Option<char>,
    alter: i8,
    octave: Option<i8>,
    tie_role: TieRole,
    ornaments: Vec<OrnamentAnnotation>,
}

/// Parses a complete MusicXML document (already decompressed) into its note stream.
pub fn parse_document(xml: &[u8]) -> Result<(Vec<ScoreNote>, ParseDiagnostics), MusicXmlError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    let mut notes = Vec::new();
    let mut diagnostics = ParseDiagnostics::default();

    let mut current_part = String::new();
    let mut current_measure: u32 = 0;
    let mut divisions: u32 = 1;
    // Running position in divisions, per voice, reset at each measure boundary per part.
    let mut voice_positions: HashMap<u8, i64> = HashMap::new();
    let mut last_note_start: HashMap<u8, i64> = HashMap::new();

    let mut in_note = false;
    let mut in_pitch = false;
    let mut in_notations = false;
    let mut in_ornaments = false;
    let mut tremolo_kind: Option<(bool, u8)> = None; // (is_single_or_start, beam count)
    let mut builder = NoteBuilder::default();
    let mut text_buf = String::new();

    loop {
        match reader
            .read_event_into(&mut buf)
            .map_err(|err| MusicXmlError::Xml {
                position: reader.buffer_position(),
                reason: err.to_string(),
            })? {
            Event::Eof => break,
            Event::Start(tag) | Event::Empty(tag) => {
                let name = String::from_utf8_lossy(tag.name().as_ref()).to_string();

                match name.as_str() {
                    "part" => {
                        for attr in tag.attributes().flatten() {
                            if attr.key.as_ref() == b"id" {
                                current_part = String::from_utf8_lossy(&attr.value).to_string();
                            }
                        }
                        voice_positions.clear();
                        last_note_start.clear();
                    }
                    "measure" => {
                        for attr in tag.attributes().flatten() {
                            if attr.key.as_ref() == b"number" {
                                current_measure = String::from_utf8_lossy(&attr.value)
                                    .parse()
                                    .unwrap_or(current_measure + 1);
                            }
                        }
                        voice_positions.clear();
                        last_note_start.clear();
                    }
                    "divisions" => {}
                    "note" => {
                        in_note = true;
                        builder = NoteBuilder::default();
                        builder.voice = 1;
                    }
                    "rest" if in_note => builder.is_rest = true,
                    "chord" if in_note => builder.is_chord = true,
                    "grace" if in_note => {
                        builder.is_grace = true;
                        for attr in tag.attributes().flatten() {
                            if attr.key.as_ref() == b"slash" {
                                builder.grace_slash = attr.value.as_ref() == b"yes";
                            }
                        }
                    }
                    "pitch" if in_note => in_pitch = true,
                    "tie" if in_note => {
                        for attr in tag.attributes().flatten() {
                            if attr.key.as_ref() == b"type" {
                                let kind = match attr.value.as_ref() {
                                    b"start" => TieRole::Start,
                                    b"stop" => TieRole::Stop,
                                    _ => TieRole::None,
                                };
                                builder.tie_role = merge_tie(builder.tie_role, kind);
                            }
                        }
                    }
                    "notations" if in_note => in_notations = true,
                    "ornaments" if in_notations => in_ornaments = true,
                    "trill-mark" if in_ornaments => {
                        builder.ornaments.push(OrnamentAnnotation {
                            kind: OrnamentKind::Trill,
                        });
                    }
                    "mordent" if in_ornaments => builder.ornaments.push(OrnamentAnnotation {
                        kind: OrnamentKind::Mordent,
                    }),
                    "inverted-mordent" if in_ornaments => {
                        builder.ornaments.push(OrnamentAnnotation {
                            kind: OrnamentKind::InvertedMordent,
                        });
                    }
                    "turn" if in_ornaments => builder.ornaments.push(OrnamentAnnotation {
                        kind: OrnamentKind::Turn,
                    }),
                    "tremolo" if in_ornaments => {
                        let mut is_start = true;
                        for attr in tag.attributes().flatten() {
                            if attr.key.as_ref() == b"type" {
                                is_start = attr.value.as_ref() != b"stop";
                            }
                        }
                        tremolo_kind = Some((is_start, 0));
                    }
                    _ => {}
                }
            }
            Event::Text(text) => {
                text_buf = text.unescape().unwrap_or_default().to_string();
            }
            Event::End(tag) => {
                let name = String::from_utf8_lossy(tag.name().as_ref()).to_string();
                match name.as_str() {
                    "divisions" => {
                        if let Ok(d) = text_buf.trim().parse::<u32>() {
                            divisions = d.max(1);
                        }
                    }
                    "voice" if in_note => {
                        builder.voice = text_buf.trim().parse().unwrap_or(1);
                    }
                    "duration" if in_note && !in_notations => {
                        builder.duration = text_buf.trim().parse().ok();
                    }
                    "step" if in_pitch => {
                        builder.step = text_buf.trim().chars().next();
                    }
                    "alter" if in_pitch => {
                        builder.alter = text_buf.trim().parse().unwrap_or(0);
                    }
                    "octave" if in_pitch => {
                        builder.octave = text_buf.trim().parse().ok();
                    }
                    "pitch" => in_pitch = false,
                    "tremolo" if in_ornaments => {
                        if let Some((is_start, _)) = tremolo_kind {
                            let beams = text_buf.trim().parse::<u8>().unwrap_or(1);
                            if is_start {
                                builder.ornaments.push(OrnamentAnnotation {
                                    kind: OrnamentKind::Tremolo { beam_count: beams },
                                });
                            }
                        }
                        tremolo_kind = None;
                    }
                    "ornaments" => in_ornaments = false,
                    "notations" => in_notations = false,
                    "note" => {
                        in_note = false;
                        let duration = builder.duration.unwrap_or(0);
                        let voice = builder.voice;
                        let start_pos = if builder.is_chord {
                            *last_note_start.get(&voice).unwrap_or(&0)
                        } else {
                            *voice_positions.get(&voice).unwrap_or(&0)
                        };

                        if builder.is_grace {
                            builder.ornaments.push(OrnamentAnnotation {
                                kind: OrnamentKind::Grace {
                                    acciaccatura: builder.grace_slash,
                                },
                            });
                        }

                        if !builder.is_rest {
                            match (builder.step, builder.octave) {
                                (Some(letter), Some(octave)) => {
                                    let pitch = Pitch::new(letter, builder.alter, octave);
                                    notes.push(ScoreNote {
                                        part_id: current_part.clone(),
                                        voice,
                                        measure: current_measure,
                                        beat: Ratio::new(start_pos, divisions as i64),
                                        pitch,
                                        duration_divisions: duration,
                                        tie_role: builder.tie_role,
                                        ornaments: builder.ornaments.clone(),
                                    });
                                    last_note_start.insert(voice, start_pos);
                                }
                                _ => {
                                    diagnostics.push(
                                        current_part.clone(),
                                        current_measure,
                                        "pitched note missing <step>/<octave>; skipped",
                                    );
                                }
                            }
                        }

                        if !builder.is_chord && !builder.is_grace {
                            *voice_positions.entry(voice).or_insert(0) += duration as i64;
                        }
                    }
                    _ => {}
                }
                text_buf.clear();
            }
            _ => {}
        }
        buf.clear();
    }

    Ok((notes, diagnostics))
}

/// A `<tie>` stop followed immediately by a start (a "continue" note tied on
/// both ends) merges to [`TieRole::Continue`]; otherwise the later tag wins.
fn merge_tie(existing: TieRole, incoming: TieRole) -> TieRole {
    match (existing, incoming) {
        (TieRole::Stop, TieRole::Start) | (TieRole::Start, TieRole::Stop) => TieRole::Continue,
        (TieRole::None, other) => other,
        (current, TieRole::None) => current,
        (_, other) => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIMPLE_SCORE: &str = r#"<?xml version="1.0"?>
<score-partwise>
  <part id="P1">
    <measure number="1">
      <attributes><divisions>4</divisions></attributes>
      <note>
        <pitch><step>C</step><octave>4</octave></pitch>
        <duration>4</duration>
      </note>
      <note>
        <pitch><step>D</step><octave>4</octave></pitch>
        <duration>4</duration>
      </note>
    </measure>
  </part>
</score-partwise>"#;

    #[test]
    fn parses_two_sequential_quarter_notes() {
        let (notes, diagnostics) = parse_document(SIMPLE_SCORE.as_bytes()).unwrap();
        assert!(diagnostics.is_clean());
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0].beat, Ratio::new(0, 1));
        assert_eq!(notes[1].beat, Ratio::new(1, 1));
        assert_eq!(notes[0].pitch.midi_pitch(), 60);
        assert_eq!(notes[1].pitch.midi_pitch(), 62);
    }

    #[test]
    fn chord_notes_share_a_beat_position() {
        let xml = r#"<score-partwise>
  <part id="P1">
    <measure number="1">
      <attributes><divisions>4</divisions></attributes>
      <note><pitch><step>C</step><octave>4</octave></pitch><duration>4</duration></note>
      <note><chord/><pitch><step>E</step><octave>4</octave></pitch><duration>4</duration></note>
    </measure>
  </part>
</score-partwise>"#;
        let (notes, _) = parse_document(xml.as_bytes()).unwrap();
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0].beat, notes[1].beat);
    }

    #[test]
    fn tie_start_and_stop_merge_to_continue() {
        let xml = r#"<score-partwise>
  <part id="P1">
    <measure number="1">
      <attributes><divisions>4</divisions></attributes>
      <note>
        <pitch><step>C</step><octave>4</octave></pitch>
        <duration>4</duration>
        <tie type="stop"/>
        <tie type="start"/>
      </note>
    </measure>
  </part>
</score-partwise>"#;
        let (notes, _) = parse_document(xml.as_bytes()).unwrap();
        assert_eq!(notes[0].tie_role, TieRole::Continue);
    }

    #[test]
    fn trill_mark_is_captured_as_ornament() {
        let xml = r#"<score-partwise>
  <part id="P1">
    <measure number="1">
      <attributes><divisions>4</divisions></attributes>
      <note>
        <pitch><step>C</step><octave>4</octave></pitch>
        <duration>4</duration>
        <notations><ornaments><trill-mark/></ornaments></notations>
      </note>
    </measure>
  </part>
</score-partwise>"#;
        let (notes, _) = parse_document(xml.as_bytes()).unwrap();
        assert_eq!(notes[0].ornaments.len(), 1);
        assert_eq!(notes[0].ornaments[0].kind, OrnamentKind::Trill);
    }

    #[test]
    fn rest_advances_position_without_emitting_a_note() {
        let xml = r#"<score-partwise>
  <part id="P1">
    <measure number="1">
      <attributes><divisions>4</divisions></attributes>
      <note><rest/><duration>4</duration></note>
      <note><pitch><step>C</step><octave>4</octave></pitch><duration>4</duration></note>
    </measure>
  </part>
</score-partwise>"#;
        let (notes, _) = parse_document(xml.as_bytes()).unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].beat, Ratio::new(1, 1));
    }
}
