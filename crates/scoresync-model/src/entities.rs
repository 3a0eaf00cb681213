//! The two immutable input entities: [`ScoreNote`] (from the score parser) and
//! [`PerformanceEvent`] (from the performance parser). See spec.md §3.1.

use num_rational::Ratio;
use serde::{Deserialize, Serialize};

/// A pitch spelled as a letter name, chromatic alteration, and octave.
///
/// `midi_pitch` converts to the MIDI note-number space for enharmonic
/// comparison against a [`PerformanceEvent::midi_pitch`] (spec.md §4.B requires
/// enharmonic equivalence, not spelling equivalence).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pitch {
    /// Letter name, 'A'..='G'.
    pub letter: char,
    /// Chromatic alteration in semitones (-2 for double-flat, 2 for double-sharp).
    pub alteration: i8,
    /// Scientific pitch octave (MusicXML convention: octave 4 contains middle C).
    pub octave: i8,
}

impl Pitch {
    pub fn new(letter: char, alteration: i8, octave: i8) -> Self {
        Self {
            letter: letter.to_ascii_uppercase(),
            alteration,
            octave,
        }
    }

    /// Natural semitone offset from C within an octave, before alteration.
    fn natural_offset(letter: char) -> i8 {
        match letter.to_ascii_uppercase() {
            'C' => 0,
            'D' => 2,
            'E' => 4,
            'F' => 5,
            'G' => 7,
            'A' => 9,
            'B' => 11,
            _ => 0,
        }
    }

    /// Converts to a MIDI note number (middle C = 60).
    pub fn midi_pitch(&self) -> i32 {
        let base = (self.octave as i32 + 1) * 12;
        base + Self::natural_offset(self.letter) as i32 + self.alteration as i32
    }

    /// Builds a `Pitch` from a MIDI note number using a fixed (sharps-preferred) spelling.
    ///
    /// Used to derive a display spelling for performance-only events (e.g. ornament
    /// expansion events with no score-side counterpart); not a full key-aware speller.
    pub fn from_midi(midi: u8) -> Self {
        const SPELLINGS: [(char, i8); 12] = [
            ('C', 0),
            ('C', 1),
            ('D', 0),
            ('D', 1),
            ('E', 0),
            ('F', 0),
            ('F', 1),
            ('G', 0),
            ('G', 1),
            ('A', 0),
            ('A', 1),
            ('B', 0),
        ];
        let octave = (midi as i32 / 12) - 1;
        let (letter, alteration) = SPELLINGS[(midi as i32 % 12) as usize];
        Pitch::new(letter, alteration, octave as i8)
    }

    /// True iff `self` and `other` denote the same sounded pitch (enharmonic equivalence).
    pub fn enharmonic_eq(&self, other_midi: i32) -> bool {
        self.midi_pitch() == other_midi
    }
}

/// Tie role of a [`ScoreNote`] within a tied sequence (spec.md §3.1, §4.C).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TieRole {
    None,
    Start,
    Continue,
    Stop,
}

/// An ornament annotation gathered from the score's notations subtree (spec.md §4.A).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OrnamentKind {
    Trill,
    Mordent,
    InvertedMordent,
    Turn,
    /// `beam_count` comes from the tremolo element's beam count in the score.
    Tremolo { beam_count: u8 },
    /// `acciaccatura` is true for a slashed grace note, false for an appoggiatura.
    Grace { acciaccatura: bool },
}

impl OrnamentKind {
    /// Expected expansion cardinality per spec.md §4.C(i): trill 6-8, mordent 3,
    /// turn 4, grace 1, tremolo per beam count (2^beam_count alternations, approximated
    /// as a representative count used only for the cardinality sub-score).
    pub fn expected_cardinality(&self) -> std::ops::RangeInclusive<usize> {
        match self {
            OrnamentKind::Trill => 6..=8,
            OrnamentKind::Mordent => 3..=3,
            OrnamentKind::Turn => 4..=4,
            OrnamentKind::Grace { .. } => 1..=1,
            OrnamentKind::Tremolo { beam_count } => {
                let n = 1usize << (*beam_count).max(1);
                n..=n
            }
        }
    }
}

/// A score-side ornament annotation: the kind plus which notation element produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrnamentAnnotation {
    pub kind: OrnamentKind,
}

/// A pitched event from the symbolic score. Immutable once created by the score parser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreNote {
    pub part_id: String,
    pub voice: u8,
    pub measure: u32,
    /// Beat position within the measure, as a rational of (running duration sum) / divisions.
    pub beat: Ratio<i64>,
    pub pitch: Pitch,
    /// Duration in the score's declared divisions-per-quarter-note unit.
    pub duration_divisions: u32,
    pub tie_role: TieRole,
    pub ornaments: Vec<OrnamentAnnotation>,
}

impl ScoreNote {
    /// A stable identity string for this note within its part, used as universal-ID evidence
    /// and as a deterministic sort/lookup key; independent of the performance side.
    pub fn evidence_key(&self) -> String {
        format!(
            "part={};voice={};measure={};beat={}/{};pitch={}{}{}",
            self.part_id,
            self.voice,
            self.measure,
            self.beat.numer(),
            self.beat.denom(),
            self.pitch.letter,
            self.pitch.alteration,
            self.pitch.octave
        )
    }
}

/// A sounded event from the performance capture. Immutable once created by the
/// performance parser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceEvent {
    pub track: usize,
    pub channel: u8,
    pub midi_pitch: u8,
    pub velocity: u8,
    /// Start time in seconds, derived from the file's tempo map.
    pub start_time: f64,
    pub end_time: f64,
    pub instrument: Option<String>,
}

impl PerformanceEvent {
    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }

    pub fn evidence_key(&self) -> String {
        format!(
            "track={};channel={};pitch={};t={:.6}",
            self.track, self.channel, self.midi_pitch, self.start_time
        )
    }
}

/// A sustain control-change (MIDI CC64) event, consumed by the pedal module (spec.md §4.A, §4.C).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PedalEvent {
    pub channel: u8,
    pub time: f64,
    pub down: bool,
}
