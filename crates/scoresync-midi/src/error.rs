//! Errors raised while reading or walking a standard MIDI file.

use scoresync_model::error::ComponentError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MidiError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse {path} as a standard MIDI file: {reason}")]
    Smf { path: String, reason: String },

    #[error("track {track} has a note-off for pitch {pitch} on channel {channel} with no matching note-on")]
    UnmatchedNoteOff {
        track: usize,
        channel: u8,
        pitch: u8,
    },
}

impl ComponentError for MidiError {
    fn code(&self) -> &'static str {
        match self {
            MidiError::Io { .. } => "MIDI_IO",
            MidiError::Smf { .. } => "MIDI_SMF",
            MidiError::UnmatchedNoteOff { .. } => "MIDI_UNMATCHED_NOTE_OFF",
        }
    }

    fn category(&self) -> &'static str {
        "midi"
    }
}
