//! Standard MIDI file parser: walks tracks with a tempo-aware clock and
//! produces scoresync's canonical [`scoresync_model::PerformanceEvent`] and
//! [`scoresync_model::PedalEvent`] streams (spec.md §4.A).

pub mod diagnostics;
pub mod error;
pub mod parser;
pub mod tempo;

pub use diagnostics::{ParseDiagnostics, ParseWarning};
pub use error::MidiError;
pub use tempo::TempoMap;

use scoresync_model::{PedalEvent, PerformanceEvent};
use std::path::Path;

/// Parses a standard MIDI file at `path`. Returns the tempo map alongside the
/// event streams so callers (the matcher) can derive tentative score times
/// from the file's real tempo rather than assuming a fixed one.
pub fn parse_midi_file(
    path: &Path,
) -> Result<(Vec<PerformanceEvent>, Vec<PedalEvent>, TempoMap, ParseDiagnostics), MidiError> {
    let bytes = std::fs::read(path).map_err(|source| MidiError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parser::parse_bytes(&bytes).map_err(|err| match err {
        MidiError::Smf { reason, .. } => MidiError::Smf {
            path: path.display().to_string(),
            reason,
        },
        other => other,
    })
}
