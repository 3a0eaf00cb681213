//! MusicXML score parser: walks parts, measures, and notes in document order
//! and produces scoresync's canonical [`scoresync_model::ScoreNote`] stream.
//!
//! Accepts both uncompressed `.musicxml`/`.xml` files and compressed `.mxl`
//! containers (spec.md §4.A, §6.1).

pub mod container;
pub mod diagnostics;
pub mod error;
pub mod parser;

pub use diagnostics::{ParseDiagnostics, ParseWarning};
pub use error::MusicXmlError;

use scoresync_model::ScoreNote;
use std::path::Path;

/// Parses a score file at `path`, transparently handling `.mxl` compression.
pub fn parse_score_file(
    path: &Path,
) -> Result<(Vec<ScoreNote>, ParseDiagnostics), MusicXmlError> {
    let bytes = container::read_score_bytes(path)?;
    parser::parse_document(&bytes)
}
