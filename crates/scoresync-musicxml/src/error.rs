//! Errors raised while locating, unzipping, or parsing a MusicXML document.

use scoresync_model::error::ComponentError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MusicXmlError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("compressed MusicXML (.mxl) container at {path} has no root file: {reason}")]
    MalformedContainer { path: String, reason: String },

    #[error("XML syntax error at byte {position}: {reason}")]
    Xml { position: usize, reason: String },

    #[error("malformed <{element}> at measure {measure}: {reason}")]
    MalformedElement {
        element: String,
        measure: u32,
        reason: String,
    },
}

impl ComponentError for MusicXmlError {
    fn code(&self) -> &'static str {
        match self {
            MusicXmlError::Io { .. } => "MUSICXML_IO",
            MusicXmlError::MalformedContainer { .. } => "MUSICXML_CONTAINER",
            MusicXmlError::Xml { .. } => "MUSICXML_SYNTAX",
            MusicXmlError::MalformedElement { .. } => "MUSICXML_ELEMENT",
        }
    }

    fn category(&self) -> &'static str {
        "musicxml"
    }
}
