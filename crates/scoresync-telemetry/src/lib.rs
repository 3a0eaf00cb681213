//! Per-UniversalID progress tracking and the newline-delimited telemetry
//! stream (spec.md §4.G).

pub mod event;
pub mod table;
pub mod writer;

pub use event::TelemetryEvent;
pub use table::{ProgressTable, StageStatus};
pub use writer::TelemetryWriter;
