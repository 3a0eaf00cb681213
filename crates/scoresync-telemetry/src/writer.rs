//! Appends [`TelemetryEvent`]s to a newline-delimited JSON file.

use crate::event::{to_ndjson_line, TelemetryEvent};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

pub struct TelemetryWriter {
    out: BufWriter<File>,
}

impl TelemetryWriter {
    pub fn create(path: &Path) -> std::io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            out: BufWriter::new(file),
        })
    }

    pub fn append(&mut self, event: &TelemetryEvent) -> std::io::Result<()> {
        let line = to_ndjson_line(event).map_err(std::io::Error::other)?;
        self.out.write_all(line.as_bytes())?;
        self.out.write_all(b"\n")?;
        self.out.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scoresync_model::UniversalId;

    #[test]
    fn appended_events_are_one_json_object_per_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("telemetry.ndjson");
        let mut writer = TelemetryWriter::create(&path).unwrap();
        writer
            .append(&TelemetryEvent::StageBatchCompleted {
                stage: "match".into(),
                universal_ids: vec![UniversalId::derive("a", 0)],
            })
            .unwrap();
        writer
            .append(&TelemetryEvent::StageFailed {
                stage: "render".into(),
                reason: "timeout".into(),
            })
            .unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        for line in lines {
            assert!(serde_json::from_str::<TelemetryEvent>(line).is_ok());
        }
    }
}
