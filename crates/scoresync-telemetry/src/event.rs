//! Newline-delimited structured event records (spec.md §4.G: "no lossy aggregation").

use scoresync_model::UniversalId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TelemetryEvent {
    /// A single ID completed a single stage.
    StageCompleted {
        universal_id: UniversalId,
        stage: String,
    },
    /// A stage serviced a whole batch of IDs at once (the common case: an
    /// executor reports everything it touched in one manifest).
    StageBatchCompleted {
        stage: String,
        universal_ids: Vec<UniversalId>,
    },
    StageFailed { stage: String, reason: String },
    /// A non-critical ancestor failed and this stage was never attempted
    /// (spec.md §4.E: dependents cascade to skipped).
    StageSkipped { stage: String },
}

/// Serializes one event as a single JSON line, as the on-disk telemetry
/// stream expects (spec.md §4.G).
pub fn to_ndjson_line(event: &TelemetryEvent) -> serde_json::Result<String> {
    serde_json::to_string(event)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_completed_serializes_as_one_line() {
        let event = TelemetryEvent::StageCompleted {
            universal_id: UniversalId::derive("evidence", 0),
            stage: "match".to_string(),
        };
        let line = to_ndjson_line(&event).unwrap();
        assert!(!line.contains('\n'));
        assert!(line.contains("\"kind\":\"stage_completed\""));
    }

    #[test]
    fn stage_skipped_serializes_as_one_line() {
        let event = TelemetryEvent::StageSkipped {
            stage: "render_audio".to_string(),
        };
        let line = to_ndjson_line(&event).unwrap();
        assert!(!line.contains('\n'));
        assert!(line.contains("\"kind\":\"stage_skipped\""));
    }
}
