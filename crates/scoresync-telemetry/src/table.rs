//! In-memory progress table keyed by UniversalID (spec.md §4.G).

use scoresync_model::UniversalId;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageStatus {
    Pending,
    Completed,
    Failed,
    /// A dependency failed and this stage was never attempted (spec.md §4.E:
    /// "dependents cascade to skipped").
    Skipped,
}

#[derive(Debug, Default)]
pub struct ProgressTable {
    known_stages: Vec<String>,
    records: BTreeMap<UniversalId, BTreeMap<String, StageStatus>>,
}

impl ProgressTable {
    pub fn new(known_stages: Vec<String>) -> Self {
        Self {
            known_stages,
            records: BTreeMap::new(),
        }
    }

    /// Registers `id` as pending at every declared stage; a no-op if already registered.
    pub fn register_id(&mut self, id: UniversalId) {
        self.records.entry(id).or_insert_with(|| {
            self.known_stages
                .iter()
                .map(|s| (s.clone(), StageStatus::Pending))
                .collect()
        });
    }

    /// Marks `stage` complete for every id in `ids`, registering any id not yet seen.
    pub fn record_stage_completion(&mut self, stage: &str, ids: &[UniversalId]) {
        for &id in ids {
            self.register_id(id);
            if let Some(stages) = self.records.get_mut(&id) {
                stages.insert(stage.to_string(), StageStatus::Completed);
            }
        }
    }

    /// Marks `stage` failed for every id currently pending at that stage.
    pub fn record_stage_failure(&mut self, stage: &str) {
        for stages in self.records.values_mut() {
            if let Some(status) = stages.get_mut(stage) {
                if *status == StageStatus::Pending {
                    *status = StageStatus::Failed;
                }
            }
        }
    }

    /// Marks `stage` skipped for every id currently pending at that stage: a
    /// non-critical failure upstream cascaded to it (spec.md §4.E).
    pub fn record_stage_skipped(&mut self, stage: &str) {
        for stages in self.records.values_mut() {
            if let Some(status) = stages.get_mut(stage) {
                if *status == StageStatus::Pending {
                    *status = StageStatus::Skipped;
                }
            }
        }
    }

    pub fn audit_trail(&self, id: &UniversalId) -> Option<&BTreeMap<String, StageStatus>> {
        self.records.get(id)
    }

    /// Completed (id, stage) pairs out of all declared pairs, in `[0.0, 1.0]`.
    pub fn completion_percentage(&self) -> f64 {
        let total = self.records.len() * self.known_stages.len();
        if total == 0 {
            return 0.0;
        }
        let completed: usize = self
            .records
            .values()
            .flat_map(|stages| stages.values())
            .filter(|status| **status == StageStatus::Completed)
            .count();
        completed as f64 / total as f64
    }

    /// Per-stage (completed, total) counts.
    pub fn per_stage_counts(&self) -> BTreeMap<String, (usize, usize)> {
        let mut counts: BTreeMap<String, (usize, usize)> = self
            .known_stages
            .iter()
            .map(|s| (s.clone(), (0, 0)))
            .collect();
        for stages in self.records.values() {
            for (stage, status) in stages {
                let entry = counts.entry(stage.clone()).or_insert((0, 0));
                entry.1 += 1;
                if *status == StageStatus::Completed {
                    entry.0 += 1;
                }
            }
        }
        counts
    }

    pub fn known_stages(&self) -> &[String] {
        &self.known_stages
    }

    pub fn id_count(&self) -> usize {
        self.records.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stages() -> Vec<String> {
        vec!["match".into(), "render".into(), "validate".into()]
    }

    #[test]
    fn fresh_id_starts_all_pending() {
        let mut table = ProgressTable::new(stages());
        let id = UniversalId::derive("a", 0);
        table.register_id(id);
        let trail = table.audit_trail(&id).unwrap();
        assert!(trail.values().all(|s| *s == StageStatus::Pending));
    }

    #[test]
    fn completion_percentage_reflects_completed_pairs() {
        let mut table = ProgressTable::new(stages());
        let a = UniversalId::derive("a", 0);
        let b = UniversalId::derive("b", 0);
        table.register_id(a);
        table.register_id(b);
        table.record_stage_completion("match", &[a, b]);
        // 2 of 6 (id,stage) pairs completed.
        assert!((table.completion_percentage() - (2.0 / 6.0)).abs() < 1e-9);
    }

    #[test]
    fn per_stage_counts_track_completed_over_total() {
        let mut table = ProgressTable::new(stages());
        let a = UniversalId::derive("a", 0);
        let b = UniversalId::derive("b", 0);
        table.record_stage_completion("match", &[a, b]);
        table.record_stage_completion("render", &[a]);
        let counts = table.per_stage_counts();
        assert_eq!(counts["match"], (2, 2));
        assert_eq!(counts["render"], (1, 2));
        assert_eq!(counts["validate"], (0, 2));
    }

    #[test]
    fn stage_failure_marks_only_pending_entries() {
        let mut table = ProgressTable::new(stages());
        let a = UniversalId::derive("a", 0);
        let b = UniversalId::derive("b", 0);
        table.record_stage_completion("match", &[a]);
        table.register_id(b);
        table.record_stage_failure("match");
        assert_eq!(table.audit_trail(&a).unwrap()["match"], StageStatus::Completed);
        assert_eq!(table.audit_trail(&b).unwrap()["match"], StageStatus::Failed);
    }

    #[test]
    fn stage_skip_marks_only_pending_entries() {
        let mut table = ProgressTable::new(stages());
        let a = UniversalId::derive("a", 0);
        let b = UniversalId::derive("b", 0);
        table.record_stage_completion("render", &[a]);
        table.register_id(b);
        table.record_stage_skipped("render");
        assert_eq!(table.audit_trail(&a).unwrap()["render"], StageStatus::Completed);
        assert_eq!(table.audit_trail(&b).unwrap()["render"], StageStatus::Skipped);
    }
}
