//! Tied-note and ornament relationship groups (spec.md §3.1, §4.C).

use crate::entities::{OrnamentKind, PerformanceEvent, ScoreNote};
use crate::ids::{GroupId, UniversalId};
use serde::{Deserialize, Serialize};

/// A single member of a [`TiedGroup`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TiedMember {
    pub score_note: ScoreNote,
    pub calculated_start_time: f64,
}

/// An ordered sequence of tied [`ScoreNote`]s (>= 2) sharing one [`PerformanceEvent`]
/// (spec.md §3.1). Invariant: the primary's `calculated_start_time` equals the
/// performance event's start time; subsequent members' start times are strictly
/// increasing and strictly less than `shared_end_time`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TiedGroup {
    pub group_id: GroupId,
    pub universal_id: UniversalId,
    pub members: Vec<TiedMember>,
    pub shared_performance_event: PerformanceEvent,
    pub shared_end_time: f64,
}

impl TiedGroup {
    pub fn primary(&self) -> &TiedMember {
        &self.members[0]
    }

    /// Checks the timing invariant from spec.md §3.1 / testable property 2.
    pub fn timing_is_valid(&self) -> bool {
        if self.members.is_empty() {
            return false;
        }
        if (self.primary().calculated_start_time - self.shared_performance_event.start_time).abs()
            > 1e-9
        {
            return false;
        }
        for pair in self.members.windows(2) {
            if pair[1].calculated_start_time <= pair[0].calculated_start_time {
                return false;
            }
        }
        self.members
            .last()
            .map(|m| m.calculated_start_time < self.shared_end_time)
            .unwrap_or(false)
    }
}

/// How an ornament group's expansion events drive downstream animation (spec.md §3.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnimationStrategy {
    Cumulative,
    Distributed,
    PrimaryOnly,
}

impl Default for AnimationStrategy {
    fn default() -> Self {
        // Per spec.md §9 Open Questions: the source consistently defaults to cumulative.
        AnimationStrategy::Cumulative
    }
}

/// One primary [`ScoreNote`] plus zero-or-more grace notes mapped to N performance
/// events (spec.md §3.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrnamentGroup {
    pub group_id: GroupId,
    pub universal_id: UniversalId,
    pub ornament_kind: OrnamentKind,
    pub primary_note: ScoreNote,
    pub grace_notes: Vec<ScoreNote>,
    /// Performance events in cluster order; sub-IDs are derived positionally via
    /// [`GroupId::expansion_sub_id`].
    pub expansion_events: Vec<PerformanceEvent>,
    pub animation_strategy: AnimationStrategy,
    pub match_confidence: f64,
}

impl OrnamentGroup {
    /// The sub-ID for the k-th expansion event.
    pub fn sub_id(&self, k: usize) -> String {
        self.group_id.expansion_sub_id(k)
    }

    pub fn expansion_count(&self) -> usize {
        self.expansion_events.len()
    }
}
