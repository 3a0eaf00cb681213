//! The matched tuple produced by the matcher and refined by the relationship processor.

use crate::entities::{PerformanceEvent, ScoreNote};
use crate::ids::{GroupId, UniversalId};
use serde::{Deserialize, Serialize};

/// Confidence tier assigned by the matcher (spec.md §4.B, GLOSSARY).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchMethod {
    /// Delta-t <= 10ms.
    Exact,
    /// Delta-t <= T_window.
    Fuzzy,
    /// Pitch-only match within T_window, any track.
    Fallback,
}

impl MatchMethod {
    /// Default confidence for this tier, per spec.md §4.B step 3 and §4.B step 4.
    pub fn default_confidence(self) -> f64 {
        match self {
            MatchMethod::Exact => 1.0,
            MatchMethod::Fuzzy => 0.9,
            MatchMethod::Fallback => 0.8,
        }
    }
}

/// Explicit tag distinguishing the role a [`RegistryEntry`] plays, per spec.md §9
/// ("Polymorphism: ... favor explicit tag fields over subtype hierarchies").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryKind {
    /// A plain 1:1 match, no group membership.
    Plain,
    /// The tie-start member of a [`crate::groups::TiedGroup`]; retains the shared performance event.
    TiedPrimary,
    /// A non-primary tied member; does not own a performance event directly.
    TiedMember,
    /// The primary note of an [`crate::groups::OrnamentGroup`].
    OrnamentPrimary,
    /// One expansion performance event within an ornament group.
    OrnamentExpansion,
}

/// The matched tuple: {universal_id, score_note, performance_event, confidence, method, ...}
/// (spec.md §3.1). A plain entry carries `performance_event: Some(..)`; a tied-member entry
/// carries `None` (it shares its group's event, looked up via `tied_group_id`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryEntry {
    pub universal_id: UniversalId,
    pub kind: EntryKind,
    pub score_note: ScoreNote,
    pub performance_event: Option<PerformanceEvent>,
    pub match_confidence: f64,
    pub match_method: MatchMethod,
    pub tied_group_id: Option<GroupId>,
    pub ornament_group_id: Option<GroupId>,
}

impl RegistryEntry {
    pub fn plain(
        universal_id: UniversalId,
        score_note: ScoreNote,
        performance_event: PerformanceEvent,
        match_confidence: f64,
        match_method: MatchMethod,
    ) -> Self {
        Self {
            universal_id,
            kind: EntryKind::Plain,
            score_note,
            performance_event: Some(performance_event),
            match_confidence,
            match_method,
            tied_group_id: None,
            ornament_group_id: None,
        }
    }

    /// A RegistryEntry carries at most one of {tied_group_id, ornament_group_id}
    /// (spec.md §3.2: "mutually exclusive at the entry level").
    pub fn is_structurally_valid(&self) -> bool {
        !(self.tied_group_id.is_some() && self.ornament_group_id.is_some())
            && (0.0..=1.0).contains(&self.match_confidence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{Pitch, TieRole};
    use num_rational::Ratio;

    fn note() -> ScoreNote {
        ScoreNote {
            part_id: "P1".into(),
            voice: 1,
            measure: 1,
            beat: Ratio::new(0, 1),
            pitch: Pitch::new('A', 0, 4),
            duration_divisions: 4,
            tie_role: TieRole::None,
            ornaments: vec![],
        }
    }

    fn event() -> PerformanceEvent {
        PerformanceEvent {
            track: 0,
            channel: 0,
            midi_pitch: 69,
            velocity: 76,
            start_time: 0.0,
            end_time: 0.5,
            instrument: None,
        }
    }

    #[test]
    fn plain_entry_has_no_group_ids() {
        let id = UniversalId::derive("x", 0);
        let entry = RegistryEntry::plain(id, note(), event(), 1.0, MatchMethod::Exact);
        assert!(entry.tied_group_id.is_none());
        assert!(entry.ornament_group_id.is_none());
        assert!(entry.is_structurally_valid());
    }

    #[test]
    fn both_group_ids_is_invalid() {
        let id = UniversalId::derive("x", 0);
        let mut entry = RegistryEntry::plain(id, note(), event(), 1.0, MatchMethod::Exact);
        entry.tied_group_id = Some(GroupId::new(&id));
        entry.ornament_group_id = Some(GroupId::new(&id));
        assert!(!entry.is_structurally_valid());
    }
}
