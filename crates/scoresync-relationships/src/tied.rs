//! Detects runs of tied [`ScoreNote`]s and collapses them into a single
//! [`TiedGroup`] with a proportional timing distribution (spec.md §4.C(i)).

use scoresync_model::{EntryKind, GroupId, RegistryEntry, ScoreNote, TieRole, TiedGroup, TiedMember, UniversalId};
use std::collections::HashMap;

/// A tie-chain candidate: either a matcher-claimed entry, or a tie
/// continuation/stop note the matcher left unmatched (it shares the primary's
/// performance event rather than claiming one of its own; spec.md §4.B
/// edge-case policy).
enum Candidate {
    Matched(RegistryEntry),
    Unmatched(ScoreNote),
}

impl Candidate {
    fn score_note(&self) -> &ScoreNote {
        match self {
            Candidate::Matched(entry) => &entry.score_note,
            Candidate::Unmatched(note) => note,
        }
    }
}

/// Scans `entries` (matched) and `unmatched_notes` (left over by the matcher)
/// for tie chains within the same part/voice and collapses each chain into
/// one [`TiedGroup`]. A chain's primary (tie-start) must be a matched entry,
/// since the group borrows its performance event for timing; a chain whose
/// start note went unmatched cannot be resolved and its notes are reported
/// back as still-unmatched.
///
/// Returns the surviving plain entries, the detected groups, and any score
/// notes that remain unmatched after tie absorption.
pub fn detect_tied_groups(
    entries: Vec<RegistryEntry>,
    unmatched_notes: Vec<ScoreNote>,
) -> (Vec<RegistryEntry>, Vec<TiedGroup>, Vec<ScoreNote>) {
    let mut by_voice: HashMap<(String, u8), Vec<Candidate>> = HashMap::new();
    for entry in entries {
        by_voice
            .entry((entry.score_note.part_id.clone(), entry.score_note.voice))
            .or_default()
            .push(Candidate::Matched(entry));
    }
    for note in unmatched_notes {
        by_voice
            .entry((note.part_id.clone(), note.voice))
            .or_default()
            .push(Candidate::Unmatched(note));
    }

    let mut surviving = Vec::new();
    let mut groups = Vec::new();
    let mut leftover_unmatched = Vec::new();

    for (_, mut voice_candidates) in by_voice {
        voice_candidates.sort_by(|a, b| {
            let (a_note, b_note) = (a.score_note(), b.score_note());
            (a_note.measure, *a_note.beat.numer() * *b_note.beat.denom())
                .cmp(&(b_note.measure, *b_note.beat.numer() * *a_note.beat.denom()))
        });

        let mut i = 0;
        while i < voice_candidates.len() {
            let is_tie_start = matches!(&voice_candidates[i], Candidate::Matched(e) if e.score_note.tie_role == TieRole::Start);
            if is_tie_start {
                let pitch = voice_candidates[i].score_note().pitch.midi_pitch();
                let mut run = vec![i];
                let mut j = i + 1;
                while j < voice_candidates.len() {
                    let note = voice_candidates[j].score_note();
                    if note.pitch.midi_pitch() != pitch {
                        break;
                    }
                    let tie_role = note.tie_role;
                    if !matches!(tie_role, TieRole::Continue | TieRole::Stop) {
                        break;
                    }
                    let was_stop = tie_role == TieRole::Stop;
                    run.push(j);
                    j += 1;
                    if was_stop {
                        break;
                    }
                }

                if run.len() >= 2 {
                    let group = build_group(&voice_candidates, &run);
                    groups.push(group);
                    i = j;
                    continue;
                }
            }

            match &voice_candidates[i] {
                Candidate::Matched(_) => {
                    if let Candidate::Matched(entry) = voice_candidates.remove(i) {
                        surviving.push(entry);
                    }
                    continue;
                }
                Candidate::Unmatched(_) => {
                    if let Candidate::Unmatched(note) = voice_candidates.remove(i) {
                        leftover_unmatched.push(note);
                    }
                    continue;
                }
            }
        }
    }

    (surviving, groups, leftover_unmatched)
}

fn build_group(candidates: &[Candidate], run: &[usize]) -> TiedGroup {
    let primary_entry = match &candidates[run[0]] {
        Candidate::Matched(entry) => entry,
        Candidate::Unmatched(_) => unreachable!("tie-chain primary is always a matched entry"),
    };
    let shared_event = primary_entry
        .performance_event
        .clone()
        .expect("tie-start entries always carry a matched performance event");
    let total_divisions: u32 = run
        .iter()
        .map(|&idx| candidates[idx].score_note().duration_divisions)
        .sum();
    let span = shared_event.end_time - shared_event.start_time;

    let mut members = Vec::new();
    let mut cumulative = 0u32;
    for &idx in run {
        let note = candidates[idx].score_note().clone();
        let fraction = if total_divisions == 0 {
            0.0
        } else {
            cumulative as f64 / total_divisions as f64
        };
        members.push(TiedMember {
            calculated_start_time: shared_event.start_time + fraction * span,
            score_note: note.clone(),
        });
        cumulative += note.duration_divisions;
    }

    let group_id = GroupId::new(&primary_entry.universal_id);
    TiedGroup {
        group_id,
        universal_id: primary_entry.universal_id,
        members,
        shared_performance_event: shared_event.clone(),
        shared_end_time: shared_event.end_time,
    }
}

/// Converts a detected [`TiedGroup`] back into flat [`RegistryEntry`] rows (one
/// `TiedPrimary` plus N-1 `TiedMember` rows), for registry persistence.
pub fn group_to_entries(group: &TiedGroup) -> Vec<RegistryEntry> {
    group
        .members
        .iter()
        .enumerate()
        .map(|(k, member)| RegistryEntry {
            universal_id: if k == 0 {
                group.universal_id
            } else {
                UniversalId::derive(&format!("{}#{}", group.group_id, k), 0)
            },
            kind: if k == 0 {
                EntryKind::TiedPrimary
            } else {
                EntryKind::TiedMember
            },
            score_note: member.score_note.clone(),
            performance_event: if k == 0 {
                Some(group.shared_performance_event.clone())
            } else {
                None
            },
            match_confidence: 1.0,
            match_method: scoresync_model::MatchMethod::Exact,
            tied_group_id: Some(group.group_id.clone()),
            ornament_group_id: None,
        })
        .collect()
}
