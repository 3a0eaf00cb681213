//! Infers which performance track(s) a score part's notes are likely to land
//! in, by comparing part IDs against MIDI track/instrument names (spec.md §4.B:
//! "part/track correspondence, with an operator override").

use std::collections::HashMap;

/// Maps a score `part_id` to the performance track indices worth searching
/// first. An empty candidate list means "search every track" (no confident
/// correspondence could be inferred).
pub struct TrackCorrespondence {
    candidates: HashMap<String, Vec<usize>>,
}

impl TrackCorrespondence {
    /// Builds a correspondence from normalized name similarity, then applies
    /// `overrides` on top (an override always wins, even with score 0).
    pub fn infer(
        part_ids: &[String],
        track_names: &HashMap<usize, String>,
        overrides: &HashMap<String, usize>,
    ) -> Self {
        let mut candidates = HashMap::new();
        for part_id in part_ids {
            if let Some(&track) = overrides.get(part_id) {
                candidates.insert(part_id.clone(), vec![track]);
                continue;
            }
            let mut scored: Vec<(usize, f64)> = track_names
                .iter()
                .map(|(&track, name)| (track, name_similarity(part_id, name)))
                .filter(|(_, score)| *score > 0.0)
                .collect();
            scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap());
            candidates.insert(part_id.clone(), scored.into_iter().map(|(t, _)| t).collect());
        }
        Self { candidates }
    }

    /// Candidate tracks for `part_id`, or `None` if no correspondence could be
    /// inferred (the caller should then search every track).
    pub fn candidates_for(&self, part_id: &str) -> Option<&[usize]> {
        self.candidates
            .get(part_id)
            .filter(|v| !v.is_empty())
            .map(Vec::as_slice)
    }
}

fn normalize(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(|c| c.to_lowercase())
        .collect()
}

/// A cheap substring/containment similarity score in `[0, 1]`; exact match scores
/// 1.0, a containment match scores proportional to the shorter string's coverage,
/// and disjoint names score 0.
fn name_similarity(part_id: &str, track_name: &str) -> f64 {
    let a = normalize(part_id);
    let b = normalize(track_name);
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }
    if b.contains(&a) || a.contains(&b) {
        return a.len().min(b.len()) as f64 / a.len().max(b.len()) as f64;
    }
    0.0
}
