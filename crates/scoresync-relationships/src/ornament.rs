//! Detects ornament expansions: a single annotated score note realized as a
//! cluster of several rapid performance events (spec.md §4.C(ii)).
//!
//! Two detection paths feed the same fusion score:
//! - score-side: the note carries an [`scoresync_model::OrnamentAnnotation`];
//!   the nearby orphan cluster is reconciled against it (this module's
//!   `try_detect_ornament`).
//! - performance-side: a tight cluster of otherwise-orphaned events bracketed
//!   by two already-matched anchor notes, classified by pitch pattern alone,
//!   with no score annotation required (`classify_orphan_cluster` /
//!   `detect_performance_side_ornaments`).
//!
//! Fusion weights (spec.md §4.C): 0.3 kind-compatibility, 0.4 time proximity,
//! 0.2 pitch agreement of the primary, 0.1 duration-vs-expected-cardinality;
//! accepted at score >= 0.7, rejected cases fall through to 1:1 treatment.

use scoresync_model::{
    AnimationStrategy, GroupId, OrnamentGroup, OrnamentKind, PerformanceEvent, RegistryEntry,
    UniversalId,
};
use std::collections::HashSet;

pub const FUSION_THRESHOLD: f64 = 0.7;
/// Cross-source timing-proximity window: |t_score - t_cluster| within 2s (spec.md §4.C).
const CLUSTER_WINDOW_S: f64 = 2.0;

/// Alternation gap ceiling for the trill/tremolo performance-side rule.
const ALTERNATION_GAP_S: f64 = 0.100;
/// Total span ceiling for the mordent (A-B-A) performance-side rule.
const MORDENT_SPAN_S: f64 = 0.300;
/// Duration ceiling for a performance-side grace-note candidate.
const GRACE_DURATION_S: f64 = 0.100;

#[derive(Debug, Clone, Copy)]
pub struct FusionComponents {
    /// Type match between the score kind and the performance-classified kind,
    /// or an explicit trill<->tremolo fallback (0.3 weight).
    pub kind_compatibility: f64,
    pub time_proximity: f64,
    /// Pitch agreement of the primary against the cluster's pitch shape (0.2 weight).
    pub pitch_pattern_match: f64,
    /// How closely the cluster's actual length matches the kind's expected
    /// cardinality (0.1 weight).
    pub duration_vs_cardinality: f64,
}

impl FusionComponents {
    pub fn score(&self) -> f64 {
        0.3 * self.kind_compatibility
            + 0.4 * self.time_proximity
            + 0.2 * self.pitch_pattern_match
            + 0.1 * self.duration_vs_cardinality
    }
}

/// Finds the contiguous run of `orphans` (sorted by start time) within
/// [`CLUSTER_WINDOW_S`] of `anchor_time`, for candidate cardinality `expected`.
fn cluster_candidates(
    orphans: &[PerformanceEvent],
    anchor_time: f64,
    expected: std::ops::RangeInclusive<usize>,
) -> Option<Vec<usize>> {
    let mut nearby: Vec<usize> = orphans
        .iter()
        .enumerate()
        .filter(|(_, e)| (e.start_time - anchor_time).abs() <= CLUSTER_WINDOW_S)
        .map(|(i, _)| i)
        .collect();
    nearby.sort_by(|&a, &b| orphans[a].start_time.partial_cmp(&orphans[b].start_time).unwrap());

    if expected.contains(&nearby.len()) {
        return Some(nearby);
    }
    // Take the densest prefix matching the expected cardinality, if the cluster
    // is longer than expected (extra orphans belong to later material).
    let min = *expected.start();
    if nearby.len() >= min {
        nearby.truncate(*expected.end());
        if expected.contains(&nearby.len()) {
            return Some(nearby);
        }
    }
    None
}

fn time_proximity_score(cluster: &[PerformanceEvent], anchor_time: f64) -> f64 {
    let Some(first) = cluster.first() else {
        return 0.0;
    };
    let gap = (first.start_time - anchor_time).abs();
    (1.0 - (gap / CLUSTER_WINDOW_S)).clamp(0.0, 1.0)
}

/// Trills/mordents/turns alternate between (at most) two neighboring pitch
/// classes; a perfect alternation scores 1.0, a monotone run scores 0.0.
fn pitch_pattern_score(cluster: &[PerformanceEvent], kind: &OrnamentKind) -> f64 {
    if cluster.len() < 2 {
        return if matches!(kind, OrnamentKind::Grace { .. }) {
            1.0
        } else {
            0.0
        };
    }
    let distinct_pitches: HashSet<u8> = cluster.iter().map(|e| e.midi_pitch).collect();
    match kind {
        OrnamentKind::Trill | OrnamentKind::Mordent | OrnamentKind::InvertedMordent => {
            if distinct_pitches.len() == 2 {
                1.0
            } else if distinct_pitches.len() <= 3 {
                0.6
            } else {
                0.2
            }
        }
        OrnamentKind::Turn => {
            if (3..=4).contains(&distinct_pitches.len()) {
                1.0
            } else {
                0.4
            }
        }
        OrnamentKind::Tremolo { .. } => {
            if distinct_pitches.len() == 1 {
                1.0
            } else {
                0.3
            }
        }
        OrnamentKind::Grace { .. } => 1.0,
    }
}

/// Scores how closely `actual` falls inside `expected`, 1.0 when inside the
/// range and decaying with distance from its nearer edge otherwise.
fn cardinality_fit_score(actual: usize, expected: &std::ops::RangeInclusive<usize>) -> f64 {
    if expected.contains(&actual) {
        return 1.0;
    }
    let edge = if actual < *expected.start() {
        *expected.start()
    } else {
        *expected.end()
    };
    let distance = actual.abs_diff(edge) as f64;
    (1.0 - distance / edge.max(1) as f64).clamp(0.0, 1.0)
}

/// Same kind family counts as a full match; a trill<->tremolo mixup is the
/// one explicit cross-kind fallback the spec allows. An unclassifiable
/// cluster (no pitch-pattern match at all) gets half credit rather than 0,
/// since the absence of a counter-classification isn't evidence of mismatch.
fn kind_compatibility_score(score_kind: &OrnamentKind, classified: Option<&OrnamentKind>) -> f64 {
    use std::mem::discriminant;
    match classified {
        None => 0.5,
        Some(k) if discriminant(k) == discriminant(score_kind) => 1.0,
        Some(OrnamentKind::Tremolo { .. }) if matches!(score_kind, OrnamentKind::Trill) => 1.0,
        Some(OrnamentKind::Trill) if matches!(score_kind, OrnamentKind::Tremolo { .. }) => 1.0,
        Some(_) => 0.0,
    }
}

fn is_strict_alternation(pitches: &[u8]) -> bool {
    pitches.windows(2).all(|w| w[0] != w[1])
}

/// The smallest beam count whose tremolo cardinality (2^beam_count) covers `count`.
fn beam_count_for(count: usize) -> u8 {
    let mut n: u8 = 1;
    while (1usize << n) < count {
        n += 1;
    }
    n
}

/// Classifies an orphan cluster by pitch pattern alone, independent of any
/// score-side annotation (spec.md §4.C(ii), performance-side path):
/// - same-pitch repetition -> tremolo
/// - two-pitch strict alternation, gap <= 100ms, count >= 4 -> trill (small
///   interval) or tremolo (large interval)
/// - exactly 3 events in an A-B-A pattern, span <= 300ms -> mordent
/// - exactly 4 events over 3 unique pitches -> turn
/// - 1-2 very short (<= 100ms) events -> grace
pub fn classify_orphan_cluster(cluster: &[PerformanceEvent]) -> Option<OrnamentKind> {
    if cluster.is_empty() {
        return None;
    }
    let pitches: Vec<u8> = cluster.iter().map(|e| e.midi_pitch).collect();

    if (1..=2).contains(&cluster.len()) && cluster.iter().all(|e| e.duration() <= GRACE_DURATION_S)
    {
        return Some(OrnamentKind::Grace {
            acciaccatura: cluster.len() == 1,
        });
    }
    if cluster.len() < 2 {
        return None;
    }

    let span = cluster.last().unwrap().start_time - cluster.first().unwrap().start_time;
    let max_gap = cluster
        .windows(2)
        .map(|w| w[1].start_time - w[0].start_time)
        .fold(0.0_f64, f64::max);
    let distinct: HashSet<u8> = pitches.iter().copied().collect();

    if distinct.len() == 1 {
        return Some(OrnamentKind::Tremolo {
            beam_count: beam_count_for(cluster.len()),
        });
    }

    if distinct.len() == 2
        && cluster.len() >= 4
        && max_gap <= ALTERNATION_GAP_S
        && is_strict_alternation(&pitches)
    {
        let mut sorted: Vec<u8> = distinct.iter().copied().collect();
        sorted.sort_unstable();
        let interval = sorted[1].abs_diff(sorted[0]);
        return Some(if interval <= 2 {
            OrnamentKind::Trill
        } else {
            OrnamentKind::Tremolo {
                beam_count: beam_count_for(cluster.len()),
            }
        });
    }

    if cluster.len() == 3 && span <= MORDENT_SPAN_S && pitches[0] == pitches[2] && pitches[0] != pitches[1]
    {
        return Some(OrnamentKind::Mordent);
    }

    if cluster.len() == 4 && distinct.len() == 3 {
        return Some(OrnamentKind::Turn);
    }

    None
}

/// Attempts to build an [`OrnamentGroup`] for `entry`, consuming orphan events
/// it claims (marking them `Some` -> taken by setting their slot to `None` via
/// the returned claimed-index list).
pub fn try_detect_ornament(
    entry: &RegistryEntry,
    orphans: &[PerformanceEvent],
) -> Option<(OrnamentGroup, Vec<usize>)> {
    let annotation = entry.score_note.ornaments.first()?;
    let anchor = entry.performance_event.as_ref()?.start_time;
    let expected = annotation.kind.expected_cardinality();

    let claimed_indices = cluster_candidates(orphans, anchor, expected.clone())?;
    let cluster: Vec<PerformanceEvent> = claimed_indices.iter().map(|&i| orphans[i].clone()).collect();
    let classified = classify_orphan_cluster(&cluster);

    let components = FusionComponents {
        kind_compatibility: kind_compatibility_score(&annotation.kind, classified.as_ref()),
        time_proximity: time_proximity_score(&cluster, anchor),
        pitch_pattern_match: pitch_pattern_score(&cluster, &annotation.kind),
        duration_vs_cardinality: cardinality_fit_score(cluster.len(), &expected),
    };
    let score = components.score();
    if score < FUSION_THRESHOLD {
        return None;
    }

    let group_id = GroupId::new(&entry.universal_id);
    let group = OrnamentGroup {
        group_id,
        universal_id: entry.universal_id,
        ornament_kind: annotation.kind.clone(),
        primary_note: entry.score_note.clone(),
        grace_notes: Vec::new(),
        expansion_events: cluster,
        animation_strategy: AnimationStrategy::default(),
        match_confidence: score,
    };
    Some((group, claimed_indices))
}

/// Detects ornaments purely from the performance side: a tight cluster of
/// otherwise-orphaned events bracketed by two already-matched anchor notes,
/// with no requirement that either score note carry an ornament annotation
/// (spec.md §4.C(ii)). `entries` must already be claimed (have a performance
/// event); unclaimed clusters consumed here are returned by index into
/// `orphans` so the caller can remove them.
pub fn detect_performance_side_ornaments(
    entries: &[RegistryEntry],
    orphans: &[PerformanceEvent],
) -> Vec<(OrnamentGroup, Vec<usize>)> {
    let mut anchors: Vec<&RegistryEntry> = entries
        .iter()
        .filter(|e| e.performance_event.is_some())
        .collect();
    anchors.sort_by(|a, b| {
        a.performance_event
            .as_ref()
            .unwrap()
            .start_time
            .partial_cmp(&b.performance_event.as_ref().unwrap().start_time)
            .unwrap()
    });

    let mut results = Vec::new();
    let mut claimed_globally: HashSet<usize> = HashSet::new();

    for pair in anchors.windows(2) {
        let before = pair[0].performance_event.as_ref().unwrap();
        let after = pair[1].performance_event.as_ref().unwrap();
        if after.start_time <= before.end_time {
            continue;
        }

        let mut indices: Vec<usize> = orphans
            .iter()
            .enumerate()
            .filter(|(i, e)| {
                !claimed_globally.contains(i)
                    && e.start_time >= before.end_time
                    && e.start_time < after.start_time
            })
            .map(|(i, _)| i)
            .collect();
        indices.sort_by(|&a, &b| orphans[a].start_time.partial_cmp(&orphans[b].start_time).unwrap());
        if indices.is_empty() {
            continue;
        }

        let cluster: Vec<PerformanceEvent> = indices.iter().map(|&i| orphans[i].clone()).collect();
        let Some(kind) = classify_orphan_cluster(&cluster) else {
            continue;
        };

        // Grace notes ornament the note they precede; every other kind
        // ornaments the note it follows.
        let primary_entry = if matches!(kind, OrnamentKind::Grace { .. }) {
            pair[1]
        } else {
            pair[0]
        };
        let anchor_time = primary_entry.performance_event.as_ref().unwrap().start_time;
        let expected = kind.expected_cardinality();

        let components = FusionComponents {
            // Classified directly from this cluster: trivially self-consistent.
            kind_compatibility: 1.0,
            time_proximity: time_proximity_score(&cluster, anchor_time),
            pitch_pattern_match: pitch_pattern_score(&cluster, &kind),
            duration_vs_cardinality: cardinality_fit_score(cluster.len(), &expected),
        };
        let score = components.score();
        if score < FUSION_THRESHOLD {
            continue;
        }

        let group_id = GroupId::new(&primary_entry.universal_id);
        let group = OrnamentGroup {
            group_id,
            universal_id: primary_entry.universal_id,
            ornament_kind: kind,
            primary_note: primary_entry.score_note.clone(),
            grace_notes: Vec::new(),
            expansion_events: cluster,
            animation_strategy: AnimationStrategy::default(),
            match_confidence: score,
        };

        for &i in &indices {
            claimed_globally.insert(i);
        }
        results.push((group, indices));
    }

    results
}

/// Converts an [`OrnamentGroup`] into its flat registry rows: one
/// `OrnamentPrimary` plus one `OrnamentExpansion` per expansion event, each
/// addressed by `{group_id}_expansion_{k}` (spec.md §3.2).
pub fn group_to_entries(group: &OrnamentGroup) -> Vec<RegistryEntry> {
    let mut rows = vec![RegistryEntry {
        universal_id: group.universal_id,
        kind: scoresync_model::EntryKind::OrnamentPrimary,
        score_note: group.primary_note.clone(),
        performance_event: group.expansion_events.first().cloned(),
        match_confidence: group.match_confidence,
        match_method: scoresync_model::MatchMethod::Fuzzy,
        tied_group_id: None,
        ornament_group_id: Some(group.group_id.clone()),
    }];
    for (k, event) in group.expansion_events.iter().enumerate() {
        let sub_id = group.sub_id(k);
        rows.push(RegistryEntry {
            // The sub-ID string (`{group}_expansion_{k}`) is the artifact-facing
            // address; the UniversalId is re-derived from it so the type stays
            // uniform across every RegistryEntry.
            universal_id: UniversalId::derive(&sub_id, 0),
            kind: scoresync_model::EntryKind::OrnamentExpansion,
            score_note: group.primary_note.clone(),
            performance_event: Some(event.clone()),
            match_confidence: group.match_confidence,
            match_method: scoresync_model::MatchMethod::Fuzzy,
            tied_group_id: None,
            ornament_group_id: Some(group.group_id.clone()),
        });
    }
    rows
}
