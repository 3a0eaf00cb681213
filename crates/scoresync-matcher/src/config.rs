//! Matcher tuning knobs (spec.md §4.B).

use scoresync_midi::TempoMap;
use std::collections::HashMap;

/// Configures the matching pass. All fields have defaults drawn from spec.md §4.B.
#[derive(Debug, Clone)]
pub struct MatcherConfig {
    /// Matching window in milliseconds; a candidate further than this from the
    /// tentative score time is never claimed.
    pub t_window_ms: f64,
    /// Delta-t at or below this many milliseconds is an [`scoresync_model::MatchMethod::Exact`]
    /// match rather than [`scoresync_model::MatchMethod::Fuzzy`].
    pub exact_threshold_ms: f64,
    /// Beats assumed per measure when estimating a note's tentative absolute time.
    pub beats_per_measure: u32,
    /// The performance's real tempo map, used to convert a note's measure/beat
    /// position into a tentative absolute time (spec.md §4.B step 1/2). Callers
    /// must thread in the `TempoMap` returned by `scoresync_midi::parse_midi_file`
    /// for the performance being matched; the `Default` here (a flat 120 BPM) is
    /// only a placeholder for tests and tools with no real performance file yet.
    pub tempo_map: TempoMap,
    /// Operator-supplied part_id -> track index overrides, taking precedence over
    /// the automatic name-similarity correspondence (spec.md §4.B).
    pub track_overrides: HashMap<String, usize>,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            t_window_ms: 100.0,
            exact_threshold_ms: 10.0,
            beats_per_measure: 4,
            tempo_map: TempoMap::default(), // flat 120 BPM
            track_overrides: HashMap::new(),
        }
    }
}
