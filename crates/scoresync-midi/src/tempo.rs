//! Converts delta-time ticks to wall-clock seconds using the file's tempo map
//! (spec.md §4.A: "performance events carry times derived from the file's
//! tempo map, not raw tick counts").

use num_rational::Ratio;

/// One tempo change: `tick` is the absolute tick at which it takes effect,
/// `micros_per_quarter` is the new tempo (MIDI Meta tempo event payload).
#[derive(Debug, Clone, Copy)]
pub struct TempoChange {
    pub tick: u64,
    pub micros_per_quarter: u32,
}

/// Default tempo per the MIDI spec: 120 BPM (500_000 microseconds/quarter).
pub const DEFAULT_MICROS_PER_QUARTER: u32 = 500_000;

/// A sorted, deduplicated tempo map used to convert ticks to seconds.
#[derive(Debug, Clone)]
pub struct TempoMap {
    changes: Vec<TempoChange>,
    ticks_per_quarter: u32,
}

impl TempoMap {
    pub fn new(mut changes: Vec<TempoChange>, ticks_per_quarter: u32) -> Self {
        changes.sort_by_key(|c| c.tick);
        if changes.first().map(|c| c.tick).unwrap_or(1) != 0 {
            changes.insert(
                0,
                TempoChange {
                    tick: 0,
                    micros_per_quarter: DEFAULT_MICROS_PER_QUARTER,
                },
            );
        }
        Self {
            changes,
            ticks_per_quarter: ticks_per_quarter.max(1),
        }
    }

    /// Converts an absolute tick count to seconds by integrating over each
    /// tempo segment up to `tick`.
    pub fn ticks_to_seconds(&self, tick: u64) -> f64 {
        self.seconds_for_tick(tick as f64)
    }

    /// Converts a score note's measure/beat position into a tentative absolute
    /// time in seconds, integrating over the real tempo map rather than
    /// assuming a fixed tempo (spec.md §4.B step 1/2). `beats_per_measure`
    /// counts quarter-note beats, matching this map's quarter-note unit.
    pub fn seconds_for_beat(&self, measure: u32, beat: Ratio<i64>, beats_per_measure: u32) -> f64 {
        let beat_offset = *beat.numer() as f64 / *beat.denom() as f64;
        let quarters = measure.saturating_sub(1) as f64 * beats_per_measure as f64 + beat_offset;
        self.seconds_for_tick(quarters * self.ticks_per_quarter as f64)
    }

    /// Integrates tempo segments up to a (possibly fractional) tick position.
    fn seconds_for_tick(&self, tick: f64) -> f64 {
        let mut seconds = 0.0;
        let mut cursor_tick = 0.0f64;
        let mut cursor_tempo = DEFAULT_MICROS_PER_QUARTER;

        for change in &self.changes {
            let change_tick = change.tick as f64;
            if change_tick >= tick {
                break;
            }
            seconds += self.segment_seconds(cursor_tick, change_tick, cursor_tempo);
            cursor_tick = change_tick;
            cursor_tempo = change.micros_per_quarter;
        }
        seconds += self.segment_seconds(cursor_tick, tick, cursor_tempo);
        seconds
    }

    fn segment_seconds(&self, from_tick: f64, to_tick: f64, micros_per_quarter: u32) -> f64 {
        if to_tick <= from_tick {
            return 0.0;
        }
        let ticks = to_tick - from_tick;
        let quarters = ticks / self.ticks_per_quarter as f64;
        quarters * micros_per_quarter as f64 / 1_000_000.0
    }
}

/// A tempo map with no recorded tempo changes, assuming the MIDI default of
/// 120 BPM throughout. Used where no real performance file is available yet
/// (e.g. a matcher config default).
impl Default for TempoMap {
    fn default() -> Self {
        Self::new(vec![], 480)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_tempo_converts_linearly() {
        let map = TempoMap::new(vec![], 480);
        // 480 ticks = 1 quarter note @ 120bpm = 0.5s
        assert!((map.ticks_to_seconds(480) - 0.5).abs() < 1e-9);
        assert!((map.ticks_to_seconds(960) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn tempo_change_mid_stream_affects_later_ticks_only() {
        let map = TempoMap::new(
            vec![TempoChange {
                tick: 480,
                micros_per_quarter: 1_000_000, // 60 BPM from here on
            }],
            480,
        );
        assert!((map.ticks_to_seconds(480) - 0.5).abs() < 1e-9);
        // next quarter note takes a full second at 60bpm
        assert!((map.ticks_to_seconds(960) - 1.5).abs() < 1e-9);
    }

    #[test]
    fn seconds_for_beat_matches_default_tempo_quarter_beats() {
        let map = TempoMap::default();
        // Measure 3, beat 0, at 4 quarter-beats/measure = 8 quarters = 4s @ 120bpm.
        assert!((map.seconds_for_beat(3, Ratio::new(0, 1), 4) - 4.0).abs() < 1e-9);
    }

    #[test]
    fn seconds_for_beat_respects_a_tempo_change_earlier_in_the_piece() {
        let map = TempoMap::new(
            vec![TempoChange {
                tick: 480,
                micros_per_quarter: 1_000_000, // 60 BPM from the second quarter on
            }],
            480,
        );
        // Measure 2, beat 0 at 4 quarters/measure = 4 quarters in: 1 quarter @120bpm
        // (0.5s) + 3 quarters @ 60bpm (3.0s) = 3.5s.
        assert!((map.seconds_for_beat(2, Ratio::new(0, 1), 4) - 3.5).abs() < 1e-9);
    }
}
