//! Sustain-pedal extension of a performance event's effective sounding duration
//! (spec.md §3.1, §4.C(ii)).

use crate::entities::PedalEvent;
use crate::ids::UniversalId;
use serde::{Deserialize, Serialize};

/// Records that a [`crate::registry_entry::RegistryEntry`]'s audible duration was
/// extended past its raw note-off because the sustain pedal (CC64) was held down.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PedalExtension {
    pub universal_id: UniversalId,
    /// Original note-off time, before extension.
    pub raw_end_time: f64,
    /// Time the pedal was released (or the note's next note-on on the same pitch/channel,
    /// whichever is earlier), becoming the effective end time.
    pub extended_end_time: f64,
    /// `max(0, sustain_on - note_start)`: how far into the note the renderer
    /// should place a synthetic pedal-down control event.
    pub synthetic_on_offset: f64,
    /// `sustain_off - note_start`: where the renderer should place the
    /// matching synthetic pedal-up control event.
    pub synthetic_off_offset: f64,
}

impl PedalExtension {
    /// True iff the pedal actually lengthens the sounding duration.
    pub fn is_effective(&self) -> bool {
        self.extended_end_time > self.raw_end_time
    }

    pub fn extension_seconds(&self) -> f64 {
        (self.extended_end_time - self.raw_end_time).max(0.0)
    }
}

/// Finds the effective end time for a note-off at `raw_end_time` on `channel`,
/// given the full stream of pedal events for that channel, sorted by time.
///
/// A note's sounding is extended to the first pedal-up event at or after
/// `raw_end_time`; if the pedal is already up at `raw_end_time`, there is no
/// extension.
pub fn resolve_extended_end_time(raw_end_time: f64, channel: u8, pedal_events: &[PedalEvent]) -> f64 {
    let mut pedal_down_at_raw_end = false;
    let mut release_after: Option<f64> = None;
    for ev in pedal_events.iter().filter(|e| e.channel == channel) {
        if ev.time <= raw_end_time {
            pedal_down_at_raw_end = ev.down;
        } else if !ev.down && release_after.is_none() {
            release_after = Some(ev.time);
        }
    }
    if pedal_down_at_raw_end {
        release_after.unwrap_or(raw_end_time)
    } else {
        raw_end_time
    }
}

/// Finds the time of the pedal-down event responsible for sustaining a note
/// ending at `raw_end_time`, if the pedal is down at that instant. Mirrors
/// [`resolve_extended_end_time`]'s state-tracking but remembers the time of
/// the down transition rather than just its boolean state.
pub fn active_pedal_on_time(raw_end_time: f64, channel: u8, pedal_events: &[PedalEvent]) -> Option<f64> {
    let mut on_time: Option<f64> = None;
    for ev in pedal_events.iter().filter(|e| e.channel == channel) {
        if ev.time > raw_end_time {
            break;
        }
        on_time = if ev.down { Some(ev.time) } else { None };
    }
    on_time
}
