//! Major triads that follow the minute hand in five-minute chord slots

use crate::pitch::{note_to_frequency, transpose};
use crate::position::{ClockTime, TrackingMode, note_position};
use crate::scale::{Note, SCALE_LEN, Scale};

/// Root, major third, perfect fifth
pub const MAJOR_TRIAD: [i32; 3] = [0, 4, 7];

/// Length of one chord slot
pub const CHORD_SLOT_MINUTES: u8 = 5;

/// Frequencies of the major triad rooted at `root` in `octave`
pub fn generate_triad(root: Note, octave: i32) -> [f64; 3] {
    let root_hz = note_to_frequency(root, octave);
    MAJOR_TRIAD.map(|interval| transpose(root_hz, interval as f64))
}

/// Chord slot (0..12) containing `minutes`
pub fn chord_slot(minutes: u8) -> usize {
    (minutes / CHORD_SLOT_MINUTES) as usize % SCALE_LEN
}

/// Root note of a chord slot: the minute hand's note at the slot's first second
pub fn slot_root(time: ClockTime, scale: &Scale, slot: usize) -> Note {
    let at_slot = ClockTime {
        minutes: (slot % SCALE_LEN) as u8 * CHORD_SLOT_MINUTES,
        seconds: 0,
        ..time
    };
    note_position(at_slot, scale, TrackingMode::Minute).current
}

/// The chord for the current slot, the chord for the next slot, and how far
/// the clock has crossed from one to the other
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClockTriad {
    pub slot: usize,
    pub current: [f64; 3],
    pub next: [f64; 3],
    /// Cross-fade position within the slot, in [0, 1)
    pub progress: f64,
}

impl ClockTriad {
    /// Each chord tone blended independently, so voices lead smoothly into
    /// the next chord instead of switching at the slot boundary
    pub fn interpolated(&self) -> [f64; 3] {
        let mut out = [0.0; 3];
        for (i, tone) in out.iter_mut().enumerate() {
            *tone = self.current[i] + (self.next[i] - self.current[i]) * self.progress;
        }
        out
    }
}

pub fn clock_triad(time: ClockTime, octave: i32, scale: &Scale) -> ClockTriad {
    let slot = chord_slot(time.minutes);
    let next_slot = (slot + 1) % SCALE_LEN;
    let within = (time.minutes % CHORD_SLOT_MINUTES) as f64 + time.seconds as f64 / 60.0;
    ClockTriad {
        slot,
        current: generate_triad(slot_root(time, scale, slot), octave),
        next: generate_triad(slot_root(time, scale, next_slot), octave),
        progress: within / CHORD_SLOT_MINUTES as f64,
    }
}
