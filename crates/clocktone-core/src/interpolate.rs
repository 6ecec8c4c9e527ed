//! Frequency interpolation between scale slots
//!
//! Blends are linear in Hz, not in pitch, so the perceived glide rate is
//! slightly uneven across a slot.

use crate::pitch::{note_to_frequency, transpose};
use crate::position::{ClockTime, TrackingMode, note_position};
use crate::scale::{Note, Scale};

/// Octave used for voices following the hour hand
pub const HOUR_OCTAVE: i32 = 2;
/// Octave used for voices following the minute hand
pub const MINUTE_OCTAVE: i32 = 3;

/// Linear blend between two notes in `octave`
pub fn interpolate_note_frequency(current: Note, next: Note, progress: f64, octave: i32) -> f64 {
    let f0 = note_to_frequency(current, octave);
    let f1 = note_to_frequency(next, octave);
    f0 + (f1 - f0) * progress
}

/// Linear blend using `seconds / 60` as the fraction
pub fn seconds_interpolated_frequency(from_hz: f64, to_hz: f64, seconds: f64) -> f64 {
    let fraction = seconds / 60.0;
    from_hz + (to_hz - from_hz) * fraction
}

/// Frequency of a clock hand at `time`
pub fn clock_frequency(time: ClockTime, octave: i32, scale: &Scale, mode: TrackingMode) -> f64 {
    let pos = note_position(time, scale, mode);
    interpolate_note_frequency(pos.current, pos.next, pos.progress, octave)
}

/// Target frequency for a voice, including its harmonic transposition.
///
/// Minute voices glide across each minute from the `m:00` target towards
/// the `m+1:00` target instead of stepping on the minute boundary.
pub fn voice_frequency(
    time: ClockTime,
    scale: &Scale,
    mode: TrackingMode,
    harmonic_interval: i32,
) -> f64 {
    let base = match mode {
        TrackingMode::Hour => clock_frequency(time, HOUR_OCTAVE, scale, TrackingMode::Hour),
        TrackingMode::Minute => {
            let this_minute = ClockTime { seconds: 0, ..time };
            let next_minute = ClockTime {
                minutes: (time.minutes % 60 + 1) % 60,
                seconds: 0,
                ..time
            };
            let from = clock_frequency(this_minute, MINUTE_OCTAVE, scale, TrackingMode::Minute);
            let to = clock_frequency(next_minute, MINUTE_OCTAVE, scale, TrackingMode::Minute);
            seconds_interpolated_frequency(from, to, time.seconds as f64)
        }
    };
    transpose(base, harmonic_interval as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scale::CHROMATIC;

    #[test]
    fn test_self_interpolation_is_identity() {
        for note in CHROMATIC {
            for progress in [0.0, 0.25, 0.5, 0.99] {
                let f = interpolate_note_frequency(note, note, progress, 3);
                assert_eq!(f, note_to_frequency(note, 3));
            }
        }
    }

    #[test]
    fn test_interpolation_is_linear_in_hz() {
        let mid = interpolate_note_frequency(Note::A, Note::ASharp, 0.5, 4);
        let expected = (note_to_frequency(Note::A, 4) + note_to_frequency(Note::ASharp, 4)) / 2.0;
        assert!((mid - expected).abs() < 1e-9);
    }

    #[test]
    fn test_seconds_interpolation() {
        assert_eq!(seconds_interpolated_frequency(100.0, 200.0, 0.0), 100.0);
        assert_eq!(seconds_interpolated_frequency(100.0, 200.0, 30.0), 150.0);
        assert_eq!(seconds_interpolated_frequency(200.0, 100.0, 45.0), 125.0);
    }

    #[test]
    fn test_clock_frequency_on_slot() {
        let scale = Scale::default();
        let f = clock_frequency(ClockTime::new(3, 0, 0), 2, &scale, TrackingMode::Hour);
        assert!((f - note_to_frequency(scale.note(3), 2)).abs() < 1e-9);
    }

    #[test]
    fn test_voice_frequency_hour_and_transposition() {
        let scale = Scale::default();
        let time = ClockTime::new(4, 0, 0);
        let root = voice_frequency(time, &scale, TrackingMode::Hour, 0);
        assert!((root - note_to_frequency(scale.note(4), HOUR_OCTAVE)).abs() < 1e-9);
        let octave_up = voice_frequency(time, &scale, TrackingMode::Hour, 12);
        assert!((octave_up - root * 2.0).abs() < 1e-9);
        let fifth = voice_frequency(time, &scale, TrackingMode::Hour, 7);
        assert!((fifth - transpose(root, 7.0)).abs() < 1e-9);
    }

    #[test]
    fn test_voice_frequency_minute_glides_through_the_minute() {
        let scale = Scale::default();
        let start = voice_frequency(ClockTime::new(0, 10, 0), &scale, TrackingMode::Minute, 0);
        let middle = voice_frequency(ClockTime::new(0, 10, 30), &scale, TrackingMode::Minute, 0);
        let end = voice_frequency(ClockTime::new(0, 11, 0), &scale, TrackingMode::Minute, 0);
        assert!((start - note_to_frequency(scale.note(2), MINUTE_OCTAVE)).abs() < 1e-9);
        assert!((middle - (start + end) / 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_voice_frequency_minute_wraps_at_the_hour() {
        let scale = Scale::default();
        let last = voice_frequency(ClockTime::new(5, 59, 59), &scale, TrackingMode::Minute, 0);
        let top = note_to_frequency(scale.note(0), MINUTE_OCTAVE);
        let prev = note_to_frequency(scale.note(11), MINUTE_OCTAVE);
        let (lo, hi) = if top < prev { (top, prev) } else { (prev, top) };
        assert!(last >= lo && last <= hi);
    }

    #[test]
    fn test_voice_frequency_unreduced_minutes() {
        let scale = Scale::default();
        let odd = ClockTime { hours: 0, minutes: 255, seconds: 0 };
        let hz = voice_frequency(odd, &scale, TrackingMode::Minute, 0);
        assert!(hz.is_finite() && hz > 0.0);
        let wrapped = voice_frequency(ClockTime::new(0, 15, 0), &scale, TrackingMode::Minute, 0);
        assert!((hz - wrapped).abs() < 1e-9);
    }
}
