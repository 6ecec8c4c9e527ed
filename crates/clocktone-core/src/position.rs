//! Clock readings and their position in scale space

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::scale::{Note, SCALE_LEN, Scale};

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

/// Which clock hand a voice follows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackingMode {
    /// One trip around the scale every 12 hours
    #[default]
    Hour,
    /// One trip around the scale every 60 minutes
    Minute,
}

impl TrackingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hour => "hour",
            Self::Minute => "minute",
        }
    }
}

impl fmt::Display for TrackingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TrackingMode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hour" => Ok(Self::Hour),
            "minute" => Ok(Self::Minute),
            _ => Err(CoreError::UnknownTrackingMode(s.to_string())),
        }
    }
}

/// A 12-hour clock reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ClockTime {
    /// 0..=11
    pub hours: u8,
    /// 0..=59
    pub minutes: u8,
    /// 0..=59
    pub seconds: u8,
}

impl ClockTime {
    /// Build a reading, reducing hours to the 12-hour cycle and wrapping
    /// minutes/seconds into range.
    pub fn new(hours: u8, minutes: u8, seconds: u8) -> Self {
        Self {
            hours: hours % 12,
            minutes: minutes % 60,
            seconds: seconds % 60,
        }
    }

    /// Wall-clock reading for a Unix timestamp shifted by a fixed UTC offset
    pub fn from_unix_seconds(unix_seconds: i64, utc_offset_hours: f64) -> Self {
        let offset = if utc_offset_hours.is_finite() {
            ((utc_offset_hours * 3600.0).round() as i64).rem_euclid(SECONDS_PER_DAY)
        } else {
            0
        };
        let of_day = (unix_seconds.rem_euclid(SECONDS_PER_DAY) + offset) % SECONDS_PER_DAY;
        Self {
            hours: ((of_day / 3600) % 12) as u8,
            minutes: ((of_day / 60) % 60) as u8,
            seconds: (of_day % 60) as u8,
        }
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}:{:02}", self.hours, self.minutes, self.seconds)
    }
}

/// Where a clock hand sits between two scale slots
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NotePosition {
    pub index: usize,
    pub current: Note,
    pub next: Note,
    /// Fraction of the way from `current` to `next`, in [0, 1)
    pub progress: f64,
}

/// Continuous position on the 0..12 ramp for a tracking mode.
///
/// Hour: `(hours mod 12) + minutes/60 + seconds/3600`.
/// Minute: `((minutes + seconds/60) / 60) * 12`.
/// Both are computed from whole seconds with a single division so slot
/// boundaries land exactly on integers.
pub fn scale_position(time: ClockTime, mode: TrackingMode) -> f64 {
    let hours = (time.hours % 12) as u32;
    let minutes = time.minutes as u32;
    let seconds = time.seconds as u32;
    match mode {
        TrackingMode::Hour => (hours * 3600 + minutes * 60 + seconds) as f64 / 3600.0,
        TrackingMode::Minute => {
            let seconds_per_slot = 3600 / SCALE_LEN as u32;
            (minutes * 60 + seconds) as f64 / seconds_per_slot as f64
        }
    }
}

/// Map a clock reading onto a scale slot plus fractional progress.
///
/// Every tracking mode shares this contract: a 0..12 ramp, the slot is the
/// floor modulo 12, and progress is the fractional remainder.
pub fn note_position(time: ClockTime, scale: &Scale, mode: TrackingMode) -> NotePosition {
    let position = scale_position(time, mode);
    let floor = position.floor();
    let index = (floor as usize) % SCALE_LEN;
    let next = (index + 1) % SCALE_LEN;
    NotePosition {
        index,
        current: scale.note(index),
        next: scale.note(next),
        progress: position - floor,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hour_mode_on_the_hour() {
        let scale = Scale::default();
        let pos = note_position(ClockTime::new(6, 0, 0), &scale, TrackingMode::Hour);
        assert_eq!(pos.index, 6);
        assert_eq!(pos.progress, 0.0);
        assert_eq!(pos.current, scale.note(6));
        assert_eq!(pos.next, scale.note(7));
    }

    #[test]
    fn test_hour_mode_progress() {
        let scale = Scale::default();
        let pos = note_position(ClockTime::new(11, 30, 0), &scale, TrackingMode::Hour);
        assert_eq!(pos.index, 11);
        assert!((pos.progress - 0.5).abs() < 1e-12);
        assert_eq!(pos.next, scale.note(0));
    }

    #[test]
    fn test_minute_mode() {
        let scale = Scale::default();
        let pos = note_position(ClockTime::new(0, 30, 0), &scale, TrackingMode::Minute);
        assert_eq!(pos.index, 6);
        assert_eq!(pos.progress, 0.0);

        let pos = note_position(ClockTime::new(0, 30, 30), &scale, TrackingMode::Minute);
        assert_eq!(pos.index, 6);
        assert!((pos.progress - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_clock_time_reduces() {
        let time = ClockTime::new(13, 61, 75);
        assert_eq!(time, ClockTime { hours: 1, minutes: 1, seconds: 15 });
    }

    #[test]
    fn test_from_unix_seconds_with_offset() {
        // 1970-01-01 15:04:05 UTC
        let ts = 15 * 3600 + 4 * 60 + 5;
        assert_eq!(ClockTime::from_unix_seconds(ts, 0.0), ClockTime::new(3, 4, 5));
        assert_eq!(ClockTime::from_unix_seconds(ts, -5.0), ClockTime::new(10, 4, 5));
        assert_eq!(ClockTime::from_unix_seconds(ts, 5.5), ClockTime::new(8, 34, 5));
        assert_eq!(ClockTime::from_unix_seconds(ts, 10.0), ClockTime::new(1, 4, 5));
    }

    #[test]
    fn test_from_unix_seconds_extreme_inputs() {
        let ts = 1_700_000_000;
        // Whole days of offset land on the same reading
        assert_eq!(
            ClockTime::from_unix_seconds(ts, 48.0),
            ClockTime::from_unix_seconds(ts, 0.0)
        );
        assert_eq!(
            ClockTime::from_unix_seconds(ts, f64::NAN),
            ClockTime::from_unix_seconds(ts, 0.0)
        );
        let huge = ClockTime::from_unix_seconds(ts, 1e300);
        assert!(huge.hours < 12 && huge.minutes < 60 && huge.seconds < 60);
        let low = ClockTime::from_unix_seconds(i64::MIN, -1e300);
        assert!(low.hours < 12 && low.minutes < 60 && low.seconds < 60);
        ClockTime::from_unix_seconds(i64::MAX, f64::INFINITY);
    }

    #[test]
    fn test_tracking_mode_parse() {
        assert_eq!("Minute".parse::<TrackingMode>(), Ok(TrackingMode::Minute));
        assert!("second".parse::<TrackingMode>().is_err());
        assert_eq!(TrackingMode::Hour.to_string(), "hour");
    }
}
