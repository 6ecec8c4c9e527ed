//! Voice parameter records shared by the engine and its display layer

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::position::TrackingMode;

pub const VOLUME_RANGE: RangeInclusive<f32> = 0.0..=1.0;
pub const HARMONIC_INTERVAL_RANGE: RangeInclusive<i32> = -24..=24;

pub fn clamp_volume(volume: f32) -> f32 {
    if volume.is_nan() {
        return *VOLUME_RANGE.start();
    }
    volume.clamp(*VOLUME_RANGE.start(), *VOLUME_RANGE.end())
}

pub fn clamp_harmonic_interval(semitones: i32) -> i32 {
    semitones.clamp(*HARMONIC_INTERVAL_RANGE.start(), *HARMONIC_INTERVAL_RANGE.end())
}

/// Editable parameters of one voice. Values are clamped on every write.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawVoiceParams")]
pub struct VoiceParams {
    volume: f32,
    harmonic_interval: i32,
    tracking_mode: TrackingMode,
}

impl Default for VoiceParams {
    fn default() -> Self {
        Self::new(0.5, 0, TrackingMode::Hour)
    }
}

impl VoiceParams {
    pub fn new(volume: f32, harmonic_interval: i32, tracking_mode: TrackingMode) -> Self {
        Self {
            volume: clamp_volume(volume),
            harmonic_interval: clamp_harmonic_interval(harmonic_interval),
            tracking_mode,
        }
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn harmonic_interval(&self) -> i32 {
        self.harmonic_interval
    }

    pub fn tracking_mode(&self) -> TrackingMode {
        self.tracking_mode
    }

    /// Returns the stored (clamped) value
    pub fn set_volume(&mut self, volume: f32) -> f32 {
        self.volume = clamp_volume(volume);
        self.volume
    }

    /// Returns the stored (clamped) value
    pub fn set_harmonic_interval(&mut self, semitones: i32) -> i32 {
        self.harmonic_interval = clamp_harmonic_interval(semitones);
        self.harmonic_interval
    }

    pub fn set_tracking_mode(&mut self, mode: TrackingMode) {
        self.tracking_mode = mode;
    }
}

/// Unvalidated wire form, clamped on the way in
#[derive(Deserialize)]
struct RawVoiceParams {
    #[serde(default = "default_volume")]
    volume: f32,
    #[serde(default)]
    harmonic_interval: i32,
    #[serde(default)]
    tracking_mode: TrackingMode,
}

fn default_volume() -> f32 {
    0.5
}

impl From<RawVoiceParams> for VoiceParams {
    fn from(raw: RawVoiceParams) -> Self {
        Self::new(raw.volume, raw.harmonic_interval, raw.tracking_mode)
    }
}

/// Initial definition of a voice in the pool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceConfig {
    pub id: String,
    pub display_name: String,
    #[serde(flatten)]
    pub params: VoiceParams,
}

impl VoiceConfig {
    pub fn new(id: &str, display_name: &str, params: VoiceParams) -> Self {
        Self {
            id: id.to_string(),
            display_name: display_name.to_string(),
            params,
        }
    }
}

/// The stock four-voice pool: a root and a fifth on each clock hand
pub fn default_voices() -> Vec<VoiceConfig> {
    vec![
        VoiceConfig::new("toneOne", "Tone One", VoiceParams::new(0.5, 0, TrackingMode::Hour)),
        VoiceConfig::new("toneTwo", "Tone Two", VoiceParams::new(0.5, 7, TrackingMode::Hour)),
        VoiceConfig::new("toneThree", "Tone Three", VoiceParams::new(0.5, 0, TrackingMode::Minute)),
        VoiceConfig::new("toneFour", "Tone Four", VoiceParams::new(0.5, 7, TrackingMode::Minute)),
    ]
}

/// Read-only snapshot of a voice for display
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VoiceDescriptor {
    pub id: String,
    pub display_name: String,
    pub tracking_mode: TrackingMode,
    pub volume: f32,
    pub harmonic_interval: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_volume_clamps() {
        let mut params = VoiceParams::default();
        assert_eq!(params.set_volume(1.5), 1.0);
        assert_eq!(params.set_volume(-1.0), 0.0);
        assert_eq!(params.set_volume(f32::NAN), 0.0);
        assert_eq!(params.set_volume(0.25), 0.25);
    }

    #[test]
    fn test_harmonic_interval_clamps() {
        let mut params = VoiceParams::default();
        assert_eq!(params.set_harmonic_interval(30), 24);
        assert_eq!(params.set_harmonic_interval(-30), -24);
        assert_eq!(params.set_harmonic_interval(-5), -5);
        assert_eq!(VoiceParams::new(2.0, 99, TrackingMode::Minute).harmonic_interval(), 24);
    }

    #[test]
    fn test_default_pool() {
        let voices = default_voices();
        let ids: Vec<&str> = voices.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(ids, ["toneOne", "toneTwo", "toneThree", "toneFour"]);
        assert_eq!(voices[1].params.harmonic_interval(), 7);
        assert_eq!(voices[2].params.tracking_mode(), TrackingMode::Minute);
    }
}
