//! Effects chain configuration and named presets

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// One stage of the shared effects chain
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EffectSpec {
    Tremolo { frequency: f32, depth: f32 },
    Chorus { frequency: f32, delay_ms: f32, depth: f32 },
    LowPass { frequency: f32 },
    Compressor { threshold_db: f32, ratio: f32 },
    Reverb { decay: f32, wet: f32 },
}

impl EffectSpec {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Tremolo { .. } => "Tremolo",
            Self::Chorus { .. } => "Chorus",
            Self::LowPass { .. } => "Low Pass",
            Self::Compressor { .. } => "Compressor",
            Self::Reverb { .. } => "Reverb",
        }
    }
}

/// Per-stage parameters. Missing fields take the default chain values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectsConfig {
    /// Reverb decay in seconds
    pub reverb_decay: f32,
    /// Reverb wet mix, 0..=1
    pub reverb_wet: f32,
    pub compressor_threshold: f32,
    pub compressor_ratio: f32,
    /// Low-pass cutoff in Hz
    pub filter_frequency: f32,
    pub chorus_frequency: f32,
    pub chorus_delay_time: f32,
    pub chorus_depth: f32,
    pub tremolo_frequency: f32,
    pub tremolo_depth: f32,
}

impl Default for EffectsConfig {
    fn default() -> Self {
        Self {
            reverb_decay: 4.0,
            reverb_wet: 0.35,
            compressor_threshold: -24.0,
            compressor_ratio: 3.0,
            filter_frequency: 8000.0,
            chorus_frequency: 0.5,
            chorus_delay_time: 2.5,
            chorus_depth: 0.3,
            tremolo_frequency: 0.1,
            tremolo_depth: 0.3,
        }
    }
}

impl EffectsConfig {
    /// Stages in signal order, input first
    pub fn chain(&self) -> [EffectSpec; 5] {
        [
            EffectSpec::Tremolo {
                frequency: self.tremolo_frequency,
                depth: self.tremolo_depth,
            },
            EffectSpec::Chorus {
                frequency: self.chorus_frequency,
                delay_ms: self.chorus_delay_time,
                depth: self.chorus_depth,
            },
            EffectSpec::LowPass {
                frequency: self.filter_frequency,
            },
            EffectSpec::Compressor {
                threshold_db: self.compressor_threshold,
                ratio: self.compressor_ratio,
            },
            EffectSpec::Reverb {
                decay: self.reverb_decay,
                wet: self.reverb_wet,
            },
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EffectsPreset {
    Default,
    Ambient,
    Hypnagogic,
    /// No coloration; tones pass through essentially unmodified
    #[default]
    Clean,
}

impl EffectsPreset {
    pub fn config(&self) -> EffectsConfig {
        let base = EffectsConfig::default();
        match self {
            Self::Default => base,
            Self::Ambient => EffectsConfig {
                reverb_decay: 6.0,
                compressor_threshold: -30.0,
                compressor_ratio: 4.0,
                filter_frequency: 6000.0,
                chorus_depth: 0.4,
                tremolo_frequency: 0.05,
                tremolo_depth: 0.2,
                ..base
            },
            Self::Hypnagogic => EffectsConfig {
                reverb_decay: 8.0,
                reverb_wet: 0.45,
                compressor_threshold: -20.0,
                compressor_ratio: 2.0,
                filter_frequency: 10000.0,
                chorus_frequency: 0.3,
                chorus_depth: 0.5,
                tremolo_frequency: 0.08,
                tremolo_depth: 0.4,
                ..base
            },
            Self::Clean => EffectsConfig {
                reverb_decay: 0.1,
                reverb_wet: 0.0,
                filter_frequency: 20000.0,
                chorus_frequency: 0.0,
                chorus_delay_time: 0.0,
                chorus_depth: 0.0,
                tremolo_frequency: 0.0,
                tremolo_depth: 0.0,
                ..base
            },
        }
    }
}

impl FromStr for EffectsPreset {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "default" => Ok(Self::Default),
            "ambient" => Ok(Self::Ambient),
            "hypnagogic" => Ok(Self::Hypnagogic),
            "clean" => Ok(Self::Clean),
            _ => Err(CoreError::UnknownPreset(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_order() {
        let names: Vec<&str> = EffectsConfig::default().chain().iter().map(|s| s.name()).collect();
        assert_eq!(names, ["Tremolo", "Chorus", "Low Pass", "Compressor", "Reverb"]);
    }

    #[test]
    fn test_clean_preset_disables_coloration() {
        let clean = EffectsPreset::Clean.config();
        assert_eq!(clean.tremolo_depth, 0.0);
        assert_eq!(clean.chorus_depth, 0.0);
        assert_eq!(clean.reverb_wet, 0.0);
        assert_eq!(clean.filter_frequency, 20000.0);
        assert_eq!(clean.compressor_threshold, -24.0);
    }

    #[test]
    fn test_preset_from_str() {
        assert_eq!("Ambient".parse::<EffectsPreset>(), Ok(EffectsPreset::Ambient));
        assert!("lofi".parse::<EffectsPreset>().is_err());
    }
}
