//! Audio effects for the shared effects stage

mod native;

pub use native::{ChorusEffect, CompressorEffect, LowPassEffect, ReverbEffect, TremoloEffect};

use std::fmt::Debug;

use clocktone_core::EffectSpec;

/// Audio effect that can process samples in-place
pub trait AudioEffect: Send + Debug {
    fn process(&mut self, samples: &mut [f32]);
    /// Update sample rate for effects that depend on it
    fn set_sample_rate(&mut self, _sample_rate: f32) {}
}

/// Instantiate the processor for one chain stage
pub fn build_effect(spec: &EffectSpec, sample_rate: f32) -> Box<dyn AudioEffect> {
    match *spec {
        EffectSpec::Tremolo { frequency, depth } => {
            Box::new(TremoloEffect::new(frequency, depth, sample_rate))
        }
        EffectSpec::Chorus { frequency, delay_ms, depth } => {
            Box::new(ChorusEffect::new(frequency, delay_ms, depth, sample_rate))
        }
        EffectSpec::LowPass { frequency } => Box::new(LowPassEffect::new(frequency, sample_rate)),
        EffectSpec::Compressor { threshold_db, ratio } => {
            Box::new(CompressorEffect::new(threshold_db, ratio, sample_rate))
        }
        EffectSpec::Reverb { decay, wet } => Box::new(ReverbEffect::new(decay, wet, sample_rate)),
    }
}
