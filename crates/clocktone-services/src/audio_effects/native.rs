//! Native effect processors (mono, in place)

use std::f64::consts::TAU;
use std::fmt;

use fundsp::hacker::*;

use super::AudioEffect;

const MAX_CHORUS_DELAY_MS: f32 = 50.0;
const COMPRESSOR_ATTACK_MS: f32 = 3.0;
const COMPRESSOR_RELEASE_MS: f32 = 250.0;

/// Advance an LFO phase in cycles, wrapping at 1
fn advance_phase(phase: &mut f64, frequency: f32, sample_rate: f32) {
    *phase += frequency as f64 / sample_rate as f64;
    if *phase >= 1.0 {
        *phase -= phase.floor();
    }
}

/// Slow amplitude modulation
#[derive(Debug)]
pub struct TremoloEffect {
    frequency: f32,
    depth: f32,
    phase: f64,
    sample_rate: f32,
}

impl TremoloEffect {
    pub fn new(frequency: f32, depth: f32, sample_rate: f32) -> Self {
        Self {
            frequency: frequency.max(0.0),
            depth: depth.clamp(0.0, 1.0),
            phase: 0.0,
            sample_rate,
        }
    }
}

impl AudioEffect for TremoloEffect {
    fn process(&mut self, samples: &mut [f32]) {
        for sample in samples.iter_mut() {
            let lfo = 0.5 * (1.0 + (self.phase * TAU).sin()) as f32;
            *sample *= 1.0 - self.depth * lfo;
            advance_phase(&mut self.phase, self.frequency, self.sample_rate);
        }
    }

    fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
    }
}

/// LFO-modulated short delay mixed 50/50 with the dry signal
pub struct ChorusEffect {
    frequency: f32,
    delay_ms: f32,
    depth: f32,
    mix: f32,
    buffer: Vec<f32>,
    write_pos: usize,
    phase: f64,
    sample_rate: f32,
}

impl ChorusEffect {
    pub fn new(frequency: f32, delay_ms: f32, depth: f32, sample_rate: f32) -> Self {
        let mut effect = Self {
            frequency: frequency.max(0.0),
            delay_ms: delay_ms.clamp(0.0, MAX_CHORUS_DELAY_MS / 2.0),
            depth: depth.clamp(0.0, 1.0),
            mix: 0.5,
            buffer: Vec::new(),
            write_pos: 0,
            phase: 0.0,
            sample_rate,
        };
        effect.allocate();
        effect
    }

    fn allocate(&mut self) {
        let len = (MAX_CHORUS_DELAY_MS * self.sample_rate / 1000.0) as usize + 2;
        self.buffer = vec![0.0; len];
        self.write_pos = 0;
    }
}

impl fmt::Debug for ChorusEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChorusEffect")
            .field("frequency", &self.frequency)
            .field("delay_ms", &self.delay_ms)
            .field("depth", &self.depth)
            .finish()
    }
}

impl AudioEffect for ChorusEffect {
    fn process(&mut self, samples: &mut [f32]) {
        let len = self.buffer.len();
        let max_delay = (len - 2) as f32;

        for sample in samples.iter_mut() {
            self.buffer[self.write_pos] = *sample;

            let lfo = (self.phase * TAU).sin() as f32;
            let delay_ms = self.delay_ms * (1.0 + self.depth * lfo);
            let delay = (delay_ms * self.sample_rate / 1000.0).clamp(0.0, max_delay);
            let whole = delay.floor();
            let frac = delay - whole;

            let newer = (self.write_pos + len - whole as usize) % len;
            let older = (newer + len - 1) % len;
            let wet = self.buffer[newer] * (1.0 - frac) + self.buffer[older] * frac;

            *sample = *sample * (1.0 - self.mix) + wet * self.mix;

            self.write_pos = (self.write_pos + 1) % len;
            advance_phase(&mut self.phase, self.frequency, self.sample_rate);
        }
    }

    fn set_sample_rate(&mut self, sample_rate: f32) {
        if (sample_rate - self.sample_rate).abs() < 1.0 {
            return;
        }
        self.sample_rate = sample_rate;
        self.allocate();
    }
}

/// Low-pass filter
pub struct LowPassEffect {
    /// Cutoff as configured, before the Nyquist limit
    requested_hz: f32,
    cutoff_hz: f32,
    filter: An<FixedSvf<f64, LowpassMode<f64>>>,
}

impl LowPassEffect {
    pub fn new(cutoff_hz: f32, sample_rate: f32) -> Self {
        let requested_hz = cutoff_hz;
        let cutoff_hz = Self::limit_cutoff(requested_hz, sample_rate);
        let mut filter = lowpass_hz(cutoff_hz, 0.707);
        filter.set_sample_rate(sample_rate as f64);
        Self { requested_hz, cutoff_hz, filter }
    }

    /// Keep the cutoff below Nyquist
    fn limit_cutoff(cutoff_hz: f32, sample_rate: f32) -> f32 {
        cutoff_hz.clamp(20.0, sample_rate * 0.45)
    }
}

impl fmt::Debug for LowPassEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LowPassEffect")
            .field("cutoff_hz", &self.cutoff_hz)
            .finish()
    }
}

impl AudioEffect for LowPassEffect {
    fn process(&mut self, samples: &mut [f32]) {
        for sample in samples.iter_mut() {
            let input = Frame::from([*sample]);
            let output = self.filter.tick(&input);
            *sample = output[0];
        }
    }

    fn set_sample_rate(&mut self, sample_rate: f32) {
        let cutoff_hz = Self::limit_cutoff(self.requested_hz, sample_rate);
        if cutoff_hz != self.cutoff_hz {
            self.cutoff_hz = cutoff_hz;
            self.filter = lowpass_hz(cutoff_hz, 0.707);
        }
        self.filter.set_sample_rate(sample_rate as f64);
    }
}

/// Feed-forward compressor with a peak envelope follower.
///
/// Signals below the threshold pass through untouched.
#[derive(Debug)]
pub struct CompressorEffect {
    ratio: f32,
    threshold_linear: f32,
    envelope: f32,
    attack_coeff: f32,
    release_coeff: f32,
    sample_rate: f32,
}

impl CompressorEffect {
    pub fn new(threshold_db: f32, ratio: f32, sample_rate: f32) -> Self {
        let mut effect = Self {
            ratio: ratio.max(1.0),
            threshold_linear: db_amp(threshold_db) as f32,
            envelope: 0.0,
            attack_coeff: 0.0,
            release_coeff: 0.0,
            sample_rate,
        };
        effect.update_coefficients();
        effect
    }

    fn update_coefficients(&mut self) {
        let coeff = |ms: f32| (-1.0 / (ms / 1000.0 * self.sample_rate)).exp();
        self.attack_coeff = coeff(COMPRESSOR_ATTACK_MS);
        self.release_coeff = coeff(COMPRESSOR_RELEASE_MS);
    }
}

impl AudioEffect for CompressorEffect {
    fn process(&mut self, samples: &mut [f32]) {
        let slope = 1.0 / self.ratio - 1.0;
        for sample in samples.iter_mut() {
            let level = sample.abs();
            let coeff = if level > self.envelope { self.attack_coeff } else { self.release_coeff };
            self.envelope = coeff * self.envelope + (1.0 - coeff) * level;

            if self.envelope > self.threshold_linear {
                *sample *= (self.envelope / self.threshold_linear).powf(slope);
            }
        }
    }

    fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.update_coefficients();
    }
}

/// Schroeder-style reverb: parallel damped comb filters
pub struct ReverbEffect {
    decay: f32,
    wet: f32,
    delays: Vec<Vec<f32>>,
    positions: Vec<usize>,
    feedback: Vec<f32>,
    damping_state: Vec<f32>,
    sample_rate: f32,
}

impl ReverbEffect {
    const COMB_MS: [f32; 4] = [29.7, 37.1, 41.1, 43.7];
    const DAMPING: f32 = 0.2;

    pub fn new(decay: f32, wet: f32, sample_rate: f32) -> Self {
        let mut effect = Self {
            decay: decay.max(0.01),
            wet: wet.clamp(0.0, 1.0),
            delays: Vec::new(),
            positions: Vec::new(),
            feedback: Vec::new(),
            damping_state: Vec::new(),
            sample_rate,
        };
        effect.rebuild_delays();
        effect
    }

    fn rebuild_delays(&mut self) {
        self.delays = Self::COMB_MS
            .iter()
            .map(|&ms| {
                let samples = (ms * self.sample_rate / 1000.0) as usize;
                vec![0.0; Ord::max(samples, 1)]
            })
            .collect();
        // Each comb loses 60 dB over `decay` seconds
        self.feedback = Self::COMB_MS
            .iter()
            .map(|&ms| 10f32.powf(-3.0 * (ms / 1000.0) / self.decay).min(0.97))
            .collect();
        self.positions = vec![0; self.delays.len()];
        self.damping_state = vec![0.0; self.delays.len()];
    }
}

impl fmt::Debug for ReverbEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReverbEffect")
            .field("decay", &self.decay)
            .field("wet", &self.wet)
            .finish()
    }
}

impl AudioEffect for ReverbEffect {
    fn process(&mut self, samples: &mut [f32]) {
        let combs = self.delays.len() as f32;

        for sample in samples.iter_mut() {
            let dry = *sample;
            let mut wet = 0.0;

            for (i, delay_buf) in self.delays.iter_mut().enumerate() {
                let pos = self.positions[i];
                let delayed = delay_buf[pos];
                wet += delayed;

                let damped = delayed * (1.0 - Self::DAMPING) + self.damping_state[i] * Self::DAMPING;
                self.damping_state[i] = damped;
                delay_buf[pos] = dry + damped * self.feedback[i];
                self.positions[i] = (pos + 1) % delay_buf.len();
            }

            wet /= combs;
            *sample = dry * (1.0 - self.wet) + wet * self.wet;
        }
    }

    fn set_sample_rate(&mut self, sample_rate: f32) {
        if (sample_rate - self.sample_rate).abs() < 1.0 {
            return;
        }
        self.sample_rate = sample_rate;
        self.rebuild_delays();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(frames: usize, hz: f32, sample_rate: f32, amplitude: f32) -> Vec<f32> {
        (0..frames)
            .map(|n| amplitude * (TAU as f32 * hz * n as f32 / sample_rate).sin())
            .collect()
    }

    fn peak(samples: &[f32]) -> f32 {
        samples.iter().fold(0.0f32, |acc, s| acc.max(s.abs()))
    }

    #[test]
    fn test_zero_depth_tremolo_passes_through() {
        let input = sine(512, 220.0, 48_000.0, 0.5);
        let mut output = input.clone();
        TremoloEffect::new(0.0, 0.0, 48_000.0).process(&mut output);
        assert_eq!(input, output);
    }

    #[test]
    fn test_tremolo_attenuates_by_depth() {
        let mut samples = vec![1.0f32; 4];
        // Phase 0 => LFO at its midpoint
        TremoloEffect::new(0.0, 0.5, 48_000.0).process(&mut samples);
        assert!(samples.iter().all(|s| (s - 0.75).abs() < 1e-6));
    }

    #[test]
    fn test_zero_delay_chorus_passes_through() {
        let input = sine(512, 220.0, 48_000.0, 0.5);
        let mut output = input.clone();
        ChorusEffect::new(0.0, 0.0, 0.0, 48_000.0).process(&mut output);
        assert_eq!(input, output);
    }

    #[test]
    fn test_chorus_delays_the_wet_signal() {
        let mut samples = vec![0.0f32; 200];
        samples[0] = 1.0;
        // 1 ms at 48 kHz = 48 samples
        ChorusEffect::new(0.0, 1.0, 0.0, 48_000.0).process(&mut samples);
        assert!((samples[0] - 0.5).abs() < 1e-6);
        assert!((samples[48] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_compressor_leaves_quiet_signal_alone() {
        let input = sine(1024, 220.0, 48_000.0, 0.01);
        let mut output = input.clone();
        CompressorEffect::new(-24.0, 3.0, 48_000.0).process(&mut output);
        assert_eq!(input, output);
    }

    #[test]
    fn test_compressor_reduces_loud_signal() {
        let input = sine(48_000, 220.0, 48_000.0, 1.0);
        let mut output = input.clone();
        CompressorEffect::new(-24.0, 3.0, 48_000.0).process(&mut output);
        let tail = &output[24_000..];
        assert!(peak(tail) < 0.5);
    }

    #[test]
    fn test_dry_reverb_passes_through() {
        let input = sine(2048, 220.0, 48_000.0, 0.5);
        let mut output = input.clone();
        ReverbEffect::new(0.1, 0.0, 48_000.0).process(&mut output);
        assert_eq!(input, output);
    }

    #[test]
    fn test_reverb_tail_rings_after_impulse() {
        let mut samples = vec![0.0f32; 9_600];
        samples[0] = 1.0;
        ReverbEffect::new(2.0, 1.0, 48_000.0).process(&mut samples);
        assert!(peak(&samples[4_800..]) > 0.0);
    }

    #[test]
    fn test_low_pass_keeps_low_tone() {
        let input = sine(4_800, 110.0, 48_000.0, 0.5);
        let mut output = input.clone();
        LowPassEffect::new(8_000.0, 48_000.0).process(&mut output);
        let settled = peak(&output[2_400..]);
        assert!(settled > 0.4 && settled < 0.6);
    }

    #[test]
    fn test_low_pass_cutoff_is_limited_by_sample_rate() {
        let effect = LowPassEffect::new(20_000.0, 22_050.0);
        assert!(effect.cutoff_hz < 11_025.0);
    }
}
