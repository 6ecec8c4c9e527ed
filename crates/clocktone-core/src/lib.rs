//! clocktone-core: Time-to-tone mapping for the clocktone engine

pub mod chord;
pub mod effects;
mod error;
pub mod interpolate;
pub mod pitch;
pub mod position;
pub mod scale;
pub mod voice;

pub use chord::{ClockTriad, chord_slot, clock_triad, generate_triad};
pub use effects::{EffectSpec, EffectsConfig, EffectsPreset};
pub use error::{CoreError, Result};
pub use interpolate::{
    clock_frequency, interpolate_note_frequency, seconds_interpolated_frequency, voice_frequency,
};
pub use pitch::{name_to_frequency, nearest_note, note_to_frequency, transpose};
pub use position::{ClockTime, NotePosition, TrackingMode, note_position};
pub use scale::{Note, Scale, ScalePattern, generate_scale};
pub use voice::{VoiceConfig, VoiceDescriptor, VoiceParams, default_voices};
