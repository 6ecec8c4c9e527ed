//! clocktone-services: Audio graph backends, voices, effects and the engine controller

pub mod audio_effects;
pub mod audio_engine;
pub mod audio_io;
pub mod effects_stage;
pub mod graph;
pub mod offline;
pub mod realtime;
pub mod render;
pub mod voice;

pub use audio_effects::{AudioEffect, build_effect};
pub use audio_effects::{ChorusEffect, CompressorEffect, LowPassEffect, ReverbEffect, TremoloEffect};
pub use audio_engine::{
    AudioEngineController, AudioEngineError, DEFAULT_RAMP_MS, EngineConfig, EngineState, StartPhase,
    StartTicket,
};
pub use audio_io::{AudioOutputError, RealtimeOutputStream};
pub use effects_stage::EffectsStage;
pub use graph::{AudioGraph, Destination, GraphError, NodeId, NodeKind, Param};
pub use offline::{GraphEvent, OfflineGraph};
pub use realtime::RealtimeGraph;
pub use render::RenderGraph;
pub use voice::{RunState, Voice, VoiceNodes};
