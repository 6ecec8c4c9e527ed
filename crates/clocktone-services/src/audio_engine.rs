//! Engine controller: owns the voice pool and the shared effects stage and
//! drives them from clock ticks

use std::time::Duration;

use clocktone_core::{
    ClockTime, EffectsConfig, EffectsPreset, Note, Scale, ScalePattern, TrackingMode, VoiceConfig,
    VoiceDescriptor, default_voices, voice_frequency,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::effects_stage::EffectsStage;
use crate::graph::{AudioGraph, GraphError};
use crate::voice::Voice;

pub const DEFAULT_RAMP_MS: u64 = 100;

#[derive(Debug, Error)]
pub enum AudioEngineError {
    #[error("Failed to build effects stage: {0}")]
    EffectsStage(#[source] GraphError),
    #[error("Failed to allocate voice '{voice}': {source}")]
    Voice {
        voice: String,
        #[source]
        source: GraphError,
    },
}

/// Everything needed to build an engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub scale: ScalePattern,
    pub scale_root: Note,
    pub effects: EffectsConfig,
    pub voices: Vec<VoiceConfig>,
    /// Gain and frequency ramp window
    pub ramp_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            scale: ScalePattern::default(),
            scale_root: Note::C,
            effects: EffectsPreset::default().config(),
            voices: default_voices(),
            ramp_ms: DEFAULT_RAMP_MS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Uninitialized,
    Initializing,
    /// Nodes allocated, oscillators stopped
    Ready,
    Running,
}

/// Identifies one start request. Only the latest request may complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartTicket(u64);

/// Progress of the permission-gated start
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartPhase {
    Idle,
    Requesting(StartTicket),
    Granted,
    Denied,
    /// Permission was granted but the graph could not be allocated
    Failed,
}

pub struct AudioEngineController<G: AudioGraph> {
    graph: G,
    scale: Scale,
    effects_config: EffectsConfig,
    voices: Vec<Voice>,
    effects: Option<EffectsStage>,
    state: EngineState,
    start_phase: StartPhase,
    next_ticket: u64,
}

impl<G: AudioGraph> AudioEngineController<G> {
    pub fn new(graph: G, config: &EngineConfig) -> Self {
        let ramp = Duration::from_millis(config.ramp_ms);
        Self {
            graph,
            scale: config.scale.scale(config.scale_root),
            effects_config: config.effects,
            voices: config.voices.iter().map(|v| Voice::new(v, ramp)).collect(),
            effects: None,
            state: EngineState::Uninitialized,
            start_phase: StartPhase::Idle,
            next_ticket: 0,
        }
    }

    /// Replace the scale, e.g. with a shuffled one. Applies from the next tick.
    pub fn with_scale(mut self, scale: Scale) -> Self {
        self.scale = scale;
        self
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn start_phase(&self) -> StartPhase {
        self.start_phase
    }

    pub fn is_started(&self) -> bool {
        self.state == EngineState::Running
    }

    pub fn is_initialized(&self) -> bool {
        matches!(self.state, EngineState::Ready | EngineState::Running)
    }

    pub fn scale(&self) -> &Scale {
        &self.scale
    }

    pub fn graph(&self) -> &G {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut G {
        &mut self.graph
    }

    pub fn effects(&self) -> Option<&EffectsStage> {
        self.effects.as_ref()
    }

    pub fn voice(&self, id: &str) -> Option<&Voice> {
        self.voices.iter().find(|v| v.id() == id)
    }

    /// Live voice state, in creation order
    pub fn voices(&self) -> Vec<VoiceDescriptor> {
        self.voices.iter().map(Voice::descriptor).collect()
    }

    /// Target frequency of every voice at `time`
    pub fn target_frequencies(&self, time: ClockTime) -> Vec<(VoiceDescriptor, f64)> {
        self.voices
            .iter()
            .map(|voice| {
                let params = voice.params();
                let hz = voice_frequency(time, &self.scale, params.tracking_mode(), params.harmonic_interval());
                (voice.descriptor(), hz)
            })
            .collect()
    }

    /// Allocate the effects stage and every voice. On failure everything
    /// allocated so far is released, the error is logged and the engine
    /// stays uninitialized so a later call can retry.
    pub fn initialize(&mut self) -> bool {
        if self.is_initialized() {
            return true;
        }

        self.state = EngineState::Initializing;
        match self.allocate() {
            Ok(()) => {
                self.state = EngineState::Ready;
                info!(voices = self.voices.len(), "Audio engine initialized");
                true
            }
            Err(e) => {
                self.state = EngineState::Uninitialized;
                error!(error = %e, "Audio engine initialization failed");
                false
            }
        }
    }

    fn allocate(&mut self) -> Result<(), AudioEngineError> {
        let mut stage =
            EffectsStage::build(&mut self.graph, &self.effects_config).map_err(AudioEngineError::EffectsStage)?;
        let input = stage.input();

        for i in 0..self.voices.len() {
            if let Err(source) = self.voices[i].allocate(&mut self.graph, input) {
                for voice in self.voices[..i].iter_mut().rev() {
                    voice.dispose(&mut self.graph);
                }
                stage.dispose(&mut self.graph);
                return Err(AudioEngineError::Voice {
                    voice: self.voices[i].id().to_string(),
                    source,
                });
            }
        }

        self.effects = Some(stage);
        Ok(())
    }

    /// First half of a start: supersedes any request still pending
    pub fn request_start(&mut self) -> StartTicket {
        self.next_ticket += 1;
        let ticket = StartTicket(self.next_ticket);
        self.start_phase = StartPhase::Requesting(ticket);
        debug!(ticket = ticket.0, "Start requested");
        ticket
    }

    /// Second half of a start, once the platform answered the permission
    /// request. Returns whether the engine is now running.
    ///
    /// A ticket cancelled by `stop`/`dispose` or superseded by a newer
    /// request is ignored.
    pub fn complete_start(&mut self, ticket: StartTicket, permission: Result<(), GraphError>) -> bool {
        if self.start_phase != StartPhase::Requesting(ticket) {
            debug!(ticket = ticket.0, "Ignoring stale start");
            return false;
        }

        if let Err(e) = permission {
            self.start_phase = StartPhase::Denied;
            warn!(error = %e, "Audio context could not be started");
            return false;
        }
        if !self.initialize() {
            self.start_phase = StartPhase::Failed;
            return false;
        }
        self.start_phase = StartPhase::Granted;

        for voice in &mut self.voices {
            if let Err(e) = voice.start(&mut self.graph) {
                warn!(voice = voice.id(), error = %e, "Failed to start oscillator");
            }
        }
        self.state = EngineState::Running;
        info!("Audio engine started");
        true
    }

    /// Resume the audio context and start every voice.
    ///
    /// Holding `&mut self` across the await rules out a concurrent `stop`;
    /// drivers that must stay responsive while permission is pending use
    /// [`Self::request_start`] and [`Self::complete_start`] instead.
    pub async fn start(&mut self) -> bool {
        let ticket = self.request_start();
        let permission = self.graph.resume().await;
        self.complete_start(ticket, permission)
    }

    /// Start when stopped, stop when started. Returns the new started flag.
    pub async fn toggle(&mut self) -> bool {
        if self.is_started() {
            self.stop();
            false
        } else {
            self.start().await
        }
    }

    /// Stop every oscillator and cancel any pending start. Never fails.
    pub fn stop(&mut self) {
        if let StartPhase::Requesting(ticket) = self.start_phase {
            debug!(ticket = ticket.0, "Pending start cancelled");
        }
        self.start_phase = StartPhase::Idle;

        for voice in &mut self.voices {
            if let Err(e) = voice.stop(&mut self.graph) {
                warn!(voice = voice.id(), error = %e, "Failed to stop oscillator");
            }
        }

        if self.state == EngineState::Running {
            self.state = EngineState::Ready;
            info!("Audio engine stopped");
        }
    }

    /// Retune every voice for `time`. Does nothing unless running; errors
    /// are logged per voice.
    pub fn tick(&mut self, time: ClockTime) {
        if self.state != EngineState::Running {
            return;
        }

        for voice in &mut self.voices {
            let params = *voice.params();
            let hz = voice_frequency(time, &self.scale, params.tracking_mode(), params.harmonic_interval());
            if !hz.is_finite() || hz <= 0.0 {
                warn!(voice = voice.id(), frequency = hz, "Skipping invalid frequency");
                continue;
            }
            if let Err(e) = voice.retune(&mut self.graph, hz) {
                warn!(voice = voice.id(), error = %e, "Failed to retune voice");
            }
        }
    }

    /// Stop, release voices newest first, then the effects stage. Safe to
    /// call repeatedly; the engine can be started again afterwards.
    pub fn dispose(&mut self) {
        self.stop();

        let allocated = self.voices.iter().any(Voice::is_allocated) || self.effects.is_some();
        for voice in self.voices.iter_mut().rev() {
            voice.dispose(&mut self.graph);
        }
        if let Some(mut stage) = self.effects.take() {
            stage.dispose(&mut self.graph);
        }
        self.state = EngineState::Uninitialized;

        if allocated {
            info!("Audio engine disposed");
        }
    }

    /// Returns false when no voice has this id
    pub fn update_volume(&mut self, id: &str, volume: f32) -> bool {
        let Some(voice) = self.voices.iter_mut().find(|v| v.id() == id) else {
            debug!(voice = id, "Ignoring volume edit for unknown voice");
            return false;
        };
        voice.set_volume(&mut self.graph, volume);
        true
    }

    pub fn update_harmonic_interval(&mut self, id: &str, semitones: i32) -> bool {
        let Some(voice) = self.voices.iter_mut().find(|v| v.id() == id) else {
            debug!(voice = id, "Ignoring interval edit for unknown voice");
            return false;
        };
        voice.set_harmonic_interval(semitones);
        true
    }

    pub fn update_tracking_mode(&mut self, id: &str, mode: TrackingMode) -> bool {
        let Some(voice) = self.voices.iter_mut().find(|v| v.id() == id) else {
            debug!(voice = id, "Ignoring mode edit for unknown voice");
            return false;
        };
        voice.set_tracking_mode(mode);
        true
    }
}

impl<G: AudioGraph> Drop for AudioEngineController<G> {
    fn drop(&mut self) {
        self.dispose();
    }
}
