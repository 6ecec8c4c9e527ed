//! A single oscillator + gain pair following one clock hand

use std::time::Duration;

use clocktone_core::{TrackingMode, VoiceConfig, VoiceDescriptor, VoiceParams, note_to_frequency, Note};
use tracing::{debug, trace, warn};

use crate::graph::{AudioGraph, Destination, GraphError, NodeId, Param};

/// Oscillator frequency before the first tick retunes it (C2)
pub fn initial_frequency() -> f64 {
    note_to_frequency(Note::C, 2)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Stopped,
    Started,
}

/// Graph nodes exclusively owned by one voice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoiceNodes {
    pub oscillator: NodeId,
    pub gain: NodeId,
}

#[derive(Debug)]
pub struct Voice {
    id: String,
    display_name: String,
    params: VoiceParams,
    nodes: Option<VoiceNodes>,
    run_state: RunState,
    ramp: Duration,
}

impl Voice {
    pub fn new(config: &VoiceConfig, ramp: Duration) -> Self {
        Self {
            id: config.id.clone(),
            display_name: config.display_name.clone(),
            params: config.params,
            nodes: None,
            run_state: RunState::Stopped,
            ramp,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn params(&self) -> &VoiceParams {
        &self.params
    }

    pub fn nodes(&self) -> Option<VoiceNodes> {
        self.nodes
    }

    pub fn run_state(&self) -> RunState {
        self.run_state
    }

    pub fn is_allocated(&self) -> bool {
        self.nodes.is_some()
    }

    /// Create the gain and oscillator, feeding `input`. On failure nothing
    /// is left allocated.
    pub fn allocate<G: AudioGraph>(&mut self, graph: &mut G, input: Destination) -> Result<VoiceNodes, GraphError> {
        if let Some(nodes) = self.nodes {
            return Ok(nodes);
        }

        let gain = graph.create_gain(self.params.volume(), input)?;
        let oscillator = match graph.create_oscillator(initial_frequency(), Destination::Node(gain)) {
            Ok(node) => node,
            Err(e) => {
                if let Err(cleanup) = graph.dispose(gain) {
                    warn!(voice = %self.id, node = %gain, error = %cleanup, "Failed to release gain node");
                }
                return Err(e);
            }
        };

        let nodes = VoiceNodes { oscillator, gain };
        self.nodes = Some(nodes);
        self.run_state = RunState::Stopped;
        Ok(nodes)
    }

    /// Store the clamped volume and ramp the live gain towards it
    pub fn set_volume<G: AudioGraph>(&mut self, graph: &mut G, volume: f32) -> f32 {
        let volume = self.params.set_volume(volume);
        if let Some(nodes) = self.nodes {
            if let Err(e) = graph.ramp(nodes.gain, Param::Gain, volume as f64, self.ramp) {
                warn!(voice = %self.id, error = %e, "Failed to ramp gain");
            }
        }
        volume
    }

    /// Takes effect on the next retune
    pub fn set_harmonic_interval(&mut self, semitones: i32) -> i32 {
        self.params.set_harmonic_interval(semitones)
    }

    pub fn set_tracking_mode(&mut self, mode: TrackingMode) {
        self.params.set_tracking_mode(mode);
    }

    pub fn retune<G: AudioGraph>(&mut self, graph: &mut G, frequency: f64) -> Result<(), GraphError> {
        let Some(nodes) = self.nodes else {
            return Ok(());
        };
        trace!(voice = %self.id, frequency, "Retune");
        graph.ramp(nodes.oscillator, Param::Frequency, frequency, self.ramp)
    }

    pub fn start<G: AudioGraph>(&mut self, graph: &mut G) -> Result<(), GraphError> {
        let Some(nodes) = self.nodes else {
            return Ok(());
        };
        if self.run_state == RunState::Started {
            return Ok(());
        }
        graph.start_oscillator(nodes.oscillator)?;
        self.run_state = RunState::Started;
        Ok(())
    }

    pub fn stop<G: AudioGraph>(&mut self, graph: &mut G) -> Result<(), GraphError> {
        let Some(nodes) = self.nodes else {
            return Ok(());
        };
        if self.run_state == RunState::Stopped {
            return Ok(());
        }
        graph.stop_oscillator(nodes.oscillator)?;
        self.run_state = RunState::Stopped;
        Ok(())
    }

    /// Release the oscillator, then the gain. Failures are logged per node
    /// and repeated calls do nothing.
    pub fn dispose<G: AudioGraph>(&mut self, graph: &mut G) {
        let Some(nodes) = self.nodes.take() else {
            return;
        };
        if self.run_state == RunState::Started {
            if let Err(e) = graph.stop_oscillator(nodes.oscillator) {
                warn!(voice = %self.id, error = %e, "Failed to stop oscillator");
            }
        }
        self.run_state = RunState::Stopped;

        for node in [nodes.oscillator, nodes.gain] {
            if let Err(e) = graph.dispose(node) {
                warn!(voice = %self.id, node = %node, error = %e, "Failed to release node");
            }
        }
        debug!(voice = %self.id, "Voice disposed");
    }

    pub fn descriptor(&self) -> VoiceDescriptor {
        VoiceDescriptor {
            id: self.id.clone(),
            display_name: self.display_name.clone(),
            tracking_mode: self.params.tracking_mode(),
            volume: self.params.volume(),
            harmonic_interval: self.params.harmonic_interval(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::offline::{GraphEvent, OfflineGraph};

    fn voice() -> Voice {
        let config = VoiceConfig::new("toneOne", "Tone One", VoiceParams::new(0.5, 0, TrackingMode::Hour));
        Voice::new(&config, Duration::from_millis(100))
    }

    #[test]
    fn test_allocate_connects_oscillator_to_gain() {
        let mut graph = OfflineGraph::default();
        let mut voice = voice();
        let nodes = voice.allocate(&mut graph, Destination::Output).unwrap();

        assert_eq!(graph.output_of(nodes.oscillator), Some(Destination::Node(nodes.gain)));
        assert_eq!(graph.output_of(nodes.gain), Some(Destination::Output));
        assert_eq!(graph.param_target(nodes.gain, Param::Gain), Some(0.5));
        assert!((graph.param_target(nodes.oscillator, Param::Frequency).unwrap() - 65.406).abs() < 0.01);
    }

    #[test]
    fn test_failed_allocation_releases_gain() {
        let mut graph = OfflineGraph::default();
        graph.fail_allocations_after(1);
        let mut voice = voice();

        assert!(voice.allocate(&mut graph, Destination::Output).is_err());
        assert!(!voice.is_allocated());
        assert_eq!(graph.live_nodes(), 0);
    }

    #[test]
    fn test_start_stop_idempotent() {
        let mut graph = OfflineGraph::default();
        let mut voice = voice();
        voice.allocate(&mut graph, Destination::Output).unwrap();
        graph.clear_events();

        voice.start(&mut graph).unwrap();
        voice.start(&mut graph).unwrap();
        voice.stop(&mut graph).unwrap();
        voice.stop(&mut graph).unwrap();

        let nodes = voice.nodes().unwrap();
        assert_eq!(
            graph.events(),
            &[GraphEvent::Started(nodes.oscillator), GraphEvent::Stopped(nodes.oscillator)]
        );
    }

    #[test]
    fn test_volume_before_allocation_is_applied_at_creation() {
        let mut graph = OfflineGraph::default();
        let mut voice = voice();
        assert_eq!(voice.set_volume(&mut graph, 2.0), 1.0);
        assert!(graph.events().is_empty());

        let nodes = voice.allocate(&mut graph, Destination::Output).unwrap();
        assert_eq!(graph.param_target(nodes.gain, Param::Gain), Some(1.0));
    }

    #[test]
    fn test_volume_ramps_live_gain() {
        let mut graph = OfflineGraph::default();
        let mut voice = voice();
        let nodes = voice.allocate(&mut graph, Destination::Output).unwrap();
        voice.set_volume(&mut graph, 0.25);
        assert!(graph.events().contains(&GraphEvent::Ramped {
            node: nodes.gain,
            param: Param::Gain,
            target: 0.25,
        }));
    }

    #[test]
    fn test_dispose_releases_oscillator_then_gain_once() {
        let mut graph = OfflineGraph::default();
        let mut voice = voice();
        let nodes = voice.allocate(&mut graph, Destination::Output).unwrap();
        voice.start(&mut graph).unwrap();

        voice.dispose(&mut graph);
        voice.dispose(&mut graph);

        assert_eq!(graph.disposed(), vec![nodes.oscillator, nodes.gain]);
        assert!(graph.running_oscillators().is_empty());
    }

    #[test]
    fn test_dispose_continues_after_failure() {
        let mut graph = OfflineGraph::default();
        let mut voice = voice();
        let nodes = voice.allocate(&mut graph, Destination::Output).unwrap();
        graph.fail_disposal_of(nodes.oscillator);

        voice.dispose(&mut graph);
        assert_eq!(graph.disposed(), vec![nodes.gain]);
        assert!(!voice.is_allocated());
    }
}
