//! Graph backed by the default cpal output device

use std::future::{Future, ready};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use clocktone_core::EffectSpec;
use tracing::info;

use crate::audio_io::RealtimeOutputStream;
use crate::graph::{AudioGraph, Destination, GraphError, NodeId, Param};
use crate::render::RenderGraph;

/// Nodes are rendered on the audio thread; the stream opens on first `resume`
pub struct RealtimeGraph {
    graph: Arc<Mutex<RenderGraph>>,
    stream: Option<RealtimeOutputStream>,
}

impl Default for RealtimeGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl RealtimeGraph {
    pub fn new() -> Self {
        Self {
            graph: Arc::new(Mutex::new(RenderGraph::default())),
            stream: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    fn with_graph<R>(&self, f: impl FnOnce(&mut RenderGraph) -> Result<R, GraphError>) -> Result<R, GraphError> {
        let Ok(mut graph) = self.graph.lock() else {
            return Err(GraphError::Unavailable("render graph lock poisoned".into()));
        };
        f(&mut graph)
    }

    fn open_stream(&mut self) -> Result<(), GraphError> {
        if self.stream.is_some() {
            return Ok(());
        }

        let graph = self.graph.clone();
        let mut mono: Vec<f32> = Vec::new();

        let stream = RealtimeOutputStream::start(move |buffer, sample_rate, channels| {
            let channels = channels.max(1) as usize;
            mono.resize(buffer.len() / channels, 0.0);

            let Ok(mut graph) = graph.lock() else {
                buffer.fill(0.0);
                return;
            };
            graph.set_sample_rate(sample_rate as f32);
            graph.render(&mut mono);
            drop(graph);

            for (frame, sample) in buffer.chunks_mut(channels).zip(&mono) {
                frame.fill(*sample);
            }
        })?;

        let sample_rate = stream.sample_rate();
        self.with_graph(|graph| {
            graph.set_sample_rate(sample_rate as f32);
            Ok(())
        })?;
        self.stream = Some(stream);
        info!(sample_rate, "Audio context running");
        Ok(())
    }
}

impl AudioGraph for RealtimeGraph {
    fn resume(&mut self) -> impl Future<Output = Result<(), GraphError>> {
        ready(self.open_stream())
    }

    fn create_effect(&mut self, spec: &EffectSpec, output: Destination) -> Result<NodeId, GraphError> {
        self.with_graph(|graph| graph.create_effect(spec, output))
    }

    fn create_gain(&mut self, gain: f32, output: Destination) -> Result<NodeId, GraphError> {
        self.with_graph(|graph| graph.create_gain(gain, output))
    }

    fn create_oscillator(&mut self, frequency: f64, output: Destination) -> Result<NodeId, GraphError> {
        self.with_graph(|graph| graph.create_oscillator(frequency, output))
    }

    fn start_oscillator(&mut self, node: NodeId) -> Result<(), GraphError> {
        self.with_graph(|graph| graph.set_running(node, true))
    }

    fn stop_oscillator(&mut self, node: NodeId) -> Result<(), GraphError> {
        self.with_graph(|graph| graph.set_running(node, false))
    }

    fn ramp(&mut self, node: NodeId, param: Param, target: f64, duration: Duration) -> Result<(), GraphError> {
        self.with_graph(|graph| graph.ramp(node, param, target, duration))
    }

    fn dispose(&mut self, node: NodeId) -> Result<(), GraphError> {
        self.with_graph(|graph| graph.remove(node))
    }
}

impl Drop for RealtimeGraph {
    fn drop(&mut self) {
        if let Some(stream) = self.stream.take() {
            stream.stop();
        }
    }
}
