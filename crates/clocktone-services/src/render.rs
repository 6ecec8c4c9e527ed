//! In-process node graph renderer shared by the realtime and offline backends

use std::collections::BTreeMap;
use std::f64::consts::TAU;
use std::time::Duration;

use clocktone_core::EffectSpec;

use crate::audio_effects::{AudioEffect, build_effect};
use crate::graph::{Destination, GraphError, NodeId, NodeKind, Param};

pub const DEFAULT_SAMPLE_RATE: u32 = 48_000;
pub const DEFAULT_NODE_LIMIT: usize = 256;

/// Linear parameter ramp advanced once per frame
#[derive(Debug, Clone, Copy)]
struct Ramp {
    value: f64,
    target: f64,
    step: f64,
    remaining: u64,
}

impl Ramp {
    fn new(value: f64) -> Self {
        Self {
            value,
            target: value,
            step: 0.0,
            remaining: 0,
        }
    }

    fn set(&mut self, target: f64, duration: Duration, sample_rate: f32) {
        let frames = (duration.as_secs_f64() * sample_rate as f64).round() as u64;
        self.target = target;
        if frames == 0 {
            self.value = target;
            self.remaining = 0;
        } else {
            self.step = (target - self.value) / frames as f64;
            self.remaining = frames;
        }
    }

    fn next(&mut self) -> f64 {
        if self.remaining > 0 {
            self.remaining -= 1;
            self.value = if self.remaining == 0 { self.target } else { self.value + self.step };
        }
        self.value
    }
}

#[derive(Debug)]
struct Oscillator {
    frequency: Ramp,
    phase: f64,
    running: bool,
}

impl Oscillator {
    fn render(&mut self, buffer: &mut [f32], sample_rate: f32) {
        if !self.running {
            buffer.fill(0.0);
            return;
        }
        for sample in buffer.iter_mut() {
            let frequency = self.frequency.next();
            *sample = (self.phase * TAU).sin() as f32;
            self.phase += frequency / sample_rate as f64;
            if self.phase >= 1.0 {
                self.phase -= self.phase.floor();
            }
        }
    }
}

#[derive(Debug)]
enum NodeBody {
    Oscillator(Oscillator),
    Gain(Ramp),
    Effect(Box<dyn AudioEffect>),
}

#[derive(Debug)]
struct RenderNode {
    output: Destination,
    body: NodeBody,
    /// Sum of everything routed here; all zeros between renders
    input: Vec<f32>,
}

impl RenderNode {
    fn kind(&self) -> NodeKind {
        match self.body {
            NodeBody::Oscillator(_) => NodeKind::Oscillator,
            NodeBody::Gain(_) => NodeKind::Gain,
            NodeBody::Effect(_) => NodeKind::Effect,
        }
    }
}

/// Owns every node and mixes them into a mono buffer
#[derive(Debug)]
pub struct RenderGraph {
    sample_rate: f32,
    next_id: u64,
    node_limit: usize,
    nodes: BTreeMap<NodeId, RenderNode>,
    order: Vec<NodeId>,
}

impl Default for RenderGraph {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_RATE)
    }
}

impl RenderGraph {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate: sample_rate as f32,
            next_id: 1,
            node_limit: DEFAULT_NODE_LIMIT,
            nodes: BTreeMap::new(),
            order: Vec::new(),
        }
    }

    pub fn with_node_limit(mut self, node_limit: usize) -> Self {
        self.node_limit = node_limit;
        self
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        if sample_rate == self.sample_rate {
            return;
        }
        self.sample_rate = sample_rate;
        for node in self.nodes.values_mut() {
            if let NodeBody::Effect(effect) = &mut node.body {
                effect.set_sample_rate(sample_rate);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains_key(&node)
    }

    pub fn kind(&self, node: NodeId) -> Option<NodeKind> {
        self.nodes.get(&node).map(RenderNode::kind)
    }

    pub fn output_of(&self, node: NodeId) -> Option<Destination> {
        self.nodes.get(&node).map(|n| n.output)
    }

    /// Oscillators currently in the started run-state
    pub fn running_oscillators(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|(_, node)| matches!(&node.body, NodeBody::Oscillator(osc) if osc.running))
            .map(|(id, _)| *id)
            .collect()
    }

    /// Final value of a parameter once any ramp in flight completes
    pub fn param_target(&self, node: NodeId, param: Param) -> Option<f64> {
        match (&self.nodes.get(&node)?.body, param) {
            (NodeBody::Oscillator(osc), Param::Frequency) => Some(osc.frequency.target),
            (NodeBody::Gain(gain), Param::Gain) => Some(gain.target),
            _ => None,
        }
    }

    fn insert(&mut self, output: Destination, body: NodeBody) -> Result<NodeId, GraphError> {
        if self.nodes.len() >= self.node_limit {
            return Err(GraphError::NodeLimit(self.node_limit));
        }
        if let Destination::Node(target) = output {
            if !self.nodes.contains_key(&target) {
                return Err(GraphError::UnknownNode(target));
            }
        }
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(id, RenderNode { output, body, input: Vec::new() });
        Ok(id)
    }

    fn node_mut(&mut self, node: NodeId) -> Result<&mut RenderNode, GraphError> {
        self.nodes.get_mut(&node).ok_or(GraphError::UnknownNode(node))
    }

    pub fn create_effect(&mut self, spec: &EffectSpec, output: Destination) -> Result<NodeId, GraphError> {
        let effect = build_effect(spec, self.sample_rate);
        self.insert(output, NodeBody::Effect(effect))
    }

    pub fn create_gain(&mut self, gain: f32, output: Destination) -> Result<NodeId, GraphError> {
        self.insert(output, NodeBody::Gain(Ramp::new(gain as f64)))
    }

    pub fn create_oscillator(&mut self, frequency: f64, output: Destination) -> Result<NodeId, GraphError> {
        let oscillator = Oscillator {
            frequency: Ramp::new(frequency),
            phase: 0.0,
            running: false,
        };
        self.insert(output, NodeBody::Oscillator(oscillator))
    }

    pub fn set_running(&mut self, node: NodeId, running: bool) -> Result<(), GraphError> {
        match &mut self.node_mut(node)?.body {
            NodeBody::Oscillator(osc) => {
                osc.running = running;
                Ok(())
            }
            _ => Err(GraphError::InvalidParam { node, param: Param::Frequency }),
        }
    }

    pub fn ramp(&mut self, node: NodeId, param: Param, target: f64, duration: Duration) -> Result<(), GraphError> {
        let sample_rate = self.sample_rate;
        match (&mut self.node_mut(node)?.body, param) {
            (NodeBody::Oscillator(osc), Param::Frequency) => osc.frequency.set(target, duration, sample_rate),
            (NodeBody::Gain(gain), Param::Gain) => gain.set(target, duration, sample_rate),
            _ => return Err(GraphError::InvalidParam { node, param }),
        }
        Ok(())
    }

    /// Remove a node. Nodes still feeding it become silent.
    pub fn remove(&mut self, node: NodeId) -> Result<(), GraphError> {
        self.nodes.remove(&node).map(|_| ()).ok_or(GraphError::UnknownNode(node))
    }

    /// Render `output.len()` mono frames.
    ///
    /// Node input buffers persist across calls, so rendering only allocates
    /// when the block size or node count grows.
    pub fn render(&mut self, output: &mut [f32]) {
        output.fill(0.0);
        let frames = output.len();
        let sample_rate = self.sample_rate;

        // Newest first: every node's inputs are complete before it runs
        self.order.clear();
        self.order.extend(self.nodes.keys().rev().copied());

        for &id in &self.order {
            let Some(node) = self.nodes.get_mut(&id) else {
                continue;
            };
            let mut buffer = std::mem::take(&mut node.input);
            buffer.resize(frames, 0.0);
            match &mut node.body {
                NodeBody::Oscillator(osc) => osc.render(&mut buffer, sample_rate),
                NodeBody::Gain(gain) => {
                    for sample in buffer.iter_mut() {
                        *sample *= gain.next() as f32;
                    }
                }
                NodeBody::Effect(effect) => effect.process(&mut buffer),
            }

            let destination = node.output;
            match destination {
                Destination::Output => mix_into(output, &buffer),
                Destination::Node(target) => {
                    if let Some(target) = self.nodes.get_mut(&target) {
                        target.input.resize(frames, 0.0);
                        mix_into(&mut target.input, &buffer);
                    }
                }
            }

            buffer.fill(0.0);
            if let Some(node) = self.nodes.get_mut(&id) {
                node.input = buffer;
            }
        }
    }
}

fn mix_into(acc: &mut [f32], buffer: &[f32]) {
    for (a, b) in acc.iter_mut().zip(buffer) {
        *a += *b;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peak(samples: &[f32]) -> f32 {
        samples.iter().fold(0.0f32, |acc, s| acc.max(s.abs()))
    }

    #[test]
    fn test_stopped_oscillator_is_silent() {
        let mut graph = RenderGraph::default();
        graph.create_oscillator(440.0, Destination::Output).unwrap();
        let mut out = vec![1.0; 256];
        graph.render(&mut out);
        assert_eq!(peak(&out), 0.0);
    }

    #[test]
    fn test_oscillator_through_gain() {
        let mut graph = RenderGraph::default();
        let gain = graph.create_gain(0.5, Destination::Output).unwrap();
        let osc = graph.create_oscillator(440.0, Destination::Node(gain)).unwrap();
        graph.set_running(osc, true).unwrap();

        let mut out = vec![0.0; 480];
        graph.render(&mut out);
        let level = peak(&out);
        assert!(level > 0.45 && level <= 0.5 + 1e-6);
    }

    #[test]
    fn test_gain_ramp_reaches_target() {
        let mut graph = RenderGraph::new(1_000);
        let gain = graph.create_gain(0.0, Destination::Output).unwrap();
        graph.ramp(gain, Param::Gain, 1.0, Duration::from_millis(10)).unwrap();

        let mut ramp = match &graph.nodes[&gain].body {
            NodeBody::Gain(ramp) => *ramp,
            _ => unreachable!(),
        };
        let values: Vec<f64> = (0..12).map(|_| ramp.next()).collect();
        assert!((values[4] - 0.5).abs() < 1e-9);
        assert_eq!(values[9], 1.0);
        assert_eq!(values[11], 1.0);
        assert_eq!(graph.param_target(gain, Param::Gain), Some(1.0));
    }

    #[test]
    fn test_connect_to_unknown_node_fails() {
        let mut graph = RenderGraph::default();
        let result = graph.create_gain(1.0, Destination::Node(NodeId(99)));
        assert!(matches!(result, Err(GraphError::UnknownNode(NodeId(99)))));
        assert!(graph.is_empty());
    }

    #[test]
    fn test_node_limit() {
        let mut graph = RenderGraph::default().with_node_limit(2);
        graph.create_gain(1.0, Destination::Output).unwrap();
        graph.create_gain(1.0, Destination::Output).unwrap();
        let result = graph.create_gain(1.0, Destination::Output);
        assert!(matches!(result, Err(GraphError::NodeLimit(2))));
    }

    #[test]
    fn test_ramp_rejects_wrong_param() {
        let mut graph = RenderGraph::default();
        let gain = graph.create_gain(1.0, Destination::Output).unwrap();
        let result = graph.ramp(gain, Param::Frequency, 220.0, Duration::ZERO);
        assert!(matches!(result, Err(GraphError::InvalidParam { .. })));
    }

    #[test]
    fn test_remove_twice_reports_unknown_node() {
        let mut graph = RenderGraph::default();
        let gain = graph.create_gain(1.0, Destination::Output).unwrap();
        graph.remove(gain).unwrap();
        assert!(matches!(graph.remove(gain), Err(GraphError::UnknownNode(_))));
    }

    #[test]
    fn test_clean_effect_chain_passes_signal() {
        let mut graph = RenderGraph::default();
        let chain = clocktone_core::EffectsPreset::Clean.config().chain();
        let mut destination = Destination::Output;
        for spec in chain.iter().rev() {
            destination = Destination::Node(graph.create_effect(spec, destination).unwrap());
        }
        let osc = graph.create_oscillator(220.0, destination).unwrap();
        graph.set_running(osc, true).unwrap();

        let mut out = vec![0.0; 4_800];
        graph.render(&mut out);
        // The compressor still applies with the clean preset
        assert!(peak(&out[2_400..]) > 0.05);
    }

    fn chain_graph() -> RenderGraph {
        let mut graph = RenderGraph::default();
        let filter = graph
            .create_effect(&EffectSpec::LowPass { frequency: 2_000.0 }, Destination::Output)
            .unwrap();
        let gain = graph.create_gain(0.5, Destination::Node(filter)).unwrap();
        for frequency in [220.0, 330.0] {
            let osc = graph.create_oscillator(frequency, Destination::Node(gain)).unwrap();
            graph.set_running(osc, true).unwrap();
        }
        graph.ramp(gain, Param::Gain, 0.25, Duration::from_millis(10)).unwrap();
        graph
    }

    #[test]
    fn test_block_size_does_not_change_output() {
        let mut whole = vec![0.0; 832];
        chain_graph().render(&mut whole);

        let mut graph = chain_graph();
        let mut blocks = Vec::new();
        for frames in [256, 64, 512] {
            let mut out = vec![0.0; frames];
            graph.render(&mut out);
            blocks.extend(out);
        }

        assert!(peak(&whole) > 0.1);
        assert_eq!(blocks, whole);
    }
}
