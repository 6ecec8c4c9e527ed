//! Headless graph: renders on demand, logs every operation, and can be told
//! to fail

use std::collections::HashSet;
use std::future::{Future, ready};
use std::time::Duration;

use clocktone_core::EffectSpec;
use tracing::debug;

use crate::graph::{AudioGraph, Destination, GraphError, NodeId, NodeKind, Param};
use crate::render::{DEFAULT_SAMPLE_RATE, RenderGraph};

#[derive(Debug, Clone, PartialEq)]
pub enum GraphEvent {
    Resumed,
    Created { node: NodeId, kind: NodeKind, output: Destination },
    Started(NodeId),
    Stopped(NodeId),
    Ramped { node: NodeId, param: Param, target: f64 },
    Disposed(NodeId),
}

#[derive(Debug)]
pub struct OfflineGraph {
    graph: RenderGraph,
    events: Vec<GraphEvent>,
    permission_denied: bool,
    allocations_left: Option<usize>,
    failing_disposals: HashSet<NodeId>,
    failing_ramps: HashSet<NodeId>,
}

impl Default for OfflineGraph {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_RATE)
    }
}

impl OfflineGraph {
    pub fn new(sample_rate: u32) -> Self {
        Self::with_render_graph(RenderGraph::new(sample_rate))
    }

    pub fn with_render_graph(graph: RenderGraph) -> Self {
        Self {
            graph,
            events: Vec::new(),
            permission_denied: false,
            allocations_left: None,
            failing_disposals: HashSet::new(),
            failing_ramps: HashSet::new(),
        }
    }

    /// Make `resume` fail as if no user gesture preceded it
    pub fn deny_permission(&mut self, denied: bool) {
        self.permission_denied = denied;
    }

    /// Allow `count` more node allocations, then fail the rest
    pub fn fail_allocations_after(&mut self, count: usize) {
        self.allocations_left = Some(count);
    }

    pub fn restore_allocations(&mut self) {
        self.allocations_left = None;
    }

    /// Make every disposal of `node` fail
    pub fn fail_disposal_of(&mut self, node: NodeId) {
        self.failing_disposals.insert(node);
    }

    /// Make every ramp on `node` fail until `restore_ramps`
    pub fn fail_ramps_of(&mut self, node: NodeId) {
        self.failing_ramps.insert(node);
    }

    pub fn restore_ramps(&mut self) {
        self.failing_ramps.clear();
    }

    pub fn events(&self) -> &[GraphEvent] {
        &self.events
    }

    pub fn clear_events(&mut self) {
        self.events.clear();
    }

    pub fn running_oscillators(&self) -> Vec<NodeId> {
        self.graph.running_oscillators()
    }

    pub fn live_nodes(&self) -> usize {
        self.graph.len()
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.graph.contains(node)
    }

    pub fn kind(&self, node: NodeId) -> Option<NodeKind> {
        self.graph.kind(node)
    }

    pub fn output_of(&self, node: NodeId) -> Option<Destination> {
        self.graph.output_of(node)
    }

    pub fn param_target(&self, node: NodeId, param: Param) -> Option<f64> {
        self.graph.param_target(node, param)
    }

    /// Nodes disposed so far, in order
    pub fn disposed(&self) -> Vec<NodeId> {
        self.events
            .iter()
            .filter_map(|event| match event {
                GraphEvent::Disposed(node) => Some(*node),
                _ => None,
            })
            .collect()
    }

    /// Render `frames` mono frames
    pub fn render(&mut self, frames: usize) -> Vec<f32> {
        let mut output = vec![0.0; frames];
        self.graph.render(&mut output);
        output
    }

    fn allocate(&mut self) -> Result<(), GraphError> {
        match self.allocations_left {
            Some(0) => {
                debug!("Injected allocation failure");
                Err(GraphError::Unavailable("node allocation failed".into()))
            }
            Some(ref mut left) => {
                *left -= 1;
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn record_created(&mut self, node: NodeId, output: Destination) -> NodeId {
        if let Some(kind) = self.graph.kind(node) {
            self.events.push(GraphEvent::Created { node, kind, output });
        }
        node
    }
}

impl AudioGraph for OfflineGraph {
    fn resume(&mut self) -> impl Future<Output = Result<(), GraphError>> {
        let result = if self.permission_denied {
            Err(GraphError::Unavailable("audio context not allowed to start".into()))
        } else {
            self.events.push(GraphEvent::Resumed);
            Ok(())
        };
        ready(result)
    }

    fn create_effect(&mut self, spec: &EffectSpec, output: Destination) -> Result<NodeId, GraphError> {
        self.allocate()?;
        let node = self.graph.create_effect(spec, output)?;
        Ok(self.record_created(node, output))
    }

    fn create_gain(&mut self, gain: f32, output: Destination) -> Result<NodeId, GraphError> {
        self.allocate()?;
        let node = self.graph.create_gain(gain, output)?;
        Ok(self.record_created(node, output))
    }

    fn create_oscillator(&mut self, frequency: f64, output: Destination) -> Result<NodeId, GraphError> {
        self.allocate()?;
        let node = self.graph.create_oscillator(frequency, output)?;
        Ok(self.record_created(node, output))
    }

    fn start_oscillator(&mut self, node: NodeId) -> Result<(), GraphError> {
        self.graph.set_running(node, true)?;
        self.events.push(GraphEvent::Started(node));
        Ok(())
    }

    fn stop_oscillator(&mut self, node: NodeId) -> Result<(), GraphError> {
        self.graph.set_running(node, false)?;
        self.events.push(GraphEvent::Stopped(node));
        Ok(())
    }

    fn ramp(&mut self, node: NodeId, param: Param, target: f64, duration: Duration) -> Result<(), GraphError> {
        if self.failing_ramps.contains(&node) {
            return Err(GraphError::Unavailable(format!("failed to schedule ramp on {node}")));
        }
        self.graph.ramp(node, param, target, duration)?;
        self.events.push(GraphEvent::Ramped { node, param, target });
        Ok(())
    }

    fn dispose(&mut self, node: NodeId) -> Result<(), GraphError> {
        if self.failing_disposals.contains(&node) {
            return Err(GraphError::Unavailable(format!("failed to release {node}")));
        }
        self.graph.remove(node)?;
        self.events.push(GraphEvent::Disposed(node));
        Ok(())
    }
}
