//! Node graph abstraction over the audio platform

use std::fmt;
use std::future::Future;
use std::time::Duration;

use clocktone_core::EffectSpec;
use thiserror::Error;

use crate::audio_io::AudioOutputError;

/// Handle to a node allocated by an [`AudioGraph`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// Where a node sends its output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    Node(NodeId),
    /// The final audio output
    Output,
}

/// Automatable node parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Param {
    /// Oscillator frequency in Hz
    Frequency,
    /// Linear gain
    Gain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Oscillator,
    Gain,
    Effect,
}

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("Unknown node: {0}")]
    UnknownNode(NodeId),
    #[error("Node limit reached ({0} nodes)")]
    NodeLimit(usize),
    #[error("{node} has no {param:?} parameter")]
    InvalidParam { node: NodeId, param: Param },
    #[error("Audio backend unavailable: {0}")]
    Unavailable(String),
    #[error("Audio output error: {0}")]
    Output(#[from] AudioOutputError),
}

/// The audio platform the engine drives.
///
/// A node can only be connected to a node that already exists, so edges
/// always run from newer to older nodes.
pub trait AudioGraph {
    /// Activate the audio context. Only succeeds after a user gesture on
    /// platforms that require one.
    fn resume(&mut self) -> impl Future<Output = Result<(), GraphError>>;

    fn create_effect(&mut self, spec: &EffectSpec, output: Destination) -> Result<NodeId, GraphError>;

    fn create_gain(&mut self, gain: f32, output: Destination) -> Result<NodeId, GraphError>;

    /// New oscillators are stopped
    fn create_oscillator(&mut self, frequency: f64, output: Destination) -> Result<NodeId, GraphError>;

    fn start_oscillator(&mut self, node: NodeId) -> Result<(), GraphError>;

    fn stop_oscillator(&mut self, node: NodeId) -> Result<(), GraphError>;

    /// Move `param` linearly to `target` over `duration`
    fn ramp(&mut self, node: NodeId, param: Param, target: f64, duration: Duration) -> Result<(), GraphError>;

    /// Release a node. Releasing an unknown node is an error.
    fn dispose(&mut self, node: NodeId) -> Result<(), GraphError>;
}
