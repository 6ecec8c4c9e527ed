//! Shared effects chain between the voices and the final output

use clocktone_core::EffectsConfig;
use tracing::{debug, warn};

use crate::graph::{AudioGraph, Destination, GraphError, NodeId};

/// Fixed-topology chain built once per engine lifetime. Every voice feeds
/// [`EffectsStage::input`]; the last stage feeds the output.
#[derive(Debug)]
pub struct EffectsStage {
    config: EffectsConfig,
    /// Signal order, input first
    nodes: Vec<NodeId>,
}

impl EffectsStage {
    /// Nodes are created from the output backwards so each one can connect
    /// to an existing successor. Partially built chains are released on
    /// failure.
    pub fn build<G: AudioGraph>(graph: &mut G, config: &EffectsConfig) -> Result<Self, GraphError> {
        let chain = config.chain();
        let mut nodes = Vec::with_capacity(chain.len());
        let mut output = Destination::Output;

        for spec in chain.iter().rev() {
            match graph.create_effect(spec, output) {
                Ok(node) => {
                    nodes.push(node);
                    output = Destination::Node(node);
                }
                Err(e) => {
                    for node in nodes.iter().rev() {
                        if let Err(cleanup) = graph.dispose(*node) {
                            warn!(node = %node, error = %cleanup, "Failed to release effect node");
                        }
                    }
                    return Err(e);
                }
            }
        }
        nodes.reverse();

        debug!(stages = nodes.len(), "Effects stage built");
        Ok(Self { config: *config, nodes })
    }

    pub fn config(&self) -> &EffectsConfig {
        &self.config
    }

    /// Where voices connect. `Output` once disposed.
    pub fn input(&self) -> Destination {
        self.nodes
            .first()
            .map(|node| Destination::Node(*node))
            .unwrap_or(Destination::Output)
    }

    pub fn node_ids(&self) -> &[NodeId] {
        &self.nodes
    }

    pub fn is_disposed(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Release every effect node in signal order. Per-node failures are
    /// logged and the rest are still released.
    pub fn dispose<G: AudioGraph>(&mut self, graph: &mut G) {
        for node in self.nodes.drain(..) {
            if let Err(e) = graph.dispose(node) {
                warn!(node = %node, error = %e, "Failed to release effect node");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::NodeKind;
    use crate::offline::OfflineGraph;
    use clocktone_core::EffectsPreset;

    #[test]
    fn test_chain_is_linked_in_order() {
        let mut graph = OfflineGraph::default();
        let stage = EffectsStage::build(&mut graph, &EffectsPreset::Ambient.config()).unwrap();
        let nodes = stage.node_ids();

        assert_eq!(nodes.len(), 5);
        assert_eq!(stage.input(), Destination::Node(nodes[0]));
        for pair in nodes.windows(2) {
            assert_eq!(graph.output_of(pair[0]), Some(Destination::Node(pair[1])));
        }
        assert_eq!(graph.output_of(nodes[4]), Some(Destination::Output));
        assert!(nodes.iter().all(|n| graph.kind(*n) == Some(NodeKind::Effect)));
    }

    #[test]
    fn test_failed_build_releases_partial_chain() {
        let mut graph = OfflineGraph::default();
        graph.fail_allocations_after(3);

        assert!(EffectsStage::build(&mut graph, &EffectsConfig::default()).is_err());
        assert_eq!(graph.live_nodes(), 0);
    }

    #[test]
    fn test_dispose_is_idempotent() {
        let mut graph = OfflineGraph::default();
        let mut stage = EffectsStage::build(&mut graph, &EffectsConfig::default()).unwrap();
        let nodes = stage.node_ids().to_vec();

        stage.dispose(&mut graph);
        stage.dispose(&mut graph);

        assert_eq!(graph.disposed(), nodes);
        assert!(stage.is_disposed());
        assert_eq!(stage.input(), Destination::Output);
    }
}
