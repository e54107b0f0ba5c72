//! Serializable view of a dependency graph, for debugging and tooling.

use serde::Serialize;

use super::dependency::DependencyGraph;
use super::node::{NodeId, NodeKind};
use crate::error::Result;

/// One node in a [`GraphSnapshot`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeSnapshot {
    pub id: NodeId,
    pub kind: NodeKind,
    pub bound: bool,
    pub observers: usize,
    pub dependencies: usize,
}

/// A point-in-time copy of the graph structure. Values are not included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphSnapshot {
    pub nodes: Vec<NodeSnapshot>,
    /// `(dependency, dependent)` pairs.
    pub edges: Vec<(NodeId, NodeId)>,
}

impl GraphSnapshot {
    pub fn capture(graph: &DependencyGraph) -> Self {
        let nodes = graph
            .nodes()
            .map(|(id, node)| NodeSnapshot {
                id,
                kind: node.kind(),
                bound: node.evaluator().is_some(),
                observers: node.observers().len(),
                dependencies: node.dependencies().len(),
            })
            .collect();
        let mut edges: Vec<_> = graph.edges().collect();
        edges.sort();

        Self { nodes, edges }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_lists_nodes_and_edges() {
        let mut graph = DependencyGraph::new();
        let a = graph.add_node(NodeKind::Source);
        let b = graph.add_node(NodeKind::Derived);
        graph.add_observer(a, b).unwrap();

        let snapshot = GraphSnapshot::capture(&graph);
        assert_eq!(snapshot.nodes.len(), 2);
        assert_eq!(snapshot.edges, vec![(a, b)]);
        assert_eq!(snapshot.nodes[0].observers, 1);
        assert_eq!(snapshot.nodes[1].dependencies, 1);

        let json = snapshot.to_json().unwrap();
        assert!(json.contains("\"derived\""));
    }
}
