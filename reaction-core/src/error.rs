//! Error types for the reaction runtime.
//!
//! Every failure is raised synchronously to the caller of the operation that
//! triggered it (bind, reset, get, or a value write). Nothing is retried and
//! nothing is swallowed inside the engine.

use crate::graph::NodeId;

/// Result type alias for reaction operations.
pub type Result<T> = std::result::Result<T, ReactionError>;

/// Errors produced by the dependency graph and its handles.
#[derive(Debug, thiserror::Error)]
pub enum ReactionError {
    /// A node was asked to depend on itself.
    #[error("node {node} cannot depend on itself")]
    SelfDependency { node: NodeId },

    /// Adding the edge would close a cycle in the graph.
    #[error("edge {dependency} -> {dependent} would create a cycle")]
    Cycle { dependency: NodeId, dependent: NodeId },

    /// A value was read before anything was ever stored.
    #[error("node {node} was read before it was initialized")]
    UninitializedResource { node: NodeId },

    /// The node behind a handle has already been disposed.
    #[error("node {node} has been disposed")]
    ExpiredHandle { node: NodeId },

    /// A handle from a different runtime was used as a dependency.
    #[error("node {node} belongs to a different runtime")]
    ForeignHandle { node: NodeId },

    /// Runtime configuration could not be parsed.
    #[error("invalid runtime configuration: {0}")]
    Config(#[from] serde_json::Error),
}

impl ReactionError {
    /// Returns true for both general cycles and self dependencies.
    pub fn is_cycle(&self) -> bool {
        matches!(
            self,
            ReactionError::Cycle { .. } | ReactionError::SelfDependency { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{DependencyGraph, NodeKind};

    #[test]
    fn self_dependency_counts_as_cycle() {
        let mut graph = DependencyGraph::new();
        let node = graph.add_node(NodeKind::Derived);

        let err = ReactionError::SelfDependency { node };
        assert!(err.is_cycle());

        let err = ReactionError::UninitializedResource { node };
        assert!(!err.is_cycle());
    }

    #[test]
    fn messages_name_the_nodes() {
        let mut graph = DependencyGraph::new();
        let a = graph.add_node(NodeKind::Source);
        let b = graph.add_node(NodeKind::Derived);

        let msg = ReactionError::Cycle { dependency: a, dependent: b }.to_string();
        assert!(msg.contains(&a.to_string()));
        assert!(msg.contains(&b.to_string()));

        let foreign = ReactionError::ForeignHandle { node: a };
        assert!(foreign.to_string().contains(&a.to_string()));
        assert!(!foreign.is_cycle());
    }
}
