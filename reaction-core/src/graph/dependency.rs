//! Dependency Graph
//!
//! The registry of nodes and the directed edges between them. An edge
//! `dependency -> dependent` is stored twice: as membership in the
//! dependency's observer set (used for propagation) and in the dependent's
//! dependency set (used for rebinding and removal).
//!
//! # Acyclicity
//!
//! Every edge insertion runs a depth-first search from the dependent over
//! the existing observer edges. If the dependency is reachable, the new edge
//! would close a cycle and is rejected before anything is written, so a
//! failed insertion leaves the edge set exactly as it was.
//!
//! The check is O(V + E) per insertion. Edges are only added when a formula
//! is bound, never during propagation, so this cost is paid once per bind.

use std::collections::HashSet;

use indexmap::IndexSet;
use smallvec::SmallVec;

use super::arena::Arena;
use super::node::{Node, NodeId, NodeKind};
use crate::error::{ReactionError, Result};

/// The node arena plus its edge sets.
#[derive(Debug)]
pub struct DependencyGraph {
    /// All nodes in the graph, indexed by generational id.
    nodes: Arena<Node>,

    /// Number of edges currently stored.
    edge_count: usize,
}

impl DependencyGraph {
    /// Create a new empty graph.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create a graph with room for `capacity` nodes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Arena::with_capacity(capacity),
            edge_count: 0,
        }
    }

    /// Register a node with empty observer and dependency sets.
    pub fn add_node(&mut self, kind: NodeKind) -> NodeId {
        self.nodes.insert(Node::new(kind))
    }

    /// Remove a node from the graph.
    ///
    /// Also removes all edges involving this node. Returns the removed node
    /// so the caller controls when its evaluator is dropped.
    pub fn remove_node(&mut self, node_id: NodeId) -> Option<Node> {
        let node = self.nodes.remove(node_id)?;

        // Remove this node from its dependencies' observer sets
        for dep_id in node.dependencies() {
            if let Some(dep) = self.nodes.get_mut(*dep_id) {
                dep.remove_observer(node_id);
            }
        }

        // Remove this node from its observers' dependency sets
        for observer_id in node.observers() {
            if let Some(observer) = self.nodes.get_mut(*observer_id) {
                observer.remove_dependency(node_id);
            }
        }

        self.edge_count -= node.dependencies().len() + node.observers().len();
        Some(node)
    }

    /// Check whether the id still refers to a live node.
    pub fn contains(&self, node_id: NodeId) -> bool {
        self.nodes.contains(node_id)
    }

    /// Get a reference to a node.
    pub fn get(&self, node_id: NodeId) -> Option<&Node> {
        self.nodes.get(node_id)
    }

    pub(crate) fn get_mut(&mut self, node_id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(node_id)
    }

    /// Get the observers (dependents) of a node.
    pub fn observers(&self, node_id: NodeId) -> Option<&IndexSet<NodeId>> {
        self.nodes.get(node_id).map(Node::observers)
    }

    /// Get the dependencies of a node.
    pub fn dependencies(&self, node_id: NodeId) -> Option<&IndexSet<NodeId>> {
        self.nodes.get(node_id).map(Node::dependencies)
    }

    /// Check whether the edge `dependency -> dependent` exists.
    pub fn has_edge(&self, dependency: NodeId, dependent: NodeId) -> bool {
        self.observers(dependency)
            .map(|observers| observers.contains(&dependent))
            .unwrap_or(false)
    }

    /// Add the edge `dependency -> dependent`.
    ///
    /// Returns `Ok(true)` if the edge was inserted and `Ok(false)` if it was
    /// already present. Fails without modifying the graph if either node is
    /// gone, if the two nodes are the same, or if the edge would close a
    /// cycle.
    pub fn add_observer(&mut self, dependency: NodeId, dependent: NodeId) -> Result<bool> {
        if dependency == dependent {
            return Err(ReactionError::SelfDependency { node: dependency });
        }
        for node in [dependency, dependent] {
            if !self.contains(node) {
                return Err(ReactionError::ExpiredHandle { node });
            }
        }
        if self.has_edge(dependency, dependent) {
            return Ok(false);
        }

        if self.reaches(dependent, dependency) {
            tracing::debug!(%dependency, %dependent, "rejected edge: would create a cycle");
            return Err(ReactionError::Cycle {
                dependency,
                dependent,
            });
        }

        self.link(dependency, dependent);
        Ok(true)
    }

    /// Remove the edge `dependency -> dependent`. Returns whether it existed.
    pub fn remove_observer(&mut self, dependency: NodeId, dependent: NodeId) -> bool {
        let removed = self
            .nodes
            .get_mut(dependency)
            .map(|node| node.remove_observer(dependent))
            .unwrap_or(false);
        if removed {
            if let Some(node) = self.nodes.get_mut(dependent) {
                node.remove_dependency(dependency);
            }
            self.edge_count -= 1;
        }
        removed
    }

    /// Remove every incoming edge of `node_id`, returning the former
    /// dependencies in insertion order.
    pub fn detach_dependencies(&mut self, node_id: NodeId) -> SmallVec<[NodeId; 4]> {
        let previous: SmallVec<[NodeId; 4]> = match self.dependencies(node_id) {
            Some(deps) => deps.iter().copied().collect(),
            None => return SmallVec::new(),
        };
        for &dep in &previous {
            self.remove_observer(dep, node_id);
        }
        previous
    }

    /// Re-insert edges that were known to be acyclic, skipping any whose
    /// endpoints have since disappeared.
    pub(crate) fn restore_dependencies(&mut self, node_id: NodeId, dependencies: &[NodeId]) {
        for &dep in dependencies {
            if self.contains(dep) && self.contains(node_id) && !self.has_edge(dep, node_id) {
                self.link(dep, node_id);
            }
        }
    }

    fn link(&mut self, dependency: NodeId, dependent: NodeId) {
        if let Some(node) = self.nodes.get_mut(dependency) {
            node.add_observer(dependent);
        }
        if let Some(node) = self.nodes.get_mut(dependent) {
            node.add_dependency(dependency);
        }
        self.edge_count += 1;
    }

    /// Depth-first search over observer edges: is `to` reachable from `from`?
    pub fn reaches(&self, from: NodeId, to: NodeId) -> bool {
        let mut visited = HashSet::new();
        let mut stack = vec![from];

        while let Some(node_id) = stack.pop() {
            if node_id == to {
                return true;
            }
            if !visited.insert(node_id) {
                continue;
            }
            if let Some(observers) = self.observers(node_id) {
                stack.extend(observers.iter().rev().copied());
            }
        }

        false
    }

    /// Get the total number of nodes in the graph.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Get the total number of edges in the graph.
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// Iterate over all live nodes.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter()
    }

    /// Iterate over all edges as `(dependency, dependent)` pairs.
    pub fn edges(&self) -> impl Iterator<Item = (NodeId, NodeId)> + '_ {
        self.nodes.iter().flat_map(|(id, node)| {
            node.observers()
                .iter()
                .map(move |&observer| (id, observer))
        })
    }
}

impl Default for DependencyGraph {
    fn default() -> Self {
        Self::new()
    }
}
