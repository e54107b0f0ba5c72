//! Graph Nodes
//!
//! This module defines the node types that live in the dependency graph.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexSet;
use serde::Serialize;

use super::field::ObjectId;
use crate::error::Result;

/// Unique identifier for a node in the dependency graph.
///
/// Ids are generational: when a node is removed its slot may be reused, but
/// the generation is bumped so stale ids never resolve to the new occupant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl NodeId {
    pub(crate) fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Slot index inside the arena.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Generation of the slot when this id was issued.
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

/// The kind of node in the dependency graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// A source node (signal or constant). Its value is written directly.
    /// A source only has dependencies when it is a field-bound object.
    Source,

    /// A derived node (memo). Recomputes from its dependencies and
    /// notifies its own observers.
    Derived,

    /// An effect node. Runs for its side effect and carries no value.
    Effect,
}

/// The reaction entrypoint of a derived or effect node.
///
/// Implementations recompute the node's value from the current values of
/// its dependencies and store it. They never touch the graph.
pub trait Evaluate: Send + Sync {
    fn evaluate(&self) -> Result<()>;
}

/// A node in the dependency graph.
pub struct Node {
    /// What kind of node this is.
    kind: NodeKind,

    /// Nodes that depend on this node. Iteration order is insertion order.
    observers: IndexSet<NodeId>,

    /// Nodes that this node depends on.
    dependencies: IndexSet<NodeId>,

    /// Recomputation entrypoint. `None` for sources and unbound nodes.
    evaluator: Option<Arc<dyn Evaluate>>,

    /// Set when this node is the "whole object" node of a field owner.
    owner: Option<ObjectId>,
}

impl Node {
    /// Create a new node with the given kind and no edges.
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            observers: IndexSet::new(),
            dependencies: IndexSet::new(),
            evaluator: None,
            owner: None,
        }
    }

    /// Get the node's kind.
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Get all observers (dependents).
    pub fn observers(&self) -> &IndexSet<NodeId> {
        &self.observers
    }

    /// Get all dependencies.
    pub fn dependencies(&self) -> &IndexSet<NodeId> {
        &self.dependencies
    }

    /// The node's recomputation entrypoint, if bound.
    pub fn evaluator(&self) -> Option<&Arc<dyn Evaluate>> {
        self.evaluator.as_ref()
    }

    /// The field owner this node represents, if any.
    pub fn owner(&self) -> Option<ObjectId> {
        self.owner
    }

    pub(crate) fn set_evaluator(
        &mut self,
        evaluator: Option<Arc<dyn Evaluate>>,
    ) -> Option<Arc<dyn Evaluate>> {
        std::mem::replace(&mut self.evaluator, evaluator)
    }

    pub(crate) fn set_owner(&mut self, owner: ObjectId) {
        self.owner = Some(owner);
    }

    pub(crate) fn add_observer(&mut self, node_id: NodeId) -> bool {
        self.observers.insert(node_id)
    }

    pub(crate) fn remove_observer(&mut self, node_id: NodeId) -> bool {
        self.observers.shift_remove(&node_id)
    }

    pub(crate) fn add_dependency(&mut self, node_id: NodeId) -> bool {
        self.dependencies.insert(node_id)
    }

    pub(crate) fn remove_dependency(&mut self, node_id: NodeId) -> bool {
        self.dependencies.shift_remove(&node_id)
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("kind", &self.kind)
            .field("observers", &self.observers)
            .field("dependencies", &self.dependencies)
            .field("bound", &self.evaluator.is_some())
            .field("owner", &self.owner)
            .finish()
    }
}
