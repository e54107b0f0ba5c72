//! Field Graph
//!
//! Structured values can expose some of their fields as independent
//! reactive sources. The field graph remembers which field nodes belong to
//! which owning object so that the node wrapping the whole object observes
//! every one of them.
//!
//! Objects usually build their fields before the whole value is wrapped in
//! a node, so registration order is not fixed: fields registered before the
//! owner node are wired when the owner binds, and fields registered after
//! are wired as they arrive (see `Runtime::field`).
//!
//! An id maps to at most one owner node. When several object nodes share an
//! id, the most recently bound one receives later fields, and releasing an
//! older one leaves the newer registration in place.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexSet;
use serde::Serialize;

use super::dependency::DependencyGraph;
use super::node::NodeId;
use crate::error::Result;

/// Process-wide unique identity of an object that owns reactive fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ObjectId(u64);

impl ObjectId {
    /// Generate a new unique object ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

/// Implemented by values whose fields are reactive nodes.
///
/// ```rust,ignore
/// #[derive(Clone)]
/// struct Person {
///     id: ObjectId,
///     name: Signal<String>,
/// }
///
/// impl FieldOwner for Person {
///     fn object_id(&self) -> ObjectId {
///         self.id
///     }
/// }
/// ```
pub trait FieldOwner {
    fn object_id(&self) -> ObjectId;
}

/// Registry from owner identity to field nodes and the owner's own node.
#[derive(Debug, Default)]
pub struct FieldGraph {
    fields: HashMap<ObjectId, IndexSet<NodeId>>,
    owners: HashMap<ObjectId, NodeId>,
}

impl FieldGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `node` as a field of `owner`.
    pub fn add_obj(&mut self, owner: ObjectId, node: NodeId) {
        self.fields.entry(owner).or_default().insert(node);
    }

    /// Drop every registration for `owner`. The field nodes themselves stay
    /// in the dependency graph; they are refcounted independently.
    ///
    /// Callers releasing an object node should check `owner_node` first, so
    /// a stale node does not clear a newer owner's registrations.
    pub fn delete_obj(&mut self, owner: ObjectId) {
        self.fields.remove(&owner);
        self.owners.remove(&owner);
    }

    /// Make `node` the whole-object node for `owner` and add an edge from
    /// every field already registered under `owner` to it. A previously
    /// bound node for the same id is superseded.
    ///
    /// Returns the number of edges added. Fields that have been disposed
    /// are pruned instead of wired.
    pub fn bind_field(
        &mut self,
        owner: ObjectId,
        node: NodeId,
        graph: &mut DependencyGraph,
    ) -> Result<usize> {
        self.owners.insert(owner, node);

        let Some(fields) = self.fields.get_mut(&owner) else {
            return Ok(0);
        };
        fields.retain(|field| graph.contains(*field));

        let mut added = 0;
        for &field in fields.iter() {
            if graph.add_observer(field, node)? {
                added += 1;
            }
        }

        tracing::debug!(owner = owner.raw(), %node, fields = added, "bound object fields");
        Ok(added)
    }

    /// The whole-object node bound for `owner`, if any.
    pub fn owner_node(&self, owner: ObjectId) -> Option<NodeId> {
        self.owners.get(&owner).copied()
    }

    /// Field nodes registered under `owner`.
    pub fn fields_of(&self, owner: ObjectId) -> impl Iterator<Item = NodeId> + '_ {
        self.fields.get(&owner).into_iter().flatten().copied()
    }

    /// Number of owners with at least one registration.
    pub fn object_count(&self) -> usize {
        self.fields
            .keys()
            .chain(self.owners.keys())
            .collect::<std::collections::HashSet<_>>()
            .len()
    }
}
