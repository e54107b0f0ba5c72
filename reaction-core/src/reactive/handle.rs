//! Handle Lifecycle
//!
//! Consumers never own nodes directly. They hold [`Handle`]s, and each node
//! keeps an atomic count of the handles that currently refer to it:
//!
//! - creating or cloning a handle increments the count
//! - dropping a handle decrements it
//! - the drop that brings the count to zero removes the node from the
//!   dependency graph (and from the field graph if it is an object node)
//!
//! Formulas hold handles to the nodes they read, so a dependency lives at
//! least as long as each of its dependents. Because the graph is acyclic,
//! handles can never form a reference cycle.
//!
//! A [`WeakHandle`] observes a node without keeping it alive. Reading
//! through it after the node is gone fails with
//! [`ReactionError::ExpiredHandle`].

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use super::resource::Resource;
use super::runtime::Runtime;
use crate::error::{ReactionError, Result};
use crate::graph::NodeId;

/// Bounds every reactive value must satisfy.
pub trait Value: Clone + Send + Sync + 'static {}

impl<T> Value for T where T: Clone + Send + Sync + 'static {}

/// Shared per-node state: the value slot and the live handle count.
pub(crate) struct NodeCell<T> {
    id: NodeId,
    handles: AtomicUsize,
    resource: RwLock<Resource<T>>,
}

impl<T: Value> NodeCell<T> {
    pub(crate) fn new(id: NodeId, resource: Resource<T>) -> Self {
        Self {
            id,
            handles: AtomicUsize::new(0),
            resource: RwLock::new(resource),
        }
    }

    pub(crate) fn id(&self) -> NodeId {
        self.id
    }

    /// Clone the current value out. The lock is released before returning,
    /// so callers may run user code with the result.
    pub(crate) fn read(&self) -> Result<T> {
        self.resource.read().get_value().cloned()
    }

    pub(crate) fn update_value(&self, value: T) {
        self.resource.write().update_value(value);
    }

    fn is_initialized(&self) -> bool {
        self.resource.read().is_initialized()
    }
}

/// A refcounted reference to one node.
pub struct Handle<T: Value> {
    runtime: Runtime,
    cell: Arc<NodeCell<T>>,
}

impl<T: Value> Handle<T> {
    pub(crate) fn new(runtime: Runtime, cell: Arc<NodeCell<T>>) -> Self {
        cell.handles.fetch_add(1, Ordering::Relaxed);
        Self { runtime, cell }
    }

    /// Id of the node this handle refers to.
    pub fn node_id(&self) -> NodeId {
        self.cell.id
    }

    /// Read the current value.
    pub fn get(&self) -> Result<T> {
        self.cell.read()
    }

    /// Whether the node has a value yet.
    pub fn is_initialized(&self) -> bool {
        self.cell.is_initialized()
    }

    /// Number of live handles to this node, including this one.
    pub fn handle_count(&self) -> usize {
        self.cell.handles.load(Ordering::Acquire)
    }

    /// Create a non-owning reference to the node.
    pub fn downgrade(&self) -> WeakHandle<T> {
        WeakHandle {
            runtime: self.runtime.clone(),
            id: self.cell.id,
            cell: Arc::downgrade(&self.cell),
        }
    }

    /// The runtime this node belongs to.
    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    pub(crate) fn cell(&self) -> &Arc<NodeCell<T>> {
        &self.cell
    }
}

impl<T: Value> Clone for Handle<T> {
    fn clone(&self) -> Self {
        Self::new(self.runtime.clone(), Arc::clone(&self.cell))
    }
}

impl<T: Value> Drop for Handle<T> {
    fn drop(&mut self) {
        if self.cell.handles.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.runtime.release(self.cell.id);
        }
    }
}

impl<T: Value + fmt::Debug> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("node", &self.cell.id)
            .field("value", &self.get().ok())
            .field("handle_count", &self.handle_count())
            .finish()
    }
}

/// A reference to a node that does not keep it alive.
pub struct WeakHandle<T: Value> {
    runtime: Runtime,
    id: NodeId,
    cell: Weak<NodeCell<T>>,
}

impl<T: Value> WeakHandle<T> {
    /// Id of the node this handle refers to.
    pub fn node_id(&self) -> NodeId {
        self.id
    }

    /// Whether the node has been disposed.
    pub fn is_expired(&self) -> bool {
        self.live_cell().is_err()
    }

    /// Read the current value, failing if the node has been disposed.
    pub fn get(&self) -> Result<T> {
        self.live_cell()?.read()
    }

    /// Take a new owning handle, failing if the node has been disposed.
    pub fn upgrade(&self) -> Result<Handle<T>> {
        let cell = self.live_cell()?;
        cell.handles
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |count| {
                (count > 0).then_some(count + 1)
            })
            .map_err(|_| ReactionError::ExpiredHandle { node: self.id })?;
        Ok(Handle {
            runtime: self.runtime.clone(),
            cell,
        })
    }

    fn live_cell(&self) -> Result<Arc<NodeCell<T>>> {
        // The generation check catches disposal even if the cell itself is
        // still referenced somewhere.
        if !self.runtime.contains(self.id) {
            return Err(ReactionError::ExpiredHandle { node: self.id });
        }
        self.cell
            .upgrade()
            .ok_or(ReactionError::ExpiredHandle { node: self.id })
    }
}

impl<T: Value> Clone for WeakHandle<T> {
    fn clone(&self) -> Self {
        Self {
            runtime: self.runtime.clone(),
            id: self.id,
            cell: Weak::clone(&self.cell),
        }
    }
}

impl<T: Value> fmt::Debug for WeakHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakHandle")
            .field("node", &self.id)
            .field("expired", &self.is_expired())
            .finish()
    }
}

/// Anything that can be read as a dependency.
pub trait Observable {
    type Output: Value;

    fn handle(&self) -> &Handle<Self::Output>;

    fn node_id(&self) -> NodeId {
        self.handle().node_id()
    }

    fn get(&self) -> Result<Self::Output> {
        self.handle().get()
    }
}

impl<T: Value> Observable for Handle<T> {
    type Output = T;

    fn handle(&self) -> &Handle<T> {
        self
    }
}
