//! Value Resource
//!
//! Every node owns exactly one value slot. The slot starts empty, is filled
//! by the first write, and every later write replaces the value in place.
//! Reading an empty slot is an error, never a default value.

use crate::error::{ReactionError, Result};
use crate::graph::NodeId;

/// Typed storage for one node's value.
#[derive(Debug)]
pub struct Resource<T> {
    /// Node that owns this slot; used in error reports.
    node: NodeId,
    value: Option<T>,
}

impl<T> Resource<T> {
    /// An uninitialized slot.
    pub fn empty(node: NodeId) -> Self {
        Self { node, value: None }
    }

    /// A slot initialized with `value`.
    pub fn new(node: NodeId, value: T) -> Self {
        Self {
            node,
            value: Some(value),
        }
    }

    /// Store a value. The first call initializes the slot; later calls
    /// overwrite the existing value without reallocating the slot.
    pub fn update_value(&mut self, value: T) {
        match &mut self.value {
            Some(slot) => *slot = value,
            None => self.value = Some(value),
        }
    }

    /// Borrow the stored value.
    pub fn get_value(&self) -> Result<&T> {
        self.value
            .as_ref()
            .ok_or(ReactionError::UninitializedResource { node: self.node })
    }

    /// Whether a value has ever been stored.
    pub fn is_initialized(&self) -> bool {
        self.value.is_some()
    }
}

impl Resource<()> {
    /// Storage for nodes that produce no value (effects). Always reads as
    /// the unit sentinel.
    pub fn unit(node: NodeId) -> Self {
        Self::new(node, ())
    }
}
