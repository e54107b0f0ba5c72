//! Reactive Context
//!
//! The reactive context is handed to a formula while it runs. Every read
//! made through [`ReactiveContext::read`] is recorded, and while the
//! formula is being bound each read also registers the source as a
//! dependency of the node being evaluated. This lets a formula such as
//! `a + b` discover its own dependency set by running once.
//!
//! # Implementation
//!
//! The context is an explicit parameter rather than ambient state, so the
//! set of reads is visible to the caller and nested evaluations cannot see
//! each other's contexts. A capturing context exists only for the duration
//! of one bind call; edges it added are rolled back by the runtime if the
//! bind fails.

use smallvec::SmallVec;

use super::handle::Observable;
use super::runtime::Runtime;
use crate::error::{ReactionError, Result};
use crate::graph::NodeId;

/// Evaluation context for one run of a formula.
pub struct ReactiveContext<'rt> {
    /// The node whose formula is running.
    subscriber: NodeId,

    /// Present while capturing: reads become graph edges.
    runtime: Option<&'rt Runtime>,

    /// Every distinct node read during this run, in read order.
    dependencies: SmallVec<[NodeId; 4]>,

    /// Edges this context inserted into the graph.
    added: SmallVec<[NodeId; 4]>,
}

impl<'rt> ReactiveContext<'rt> {
    /// A context that records reads as edges into `subscriber`.
    pub(crate) fn capturing(runtime: &'rt Runtime, subscriber: NodeId) -> Self {
        Self {
            subscriber,
            runtime: Some(runtime),
            dependencies: SmallVec::new(),
            added: SmallVec::new(),
        }
    }

    /// A context that only reads. Used when propagation re-runs a formula
    /// whose edges already exist.
    pub(crate) fn untracked(subscriber: NodeId) -> Self {
        Self {
            subscriber,
            runtime: None,
            dependencies: SmallVec::new(),
            added: SmallVec::new(),
        }
    }

    /// Read a dependency's current value.
    ///
    /// While capturing, the first read of each source adds the edge
    /// `source -> subscriber`; a read that would close a cycle fails here,
    /// as does a read of a node that belongs to another runtime.
    pub fn read<S: Observable>(&mut self, source: &S) -> Result<S::Output> {
        self.observe(source.handle().runtime(), source.node_id())?;
        source.get()
    }

    /// The node whose formula is running.
    pub fn subscriber(&self) -> NodeId {
        self.subscriber
    }

    /// Whether reads are being turned into edges.
    pub fn is_capturing(&self) -> bool {
        self.runtime.is_some()
    }

    /// Nodes read so far, without duplicates.
    pub fn dependencies(&self) -> &[NodeId] {
        &self.dependencies
    }

    /// Record a read of `node`, which lives in `owner`.
    pub(crate) fn observe(&mut self, owner: &Runtime, node: NodeId) -> Result<()> {
        if let Some(runtime) = self.runtime {
            // Ids are only meaningful inside the graph that issued them.
            if !runtime.ptr_eq(owner) {
                return Err(ReactionError::ForeignHandle { node });
            }
        }
        if self.dependencies.contains(&node) {
            return Ok(());
        }
        if let Some(runtime) = self.runtime {
            if runtime.add_observer(node, self.subscriber)? {
                self.added.push(node);
            }
        }
        self.dependencies.push(node);
        Ok(())
    }

    /// Edges inserted by this context, for rollback.
    pub(crate) fn added(&self) -> &[NodeId] {
        &self.added
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn untracked_context_records_without_edges() {
        let rt = Runtime::new();
        let a = rt.signal(1);
        let b = rt.signal(2);
        let target = rt.declare::<i32>();

        let mut cx = ReactiveContext::untracked(target.node_id());
        assert!(!cx.is_capturing());

        let sum = cx.read(&a).unwrap() + cx.read(&b).unwrap() + cx.read(&a).unwrap();
        assert_eq!(sum, 4);
        assert_eq!(cx.dependencies(), &[a.node_id(), b.node_id()]);
        assert!(cx.added().is_empty());
        assert_eq!(rt.edge_count(), 0);
    }

    #[test]
    fn capturing_context_adds_edges_once() {
        let rt = Runtime::new();
        let a = rt.signal(1);
        let target = rt.declare::<i32>();

        let mut cx = ReactiveContext::capturing(&rt, target.node_id());
        cx.read(&a).unwrap();
        cx.read(&a).unwrap();

        assert_eq!(cx.subscriber(), target.node_id());
        assert_eq!(cx.added(), &[a.node_id()]);
        assert_eq!(rt.edge_count(), 1);
    }

    #[test]
    fn capturing_self_read_fails() {
        let rt = Runtime::new();
        let target = rt.declare::<i32>();

        let mut cx = ReactiveContext::capturing(&rt, target.node_id());
        let err = cx.read(&target).unwrap_err();
        assert!(matches!(err, ReactionError::SelfDependency { .. }));
        assert!(cx.dependencies().is_empty());
    }

    #[test]
    fn capturing_rejects_nodes_of_another_runtime() {
        let rt = Runtime::new();
        let other = Runtime::new();
        let target = rt.declare::<i32>();
        let foreign = other.signal(1);

        let mut cx = ReactiveContext::capturing(&rt, target.node_id());
        let err = cx.read(&foreign).unwrap_err();
        assert!(matches!(err, ReactionError::ForeignHandle { node } if node == foreign.node_id()));
        assert!(cx.dependencies().is_empty());
        assert!(cx.added().is_empty());
        assert_eq!(rt.edge_count(), 0);
    }
}
