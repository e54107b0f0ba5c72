//! Memo Implementation
//!
//! A Memo is a derived value: the stored result of a formula over other
//! nodes. It is recomputed eagerly whenever one of its dependencies
//! changes, so reads never trigger computation.
//!
//! # Rebinding
//!
//! `reset` and `reset_tracked` replace a memo's formula after construction.
//! The new dependency edges are validated before anything is committed; if
//! any of them would close a cycle, or the formula fails on its first run,
//! the memo keeps its previous formula, value, and edges.

use std::fmt::{self, Debug};

use super::context::ReactiveContext;
use super::expression::{Dependencies, Formula, IntoDependencies};
use super::handle::{Handle, Observable, Value, WeakHandle};
use crate::error::Result;
use crate::graph::NodeId;

/// A derived value computed from other nodes.
///
/// # Type Parameters
///
/// - `T`: The type of the computed value.
#[derive(Clone)]
pub struct Memo<T: Value> {
    handle: Handle<T>,
}

impl<T: Value> Memo<T> {
    pub(crate) fn from_handle(handle: Handle<T>) -> Self {
        Self { handle }
    }

    /// Get the memo's node id.
    pub fn node_id(&self) -> NodeId {
        self.handle.node_id()
    }

    /// Get the current value. Fails if the memo was declared but never
    /// bound.
    pub fn get(&self) -> Result<T> {
        self.handle.get()
    }

    /// Check if the memo has a value.
    pub fn is_initialized(&self) -> bool {
        self.handle.is_initialized()
    }

    /// Rebind to a formula over explicit dependencies.
    pub fn reset<D, F>(&self, dependencies: D, f: F) -> Result<()>
    where
        D: IntoDependencies,
        F: Fn(<D::Deps as Dependencies>::Values) -> T + Send + Sync + 'static,
    {
        self.handle
            .runtime()
            .bind(&self.handle, Formula::new(dependencies, f))
    }

    /// Rebind to a formula whose dependencies are captured from its reads.
    pub fn reset_tracked<F>(&self, f: F) -> Result<()>
    where
        F: Fn(&mut ReactiveContext<'_>) -> Result<T> + Send + Sync + 'static,
    {
        self.handle.runtime().bind(&self.handle, Formula::tracked(f))
    }

    /// Get the number of dependencies.
    pub fn dependency_count(&self) -> usize {
        self.handle.runtime().dependencies(self.node_id()).len()
    }

    /// Get the number of observers.
    pub fn observer_count(&self) -> usize {
        self.handle.runtime().observers(self.node_id()).len()
    }

    pub fn handle_count(&self) -> usize {
        self.handle.handle_count()
    }

    pub fn downgrade(&self) -> WeakHandle<T> {
        self.handle.downgrade()
    }
}

impl<T: Value> Observable for Memo<T> {
    type Output = T;

    fn handle(&self) -> &Handle<T> {
        &self.handle
    }
}

impl<T: Value + Debug> Debug for Memo<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Memo")
            .field("id", &self.node_id())
            .field("value", &self.get().ok())
            .field("dependency_count", &self.dependency_count())
            .field("observer_count", &self.observer_count())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ResetPolicy, RuntimeConfig};
    use crate::error::ReactionError;
    use crate::reactive::Runtime;
    use std::sync::atomic::{AtomicI32, Ordering};
    use std::sync::Arc;

    #[test]
    fn memo_computes_on_creation() {
        let rt = Runtime::new();
        let call_count = Arc::new(AtomicI32::new(0));
        let call_count_clone = call_count.clone();
        let a = rt.signal(21);

        let memo = rt
            .memo(&a, move |a| {
                call_count_clone.fetch_add(1, Ordering::SeqCst);
                a * 2
            })
            .unwrap();

        assert!(memo.is_initialized());
        assert_eq!(call_count.load(Ordering::SeqCst), 1);

        // Reads use the stored value
        assert_eq!(memo.get().unwrap(), 42);
        assert_eq!(memo.get().unwrap(), 42);
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn memo_recomputes_when_dependency_changes() {
        let rt = Runtime::new();
        let a = rt.signal(1);
        let memo = rt.memo(&a, |a| a * 3).unwrap();

        a.set(5).unwrap();
        assert_eq!(memo.get().unwrap(), 15);
    }

    #[test]
    fn declared_memo_is_uninitialized_until_bound() {
        let rt = Runtime::new();
        let memo = rt.declare::<i32>();

        assert!(!memo.is_initialized());
        let err = memo.get().unwrap_err();
        assert!(matches!(err, ReactionError::UninitializedResource { node } if node == memo.node_id()));

        let a = rt.signal(4);
        memo.reset(&a, |a| a + 1).unwrap();
        assert_eq!(memo.get().unwrap(), 5);
    }

    #[test]
    fn tracked_memo_discovers_dependencies() {
        let rt = Runtime::new();
        let a = rt.signal(1);
        let b = rt.signal(2);

        let memo = rt
            .memo_tracked({
                let (a, b) = (a.clone(), b.clone());
                move |cx| Ok(cx.read(&a)? + cx.read(&b)?)
            })
            .unwrap();

        assert_eq!(memo.get().unwrap(), 3);
        assert_eq!(memo.dependency_count(), 2);

        b.set(10).unwrap();
        assert_eq!(memo.get().unwrap(), 11);
    }

    #[test]
    fn reset_replaces_dependencies() {
        let rt = Runtime::new();
        let a = rt.signal(1);
        let b = rt.signal(100);
        let memo = rt.memo(&a, |a| a).unwrap();

        memo.reset(&b, |b| b + 1).unwrap();
        assert_eq!(memo.get().unwrap(), 101);
        assert_eq!(memo.dependency_count(), 1);

        // The old dependency no longer triggers recomputation
        a.set(2).unwrap();
        assert_eq!(memo.get().unwrap(), 101);
        assert_eq!(a.handle_count(), 1);
    }

    #[test]
    fn reset_accumulates_when_configured() {
        let rt = Runtime::with_config(
            RuntimeConfig::default().with_reset_policy(ResetPolicy::Accumulate),
        );
        let a = rt.signal(1);
        let b = rt.signal(100);
        let memo = rt.memo(&a, |a| a).unwrap();

        memo.reset(&b, |b| b + 1).unwrap();
        assert_eq!(memo.dependency_count(), 2);
        assert!(rt.observers(a.node_id()).contains(&memo.node_id()));
    }

    #[test]
    fn reset_notifies_observers() {
        let rt = Runtime::new();
        let a = rt.signal(1);
        let b = rt.signal(50);
        let memo = rt.memo(&a, |a| a).unwrap();
        let downstream = rt.memo(&memo, |m| m * 2).unwrap();

        memo.reset(&b, |b| b).unwrap();
        assert_eq!(downstream.get().unwrap(), 100);
    }

    #[test]
    fn self_reset_is_rejected() {
        let rt = Runtime::new();
        let a = rt.signal(1);
        let memo = rt.memo(&a, |a| a).unwrap();

        let err = memo.reset((&a, &memo), |(a, m)| a + m).unwrap_err();
        assert!(matches!(err, ReactionError::SelfDependency { .. }));
        assert_eq!(memo.handle_count(), 1);
        assert_eq!(memo.get().unwrap(), 1);
    }
}
