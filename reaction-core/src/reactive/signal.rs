//! Signal Implementation
//!
//! A Signal is the fundamental reactive primitive: a source node holding a
//! value that callers write directly.
//!
//! # How Signals Work
//!
//! 1. A derived node or effect that depends on the signal is registered as
//!    one of its observers when its formula is bound.
//!
//! 2. `set` stores the new value and then notifies every observer.
//!
//! 3. Notification re-runs dependent computations synchronously, so when
//!    `set` returns every downstream value reflects the write.
//!
//! A [`Constant`] is a source node without the write half. Attempting to
//! write one is a compile error rather than a runtime failure.

use std::fmt::{self, Debug};

use super::handle::{Handle, Observable, Value, WeakHandle};
use crate::error::Result;
use crate::graph::NodeId;

/// A mutable reactive source holding a value of type `T`.
///
/// # Example
///
/// ```rust,ignore
/// let count = rt.signal(0);
///
/// // Read the value
/// let value = count.get()?;
///
/// // Update the value (notifies observers)
/// count.set(5)?;
/// ```
#[derive(Clone)]
pub struct Signal<T: Value> {
    handle: Handle<T>,
}

impl<T: Value> Signal<T> {
    pub(crate) fn from_handle(handle: Handle<T>) -> Self {
        Self { handle }
    }

    /// Get the signal's node id.
    pub fn node_id(&self) -> NodeId {
        self.handle.node_id()
    }

    /// Get the current value.
    pub fn get(&self) -> Result<T> {
        self.handle.get()
    }

    /// Set a new value and notify observers.
    ///
    /// Errors raised by downstream formulas abort propagation and are
    /// returned here.
    pub fn set(&self, value: T) -> Result<()> {
        self.handle.cell().update_value(value);
        self.handle.runtime().notify(self.node_id())
    }

    /// Update the value using a function of the current value.
    pub fn update<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&T) -> T,
    {
        let current = self.get()?;
        self.set(f(&current))
    }

    /// Get the number of live handles to this signal.
    pub fn handle_count(&self) -> usize {
        self.handle.handle_count()
    }

    /// Create a non-owning reference.
    pub fn downgrade(&self) -> WeakHandle<T> {
        self.handle.downgrade()
    }
}

impl<T: Value> Observable for Signal<T> {
    type Output = T;

    fn handle(&self) -> &Handle<T> {
        &self.handle
    }
}

impl<T: Value + Debug> Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("id", &self.node_id())
            .field("value", &self.get().ok())
            .field("handle_count", &self.handle_count())
            .finish()
    }
}

/// An immutable reactive source.
///
/// ```rust
/// let rt = reaction_core::Runtime::new();
/// let rate = rt.constant(3);
/// assert_eq!(rate.get().unwrap(), 3);
/// ```
///
/// There is no write half:
///
/// ```compile_fail
/// let rt = reaction_core::Runtime::new();
/// let rate = rt.constant(3);
/// rate.set(4);
/// ```
#[derive(Clone)]
pub struct Constant<T: Value> {
    handle: Handle<T>,
}

impl<T: Value> Constant<T> {
    pub(crate) fn from_handle(handle: Handle<T>) -> Self {
        Self { handle }
    }

    pub fn node_id(&self) -> NodeId {
        self.handle.node_id()
    }

    pub fn get(&self) -> Result<T> {
        self.handle.get()
    }

    pub fn handle_count(&self) -> usize {
        self.handle.handle_count()
    }
}

impl<T: Value> Observable for Constant<T> {
    type Output = T;

    fn handle(&self) -> &Handle<T> {
        &self.handle
    }
}

impl<T: Value + Debug> Debug for Constant<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Constant")
            .field("id", &self.node_id())
            .field("value", &self.get().ok())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::Runtime;
    use std::sync::atomic::{AtomicI32, Ordering};
    use std::sync::Arc;

    #[test]
    fn signal_get_and_set() {
        let rt = Runtime::new();
        let signal = rt.signal(0);
        assert_eq!(signal.get().unwrap(), 0);

        signal.set(42).unwrap();
        assert_eq!(signal.get().unwrap(), 42);
    }

    #[test]
    fn signal_update() {
        let rt = Runtime::new();
        let signal = rt.signal(10);
        signal.update(|v| v + 5).unwrap();
        assert_eq!(signal.get().unwrap(), 15);
    }

    #[test]
    fn signal_notifies_observers() {
        let rt = Runtime::new();
        let signal = rt.signal(0);
        let call_count = Arc::new(AtomicI32::new(0));
        let call_count_clone = call_count.clone();

        let _effect = rt
            .effect(&signal, move |_| {
                call_count_clone.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();

        // Effects run once when bound
        assert_eq!(call_count.load(Ordering::SeqCst), 1);

        signal.set(1).unwrap();
        assert_eq!(call_count.load(Ordering::SeqCst), 2);

        signal.set(2).unwrap();
        assert_eq!(call_count.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn dropped_observer_stops_running() {
        let rt = Runtime::new();
        let signal = rt.signal(0);
        let call_count = Arc::new(AtomicI32::new(0));
        let call_count_clone = call_count.clone();

        let effect = rt
            .effect(&signal, move |_| {
                call_count_clone.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();

        signal.set(1).unwrap();
        assert_eq!(call_count.load(Ordering::SeqCst), 2);

        drop(effect);
        signal.set(2).unwrap();
        // Should not have been called again
        assert_eq!(call_count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn signal_clone_shares_state() {
        let rt = Runtime::new();
        let signal1 = rt.signal(0);
        let signal2 = signal1.clone();

        signal1.set(42).unwrap();
        assert_eq!(signal2.get().unwrap(), 42);

        signal2.set(100).unwrap();
        assert_eq!(signal1.get().unwrap(), 100);
        assert_eq!(signal1.handle_count(), 2);
    }

    #[test]
    fn signal_ids_are_unique() {
        let rt = Runtime::new();
        let s1 = rt.signal(0);
        let s2 = rt.signal(0);
        let s3 = rt.signal(0);

        assert_ne!(s1.node_id(), s2.node_id());
        assert_ne!(s2.node_id(), s3.node_id());
        assert_ne!(s1.node_id(), s3.node_id());
    }

    #[test]
    fn constant_feeds_memos() {
        let rt = Runtime::new();
        let rate = rt.constant(3);
        let qty = rt.signal(2);
        let total = rt.memo((&rate, &qty), |(r, q)| r * q).unwrap();

        assert_eq!(rate.get().unwrap(), 3);
        qty.set(5).unwrap();
        assert_eq!(total.get().unwrap(), 15);
    }
}
