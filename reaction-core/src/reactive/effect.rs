//! Effect Implementation
//!
//! An Effect is a side-effecting computation that runs whenever its
//! dependencies change.
//!
//! # How Effects Work
//!
//! 1. When created, the effect runs its function immediately; for tracked
//!    effects this first run also establishes the dependency set.
//!
//! 2. When any dependency changes, the effect runs again as part of the
//!    same synchronous propagation pass.
//!
//! 3. Dropping the last handle to the effect removes it from the graph; it
//!    will not run again.
//!
//! # Differences from Memo
//!
//! - Memos store a value; effects carry only the unit sentinel.
//! - Nothing can depend on an effect, so an effect never cascades.

use std::fmt;

use super::context::ReactiveContext;
use super::expression::{Dependencies, Formula, IntoDependencies};
use super::handle::Handle;
use crate::error::Result;
use crate::graph::NodeId;

/// A side-effecting computation that runs when dependencies change.
///
/// # Example
///
/// ```rust,ignore
/// let count = rt.signal(0);
///
/// let effect = rt.effect(&count, |count| {
///     println!("Count is: {}", count);
/// })?;
///
/// count.set(5)?;  // Prints: "Count is: 5"
/// ```
#[derive(Clone)]
pub struct Effect {
    handle: Handle<()>,
}

impl Effect {
    pub(crate) fn from_handle(handle: Handle<()>) -> Self {
        Self { handle }
    }

    /// Get the effect's node id.
    pub fn node_id(&self) -> NodeId {
        self.handle.node_id()
    }

    /// Rebind to a function over explicit dependencies. The function runs
    /// once immediately.
    pub fn reset<D, F>(&self, dependencies: D, f: F) -> Result<()>
    where
        D: IntoDependencies,
        F: Fn(<D::Deps as Dependencies>::Values) + Send + Sync + 'static,
    {
        self.handle
            .runtime()
            .bind(&self.handle, Formula::new(dependencies, f))
    }

    /// Rebind to a function whose dependencies are captured from its reads.
    pub fn reset_tracked<F>(&self, f: F) -> Result<()>
    where
        F: Fn(&mut ReactiveContext<'_>) -> Result<()> + Send + Sync + 'static,
    {
        self.handle.runtime().bind(&self.handle, Formula::tracked(f))
    }

    /// Get the number of dependencies.
    pub fn dependency_count(&self) -> usize {
        self.handle.runtime().dependencies(self.node_id()).len()
    }

    pub fn handle_count(&self) -> usize {
        self.handle.handle_count()
    }
}

impl fmt::Debug for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Effect")
            .field("id", &self.node_id())
            .field("dependency_count", &self.dependency_count())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
