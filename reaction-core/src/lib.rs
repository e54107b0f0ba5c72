//! Reaction Core
//!
//! This crate provides a reactive dependency-graph computation engine.
//! It implements:
//!
//! - Reactive primitives (signals, constants, memos, effects)
//! - A cycle-checked dependency graph with generational node ids
//! - Eager, synchronous change propagation
//! - Reactive fields that forward changes to their owning object
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `reactive`: Handles, formulas, and the runtime that drives propagation
//! - `graph`: Node storage, observer edges, cycle detection, field registry
//! - `config`: Runtime configuration
//! - `error`: The crate-wide error type
//!
//! # Example
//!
//! ```rust
//! use reaction_core::Runtime;
//!
//! # fn main() -> reaction_core::Result<()> {
//! let rt = Runtime::new();
//!
//! // Create sources
//! let a = rt.signal(1);
//! let b = rt.signal(3.14);
//!
//! // Create a derived value
//! let sum = rt.memo((&a, &b), |(a, b)| a as f64 + b)?;
//! assert!((sum.get()? - 4.14).abs() < 1e-9);
//!
//! // Update a source; the derived value is already current
//! a.set(2)?;
//! assert!((sum.get()? - 5.14).abs() < 1e-9);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod graph;
pub mod reactive;

pub use config::{PropagationOrder, ResetPolicy, RuntimeConfig};
pub use error::{ReactionError, Result};
pub use graph::{FieldOwner, NodeId, NodeKind, ObjectId};
pub use reactive::{
    Constant, Effect, Handle, Memo, Observable, ReactiveContext, Runtime, Signal, WeakHandle,
};
