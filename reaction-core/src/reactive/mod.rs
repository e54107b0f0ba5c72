//! Reactive Primitives
//!
//! This module implements the user-facing half of the engine: sources,
//! memos, and effects, plus the runtime that connects them.
//!
//! # Concepts
//!
//! ## Signals
//!
//! A Signal is a container for mutable state. Writing it pushes the change
//! to every node that depends on it before the write returns. A Constant is
//! a signal without the write half.
//!
//! ## Memos
//!
//! A Memo is a derived value that stores its result. It re-evaluates
//! eagerly when one of its dependencies changes, so reads are plain loads.
//!
//! ## Effects
//!
//! An Effect is a side-effecting computation that runs whenever its
//! dependencies change. It produces no value and nothing can depend on it.
//!
//! # Implementation Notes
//!
//! Dependencies are either listed explicitly (a handle reference or a tuple
//! of them) or captured: a tracked formula receives a [`ReactiveContext`]
//! and every `cx.read(&node)` during its first evaluation becomes an edge.
//! The context is an explicit parameter, so there is no ambient tracking
//! state and runtimes on different threads never interfere.
//!
//! Every node is reference counted through its [`Handle`]s. When the last
//! handle goes away the node is removed from the graph.

mod context;
mod effect;
mod expression;
mod handle;
mod memo;
mod resource;
mod runtime;
mod signal;

pub use context::ReactiveContext;
pub use effect::Effect;
pub use expression::{Dependencies, DependencySource, IntoDependencies};
pub use handle::{Handle, Observable, Value, WeakHandle};
pub use memo::Memo;
pub use resource::Resource;
pub use runtime::Runtime;
pub use signal::{Constant, Signal};
