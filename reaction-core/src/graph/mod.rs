//! Dependency Graph
//!
//! This module implements the structural half of the engine: which nodes
//! exist and which nodes depend on which.
//!
//! # Overview
//!
//! The dependency graph is a directed acyclic graph (DAG) where:
//!
//! - Nodes represent reactive values (sources) or computations (memos, effects)
//! - Edges represent dependencies: if A depends on B, there is an edge from B to A,
//!   stored as A's membership in B's observer set
//!
//! When a source changes, the runtime walks observer edges and invokes each
//! observer's reaction. The graph itself never runs user code.
//!
//! # Design Decisions
//!
//! 1. Nodes live in a generational arena. A `NodeId` that outlives its node
//!    can never alias a newer node in the same slot.
//!
//! 2. Acyclicity is enforced at insertion time, so propagation never has to
//!    guard against cycles.
//!
//! 3. We maintain both forward (dependencies) and reverse (observers) edges
//!    so that removal and rebinding do not need a full scan.

mod arena;
mod dependency;
mod field;
mod node;
mod scheduler;
mod snapshot;

pub use dependency::DependencyGraph;
pub use field::{FieldGraph, FieldOwner, ObjectId};
pub use node::{Evaluate, Node, NodeId, NodeKind};
pub use scheduler::UpdateScheduler;
pub use snapshot::{GraphSnapshot, NodeSnapshot};
