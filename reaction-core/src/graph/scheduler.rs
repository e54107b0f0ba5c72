//! Update Scheduler
//!
//! The scheduler computes the order in which nodes are re-evaluated when
//! the runtime is configured for topological propagation.
//!
//! # Algorithm
//!
//! 1. Starting from the changed node, collect every transitive observer
//!    (breadth-first over observer edges).
//! 2. Sort the collected nodes topologically (Kahn's algorithm, counting
//!    only edges inside the collected set), so every node comes after all
//!    of its affected dependencies.
//!
//! Each node in the plan is then re-evaluated exactly once, which means a
//! dependent never sees a mix of old and new inputs mid-pass.

use std::collections::{HashMap, HashSet, VecDeque};

use super::dependency::DependencyGraph;
use super::node::NodeId;

/// Builds propagation plans from a dependency graph.
pub struct UpdateScheduler;

impl UpdateScheduler {
    /// Collect every node affected by a change to `source`, in dependency
    /// order. The source itself is not part of the plan.
    pub fn plan(graph: &DependencyGraph, source: NodeId) -> Vec<NodeId> {
        let affected = Self::affected(graph, source);
        Self::topological_sort(graph, affected)
    }

    /// Breadth-first walk over observer edges.
    fn affected(graph: &DependencyGraph, source: NodeId) -> Vec<NodeId> {
        let mut affected = Vec::new();
        let mut visited = HashSet::new();
        let mut queue = VecDeque::new();

        // Start with the source node's direct observers
        if let Some(observers) = graph.observers(source) {
            queue.extend(observers.iter().copied());
        }

        while let Some(node_id) = queue.pop_front() {
            if !visited.insert(node_id) {
                continue;
            }
            affected.push(node_id);

            if let Some(observers) = graph.observers(node_id) {
                queue.extend(observers.iter().copied());
            }
        }

        affected
    }

    /// Perform a topological sort of the given nodes.
    ///
    /// Returns nodes in order such that dependencies come before dependents.
    fn topological_sort(graph: &DependencyGraph, nodes: Vec<NodeId>) -> Vec<NodeId> {
        let node_set: HashSet<_> = nodes.iter().copied().collect();
        let mut in_degree: HashMap<NodeId, usize> = HashMap::new();
        let mut result = Vec::with_capacity(nodes.len());
        let mut queue = VecDeque::new();

        // Calculate in-degrees (only counting edges within the node set)
        for &node_id in &nodes {
            if let Some(dependencies) = graph.dependencies(node_id) {
                let degree = dependencies
                    .iter()
                    .filter(|d| node_set.contains(d))
                    .count();
                in_degree.insert(node_id, degree);
                if degree == 0 {
                    queue.push_back(node_id);
                }
            }
        }

        // Kahn's algorithm
        while let Some(node_id) = queue.pop_front() {
            result.push(node_id);

            if let Some(observers) = graph.observers(node_id) {
                for observer_id in observers {
                    if let Some(degree) = in_degree.get_mut(observer_id) {
                        *degree = degree.saturating_sub(1);
                        if *degree == 0 {
                            queue.push_back(*observer_id);
                        }
                    }
                }
            }
        }

        result
    }
}
