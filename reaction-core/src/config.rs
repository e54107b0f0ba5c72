//! Runtime Configuration
//!
//! A [`RuntimeConfig`] controls how a [`Runtime`](crate::reactive::Runtime)
//! propagates changes and how rebinding a formula treats the edges of the
//! formula it replaces. Configs can be built in code or parsed from JSON;
//! missing fields fall back to their defaults.
//!
//! ```rust,ignore
//! let config = RuntimeConfig::from_json(r#"{ "propagation": "topological" }"#)?;
//! let rt = Runtime::with_config(config);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Order in which a change is pushed through the dependency graph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropagationOrder {
    /// Each reaction recomputes and then immediately notifies its own
    /// observers, recursively, before the next sibling runs.
    #[default]
    DepthFirst,

    /// The affected sub-graph is collected first and every node in it is
    /// re-evaluated exactly once, dependencies before dependents.
    Topological,
}

/// What happens to existing dependency edges when a node is rebound.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResetPolicy {
    /// The previous formula's edges are dropped and replaced.
    #[default]
    Replace,

    /// Edges from earlier formulas are kept alongside the new ones.
    Accumulate,
}

/// Settings for one runtime instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Propagation strategy for value writes.
    pub propagation: PropagationOrder,

    /// Edge handling for `reset`.
    pub reset_policy: ResetPolicy,

    /// Number of node slots to pre-allocate.
    pub initial_capacity: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            propagation: PropagationOrder::default(),
            reset_policy: ResetPolicy::default(),
            initial_capacity: 64,
        }
    }
}

impl RuntimeConfig {
    /// Parse a config from JSON. Unknown enum values are rejected.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Set the propagation order.
    pub fn with_propagation(mut self, propagation: PropagationOrder) -> Self {
        self.propagation = propagation;
        self
    }

    /// Set the reset policy.
    pub fn with_reset_policy(mut self, reset_policy: ResetPolicy) -> Self {
        self.reset_policy = reset_policy;
        self
    }

    /// Set the number of pre-allocated node slots.
    pub fn with_initial_capacity(mut self, initial_capacity: usize) -> Self {
        self.initial_capacity = initial_capacity;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReactionError;

    #[test]
    fn defaults() {
        let config = RuntimeConfig::default();
        assert_eq!(config.propagation, PropagationOrder::DepthFirst);
        assert_eq!(config.reset_policy, ResetPolicy::Replace);
        assert_eq!(config.initial_capacity, 64);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = RuntimeConfig::from_json(r#"{ "propagation": "topological" }"#).unwrap();
        assert_eq!(config.propagation, PropagationOrder::Topological);
        assert_eq!(config.reset_policy, ResetPolicy::Replace);
        assert_eq!(config.initial_capacity, 64);
    }

    #[test]
    fn full_json() {
        let config = RuntimeConfig::from_json(
            r#"{ "propagation": "depth_first", "reset_policy": "accumulate", "initial_capacity": 8 }"#,
        )
        .unwrap();
        assert_eq!(
            config,
            RuntimeConfig::default()
                .with_reset_policy(ResetPolicy::Accumulate)
                .with_initial_capacity(8)
        );
    }

    #[test]
    fn bad_json_is_a_config_error() {
        let err = RuntimeConfig::from_json(r#"{ "propagation": "sideways" }"#).unwrap_err();
        assert!(matches!(err, ReactionError::Config(_)));
    }
}
