//! The local agent's negotiation state.

use serde::{Deserialize, Serialize};

use crate::config::AgentConfig;
use crate::types::Address;

/// Mutable negotiation state of the running agent.
///
/// Exactly one instance exists per agent. Only the negotiator writes it;
/// everyone else reads snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentState {
    /// Current asking cost. May go negative internally; clamped on publish.
    pub cost: i64,

    /// Local identity.
    pub address: Address,

    /// Model filter.
    pub model: String,

    /// Token filter.
    pub token: String,
}

impl AgentState {
    /// Initial state from configuration.
    pub fn from_config(config: &AgentConfig) -> Self {
        Self {
            cost: config.arrangement_price_start,
            address: config.address.clone(),
            model: config.model.clone(),
            token: config.token.clone(),
        }
    }

    /// Copy of this state with the asking cost moved by `delta`.
    pub fn adjusted(&self, delta: i64) -> Self {
        Self {
            cost: self.cost.saturating_add(delta),
            ..self.clone()
        }
    }
}
