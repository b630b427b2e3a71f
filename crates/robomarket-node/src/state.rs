//! Application state.

use std::sync::Arc;

use robomarket_core::{AgentConfig, Transport};
use robomarket_liability::LiabilityCoordinator;
use robomarket_negotiate::NegotiatorHandle;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Immutable agent configuration.
    pub config: Arc<AgentConfig>,

    /// Market transport.
    pub transport: Arc<dyn Transport>,

    /// Handle to the negotiator owning the agent state.
    pub negotiator: NegotiatorHandle,

    /// Liability lifecycle coordinator.
    pub coordinator: LiabilityCoordinator,
}
