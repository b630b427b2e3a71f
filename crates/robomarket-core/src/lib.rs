//! # Robomarket Core
//!
//! Core primitives and types shared by every Robomarket agent component.
//!
//! This crate provides the fundamental building blocks:
//! - [`Bid`] - Demand or Offer broadcast on the market
//! - [`AgentState`] - The local agent's negotiation state
//! - [`Liability`] - A matched task instance and its [`LiabilityState`]
//! - [`AgentConfig`] - Immutable configuration built once at startup
//! - [`MarketError`] - Error taxonomy
//! - [`interfaces`] - Narrow traits for the external collaborators

pub mod agent;
pub mod bid;
pub mod config;
pub mod error;
pub mod interfaces;
pub mod liability;
pub mod retry;
pub mod types;

// Re-exports for convenience
pub use agent::AgentState;
pub use bid::{Bid, BidKind};
pub use config::{AgentConfig, NegotiationPolicy, RetryConfig, WorkerConfig, WorkerKind};
pub use error::{MarketError, Result};
pub use interfaces::{BlockSource, LiabilityLedger, ObjectiveStore, SigningGateway, Subscription, Transport};
pub use liability::{FinishStatus, Liability, LiabilityRecord, LiabilityState};
pub use retry::RetryPolicy;
pub use types::{topics, Address, ObjectiveRef, WorkResult};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::agent::AgentState;
    pub use crate::bid::{Bid, BidKind};
    pub use crate::config::AgentConfig;
    pub use crate::error::{MarketError, Result};
    pub use crate::interfaces::{
        BlockSource, LiabilityLedger, ObjectiveStore, SigningGateway, Transport,
    };
    pub use crate::liability::{FinishStatus, Liability, LiabilityState};
    pub use crate::types::{Address, ObjectiveRef, WorkResult};
}
