//! Agent configuration.
//!
//! Built once at startup and shared read-only (`Arc<AgentConfig>`) with every
//! component. Missing fields fall back to defaults suitable for a local node.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{MarketError, Result};
use crate::types::Address;

/// Which incoming bid kinds the negotiator reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NegotiationPolicy {
    /// Answer demands with offers.
    pub react_to_demand: bool,
    /// Answer offers with demands.
    pub react_to_offer: bool,
}

impl Default for NegotiationPolicy {
    fn default() -> Self {
        Self {
            react_to_demand: true,
            react_to_offer: false,
        }
    }
}

/// Bounded retry settings for external calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    /// Timeout applied to every single external call.
    pub call_timeout_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_ms: 200,
            max_delay_ms: 5_000,
            call_timeout_ms: 10_000,
        }
    }
}

impl RetryConfig {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }
}

/// Built-in worker strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WorkerKind {
    /// Return the objective as the result.
    #[default]
    Echo,
    /// Run an external command with the objective on stdin.
    Command,
}

/// Worker strategy selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct WorkerConfig {
    pub kind: WorkerKind,
    /// Program and arguments for [`WorkerKind::Command`].
    pub command: Vec<String>,
}

/// Agent configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Task class this agent trades.
    pub model: String,

    /// Payment token this agent accepts.
    pub token: String,

    /// Market/broker attached to outbound offers.
    pub lighthouse: String,

    /// Local agent identity.
    pub address: Address,

    /// Bid lifetime in blocks (`deadline = current_block + bid_lifetime`).
    pub bid_lifetime: u64,

    /// Initial asking cost.
    pub arrangement_price_start: i64,

    /// Prices closer than this are considered converged.
    pub convergence_threshold: i64,

    pub policy: NegotiationPolicy,

    /// Capacity of the negotiator's inbound queue.
    pub queue_capacity: usize,

    pub retry: RetryConfig,

    /// Terminal liabilities remembered for observation.
    pub history_limit: usize,

    /// Remote signing/ledger gateway. Runs standalone when unset.
    pub gateway_url: Option<String>,

    pub worker: WorkerConfig,

    /// HTTP listen address of the node.
    pub listen_addr: String,

    /// Time allowed for in-flight liabilities on shutdown.
    pub shutdown_grace_secs: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: "default".to_string(),
            token: "xrt".to_string(),
            lighthouse: "local.lighthouse".to_string(),
            address: Address::new("0x0000000000000000000000000000000000000000"),
            bid_lifetime: 128,
            arrangement_price_start: 0,
            convergence_threshold: 2,
            policy: NegotiationPolicy::default(),
            queue_capacity: 256,
            retry: RetryConfig::default(),
            history_limit: 1024,
            gateway_url: None,
            worker: WorkerConfig::default(),
            listen_addr: "0.0.0.0:3000".to_string(),
            shutdown_grace_secs: 30,
        }
    }
}

impl AgentConfig {
    /// Check invariants that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            return Err(MarketError::ConfigError("model must not be empty".into()));
        }
        if self.token.trim().is_empty() {
            return Err(MarketError::ConfigError("token must not be empty".into()));
        }
        if self.address.is_empty() {
            return Err(MarketError::ConfigError("address must not be empty".into()));
        }
        if self.bid_lifetime == 0 {
            return Err(MarketError::ConfigError("bid_lifetime must be > 0".into()));
        }
        if self.convergence_threshold < 0 {
            return Err(MarketError::ConfigError(
                "convergence_threshold must be >= 0".into(),
            ));
        }
        if self.queue_capacity == 0 {
            return Err(MarketError::ConfigError("queue_capacity must be > 0".into()));
        }
        if self.retry.max_attempts == 0 {
            return Err(MarketError::ConfigError("retry.max_attempts must be > 0".into()));
        }
        if self.worker.kind == WorkerKind::Command
            && self.worker.command.first().map_or(true, |p| p.trim().is_empty())
        {
            return Err(MarketError::ConfigError(
                "worker.command must be a non-empty array".into(),
            ));
        }
        Ok(())
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}
