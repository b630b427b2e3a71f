//! Liabilities: matched task instances and their lifecycle states.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{MarketError, Result};
use crate::types::{Address, ObjectiveRef};

/// A task instance created by the matching layer once a demand and an offer agree.
///
/// Immutable after creation and identified by `address` for one execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Liability {
    pub address: Address,

    /// Task input, when the notification carries one.
    #[serde(default)]
    pub objective: Option<ObjectiveRef>,

    #[serde(default)]
    pub model: Option<String>,

    #[serde(default)]
    pub token: Option<String>,

    #[serde(default)]
    pub cost: Option<i64>,

    /// Requester side.
    #[serde(default)]
    pub promisee: Option<Address>,

    /// Provider side.
    #[serde(default)]
    pub promisor: Option<Address>,

    #[serde(default)]
    pub lighthouse: Option<String>,
}

impl Liability {
    /// A bare task slot.
    pub fn new(address: Address) -> Self {
        Self {
            address,
            objective: None,
            model: None,
            token: None,
            cost: None,
            promisee: None,
            promisor: None,
            lighthouse: None,
        }
    }

    pub fn with_objective(mut self, objective: ObjectiveRef) -> Self {
        self.objective = Some(objective);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.address.is_empty() {
            return Err(MarketError::Malformed("liability has no address".into()));
        }
        Ok(())
    }
}

/// Lifecycle state of one liability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LiabilityState {
    /// Accepted, start not yet called.
    Pending,
    /// Ledger acknowledged the start.
    Started,
    /// Worker strategy is running.
    Executing,
    /// Work done and ledger informed.
    Finished,
    /// Start, work or finish failed.
    Failed,
}

impl LiabilityState {
    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, LiabilityState::Finished | LiabilityState::Failed)
    }
}

/// Status reported to the ledger on finish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishStatus {
    Success,
    Failure,
}

impl FinishStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, FinishStatus::Success)
    }
}

/// Observable record of a liability's progress.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiabilityRecord {
    pub address: Address,
    pub state: LiabilityState,
    pub accepted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub error: Option<String>,
}

impl LiabilityRecord {
    pub fn pending(address: Address) -> Self {
        let now = Utc::now();
        Self {
            address,
            state: LiabilityState::Pending,
            accepted_at: now,
            updated_at: now,
            error: None,
        }
    }

    pub fn transition(&mut self, state: LiabilityState) {
        self.state = state;
        self.updated_at = Utc::now();
    }
}
