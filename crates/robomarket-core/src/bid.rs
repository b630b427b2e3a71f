//! Market bids: demands and offers.
//!
//! Both kinds share one attribute shape; the kind is a tag, not a separate type.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{MarketError, Result};
use crate::types::{Address, ObjectiveRef};

/// Which side of the market a bid comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BidKind {
    /// Requester wants work done.
    Demand,
    /// Provider is willing to do work.
    Offer,
}

impl BidKind {
    /// The kind published in response to this one.
    pub fn counterpart(self) -> BidKind {
        match self {
            BidKind::Demand => BidKind::Offer,
            BidKind::Offer => BidKind::Demand,
        }
    }

    /// Transport topic carrying bids of this kind.
    pub fn topic(self) -> &'static str {
        match self {
            BidKind::Demand => crate::types::topics::DEMAND,
            BidKind::Offer => crate::types::topics::OFFER,
        }
    }
}

/// A demand or offer broadcast on the market.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bid {
    /// Correlation id for logs.
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,

    /// Demand or offer.
    pub kind: BidKind,

    /// Identifier of the task class.
    pub model: String,

    /// Payment token identifier.
    pub token: String,

    /// Content identifier of the task's input description.
    pub objective: ObjectiveRef,

    /// Price in token units. Signed on the wire; clamped when we publish.
    pub cost: i64,

    /// Block height after which the bid is void.
    #[serde(default)]
    pub deadline: u64,

    /// Market/broker the bid is associated with.
    #[serde(default)]
    pub lighthouse: Option<String>,

    #[serde(default)]
    pub lighthouse_fee: i64,

    #[serde(default)]
    pub validator: Option<Address>,

    #[serde(default)]
    pub validator_fee: i64,

    /// Publishing agent, if known.
    #[serde(default)]
    pub sender: Option<Address>,

    #[serde(default)]
    pub nonce: u64,
}

impl Bid {
    /// Create a bid with only the required attributes set.
    pub fn new(
        kind: BidKind,
        model: impl Into<String>,
        token: impl Into<String>,
        objective: ObjectiveRef,
        cost: i64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            model: model.into(),
            token: token.into(),
            objective,
            cost,
            deadline: 0,
            lighthouse: None,
            lighthouse_fee: 0,
            validator: None,
            validator_fee: 0,
            sender: None,
            nonce: 0,
        }
    }

    pub fn demand(model: impl Into<String>, token: impl Into<String>, objective: ObjectiveRef, cost: i64) -> Self {
        Self::new(BidKind::Demand, model, token, objective, cost)
    }

    pub fn offer(model: impl Into<String>, token: impl Into<String>, objective: ObjectiveRef, cost: i64) -> Self {
        Self::new(BidKind::Offer, model, token, objective, cost)
    }

    pub fn with_deadline(mut self, deadline: u64) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn with_lighthouse(mut self, lighthouse: impl Into<String>) -> Self {
        self.lighthouse = Some(lighthouse.into());
        self
    }

    pub fn with_sender(mut self, sender: Address) -> Self {
        self.sender = Some(sender);
        self
    }

    pub fn with_nonce(mut self, nonce: u64) -> Self {
        self.nonce = nonce;
        self
    }

    /// Clamp price and fees to be non-negative for publication.
    pub fn normalized(mut self) -> Self {
        self.cost = self.cost.max(0);
        self.lighthouse_fee = self.lighthouse_fee.max(0);
        self.validator_fee = self.validator_fee.max(0);
        self
    }

    /// True when this bid trades the given model for the given token.
    pub fn matches(&self, model: &str, token: &str) -> bool {
        self.model == model && self.token == token
    }

    /// Reject bids missing required fields.
    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            return Err(MarketError::Malformed(format!("bid {} has no model", self.id)));
        }
        if self.token.trim().is_empty() {
            return Err(MarketError::Malformed(format!("bid {} has no token", self.id)));
        }
        if self.objective.is_empty() {
            return Err(MarketError::Malformed(format!("bid {} has no objective", self.id)));
        }
        if self.lighthouse_fee < 0 || self.validator_fee < 0 {
            return Err(MarketError::Malformed(format!("bid {} has a negative fee", self.id)));
        }
        Ok(())
    }
}
