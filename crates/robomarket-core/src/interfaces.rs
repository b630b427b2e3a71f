//! Narrow interfaces to the agent's external collaborators.
//!
//! Nothing here is implemented by the core; `robomarket-state` ships in-process
//! versions and `robomarket-gateway` an HTTP adapter.

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::warn;

use crate::bid::Bid;
use crate::error::Result;
use crate::liability::FinishStatus;
use crate::types::{Address, ObjectiveRef};

/// Content-addressed storage of task objectives.
#[async_trait]
pub trait ObjectiveStore: Send + Sync {
    /// Store bytes, returning their stable content identifier.
    async fn put(&self, bytes: Vec<u8>) -> Result<ObjectiveRef>;

    /// Fetch the bytes named by `objective`.
    async fn get(&self, objective: &ObjectiveRef) -> Result<Vec<u8>>;
}

/// Pub/sub message delivery.
///
/// At-least-once, ordered per publisher within a topic, unordered across topics.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn publish(&self, topic: &str, message: serde_json::Value) -> Result<()>;

    async fn subscribe(&self, topic: &str) -> Result<Subscription>;
}

/// Takes unsigned bids, signs them and publishes them to the market.
#[async_trait]
pub trait SigningGateway: Send + Sync {
    async fn submit(&self, bid: Bid) -> Result<()>;
}

/// Ledger tracking liability execution.
///
/// Calls are not idempotent; callers must not repeat them per transition.
#[async_trait]
pub trait LiabilityLedger: Send + Sync {
    async fn start(&self, address: &Address) -> Result<()>;

    async fn finish(&self, address: &Address, status: FinishStatus) -> Result<()>;
}

/// Monotonic block counter used for bid deadlines.
#[async_trait]
pub trait BlockSource: Send + Sync {
    async fn current_block(&self) -> Result<u64>;
}

/// A live subscription to one transport topic.
pub struct Subscription {
    /// Topic this subscription listens on.
    pub topic: String,

    receiver: broadcast::Receiver<serde_json::Value>,
}

impl Subscription {
    pub fn new(topic: impl Into<String>, receiver: broadcast::Receiver<serde_json::Value>) -> Self {
        Self {
            topic: topic.into(),
            receiver,
        }
    }

    /// Next message, or `None` once the transport is gone.
    ///
    /// Lagging subscribers skip what they missed.
    pub async fn recv(&mut self) -> Option<serde_json::Value> {
        loop {
            match self.receiver.recv().await {
                Ok(message) => return Some(message),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(topic = %self.topic, skipped, "Subscriber lagged, messages dropped");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
