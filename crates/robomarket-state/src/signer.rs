//! Loopback signing gateway.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use robomarket_core::{Bid, MarketError, Result, SigningGateway, Transport};
use tokio::sync::RwLock;
use tracing::debug;

/// Gateway that publishes bids straight onto a transport without signing.
///
/// Keeps a copy of every accepted bid. Can be told to be unreachable for the
/// next few submissions.
#[derive(Clone)]
pub struct LoopbackGateway {
    transport: Option<Arc<dyn Transport>>,
    submitted: Arc<RwLock<Vec<Bid>>>,
    failures: Arc<AtomicU32>,
}

impl LoopbackGateway {
    /// Publish accepted bids on `transport`.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport: Some(transport),
            submitted: Arc::new(RwLock::new(Vec::new())),
            failures: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Record bids only.
    pub fn detached() -> Self {
        Self {
            transport: None,
            submitted: Arc::new(RwLock::new(Vec::new())),
            failures: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Make the next `count` submissions fail as unreachable.
    pub fn fail_next(&self, count: u32) {
        self.failures.store(count, Ordering::SeqCst);
    }

    pub async fn submitted(&self) -> Vec<Bid> {
        self.submitted.read().await.clone()
    }
}

#[async_trait]
impl SigningGateway for LoopbackGateway {
    async fn submit(&self, bid: Bid) -> Result<()> {
        let unreachable = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if unreachable {
            return Err(MarketError::ConnectionError("signing gateway unreachable".into()));
        }

        debug!(bid_id = %bid.id, kind = ?bid.kind, cost = bid.cost, "Loopback submit");
        if let Some(transport) = &self.transport {
            transport.publish(bid.kind.topic(), serde_json::to_value(&bid)?).await?;
        }
        self.submitted.write().await.push(bid);
        Ok(())
    }
}
