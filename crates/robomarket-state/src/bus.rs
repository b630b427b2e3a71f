//! In-process topic bus.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use robomarket_core::{Result, Subscription, Transport};
use tokio::sync::{broadcast, RwLock};
use tracing::trace;

const DEFAULT_TOPIC_CAPACITY: usize = 1000;

/// Pub/sub bus with one broadcast channel per topic.
///
/// Messages published before anyone subscribes to a topic are dropped.
#[derive(Clone)]
pub struct InMemoryBus {
    topics: Arc<RwLock<HashMap<String, broadcast::Sender<serde_json::Value>>>>,
    capacity: usize,
}

impl InMemoryBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_TOPIC_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            topics: Arc::new(RwLock::new(HashMap::new())),
            capacity: capacity.max(1),
        }
    }

    async fn sender(&self, topic: &str) -> broadcast::Sender<serde_json::Value> {
        if let Some(sender) = self.topics.read().await.get(topic) {
            return sender.clone();
        }
        let mut topics = self.topics.write().await;
        topics
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone()
    }

    /// Number of live subscribers on a topic.
    pub async fn subscriber_count(&self, topic: &str) -> usize {
        self.topics
            .read()
            .await
            .get(topic)
            .map_or(0, |sender| sender.receiver_count())
    }
}

impl Default for InMemoryBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for InMemoryBus {
    async fn publish(&self, topic: &str, message: serde_json::Value) -> Result<()> {
        let delivered = self.sender(topic).await.send(message).unwrap_or(0);
        trace!(topic, delivered, "Published");
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> Result<Subscription> {
        let receiver = self.sender(topic).await.subscribe();
        Ok(Subscription::new(topic, receiver))
    }
}
