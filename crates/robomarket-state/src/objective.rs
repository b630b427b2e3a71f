//! Content-addressed objective store.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use robomarket_core::{MarketError, ObjectiveRef, ObjectiveStore, Result};
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;

/// Prefix of identifiers produced by [`content_id`].
pub const CONTENT_ID_PREFIX: &str = "sha256:";

/// Stable content identifier for `bytes`.
pub fn content_id(bytes: &[u8]) -> ObjectiveRef {
    let digest = Sha256::digest(bytes);
    let hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
    ObjectiveRef::new(format!("{}{}", CONTENT_ID_PREFIX, hex))
}

/// In-memory objective store keyed by SHA-256 of the content.
#[derive(Clone, Default)]
pub struct InMemoryObjectiveStore {
    blobs: Arc<RwLock<HashMap<ObjectiveRef, Vec<u8>>>>,
}

impl InMemoryObjectiveStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objectives.
    pub async fn len(&self) -> usize {
        self.blobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.blobs.read().await.is_empty()
    }
}

#[async_trait]
impl ObjectiveStore for InMemoryObjectiveStore {
    async fn put(&self, bytes: Vec<u8>) -> Result<ObjectiveRef> {
        let id = content_id(&bytes);
        let mut blobs = self.blobs.write().await;
        blobs.entry(id.clone()).or_insert(bytes);
        Ok(id)
    }

    async fn get(&self, objective: &ObjectiveRef) -> Result<Vec<u8>> {
        let blobs = self.blobs.read().await;
        blobs
            .get(objective)
            .cloned()
            .ok_or_else(|| MarketError::NotFound {
                resource_type: "objective".to_string(),
                id: objective.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_and_get() {
        let store = InMemoryObjectiveStore::new();

        let id = store.put(b"fly to waypoint 3".to_vec()).await.unwrap();
        assert!(id.as_str().starts_with(CONTENT_ID_PREFIX));

        let bytes = store.get(&id).await.unwrap();
        assert_eq!(bytes, b"fly to waypoint 3");
    }

    #[tokio::test]
    async fn test_identical_content_shares_id() {
        let store = InMemoryObjectiveStore::new();

        let a = store.put(b"same".to_vec()).await.unwrap();
        let b = store.put(b"same".to_vec()).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_missing_objective() {
        let store = InMemoryObjectiveStore::new();
        let result = store.get(&ObjectiveRef::new("sha256:00")).await;
        assert!(matches!(result, Err(MarketError::NotFound { .. })));
    }
}
