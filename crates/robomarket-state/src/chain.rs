//! Local block counters.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use robomarket_core::{BlockSource, MarketError, Result};

/// Block counter advanced by hand. Can be told to fail the next few lookups.
#[derive(Clone, Default)]
pub struct ManualBlockSource {
    block: Arc<AtomicU64>,
    failures: Arc<AtomicU32>,
}

impl ManualBlockSource {
    pub fn new(block: u64) -> Self {
        Self {
            block: Arc::new(AtomicU64::new(block)),
            failures: Arc::new(AtomicU32::new(0)),
        }
    }

    pub fn advance(&self, blocks: u64) {
        self.block.fetch_add(blocks, Ordering::SeqCst);
    }

    /// Make the next `count` lookups fail with a transient error.
    pub fn fail_next(&self, count: u32) {
        self.failures.store(count, Ordering::SeqCst);
    }
}

#[async_trait]
impl BlockSource for ManualBlockSource {
    async fn current_block(&self) -> Result<u64> {
        let failing = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(MarketError::transient("current_block", "block lookup failed"));
        }
        Ok(self.block.load(Ordering::SeqCst))
    }
}

/// Block counter derived from wall-clock time since creation.
#[derive(Debug, Clone)]
pub struct ClockBlockSource {
    genesis: Instant,
    base: u64,
    interval: Duration,
}

impl ClockBlockSource {
    pub fn new(base: u64, interval: Duration) -> Self {
        Self {
            genesis: Instant::now(),
            base,
            interval,
        }
    }
}

#[async_trait]
impl BlockSource for ClockBlockSource {
    async fn current_block(&self) -> Result<u64> {
        let interval_ms = self.interval.as_millis().max(1);
        let elapsed = (self.genesis.elapsed().as_millis() / interval_ms) as u64;
        Ok(self.base.saturating_add(elapsed))
    }
}
