//! Ledger that records every call it receives.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use robomarket_core::{Address, FinishStatus, LiabilityLedger, MarketError, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::info;

/// A call received by the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum LedgerCall {
    Start { address: Address },
    Finish { address: Address, status: FinishStatus },
}

#[derive(Default)]
struct Faults {
    reject_start: HashSet<Address>,
    reject_finish: HashSet<Address>,
    start_delay: Option<Duration>,
}

/// In-process ledger that logs and records calls.
///
/// Starts and finishes can be made to fail per address.
#[derive(Clone, Default)]
pub struct RecordingLedger {
    calls: Arc<RwLock<Vec<(LedgerCall, DateTime<Utc>)>>>,
    faults: Arc<RwLock<Faults>>,
}

impl RecordingLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn reject_start(&self, address: Address) {
        self.faults.write().await.reject_start.insert(address);
    }

    pub async fn reject_finish(&self, address: Address) {
        self.faults.write().await.reject_finish.insert(address);
    }

    /// Delay every start call.
    pub async fn set_start_delay(&self, delay: Duration) {
        self.faults.write().await.start_delay = Some(delay);
    }

    /// All calls in arrival order.
    pub async fn calls(&self) -> Vec<LedgerCall> {
        self.calls.read().await.iter().map(|(c, _)| c.clone()).collect()
    }

    pub async fn start_count(&self, address: &Address) -> usize {
        self.calls()
            .await
            .iter()
            .filter(|c| matches!(c, LedgerCall::Start { address: a } if a == address))
            .count()
    }

    pub async fn finishes(&self, address: &Address) -> Vec<FinishStatus> {
        self.calls()
            .await
            .into_iter()
            .filter_map(|c| match c {
                LedgerCall::Finish { address: a, status } if &a == address => Some(status),
                _ => None,
            })
            .collect()
    }

    async fn record(&self, call: LedgerCall) {
        self.calls.write().await.push((call, Utc::now()));
    }
}

#[async_trait]
impl LiabilityLedger for RecordingLedger {
    async fn start(&self, address: &Address) -> Result<()> {
        let (rejected, delay) = {
            let faults = self.faults.read().await;
            (faults.reject_start.contains(address), faults.start_delay)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.record(LedgerCall::Start {
            address: address.clone(),
        })
        .await;
        if rejected {
            return Err(MarketError::StartFailed {
                address: address.clone(),
                message: "start rejected by ledger".to_string(),
            });
        }
        info!(address = %address, "Ledger: liability started");
        Ok(())
    }

    async fn finish(&self, address: &Address, status: FinishStatus) -> Result<()> {
        let rejected = self.faults.read().await.reject_finish.contains(address);
        self.record(LedgerCall::Finish {
            address: address.clone(),
            status,
        })
        .await;
        if rejected {
            return Err(MarketError::FinishFailed {
                address: address.clone(),
                message: "finish rejected by ledger".to_string(),
            });
        }
        info!(address = %address, ?status, "Ledger: liability finished");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_calls_in_order() {
        let ledger = RecordingLedger::new();
        let address = Address::new("0xA1");

        ledger.start(&address).await.unwrap();
        ledger.finish(&address, FinishStatus::Success).await.unwrap();

        assert_eq!(
            ledger.calls().await,
            vec![
                LedgerCall::Start { address: address.clone() },
                LedgerCall::Finish { address: address.clone(), status: FinishStatus::Success },
            ]
        );
        assert_eq!(ledger.start_count(&address).await, 1);
    }

    #[tokio::test]
    async fn test_rejections_are_recorded_and_fail() {
        let ledger = RecordingLedger::new();
        let address = Address::new("0xB2");
        ledger.reject_start(address.clone()).await;

        assert!(ledger.start(&address).await.is_err());
        assert_eq!(ledger.start_count(&address).await, 1);
    }
}
