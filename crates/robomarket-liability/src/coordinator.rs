//! Liability lifecycle coordinator.
//!
//! Each accepted liability runs in its own task through
//! Pending → Started → Executing → Finished | Failed. Tasks for different
//! addresses run concurrently and never touch each other's state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use robomarket_core::{
    topics, Address, AgentConfig, FinishStatus, Liability, LiabilityLedger, LiabilityRecord,
    LiabilityState, MarketError, ObjectiveStore, RetryPolicy, Transport, WorkResult,
};
use tokio::sync::{Notify, RwLock};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::table::{LiabilityTable, ReadyOutcome};
use crate::worker::{WorkContext, WorkerStrategy};

struct Inner {
    ledger: Arc<dyn LiabilityLedger>,
    worker: Arc<dyn WorkerStrategy>,
    store: Arc<dyn ObjectiveStore>,
    transport: Arc<dyn Transport>,
    retry: RetryPolicy,
    table: RwLock<LiabilityTable>,
    accepting: AtomicBool,
    drained: Notify,
}

/// Owns the lifecycle of every liability this agent executes.
#[derive(Clone)]
pub struct LiabilityCoordinator {
    inner: Arc<Inner>,
}

impl LiabilityCoordinator {
    pub fn new(
        config: &AgentConfig,
        ledger: Arc<dyn LiabilityLedger>,
        worker: Arc<dyn WorkerStrategy>,
        store: Arc<dyn ObjectiveStore>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                ledger,
                worker,
                store,
                transport,
                retry: RetryPolicy::from(&config.retry),
                table: RwLock::new(LiabilityTable::new(config.history_limit)),
                accepting: AtomicBool::new(true),
                drained: Notify::new(),
            }),
        }
    }

    /// Handle a liability-ready notification.
    ///
    /// Accepted liabilities are processed in the background; a notification for
    /// an address already in flight or already processed is ignored.
    pub async fn on_ready(&self, liability: Liability) -> ReadyOutcome {
        if let Err(err) = liability.validate() {
            warn!(error = %err, "Dropping malformed liability notification");
            return ReadyOutcome::Rejected;
        }
        if !self.inner.accepting.load(Ordering::SeqCst) {
            warn!(address = %liability.address, "Shutting down, liability not accepted");
            return ReadyOutcome::ShuttingDown;
        }

        let outcome = self.inner.table.write().await.try_insert(&liability.address);
        match outcome {
            ReadyOutcome::Accepted => {
                info!(address = %liability.address, "Liability accepted");
                let coordinator = self.clone();
                tokio::spawn(async move { coordinator.process(liability).await });
            }
            other => {
                debug!(address = %liability.address, outcome = ?other, "Duplicate liability notification ignored");
            }
        }
        outcome
    }

    async fn process(&self, liability: Liability) {
        let address = liability.address.clone();

        if let Err(err) = self
            .inner
            .retry
            .once("start", self.inner.ledger.start(&address))
            .await
        {
            error!(address = %address, error = %err, "Liability start failed, abandoning");
            self.complete(&address, LiabilityState::Failed, Some(err.to_string()))
                .await;
            return;
        }
        self.transition(&address, LiabilityState::Started).await;

        let work = self.execute(liability).await;

        match work {
            Ok(result) => self.finish_success(&address, result).await,
            Err(err) => {
                warn!(address = %address, error = %err, "Worker failed");
                if let Err(finish_err) = self.finish(&address, FinishStatus::Failure).await {
                    error!(address = %address, error = %finish_err, "Finish after failure failed");
                }
                self.complete(&address, LiabilityState::Failed, Some(err.to_string()))
                    .await;
            }
        }
    }

    async fn execute(&self, liability: Liability) -> Result<WorkResult, MarketError> {
        let address = liability.address.clone();

        let objective = match &liability.objective {
            Some(objective) => Some(
                self.inner
                    .retry
                    .run("objective_get", || self.inner.store.get(objective))
                    .await?,
            ),
            None => None,
        };

        self.transition(&address, LiabilityState::Executing).await;
        info!(address = %address, worker = self.inner.worker.name(), "Executing liability");

        let worker = self.inner.worker.clone();
        let context = WorkContext {
            liability,
            objective,
        };
        match tokio::spawn(async move { worker.execute(context).await }).await {
            Ok(result) => result,
            Err(join_err) => Err(MarketError::WorkerFailed {
                address,
                message: format!("worker task aborted: {}", join_err),
            }),
        }
    }

    async fn finish_success(&self, address: &Address, result: WorkResult) {
        if let Err(err) = self.finish(address, FinishStatus::Success).await {
            error!(address = %address, error = %err, "Liability finish failed");
            self.complete(address, LiabilityState::Failed, Some(err.to_string()))
                .await;
            return;
        }

        self.complete(address, LiabilityState::Finished, None).await;

        let transport = &self.inner.transport;
        let published = self
            .inner
            .retry
            .run("publish_result", || transport.publish(topics::RESULT, result.clone()))
            .await;
        if let Err(err) = published {
            warn!(address = %address, error = %err, "Result publication dropped");
        }
    }

    /// Exactly one finish call per liability; never retried.
    async fn finish(&self, address: &Address, status: FinishStatus) -> robomarket_core::Result<()> {
        self.inner
            .retry
            .once("finish", self.inner.ledger.finish(address, status))
            .await
    }

    async fn transition(&self, address: &Address, state: LiabilityState) {
        debug!(address = %address, ?state, "Liability transition");
        self.inner.table.write().await.transition(address, state);
    }

    async fn complete(&self, address: &Address, state: LiabilityState, error: Option<String>) {
        let record = self.inner.table.write().await.complete(address, state, error);
        if let Some(record) = record {
            info!(address = %address, state = ?record.state, "Liability released");
        }
        self.inner.drained.notify_waiters();
    }

    pub async fn record(&self, address: &Address) -> Option<LiabilityRecord> {
        self.inner.table.read().await.get(address)
    }

    pub async fn active(&self) -> Vec<LiabilityRecord> {
        self.inner.table.read().await.active()
    }

    pub async fn history(&self) -> Vec<LiabilityRecord> {
        self.inner.table.read().await.history()
    }

    /// Stop accepting liabilities and wait up to `grace` for in-flight ones.
    ///
    /// Returns the addresses abandoned when the grace period ran out.
    pub async fn shutdown(&self, grace: Duration) -> Vec<Address> {
        self.inner.accepting.store(false, Ordering::SeqCst);
        let deadline = Instant::now() + grace;

        loop {
            let drained = self.inner.drained.notified();
            if self.inner.table.read().await.active_count() == 0 {
                info!("All liabilities reached a terminal state");
                return Vec::new();
            }
            if tokio::time::timeout_at(deadline, drained).await.is_err() {
                break;
            }
        }

        let abandoned = self.inner.table.read().await.active_addresses();
        for address in &abandoned {
            warn!(address = %address, "Liability abandoned at shutdown");
        }
        abandoned
    }
}
