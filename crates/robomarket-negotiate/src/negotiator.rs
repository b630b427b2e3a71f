//! Negotiator actor: the single writer of [`AgentState`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use robomarket_core::{
    AgentConfig, AgentState, Bid, BidKind, BlockSource, ObjectiveRef, ObjectiveStore, Result,
    RetryPolicy, SigningGateway,
};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::listener::MarketListener;
use crate::protocol::NegotiationEvent;
use crate::strategy::{Action, ConvergenceStrategy};

const EVENT_CAPACITY: usize = 256;

/// Builds outbound bids and submits them through the signing gateway.
#[derive(Clone)]
pub struct Publisher {
    config: Arc<AgentConfig>,
    gateway: Arc<dyn SigningGateway>,
    blocks: Arc<dyn BlockSource>,
    retry: RetryPolicy,
    nonce: Arc<AtomicU64>,
}

impl Publisher {
    pub fn new(
        config: Arc<AgentConfig>,
        gateway: Arc<dyn SigningGateway>,
        blocks: Arc<dyn BlockSource>,
    ) -> Self {
        let retry = RetryPolicy::from(&config.retry);
        Self {
            config,
            gateway,
            blocks,
            retry,
            nonce: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Build the outbound bid: local model and token, clamped cost,
    /// deadline `current_block + bid_lifetime`.
    pub async fn build(&self, kind: BidKind, objective: ObjectiveRef, cost: i64) -> Result<Bid> {
        let current = self
            .retry
            .run("current_block", || self.blocks.current_block())
            .await?;

        let mut bid = Bid::new(kind, &self.config.model, &self.config.token, objective, cost)
            .with_deadline(current.saturating_add(self.config.bid_lifetime))
            .with_sender(self.config.address.clone())
            .with_nonce(self.nonce.fetch_add(1, Ordering::SeqCst));
        if kind == BidKind::Offer {
            bid = bid.with_lighthouse(&self.config.lighthouse);
        }
        Ok(bid.normalized())
    }

    /// Build and submit, retrying transient failures.
    pub async fn publish(&self, kind: BidKind, objective: ObjectiveRef, cost: i64) -> Result<Bid> {
        let bid = self.build(kind, objective, cost).await?;
        self.retry
            .run("submit", || self.gateway.submit(bid.clone()))
            .await?;
        info!(
            bid_id = %bid.id,
            kind = ?bid.kind,
            objective = %bid.objective,
            cost = bid.cost,
            deadline = bid.deadline,
            "Bid published"
        );
        Ok(bid)
    }
}

/// Owns the agent state and applies the convergence strategy to bids in
/// receipt order.
pub struct Negotiator {
    state: AgentState,
    strategy: ConvergenceStrategy,
    publisher: Publisher,
    inbound: mpsc::Receiver<Bid>,
    state_tx: watch::Sender<AgentState>,
    events: broadcast::Sender<NegotiationEvent>,
}

/// Cloneable access to a running negotiator.
#[derive(Clone)]
pub struct NegotiatorHandle {
    inbound: mpsc::Sender<Bid>,
    state_rx: watch::Receiver<AgentState>,
    events: broadcast::Sender<NegotiationEvent>,
    publisher: Publisher,
    store: Arc<dyn ObjectiveStore>,
    config: Arc<AgentConfig>,
}

impl Negotiator {
    /// Start the negotiator task.
    pub fn spawn(
        config: Arc<AgentConfig>,
        gateway: Arc<dyn SigningGateway>,
        blocks: Arc<dyn BlockSource>,
        store: Arc<dyn ObjectiveStore>,
    ) -> (NegotiatorHandle, JoinHandle<()>) {
        let (inbound_tx, inbound_rx) = mpsc::channel(config.queue_capacity.max(1));
        let state = AgentState::from_config(&config);
        let (state_tx, state_rx) = watch::channel(state.clone());
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let publisher = Publisher::new(config.clone(), gateway, blocks);

        let negotiator = Negotiator {
            state,
            strategy: ConvergenceStrategy::from_config(&config),
            publisher: publisher.clone(),
            inbound: inbound_rx,
            state_tx,
            events: events.clone(),
        };

        let handle = NegotiatorHandle {
            inbound: inbound_tx,
            state_rx,
            events,
            publisher,
            store,
            config,
        };

        (handle, tokio::spawn(negotiator.run()))
    }

    async fn run(mut self) {
        info!(
            model = %self.state.model,
            token = %self.state.token,
            cost = self.state.cost,
            "Negotiator started"
        );
        while let Some(bid) = self.inbound.recv().await {
            self.handle(bid);
        }
        info!("Negotiator stopped");
    }

    fn handle(&mut self, bid: Bid) {
        let (next, action) = self.strategy.react(&self.state, &bid);
        self.state = next;

        match action {
            Action::None => {
                debug!(bid_id = %bid.id, kind = ?bid.kind, "Bid ignored by policy");
                let _ = self.events.send(NegotiationEvent::Ignored { bid_id: bid.id });
            }
            Action::AdjustPrice { delta } => {
                self.state_tx.send_replace(self.state.clone());
                info!(
                    bid_id = %bid.id,
                    their_cost = bid.cost,
                    delta,
                    cost = self.state.cost,
                    "Asking cost adjusted"
                );
                let _ = self.events.send(NegotiationEvent::Adjusted {
                    bid_id: bid.id,
                    delta,
                    cost: self.state.cost,
                });
            }
            action => {
                if let Some((kind, objective, cost)) = action.publication() {
                    self.spawn_publish(bid.id, kind, objective.clone(), cost);
                }
            }
        }
    }

    /// Publication runs off the actor so a slow gateway never stalls negotiation.
    fn spawn_publish(&self, bid_id: uuid::Uuid, kind: BidKind, objective: ObjectiveRef, cost: i64) {
        let publisher = self.publisher.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            match publisher.publish(kind, objective, cost).await {
                Ok(bid) => {
                    let _ = events.send(NegotiationEvent::Published(bid));
                }
                Err(err) => {
                    warn!(bid_id = %bid_id, error = %err, "Publication dropped");
                    let _ = events.send(NegotiationEvent::Dropped {
                        bid_id: Some(bid_id),
                        reason: err.to_string(),
                    });
                }
            }
        });
    }
}

impl NegotiatorHandle {
    /// Snapshot of the agent state.
    pub fn state(&self) -> AgentState {
        self.state_rx.borrow().clone()
    }

    /// Watch the agent state.
    pub fn watch_state(&self) -> watch::Receiver<AgentState> {
        self.state_rx.clone()
    }

    pub fn events(&self) -> broadcast::Receiver<NegotiationEvent> {
        self.events.subscribe()
    }

    /// Listener feeding this negotiator.
    pub fn listener(&self) -> MarketListener {
        MarketListener::new(&self.config, self.inbound.clone())
    }

    /// Store an objective and publish a demand for it.
    pub async fn post_demand(&self, objective: Vec<u8>, cost: i64) -> Result<Bid> {
        let policy = self.publisher.retry;
        let objective = policy
            .run("objective_put", || self.store.put(objective.clone()))
            .await?;
        let result = self.publisher.publish(BidKind::Demand, objective, cost).await;
        match &result {
            Ok(bid) => {
                let _ = self.events.send(NegotiationEvent::Published(bid.clone()));
            }
            Err(err) => {
                warn!(error = %err, "Demand dropped");
                let _ = self.events.send(NegotiationEvent::Dropped {
                    bid_id: None,
                    reason: err.to_string(),
                });
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use robomarket_core::{NegotiationPolicy, RetryConfig};
    use robomarket_state::{InMemoryObjectiveStore, LoopbackGateway, ManualBlockSource};

    use super::*;

    struct Fixture {
        handle: NegotiatorHandle,
        gateway: LoopbackGateway,
        blocks: ManualBlockSource,
        store: InMemoryObjectiveStore,
    }

    fn fixture(config: AgentConfig) -> Fixture {
        let gateway = LoopbackGateway::detached();
        let blocks = ManualBlockSource::new(1_000);
        let store = InMemoryObjectiveStore::new();
        let (handle, _task) = Negotiator::spawn(
            Arc::new(config),
            Arc::new(gateway.clone()),
            Arc::new(blocks.clone()),
            Arc::new(store.clone()),
        );
        Fixture {
            handle,
            gateway,
            blocks,
            store,
        }
    }

    fn config(start: i64) -> AgentConfig {
        AgentConfig {
            arrangement_price_start: start,
            retry: RetryConfig {
                max_attempts: 3,
                base_delay_ms: 1,
                max_delay_ms: 2,
                call_timeout_ms: 500,
            },
            ..AgentConfig::default()
        }
    }

    fn demand(cost: i64) -> Bid {
        Bid::demand("default", "xrt", ObjectiveRef::new("QmTask"), cost)
    }

    async fn next_event(events: &mut broadcast::Receiver<NegotiationEvent>) -> NegotiationEvent {
        tokio::time::timeout(Duration::from_secs(2), events.recv())
            .await
            .expect("no event")
            .expect("event channel closed")
    }

    #[tokio::test]
    async fn test_far_demand_adjusts_state() {
        let f = fixture(config(10));
        let mut events = f.handle.events();

        assert_eq!(f.handle.listener().on_incoming(demand(15)), crate::ListenOutcome::Forwarded);

        match next_event(&mut events).await {
            NegotiationEvent::Adjusted { delta, cost, .. } => {
                assert_eq!(delta, 1);
                assert_eq!(cost, 11);
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert_eq!(f.handle.state().cost, 11);
        assert!(f.gateway.submitted().await.is_empty());
    }

    #[tokio::test]
    async fn test_close_demand_publishes_offer() {
        let f = fixture(config(10));
        let mut events = f.handle.events();

        f.handle.listener().on_incoming(demand(11));

        match next_event(&mut events).await {
            NegotiationEvent::Published(bid) => {
                assert_eq!(bid.kind, BidKind::Offer);
                assert_eq!(bid.cost, 11);
                assert_eq!(bid.objective, ObjectiveRef::new("QmTask"));
                assert_eq!(bid.deadline, 1_000 + 128);
                assert_eq!(bid.lighthouse.as_deref(), Some("local.lighthouse"));
                assert_eq!(bid.sender, Some(AgentConfig::default().address));
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert_eq!(f.handle.state().cost, 10);
        assert_eq!(f.gateway.submitted().await.len(), 1);
    }

    #[tokio::test]
    async fn test_adjustments_apply_in_receipt_order() {
        let f = fixture(config(0));
        let mut events = f.handle.events();
        let listener = f.handle.listener();

        for _ in 0..5 {
            listener.on_incoming(demand(100));
        }
        let mut costs = Vec::new();
        for _ in 0..5 {
            if let NegotiationEvent::Adjusted { cost, .. } = next_event(&mut events).await {
                costs.push(cost);
            }
        }
        assert_eq!(costs, vec![1, 2, 3, 4, 5]);
        assert_eq!(f.handle.state().cost, 5);
    }

    #[tokio::test]
    async fn test_unreachable_gateway_is_retried() {
        let f = fixture(config(10));
        let mut events = f.handle.events();
        f.gateway.fail_next(2);
        f.blocks.fail_next(1);

        f.handle.listener().on_incoming(demand(10));

        assert!(matches!(next_event(&mut events).await, NegotiationEvent::Published(_)));
        assert_eq!(f.gateway.submitted().await.len(), 1);
    }

    #[tokio::test]
    async fn test_exhausted_retries_drop_action_and_engine_stays_live() {
        let f = fixture(config(10));
        let mut events = f.handle.events();
        f.gateway.fail_next(3);

        let listener = f.handle.listener();
        listener.on_incoming(demand(10));
        assert!(matches!(
            next_event(&mut events).await,
            NegotiationEvent::Dropped { .. }
        ));

        listener.on_incoming(demand(30));
        assert!(matches!(
            next_event(&mut events).await,
            NegotiationEvent::Adjusted { cost: 11, .. }
        ));
    }

    #[tokio::test]
    async fn test_negative_cost_is_clamped_on_publish() {
        let f = fixture(config(0));
        let mut events = f.handle.events();

        f.handle.listener().on_incoming(demand(-1));

        match next_event(&mut events).await {
            NegotiationEvent::Published(bid) => assert_eq!(bid.cost, 0),
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_offer_policy_disabled_ignores_offers() {
        let f = fixture(config(10));
        let mut events = f.handle.events();

        let offer = Bid::offer("default", "xrt", ObjectiveRef::new("Qm"), 50);
        f.handle.listener().on_incoming(offer);

        assert!(matches!(next_event(&mut events).await, NegotiationEvent::Ignored { .. }));
        assert_eq!(f.handle.state().cost, 10);
    }

    #[tokio::test]
    async fn test_offer_answered_with_demand_when_enabled() {
        let f = fixture(AgentConfig {
            policy: NegotiationPolicy {
                react_to_demand: true,
                react_to_offer: true,
            },
            ..config(10)
        });
        let mut events = f.handle.events();

        let offer = Bid::offer("default", "xrt", ObjectiveRef::new("Qm"), 9);
        f.handle.listener().on_incoming(offer);

        match next_event(&mut events).await {
            NegotiationEvent::Published(bid) => {
                assert_eq!(bid.kind, BidKind::Demand);
                assert_eq!(bid.cost, 9);
                assert!(bid.lighthouse.is_none());
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_post_demand_stores_objective() {
        let f = fixture(config(10));

        let bid = f.handle.post_demand(b"inspect pipe 7".to_vec(), 25).await.unwrap();

        assert_eq!(bid.kind, BidKind::Demand);
        assert_eq!(bid.cost, 25);
        assert_eq!(f.store.get(&bid.objective).await.unwrap(), b"inspect pipe 7");
        assert_eq!(f.gateway.submitted().await, vec![bid]);
    }

    #[tokio::test]
    async fn test_nonce_increases() {
        let f = fixture(config(10));
        let first = f.handle.post_demand(b"a".to_vec(), 1).await.unwrap();
        let second = f.handle.post_demand(b"b".to_vec(), 1).await.unwrap();
        assert!(second.nonce > first.nonce);
    }
}
