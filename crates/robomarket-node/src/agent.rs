//! Agent wiring: collaborators, negotiator, coordinator and transport pumps.

use std::sync::Arc;
use std::time::Duration;

use robomarket_core::{
    topics, AgentConfig, BidKind, BlockSource, LiabilityLedger, ObjectiveStore, SigningGateway,
    Subscription, Transport,
};
use robomarket_gateway::HttpGateway;
use robomarket_liability::{worker_from_config, LiabilityCoordinator};
use robomarket_negotiate::{decode_bid, decode_liability, MarketListener, Negotiator};
use robomarket_state::{
    ClockBlockSource, InMemoryBus, InMemoryObjectiveStore, LoopbackGateway, RecordingLedger,
};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::state::AppState;

/// Block interval of the local block counter in standalone mode.
const LOCAL_BLOCK_INTERVAL: Duration = Duration::from_secs(1);

struct Collaborators {
    gateway: Arc<dyn SigningGateway>,
    ledger: Arc<dyn LiabilityLedger>,
    blocks: Arc<dyn BlockSource>,
}

fn collaborators(config: &AgentConfig, transport: Arc<dyn Transport>) -> anyhow::Result<Collaborators> {
    match &config.gateway_url {
        Some(url) => {
            info!(url = %url, "Using remote gateway");
            let remote = Arc::new(HttpGateway::new(url, config.retry.call_timeout())?);
            Ok(Collaborators {
                gateway: remote.clone(),
                ledger: remote.clone(),
                blocks: remote,
            })
        }
        None => {
            info!("No gateway configured, running standalone");
            Ok(Collaborators {
                gateway: Arc::new(LoopbackGateway::new(transport)),
                ledger: Arc::new(RecordingLedger::new()),
                blocks: Arc::new(ClockBlockSource::new(0, LOCAL_BLOCK_INTERVAL)),
            })
        }
    }
}

/// A running agent.
pub struct Agent {
    pub state: AppState,
    tasks: Vec<JoinHandle<()>>,
}

impl Agent {
    /// Wire everything up and start the negotiator and transport pumps.
    pub async fn start(config: AgentConfig) -> anyhow::Result<Self> {
        let config = Arc::new(config);
        let transport: Arc<dyn Transport> = Arc::new(InMemoryBus::new());
        let store: Arc<dyn ObjectiveStore> = Arc::new(InMemoryObjectiveStore::new());
        let parts = collaborators(&config, transport.clone())?;

        let (negotiator, negotiator_task) =
            Negotiator::spawn(config.clone(), parts.gateway, parts.blocks, store.clone());

        let coordinator = LiabilityCoordinator::new(
            &config,
            parts.ledger,
            worker_from_config(&config.worker)?,
            store,
            transport.clone(),
        );

        // Subscribe before anything can publish; the bus drops unsubscribed topics.
        let demands = transport.subscribe(topics::DEMAND).await?;
        let offers = transport.subscribe(topics::OFFER).await?;
        let ready = transport.subscribe(topics::LIABILITY_READY).await?;

        let listener = negotiator.listener();
        let tasks = vec![
            negotiator_task,
            tokio::spawn(pump_bids(demands, BidKind::Demand, listener.clone())),
            tokio::spawn(pump_bids(offers, BidKind::Offer, listener)),
            tokio::spawn(pump_liabilities(ready, coordinator.clone())),
        ];

        info!(
            model = %config.model,
            token = %config.token,
            address = %config.address,
            "Agent started"
        );

        Ok(Self {
            state: AppState {
                config,
                transport,
                negotiator,
                coordinator,
            },
            tasks,
        })
    }

    /// Let in-flight liabilities finish, then stop the background tasks.
    pub async fn shutdown(self) {
        let grace = self.state.config.shutdown_grace();
        let abandoned = self.state.coordinator.shutdown(grace).await;
        if !abandoned.is_empty() {
            warn!(count = abandoned.len(), "Liabilities abandoned at shutdown");
        }
        for task in self.tasks {
            task.abort();
        }
        info!("Agent stopped");
    }
}

async fn pump_bids(mut subscription: Subscription, kind: BidKind, listener: MarketListener) {
    while let Some(message) = subscription.recv().await {
        match decode_bid(kind, message) {
            Ok(bid) => {
                listener.on_incoming(bid);
            }
            Err(err) => warn!(topic = %subscription.topic, error = %err, "Dropping malformed bid"),
        }
    }
}

async fn pump_liabilities(mut subscription: Subscription, coordinator: LiabilityCoordinator) {
    while let Some(message) = subscription.recv().await {
        match decode_liability(message) {
            Ok(liability) => {
                coordinator.on_ready(liability).await;
            }
            Err(err) => warn!(error = %err, "Dropping malformed liability notification"),
        }
    }
}

#[cfg(test)]
mod tests {
    use robomarket_core::{Address, Bid, LiabilityState, ObjectiveRef};
    use robomarket_negotiate::NegotiationEvent;

    use super::*;

    fn config() -> AgentConfig {
        AgentConfig {
            arrangement_price_start: 10,
            ..AgentConfig::default()
        }
    }

    #[tokio::test]
    async fn test_demand_on_transport_reaches_negotiator() {
        let agent = Agent::start(config()).await.unwrap();
        let mut events = agent.state.negotiator.events();

        let demand = Bid::demand("default", "xrt", ObjectiveRef::new("QmTask"), 11);
        agent
            .state
            .transport
            .publish(topics::DEMAND, serde_json::to_value(&demand).unwrap())
            .await
            .unwrap();

        let event = tokio::time::timeout(Duration::from_secs(2), events.recv())
            .await
            .unwrap()
            .unwrap();
        match event {
            NegotiationEvent::Published(offer) => {
                assert_eq!(offer.kind, BidKind::Offer);
                assert_eq!(offer.cost, 11);
            }
            other => panic!("unexpected event {:?}", other),
        }

        // own offer echoes back on the offer topic and must not move the price
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(agent.state.negotiator.state().cost, 10);
        agent.shutdown().await;
    }

    #[tokio::test]
    async fn test_malformed_transport_message_is_dropped() {
        let agent = Agent::start(config()).await.unwrap();
        let transport = agent.state.transport.clone();

        transport
            .publish(topics::DEMAND, serde_json::json!({"garbage": true}))
            .await
            .unwrap();
        transport
            .publish(topics::LIABILITY_READY, serde_json::json!("nope"))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(agent.state.negotiator.state().cost, 10);
        assert!(agent.state.coordinator.active().await.is_empty());
        agent.shutdown().await;
    }

    #[tokio::test]
    async fn test_liability_ready_runs_to_finished() {
        let agent = Agent::start(config()).await.unwrap();
        let mut results = agent.state.transport.subscribe(topics::RESULT).await.unwrap();

        agent
            .state
            .transport
            .publish(topics::LIABILITY_READY, serde_json::json!({"address": "0xA1"}))
            .await
            .unwrap();

        let result = tokio::time::timeout(Duration::from_secs(2), results.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(result["address"], "0xA1");

        let record = agent.state.coordinator.record(&Address::new("0xA1")).await.unwrap();
        assert_eq!(record.state, LiabilityState::Finished);
        agent.shutdown().await;
    }
}
