//! Market listener: filters inbound bids and hands matches to the negotiator.

use robomarket_core::{Address, AgentConfig, Bid};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// What happened to an inbound bid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenOutcome {
    /// Queued for negotiation.
    Forwarded,
    /// Not for us.
    Filtered,
    /// Malformed, or the negotiator queue was full or closed.
    Dropped,
}

/// Receives market bids and forwards the ones matching the local model and token.
///
/// Never blocks the caller: the hand-off to the negotiator is a `try_send`.
#[derive(Clone)]
pub struct MarketListener {
    model: String,
    token: String,
    address: Address,
    negotiator: mpsc::Sender<Bid>,
}

impl MarketListener {
    pub fn new(config: &AgentConfig, negotiator: mpsc::Sender<Bid>) -> Self {
        Self {
            model: config.model.clone(),
            token: config.token.clone(),
            address: config.address.clone(),
            negotiator,
        }
    }

    pub fn on_incoming(&self, bid: Bid) -> ListenOutcome {
        if let Err(err) = bid.validate() {
            warn!(bid_id = %bid.id, error = %err, "Dropping malformed bid");
            return ListenOutcome::Dropped;
        }

        if !bid.matches(&self.model, &self.token) {
            info!(
                bid_id = %bid.id,
                model = %bid.model,
                token = %bid.token,
                "Bid filtered: model/token mismatch"
            );
            return ListenOutcome::Filtered;
        }

        if bid.sender.as_ref() == Some(&self.address) {
            debug!(bid_id = %bid.id, "Bid filtered: own bid");
            return ListenOutcome::Filtered;
        }

        match self.negotiator.try_send(bid) {
            Ok(()) => ListenOutcome::Forwarded,
            Err(mpsc::error::TrySendError::Full(bid)) => {
                warn!(bid_id = %bid.id, "Negotiator queue full, dropping bid");
                ListenOutcome::Dropped
            }
            Err(mpsc::error::TrySendError::Closed(bid)) => {
                warn!(bid_id = %bid.id, "Negotiator stopped, dropping bid");
                ListenOutcome::Dropped
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use robomarket_core::ObjectiveRef;

    use super::*;

    fn listener(capacity: usize) -> (MarketListener, mpsc::Receiver<Bid>) {
        let (tx, rx) = mpsc::channel(capacity);
        (MarketListener::new(&AgentConfig::default(), tx), rx)
    }

    fn bid(model: &str, token: &str) -> Bid {
        Bid::demand(model, token, ObjectiveRef::new("Qm"), 10)
    }

    #[test]
    fn test_forwards_matching_bid() {
        let (listener, mut rx) = listener(4);
        let incoming = bid("default", "xrt");
        assert_eq!(listener.on_incoming(incoming.clone()), ListenOutcome::Forwarded);
        assert_eq!(rx.try_recv().unwrap(), incoming);
    }

    #[test]
    fn test_never_forwards_mismatch() {
        let (listener, mut rx) = listener(16);
        for (model, token) in [("other", "xrt"), ("default", "eth"), ("other", "eth")] {
            assert_eq!(listener.on_incoming(bid(model, token)), ListenOutcome::Filtered);
        }
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_filters_own_echo() {
        let (listener, mut rx) = listener(4);
        let own = bid("default", "xrt").with_sender(AgentConfig::default().address);
        assert_eq!(listener.on_incoming(own), ListenOutcome::Filtered);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_full_queue_drops_without_blocking() {
        let (listener, _rx) = listener(1);
        assert_eq!(listener.on_incoming(bid("default", "xrt")), ListenOutcome::Forwarded);
        assert_eq!(listener.on_incoming(bid("default", "xrt")), ListenOutcome::Dropped);
    }

    #[test]
    fn test_malformed_dropped() {
        let (listener, mut rx) = listener(4);
        assert_eq!(listener.on_incoming(bid("", "xrt")), ListenOutcome::Dropped);
        assert!(rx.try_recv().is_err());
    }
}
