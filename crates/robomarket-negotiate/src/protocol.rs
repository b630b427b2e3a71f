//! Wire decoding of market messages and negotiation events.

use robomarket_core::{Bid, BidKind, Liability, MarketError, Result};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Decode a bid received on `topic`.
///
/// The topic decides the kind when the payload omits it; a payload whose kind
/// contradicts its topic is malformed.
pub fn decode_bid(topic_kind: BidKind, message: serde_json::Value) -> Result<Bid> {
    let mut message = message;
    if let Some(object) = message.as_object_mut() {
        object
            .entry("kind")
            .or_insert_with(|| serde_json::to_value(topic_kind).unwrap_or_default());
    }
    let bid: Bid = serde_json::from_value(message)
        .map_err(|e| MarketError::Malformed(format!("undecodable bid: {}", e)))?;
    if bid.kind != topic_kind {
        return Err(MarketError::Malformed(format!(
            "bid {} of kind {:?} on {} topic",
            bid.id,
            bid.kind,
            topic_kind.topic()
        )));
    }
    bid.validate()?;
    Ok(bid)
}

/// Decode a liability-ready notification.
pub fn decode_liability(message: serde_json::Value) -> Result<Liability> {
    let liability: Liability = serde_json::from_value(message)
        .map_err(|e| MarketError::Malformed(format!("undecodable liability: {}", e)))?;
    liability.validate()?;
    Ok(liability)
}

/// Observable negotiation events.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NegotiationEvent {
    /// Bid processed without any effect.
    Ignored { bid_id: Uuid },

    /// Asking cost moved.
    Adjusted { bid_id: Uuid, delta: i64, cost: i64 },

    /// A bid was accepted by the signing gateway.
    Published(Bid),

    /// A publication was abandoned after retries.
    Dropped { bid_id: Option<Uuid>, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_bid_takes_kind_from_topic() {
        let message = serde_json::json!({"model": "m", "token": "t", "objective": "Qm", "cost": 4});
        let bid = decode_bid(BidKind::Offer, message).unwrap();
        assert_eq!(bid.kind, BidKind::Offer);
    }

    #[test]
    fn test_decode_bid_rejects_kind_mismatch() {
        let message = serde_json::json!({"kind": "offer", "model": "m", "token": "t", "objective": "Qm", "cost": 4});
        assert!(matches!(
            decode_bid(BidKind::Demand, message),
            Err(MarketError::Malformed(_))
        ));
    }

    #[test]
    fn test_decode_bid_rejects_missing_fields() {
        let message = serde_json::json!({"model": "m", "cost": 4});
        assert!(matches!(
            decode_bid(BidKind::Demand, message),
            Err(MarketError::Malformed(_))
        ));

        let blank = serde_json::json!({"model": "m", "token": "t", "objective": "", "cost": 4});
        assert!(decode_bid(BidKind::Demand, blank).is_err());
    }

    #[test]
    fn test_decode_liability() {
        let liability = decode_liability(serde_json::json!({"address": "0xA1"})).unwrap();
        assert_eq!(liability.address.as_str(), "0xA1");
        assert!(decode_liability(serde_json::json!({"objective": "Qm"})).is_err());
    }

    #[test]
    fn test_event_serialization() {
        let event = NegotiationEvent::Adjusted {
            bid_id: Uuid::new_v4(),
            delta: 1,
            cost: 11,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("adjusted"));
    }
}
