//! Reactive price-convergence strategy.
//!
//! Pure: given the agent state and an incoming bid, returns the next state and
//! the action to take. No I/O happens here.

use robomarket_core::{AgentConfig, AgentState, Bid, BidKind, NegotiationPolicy, ObjectiveRef};
use serde::{Deserialize, Serialize};

/// What the negotiator should do in response to a bid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    /// Nothing to do.
    None,
    /// Asking cost moved by this delta.
    AdjustPrice { delta: i64 },
    /// Answer a demand with a matching offer.
    PublishOffer { objective: ObjectiveRef, cost: i64 },
    /// Answer an offer with a matching demand.
    PublishDemand { objective: ObjectiveRef, cost: i64 },
}

impl Action {
    /// Kind, objective and price of the bid to publish, if any.
    pub fn publication(&self) -> Option<(BidKind, &ObjectiveRef, i64)> {
        match self {
            Action::PublishOffer { objective, cost } => Some((BidKind::Offer, objective, *cost)),
            Action::PublishDemand { objective, cost } => Some((BidKind::Demand, objective, *cost)),
            _ => None,
        }
    }
}

/// Step the asking cost one unit toward the counter-party until the gap is
/// within `threshold`, then publish at the counter-party's price.
pub fn react(
    state: &AgentState,
    bid: &Bid,
    policy: &NegotiationPolicy,
    threshold: i64,
) -> (AgentState, Action) {
    let enabled = match bid.kind {
        BidKind::Demand => policy.react_to_demand,
        BidKind::Offer => policy.react_to_offer,
    };
    if !enabled {
        return (state.clone(), Action::None);
    }

    let diff = state.cost.saturating_sub(bid.cost);
    if diff.saturating_abs() > threshold {
        let delta = -diff.signum();
        return (state.adjusted(delta), Action::AdjustPrice { delta });
    }

    let objective = bid.objective.clone();
    let action = match bid.kind.counterpart() {
        BidKind::Offer => Action::PublishOffer {
            objective,
            cost: bid.cost,
        },
        BidKind::Demand => Action::PublishDemand {
            objective,
            cost: bid.cost,
        },
    };
    (state.clone(), action)
}

/// [`react`] bound to a configured policy and threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvergenceStrategy {
    pub policy: NegotiationPolicy,
    pub threshold: i64,
}

impl ConvergenceStrategy {
    pub fn new(policy: NegotiationPolicy, threshold: i64) -> Self {
        Self { policy, threshold }
    }

    pub fn from_config(config: &AgentConfig) -> Self {
        Self::new(config.policy, config.convergence_threshold)
    }

    pub fn react(&self, state: &AgentState, bid: &Bid) -> (AgentState, Action) {
        react(state, bid, &self.policy, self.threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(cost: i64) -> AgentState {
        AgentState {
            cost,
            ..AgentState::from_config(&AgentConfig::default())
        }
    }

    fn demand(cost: i64) -> Bid {
        Bid::demand("default", "xrt", ObjectiveRef::new("QmTask"), cost)
    }

    fn offer(cost: i64) -> Bid {
        Bid::offer("default", "xrt", ObjectiveRef::new("QmTask"), cost)
    }

    fn both_ways() -> NegotiationPolicy {
        NegotiationPolicy {
            react_to_demand: true,
            react_to_offer: true,
        }
    }

    #[test]
    fn test_far_demand_moves_price_up_one() {
        let (next, action) = react(&state(10), &demand(15), &NegotiationPolicy::default(), 2);
        assert_eq!(action, Action::AdjustPrice { delta: 1 });
        assert_eq!(next.cost, 11);
    }

    #[test]
    fn test_far_demand_moves_price_down_one() {
        let (next, action) = react(&state(10), &demand(4), &NegotiationPolicy::default(), 2);
        assert_eq!(action, Action::AdjustPrice { delta: -1 });
        assert_eq!(next.cost, 9);
    }

    #[test]
    fn test_close_demand_publishes_offer_at_their_price() {
        let (next, action) = react(&state(10), &demand(11), &NegotiationPolicy::default(), 2);
        assert_eq!(
            action,
            Action::PublishOffer {
                objective: ObjectiveRef::new("QmTask"),
                cost: 11
            }
        );
        assert_eq!(next.cost, 10);
    }

    #[test]
    fn test_equal_price_publishes() {
        let (_, action) = react(&state(7), &demand(7), &NegotiationPolicy::default(), 0);
        assert_eq!(action.publication().map(|(_, _, cost)| cost), Some(7));
    }

    #[test]
    fn test_gap_equal_to_threshold_publishes() {
        let (_, action) = react(&state(10), &demand(12), &NegotiationPolicy::default(), 2);
        assert!(matches!(action, Action::PublishOffer { cost: 12, .. }));
    }

    #[test]
    fn test_offers_ignored_by_default() {
        let (next, action) = react(&state(10), &offer(30), &NegotiationPolicy::default(), 2);
        assert_eq!(action, Action::None);
        assert_eq!(next.cost, 10);
    }

    #[test]
    fn test_offer_answered_with_demand_when_enabled() {
        let (_, action) = react(&state(10), &offer(9), &both_ways(), 2);
        assert_eq!(
            action,
            Action::PublishDemand {
                objective: ObjectiveRef::new("QmTask"),
                cost: 9
            }
        );
    }

    #[test]
    fn test_price_may_go_negative_internally() {
        let (next, action) = react(&state(0), &demand(-10), &NegotiationPolicy::default(), 2);
        assert_eq!(action, Action::AdjustPrice { delta: -1 });
        assert_eq!(next.cost, -1);
    }

    #[test]
    fn test_two_agents_converge() {
        let strategy = ConvergenceStrategy::new(both_ways(), 2);
        for (a0, b0) in [(0_i64, 50_i64), (100, 3), (-20, 20), (5, 6), (40, 40)] {
            let mut a = state(a0);
            let mut b = state(b0);
            let mut published = None;
            let bound = (a0 - b0).abs() + 2;

            for _ in 0..bound {
                // a sees b's demand, then b sees a's offer
                let (next_a, action_a) = strategy.react(&a, &demand(b.cost));
                a = next_a;
                if let Some((_, _, cost)) = action_a.publication() {
                    published = Some(cost);
                    break;
                }
                let (next_b, action_b) = strategy.react(&b, &offer(a.cost));
                b = next_b;
                if let Some((_, _, cost)) = action_b.publication() {
                    published = Some(cost);
                    break;
                }
            }

            let price = published.expect("negotiation did not converge");
            assert!((a.cost - b.cost).abs() <= 2, "a={} b={}", a.cost, b.cost);
            assert!(price == a.cost || price == b.cost);
        }
    }
}
