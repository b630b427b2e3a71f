//! # Robomarket Negotiate
//!
//! Market listener and the reactive price-convergence negotiation.

pub mod listener;
pub mod negotiator;
pub mod protocol;
pub mod strategy;

pub use listener::{ListenOutcome, MarketListener};
pub use negotiator::{Negotiator, NegotiatorHandle, Publisher};
pub use protocol::{decode_bid, decode_liability, NegotiationEvent};
pub use strategy::{react, Action, ConvergenceStrategy};
