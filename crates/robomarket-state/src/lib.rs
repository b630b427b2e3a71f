//! # Robomarket State
//!
//! In-process implementations of the agent's external collaborators.
//! A node without a remote gateway runs on these; every test suite uses them
//! as fakes.

pub mod bus;
pub mod chain;
pub mod ledger;
pub mod objective;
pub mod signer;

pub use bus::InMemoryBus;
pub use chain::{ClockBlockSource, ManualBlockSource};
pub use ledger::{LedgerCall, RecordingLedger};
pub use objective::InMemoryObjectiveStore;
pub use signer::LoopbackGateway;
