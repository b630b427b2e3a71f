//! # Robomarket Liability
//!
//! Drives matched liabilities through start, execution and finish.

pub mod coordinator;
pub mod table;
pub mod worker;

pub use coordinator::LiabilityCoordinator;
pub use table::{LiabilityTable, ReadyOutcome};
pub use worker::{worker_from_config, CommandWorker, EchoWorker, WorkContext, WorkerStrategy};
