//! # Robomarket Gateway
//!
//! HTTP client for a remote gateway that signs and publishes bids and fronts
//! the liability ledger.

pub mod client;

pub use client::HttpGateway;
