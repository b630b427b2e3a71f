//! HTTP and WebSocket API.

pub mod health;
pub mod liability;
pub mod market;
pub mod ws;
