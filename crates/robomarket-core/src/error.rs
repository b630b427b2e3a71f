//! Error types for Robomarket.

use thiserror::Error;

use crate::types::Address;

/// Main error type for Robomarket operations.
#[derive(Error, Debug, Clone)]
pub enum MarketError {
    /// Bid does not match the local model/token (or is our own echo).
    #[error("Bid filtered: {reason}")]
    Filtered { reason: String },

    /// Bid or notification is missing required fields.
    #[error("Malformed message: {0}")]
    Malformed(String),

    /// External collaborator failed in a way worth retrying.
    #[error("Transient failure in {operation}: {message}")]
    Transient { operation: String, message: String },

    /// Connection to an external collaborator failed.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Operation timed out.
    #[error("Operation timed out after {duration_ms}ms: {operation}")]
    Timeout { duration_ms: u64, operation: String },

    /// Ledger refused or failed to start a liability.
    #[error("Start failed for liability {address}: {message}")]
    StartFailed { address: Address, message: String },

    /// Ledger refused or failed to finish a liability.
    #[error("Finish failed for liability {address}: {message}")]
    FinishFailed { address: Address, message: String },

    /// Worker strategy reported failure.
    #[error("Worker failed for liability {address}: {message}")]
    WorkerFailed { address: Address, message: String },

    /// Objective store error.
    #[error("Objective store error: {message}")]
    StorageError { message: String },

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Resource not found.
    #[error("Resource not found: {resource_type} with id {id}")]
    NotFound { resource_type: String, id: String },

    /// Internal error (should not happen).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl MarketError {
    /// Returns true if the operation that produced this error may be retried.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            MarketError::Transient { .. }
                | MarketError::ConnectionError(_)
                | MarketError::Timeout { .. }
        )
    }

    /// Returns the liability address if available.
    pub fn address(&self) -> Option<&Address> {
        match self {
            MarketError::StartFailed { address, .. } => Some(address),
            MarketError::FinishFailed { address, .. } => Some(address),
            MarketError::WorkerFailed { address, .. } => Some(address),
            _ => None,
        }
    }

    pub fn transient(operation: impl Into<String>, message: impl Into<String>) -> Self {
        MarketError::Transient {
            operation: operation.into(),
            message: message.into(),
        }
    }
}

/// Convenience Result type for Robomarket operations.
pub type Result<T> = std::result::Result<T, MarketError>;

impl From<serde_json::Error> for MarketError {
    fn from(err: serde_json::Error) -> Self {
        MarketError::SerializationError(err.to_string())
    }
}
