//! Common types used across Robomarket.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque result payload produced by a worker strategy.
pub type WorkResult = serde_json::Value;

/// Transport topic names.
pub mod topics {
    /// Inbound and outbound demands.
    pub const DEMAND: &str = "demand";
    /// Inbound and outbound offers.
    pub const OFFER: &str = "offer";
    /// Liability-ready notifications from the matching layer.
    pub const LIABILITY_READY: &str = "liability_ready";
    /// Worker result payloads.
    pub const RESULT: &str = "result";
}

/// Address of an agent or a liability on the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Address {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Content identifier of a task objective held by the objective store.
///
/// Immutable once created; the store owns the bytes it names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectiveRef(String);

impl ObjectiveRef {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for ObjectiveRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ObjectiveRef {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_newtypes_serialize_transparently() {
        let address = Address::new("0xA1");
        assert_eq!(serde_json::to_string(&address).unwrap(), "\"0xA1\"");

        let objective: ObjectiveRef = serde_json::from_str("\"QmTask\"").unwrap();
        assert_eq!(objective.as_str(), "QmTask");
    }

    #[test]
    fn test_blank_is_empty() {
        assert!(Address::new("  ").is_empty());
        assert!(!ObjectiveRef::new("Qm").is_empty());
    }
}
