//! Per-address liability state table.

use std::collections::{HashMap, HashSet, VecDeque};

use robomarket_core::{Address, LiabilityRecord, LiabilityState};
use serde::Serialize;

/// Result of offering a liability-ready notification to the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadyOutcome {
    /// New address; the caller now owns its lifecycle.
    Accepted,
    /// Address is already in flight.
    Duplicate,
    /// Address already reached a terminal state in this process.
    AlreadyProcessed,
    /// Coordinator is shutting down.
    ShuttingDown,
    /// Notification failed validation.
    Rejected,
}

/// Active liabilities keyed by address, plus a bounded history of terminal ones.
///
/// An address enters once and never re-enters, so the ledger's start call is
/// made at most once per address for the life of the process.
#[derive(Debug)]
pub struct LiabilityTable {
    active: HashMap<Address, LiabilityRecord>,
    processed: HashSet<Address>,
    history: VecDeque<LiabilityRecord>,
    history_limit: usize,
}

impl LiabilityTable {
    pub fn new(history_limit: usize) -> Self {
        Self {
            active: HashMap::new(),
            processed: HashSet::new(),
            history: VecDeque::new(),
            history_limit,
        }
    }

    /// Claim `address` in the Pending state.
    pub fn try_insert(&mut self, address: &Address) -> ReadyOutcome {
        if self.active.contains_key(address) {
            return ReadyOutcome::Duplicate;
        }
        if self.processed.contains(address) {
            return ReadyOutcome::AlreadyProcessed;
        }
        self.active
            .insert(address.clone(), LiabilityRecord::pending(address.clone()));
        ReadyOutcome::Accepted
    }

    /// Move an active liability to a non-terminal state.
    pub fn transition(&mut self, address: &Address, state: LiabilityState) {
        if let Some(record) = self.active.get_mut(address) {
            record.transition(state);
        }
    }

    /// Release an active liability into the history with its terminal state.
    pub fn complete(
        &mut self,
        address: &Address,
        state: LiabilityState,
        error: Option<String>,
    ) -> Option<LiabilityRecord> {
        let mut record = self.active.remove(address)?;
        record.transition(state);
        record.error = error;
        self.processed.insert(address.clone());

        if self.history_limit > 0 {
            if self.history.len() >= self.history_limit {
                self.history.pop_front();
            }
            self.history.push_back(record.clone());
        }
        Some(record)
    }

    pub fn get(&self, address: &Address) -> Option<LiabilityRecord> {
        self.active
            .get(address)
            .cloned()
            .or_else(|| self.history.iter().rev().find(|r| &r.address == address).cloned())
    }

    pub fn active(&self) -> Vec<LiabilityRecord> {
        let mut records: Vec<_> = self.active.values().cloned().collect();
        records.sort_by(|a, b| a.accepted_at.cmp(&b.accepted_at));
        records
    }

    pub fn history(&self) -> Vec<LiabilityRecord> {
        self.history.iter().cloned().collect()
    }

    pub fn active_addresses(&self) -> Vec<Address> {
        self.active.keys().cloned().collect()
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_duplicate() {
        let mut table = LiabilityTable::new(8);
        let address = Address::new("0xA1");

        assert_eq!(table.try_insert(&address), ReadyOutcome::Accepted);
        assert_eq!(table.try_insert(&address), ReadyOutcome::Duplicate);
        assert_eq!(table.get(&address).unwrap().state, LiabilityState::Pending);
    }

    #[test]
    fn test_terminal_address_never_reenters() {
        let mut table = LiabilityTable::new(8);
        let address = Address::new("0xA1");

        table.try_insert(&address);
        table.transition(&address, LiabilityState::Started);
        let record = table.complete(&address, LiabilityState::Finished, None).unwrap();

        assert_eq!(record.state, LiabilityState::Finished);
        assert_eq!(table.active_count(), 0);
        assert_eq!(table.try_insert(&address), ReadyOutcome::AlreadyProcessed);
    }

    #[test]
    fn test_history_is_bounded() {
        let mut table = LiabilityTable::new(2);
        for n in 0..3 {
            let address = Address::new(format!("0x{}", n));
            table.try_insert(&address);
            table.complete(&address, LiabilityState::Failed, Some("x".into()));
        }

        let history = table.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].address.as_str(), "0x1");
        // evicted from history but still guarded
        assert_eq!(table.try_insert(&Address::new("0x0")), ReadyOutcome::AlreadyProcessed);
    }

    #[test]
    fn test_complete_unknown_is_none() {
        let mut table = LiabilityTable::new(2);
        assert!(table
            .complete(&Address::new("0xZZ"), LiabilityState::Finished, None)
            .is_none());
    }
}
