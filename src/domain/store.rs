//! Canonical one-record-per-id trade store.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use super::trade::{Action, Trade};

/// Current state of every trade id seen so far.
///
/// Entries are only ever inserted or overwritten; a cancelled trade stays in
/// the store with its Cancel record. Iteration is in trade-id order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CanonicalStore {
    trades: BTreeMap<String, Trade>,
}

/// Counts of stored trades by lifecycle action.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActionCounts {
    pub new: usize,
    pub amend: usize,
    pub cancel: usize,
}

impl CanonicalStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, trade_id: &str) -> Option<&Trade> {
        self.trades.get(trade_id)
    }

    pub fn contains(&self, trade_id: &str) -> bool {
        self.trades.contains_key(trade_id)
    }

    pub fn len(&self) -> usize {
        self.trades.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trades.is_empty()
    }

    pub fn trades(&self) -> impl Iterator<Item = &Trade> {
        self.trades.values()
    }

    pub fn action_counts(&self) -> ActionCounts {
        let mut counts = ActionCounts::default();
        for trade in self.trades.values() {
            match trade.action {
                Action::New => counts.new += 1,
                Action::Amend => counts.amend += 1,
                Action::Cancel => counts.cancel += 1,
            }
        }
        counts
    }

    pub(crate) fn entry(&mut self, trade_id: String) -> Entry<'_, String, Trade> {
        self.trades.entry(trade_id)
    }
}
