//! Inventory ledger: collected, not yet claimed amounts per item kind

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Serialize;

use super::item::ItemKind;

/// Read-only copy of the ledger
pub type LedgerSnapshot = BTreeMap<ItemKind, Decimal>;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct InventoryLedger {
    counts: BTreeMap<ItemKind, Decimal>,
}

impl InventoryLedger {
    /// Ledger with every kind at zero
    pub fn new() -> Self {
        Self {
            counts: ItemKind::ALL.into_iter().map(|kind| (kind, Decimal::ZERO)).collect(),
        }
    }

    /// Add the kind's increment, returning the new total
    pub fn credit(&mut self, kind: ItemKind) -> Decimal {
        let entry = self.counts.entry(kind).or_insert(Decimal::ZERO);
        *entry += kind.increment();
        *entry
    }

    #[cfg(test)]
    pub fn get(&self, kind: ItemKind) -> Decimal {
        self.counts.get(&kind).copied().unwrap_or(Decimal::ZERO)
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        self.counts.clone()
    }

    /// True when nothing is waiting to be claimed
    pub fn is_empty(&self) -> bool {
        self.counts.values().all(|count| count.is_zero())
    }

    pub fn reset_all(&mut self) {
        for count in self.counts.values_mut() {
            *count = Decimal::ZERO;
        }
    }

    /// Zero only the given kinds
    pub fn reset(&mut self, kinds: &[ItemKind]) {
        for kind in kinds {
            if let Some(count) = self.counts.get_mut(kind) {
                *count = Decimal::ZERO;
            }
        }
    }
}

impl Default for InventoryLedger {
    fn default() -> Self {
        Self::new()
    }
}
