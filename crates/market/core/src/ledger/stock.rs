use std::collections::BTreeMap;

use dashmap::DashMap;

use crate::catalog::{Catalog, CatalogEntry, INFINITE_STOCK};

/// Remaining shared stock per catalog key.
///
/// Counts use the entry's initial-stock convention: `-1` never runs out and
/// finite counts floor at 0.
#[derive(Debug, Default)]
pub struct StockLedger {
    counts: DashMap<String, i64>,
}

impl StockLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored count for `key`, or 0 when the key is unknown.
    pub fn remaining(&self, key: &str) -> i64 {
        self.counts.get(key).map(|count| *count).unwrap_or(0)
    }

    /// Takes one unit. Returns false when nothing was taken (infinite stock,
    /// exhausted stock, or an unknown key).
    pub fn decrement(&self, key: &str) -> bool {
        match self.counts.get_mut(key) {
            Some(mut count) if *count > 0 => {
                *count -= 1;
                true
            }
            _ => false,
        }
    }

    /// Repopulates every count from the catalog's initial stock.
    pub fn reset_all(&self, catalog: &Catalog) {
        self.counts.clear();
        for entry in catalog.entries() {
            self.counts.insert(entry.key.clone(), entry.stock);
        }
    }

    /// Aligns the table with a reloaded catalog: new keys start at their
    /// initial stock and removed keys are dropped. Existing counts are kept,
    /// fitted to the entry's current stock.
    pub fn reconcile(&self, catalog: &Catalog) {
        self.counts.retain(|key, _| catalog.get(key).is_some());
        for entry in catalog.entries() {
            self.counts
                .entry(entry.key.clone())
                .and_modify(|count| *count = fit(entry, *count))
                .or_insert(entry.stock);
        }
    }

    pub fn snapshot(&self) -> BTreeMap<String, i64> {
        self.counts
            .iter()
            .map(|item| (item.key().clone(), *item.value()))
            .collect()
    }

    /// Replaces the table with persisted counts. Unknown keys are dropped
    /// and catalog keys missing from `counts` start at their initial stock.
    pub fn restore(&self, counts: BTreeMap<String, i64>, catalog: &Catalog) {
        self.counts.clear();
        for (key, count) in counts {
            if catalog.get(&key).is_none() {
                tracing::warn!(%key, "dropping persisted stock for unknown catalog key");
                continue;
            }
            self.counts.insert(key, count);
        }
        self.reconcile(catalog);
    }
}

/// Fits a kept count to the entry's initial stock.
///
/// Infinite entries always read `-1`. A count still carrying the infinite
/// sentinel for a now finite entry restarts at the initial stock; any other
/// count is clamped to `0..=stock`.
fn fit(entry: &CatalogEntry, count: i64) -> i64 {
    let fitted = if entry.has_infinite_stock() {
        INFINITE_STOCK
    } else if count == INFINITE_STOCK {
        entry.stock
    } else {
        count.clamp(0, entry.stock)
    };
    if fitted != count {
        tracing::warn!(key = %entry.key, count, fitted, "stock count does not fit its catalog entry");
    }
    fitted
}
