use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::catalog::CatalogEntry;
use crate::config::StockMode;

/// What one visitor bought this cycle.
///
/// The variant is fixed by the market's [`StockMode`]; the two shapes are
/// never mixed within one market.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum PurchaseRecord {
    /// Global-stock mode: each distinct key at most once.
    Keys { keys: BTreeSet<String> },
    /// Per-visitor mode: a counter per key, capped by initial stock.
    Counts { counts: BTreeMap<String, u32> },
}

impl PurchaseRecord {
    pub fn new(mode: StockMode) -> Self {
        match mode {
            StockMode::Global => Self::Keys {
                keys: BTreeSet::new(),
            },
            StockMode::PerVisitor => Self::Counts {
                counts: BTreeMap::new(),
            },
        }
    }

    pub fn mode(&self) -> StockMode {
        match self {
            Self::Keys { .. } => StockMode::Global,
            Self::Counts { .. } => StockMode::PerVisitor,
        }
    }

    /// Records one purchase of `key`.
    pub fn record(&mut self, key: &str) {
        match self {
            Self::Keys { keys } => {
                keys.insert(key.to_string());
            }
            Self::Counts { counts } => {
                *counts.entry(key.to_string()).or_insert(0) += 1;
            }
        }
    }

    pub fn met_limit(&self, entry: &CatalogEntry) -> bool {
        match self {
            Self::Keys { keys } => keys.contains(&entry.key),
            Self::Counts { counts } => {
                if entry.has_infinite_stock() {
                    return false;
                }
                let bought = i64::from(counts.get(&entry.key).copied().unwrap_or(0));
                bought >= entry.stock
            }
        }
    }

    /// Per-key counter; always 0 in global-stock mode.
    pub fn count(&self, key: &str) -> u32 {
        match self {
            Self::Keys { .. } => 0,
            Self::Counts { counts } => counts.get(key).copied().unwrap_or(0),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Keys { keys } => keys.is_empty(),
            Self::Counts { counts } => counts.is_empty(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(stock: i64) -> CatalogEntry {
        CatalogEntry {
            stock,
            ..CatalogEntry::new("relic", 1.0)
        }
    }

    #[test]
    fn global_mode_limits_after_one_purchase() {
        let mut record = PurchaseRecord::new(StockMode::Global);
        let relic = entry(10);
        assert!(!record.met_limit(&relic));

        record.record("relic");
        assert!(record.met_limit(&relic));
        assert_eq!(record.count("relic"), 0);
    }

    #[test]
    fn per_visitor_mode_limits_at_initial_stock() {
        let mut record = PurchaseRecord::new(StockMode::PerVisitor);
        let relic = entry(3);

        for _ in 0..2 {
            record.record("relic");
            assert!(!record.met_limit(&relic));
        }
        record.record("relic");
        assert!(record.met_limit(&relic));
        assert_eq!(record.count("relic"), 3);
    }

    #[test]
    fn per_visitor_mode_never_limits_infinite_stock() {
        let mut record = PurchaseRecord::new(StockMode::PerVisitor);
        let relic = entry(-1);
        for _ in 0..50 {
            record.record("relic");
        }
        assert!(!record.met_limit(&relic));
    }

    #[test]
    fn zero_stock_is_limited_before_any_purchase() {
        let record = PurchaseRecord::new(StockMode::PerVisitor);
        assert!(record.met_limit(&entry(0)));
    }

    #[test]
    fn serialized_shape_names_the_mode() {
        let mut record = PurchaseRecord::new(StockMode::PerVisitor);
        record.record("relic");
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "mode": "counts", "counts": { "relic": 1 } })
        );
    }
}
