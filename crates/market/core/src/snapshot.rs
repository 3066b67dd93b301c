//! Persisted market schema.
//!
//! One [`MarketSnapshot`] captures everything needed to resume: the cycle,
//! the global table, every visitor record and the stock table. Visitor ids
//! are kept as strings so a single malformed id can be skipped on load
//! instead of failing the whole document.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::allocation::AllocationRecord;
use crate::config::StockMode;
use crate::cycle::{CycleState, Phase};
use crate::ledger::PurchaseRecord;
use crate::visitor::Slot;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub phase: Phase,
    pub seconds_remaining: u64,
    pub last_persisted_at: i64,
    pub stock_mode: StockMode,
    #[serde(default)]
    pub global_allocations: Vec<AllocationRecord>,
    #[serde(default)]
    pub visitors: Vec<VisitorSnapshot>,
    /// Absent in documents written before any stock table existed; the
    /// loader resets stock in that case.
    #[serde(default)]
    pub stock: Option<BTreeMap<String, i64>>,
}

impl MarketSnapshot {
    pub fn cycle(&self) -> CycleState {
        CycleState {
            phase: self.phase,
            seconds_remaining: self.seconds_remaining,
            last_persisted_at: self.last_persisted_at,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VisitorSnapshot {
    pub visitor: String,
    #[serde(default)]
    pub allocations: Vec<AllocationRecord>,
    #[serde(default)]
    pub revealed: BTreeSet<Slot>,
    pub purchases: PurchaseRecord,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_document_fills_optional_sections() {
        let json = r#"{
            "phase": "OPEN",
            "seconds_remaining": 120,
            "last_persisted_at": 1700000000,
            "stock_mode": "GLOBAL"
        }"#;
        let snapshot: MarketSnapshot = serde_json::from_str(json).unwrap();

        assert_eq!(snapshot.phase, Phase::Open);
        assert!(snapshot.global_allocations.is_empty());
        assert!(snapshot.visitors.is_empty());
        assert!(snapshot.stock.is_none());
        assert_eq!(snapshot.cycle().seconds_remaining, 120);
    }
}
