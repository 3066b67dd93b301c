//! Per-visitor state for the current cycle.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::allocation::Allocation;
use crate::catalog::{Catalog, CatalogEntry};
use crate::config::StockMode;
use crate::ledger::PurchaseRecord;
use crate::snapshot::VisitorSnapshot;

/// Display slot index.
pub type Slot = u32;

/// Stable visitor identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VisitorId(pub Uuid);

impl VisitorId {
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for VisitorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for VisitorId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

impl From<Uuid> for VisitorId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

/// Transient interaction state. Never persisted.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VisitorSession {
    /// Slot awaiting a purchase confirmation.
    pub pending_confirmation: Option<Slot>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct VisitorRecord {
    pub personal: BTreeMap<Slot, Allocation>,
    pub revealed: BTreeSet<Slot>,
    pub purchases: PurchaseRecord,
    pub session: VisitorSession,
}

impl VisitorRecord {
    pub fn new(mode: StockMode) -> Self {
        Self {
            personal: BTreeMap::new(),
            revealed: BTreeSet::new(),
            purchases: PurchaseRecord::new(mode),
            session: VisitorSession::default(),
        }
    }

    fn to_snapshot(&self, visitor: VisitorId) -> VisitorSnapshot {
        VisitorSnapshot {
            visitor: visitor.to_string(),
            allocations: self
                .personal
                .iter()
                .map(|(&slot, allocation)| allocation.to_record(slot))
                .collect(),
            revealed: self.revealed.clone(),
            purchases: self.purchases.clone(),
        }
    }
}

/// Concurrent table of visitor records.
///
/// Records are created lazily on first write and share the book's
/// [`StockMode`]. Reads of absent visitors answer as if the record were
/// empty.
#[derive(Debug)]
pub struct VisitorBook {
    mode: StockMode,
    records: DashMap<VisitorId, VisitorRecord>,
}

impl VisitorBook {
    pub fn new(mode: StockMode) -> Self {
        Self {
            mode,
            records: DashMap::new(),
        }
    }

    pub fn mode(&self) -> StockMode {
        self.mode
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, visitor: VisitorId) -> bool {
        self.records.contains_key(&visitor)
    }

    /// Runs `f` against the visitor's record, creating it first if needed.
    /// The record stays locked for the duration of `f`.
    pub fn with_record<R>(&self, visitor: VisitorId, f: impl FnOnce(&mut VisitorRecord) -> R) -> R {
        let mut record = self
            .records
            .entry(visitor)
            .or_insert_with(|| VisitorRecord::new(self.mode));
        f(record.value_mut())
    }

    /// Runs `f` against an existing record without creating one.
    pub fn read<R>(&self, visitor: VisitorId, f: impl FnOnce(&VisitorRecord) -> R) -> Option<R> {
        self.records.get(&visitor).map(|record| f(record.value()))
    }

    pub fn personal(&self, visitor: VisitorId, slot: Slot) -> Option<Allocation> {
        self.read(visitor, |record| record.personal.get(&slot).cloned())
            .flatten()
    }

    pub fn record_purchase(&self, visitor: VisitorId, key: &str) {
        self.with_record(visitor, |record| record.purchases.record(key));
    }

    pub fn met_limit(&self, visitor: VisitorId, entry: &CatalogEntry) -> bool {
        self.read(visitor, |record| record.purchases.met_limit(entry))
            .unwrap_or_else(|| PurchaseRecord::new(self.mode).met_limit(entry))
    }

    pub fn purchase_count(&self, visitor: VisitorId, key: &str) -> u32 {
        self.read(visitor, |record| record.purchases.count(key))
            .unwrap_or(0)
    }

    /// Returns true when the slot was not revealed before.
    pub fn mark_revealed(&self, visitor: VisitorId, slot: Slot) -> bool {
        self.with_record(visitor, |record| record.revealed.insert(slot))
    }

    pub fn is_revealed(&self, visitor: VisitorId, slot: Slot) -> bool {
        self.read(visitor, |record| record.revealed.contains(&slot))
            .unwrap_or(false)
    }

    pub fn set_pending(&self, visitor: VisitorId, slot: Slot) {
        self.with_record(visitor, |record| {
            record.session.pending_confirmation = Some(slot);
        });
    }

    pub fn pending(&self, visitor: VisitorId) -> Option<Slot> {
        self.read(visitor, |record| record.session.pending_confirmation)
            .flatten()
    }

    pub fn take_pending(&self, visitor: VisitorId) -> Option<Slot> {
        self.records
            .get_mut(&visitor)
            .and_then(|mut record| record.session.pending_confirmation.take())
    }

    /// Drops the visitor's record. Returns true when one existed.
    pub fn remove(&self, visitor: VisitorId) -> bool {
        self.records.remove(&visitor).is_some()
    }

    pub fn clear(&self) {
        self.records.clear();
    }

    pub fn snapshot(&self) -> Vec<VisitorSnapshot> {
        let mut visitors: Vec<_> = self
            .records
            .iter()
            .map(|item| item.value().to_snapshot(*item.key()))
            .collect();
        visitors.sort_by(|a, b| a.visitor.cmp(&b.visitor));
        visitors
    }

    /// Replaces all records with persisted ones.
    ///
    /// Unparseable ids are skipped with a warning, purchases recorded under
    /// the other stock mode are discarded, and allocations whose key left the
    /// catalog are dropped.
    pub fn restore(&self, visitors: Vec<VisitorSnapshot>, catalog: &Catalog) {
        self.records.clear();

        for snapshot in visitors {
            let visitor = match snapshot.visitor.parse::<VisitorId>() {
                Ok(visitor) => visitor,
                Err(error) => {
                    tracing::warn!(id = %snapshot.visitor, %error, "skipping visitor with invalid id");
                    continue;
                }
            };
            let purchases = if snapshot.purchases.mode() == self.mode {
                snapshot.purchases
            } else {
                tracing::warn!(
                    %visitor,
                    saved = %snapshot.purchases.mode(),
                    active = %self.mode,
                    "discarding purchases recorded under another stock mode"
                );
                PurchaseRecord::new(self.mode)
            };

            let personal = snapshot
                .allocations
                .iter()
                .filter_map(|record| record.resolve(catalog))
                .collect();

            self.records.insert(
                visitor,
                VisitorRecord {
                    personal,
                    revealed: snapshot.revealed,
                    purchases,
                    session: VisitorSession::default(),
                },
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocation::AllocationRecord;

    fn visitor() -> VisitorId {
        VisitorId::random()
    }

    #[test]
    fn reads_do_not_create_records() {
        let book = VisitorBook::new(StockMode::Global);
        let id = visitor();

        assert!(!book.is_revealed(id, 3));
        assert_eq!(book.purchase_count(id, "lamp"), 0);
        assert!(book.pending(id).is_none());
        assert!(book.is_empty());
    }

    #[test]
    fn reveal_is_reported_once() {
        let book = VisitorBook::new(StockMode::Global);
        let id = visitor();

        assert!(book.mark_revealed(id, 3));
        assert!(!book.mark_revealed(id, 3));
        assert!(book.is_revealed(id, 3));
        assert!(!book.is_revealed(id, 4));
    }

    #[test]
    fn pending_confirmation_is_taken_once() {
        let book = VisitorBook::new(StockMode::Global);
        let id = visitor();

        book.set_pending(id, 12);
        assert_eq!(book.pending(id), Some(12));
        assert_eq!(book.take_pending(id), Some(12));
        assert_eq!(book.take_pending(id), None);
    }

    #[test]
    fn remove_clears_session_with_the_record() {
        let book = VisitorBook::new(StockMode::PerVisitor);
        let id = visitor();

        book.set_pending(id, 1);
        book.record_purchase(id, "lamp");
        assert!(book.remove(id));
        assert!(book.pending(id).is_none());
        assert_eq!(book.purchase_count(id, "lamp"), 0);
        assert!(!book.remove(id));
    }

    #[test]
    fn restore_skips_bad_ids_and_discards_foreign_purchases() {
        let catalog = Catalog::new([CatalogEntry::new("lamp", 1.0)]);
        let good = visitor();
        let mut purchases = PurchaseRecord::new(StockMode::Global);
        purchases.record("lamp");

        let snapshots = vec![
            VisitorSnapshot {
                visitor: good.to_string(),
                allocations: vec![
                    AllocationRecord {
                        slot: 1,
                        key: "lamp".into(),
                        discounted: false,
                        price: 0.0,
                    },
                    AllocationRecord {
                        slot: 2,
                        key: "retired".into(),
                        discounted: false,
                        price: 0.0,
                    },
                ],
                revealed: BTreeSet::from([1]),
                purchases: purchases.clone(),
            },
            VisitorSnapshot {
                visitor: "not-a-uuid".into(),
                allocations: Vec::new(),
                revealed: BTreeSet::new(),
                purchases: purchases.clone(),
            },
            VisitorSnapshot {
                visitor: visitor().to_string(),
                allocations: Vec::new(),
                revealed: BTreeSet::new(),
                purchases: PurchaseRecord::new(StockMode::PerVisitor),
            },
        ];

        let foreign = snapshots[2].visitor.parse::<VisitorId>().unwrap();
        let book = VisitorBook::new(StockMode::Global);
        book.restore(snapshots, &catalog);

        assert_eq!(book.len(), 2);
        assert!(book.contains(foreign));
        assert!(!book.met_limit(foreign, catalog.get("lamp").unwrap()));
        assert!(book.personal(good, 1).is_some());
        assert!(book.personal(good, 2).is_none());
        assert!(book.is_revealed(good, 1));
        assert!(book.met_limit(good, catalog.get("lamp").unwrap()));
    }
}
