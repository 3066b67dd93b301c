//! Slot assignment: the shared global table and lazy personal picks.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use dashmap::DashMap;

use crate::allocation::{Allocation, AllocationRecord};
use crate::catalog::{Catalog, CatalogEntry};
use crate::rng::{RandomSource, shuffle};
use crate::visitor::{Slot, VisitorBook, VisitorId};

/// Upper bound on weighted draws when looking for a non-duplicate personal
/// entry.
pub const MAX_PERSONAL_ATTEMPTS: usize = 50;

/// Owns the global allocation table and resolves personal slots into a
/// [`VisitorBook`].
#[derive(Debug, Default)]
pub struct AssignmentEngine {
    globals: DashMap<Slot, Allocation>,
}

impl AssignmentEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Redraws the global table: up to `budget` distinct global entries,
    /// weighted and without replacement, each placed on a distinct slot from
    /// a shuffled copy of `slots`.
    pub fn refresh_globals(
        &self,
        catalog: &Catalog,
        slots: &[Slot],
        budget: usize,
        rng: &mut dyn RandomSource,
    ) {
        self.globals.clear();

        let mut candidates: Vec<Arc<CatalogEntry>> = catalog.global_entries().to_vec();
        let mut pool: Vec<Slot> = slots.to_vec();
        pool.sort_unstable();
        pool.dedup();
        shuffle(&mut pool, rng);

        let target = budget.min(candidates.len()).min(pool.len());
        for slot in pool.into_iter().take(target) {
            let Some(entry) = Catalog::sample_from(&candidates, rng) else {
                break;
            };
            candidates.retain(|candidate| candidate.key != entry.key);
            self.globals.insert(slot, Allocation::roll(entry, rng));
        }

        tracing::info!(
            selected = self.globals.len(),
            requested = budget,
            "global allocations refreshed"
        );
    }

    pub fn clear_globals(&self) {
        self.globals.clear();
    }

    pub fn global(&self, slot: Slot) -> Option<Allocation> {
        self.globals.get(&slot).map(|allocation| allocation.clone())
    }

    pub fn global_len(&self) -> usize {
        self.globals.len()
    }

    pub fn global_keys(&self) -> HashSet<String> {
        self.globals
            .iter()
            .map(|item| item.value().key().to_string())
            .collect()
    }

    pub fn snapshot(&self) -> Vec<AllocationRecord> {
        let ordered: BTreeMap<Slot, AllocationRecord> = self
            .globals
            .iter()
            .map(|item| (*item.key(), item.value().to_record(*item.key())))
            .collect();
        ordered.into_values().collect()
    }

    /// Replaces the global table with persisted records, dropping keys the
    /// catalog no longer knows.
    pub fn restore(&self, records: &[AllocationRecord], catalog: &Catalog) {
        self.globals.clear();
        for (slot, allocation) in records.iter().filter_map(|record| record.resolve(catalog)) {
            self.globals.insert(slot, allocation);
        }
    }

    /// Existing allocation for the slot, global first. Never samples.
    pub fn peek(&self, visitors: &VisitorBook, visitor: VisitorId, slot: Slot) -> Option<Allocation> {
        self.global(slot)
            .or_else(|| visitors.personal(visitor, slot))
    }

    /// Allocation for the slot, sampling a personal entry on first access.
    ///
    /// Personal picks exclude keys already held by the visitor and keys on
    /// the global table. After [`MAX_PERSONAL_ATTEMPTS`] duplicate draws the
    /// slot is left unassigned.
    pub fn resolve(
        &self,
        catalog: &Catalog,
        visitors: &VisitorBook,
        visitor: VisitorId,
        slot: Slot,
        rng: &mut dyn RandomSource,
    ) -> Option<Allocation> {
        if let Some(global) = self.global(slot) {
            return Some(global);
        }

        visitors.with_record(visitor, |record| {
            if let Some(cached) = record.personal.get(&slot) {
                return Some(cached.clone());
            }

            let candidates = catalog.personal_entries();
            if candidates.is_empty() {
                return None;
            }

            let mut taken = self.global_keys();
            taken.extend(record.personal.values().map(|allocation| allocation.key().to_string()));

            for _ in 0..MAX_PERSONAL_ATTEMPTS {
                let entry = Catalog::sample_from(candidates, rng)?;
                if taken.contains(&entry.key) {
                    continue;
                }
                let allocation = Allocation::roll(entry, rng);
                record.personal.insert(slot, allocation.clone());
                return Some(allocation);
            }

            tracing::warn!(
                %visitor,
                slot,
                attempts = MAX_PERSONAL_ATTEMPTS,
                "no unique personal entry found; leaving slot unassigned"
            );
            None
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StockMode;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn catalog(globals: usize, personals: usize) -> Catalog {
        let global = (0..globals).map(|i| CatalogEntry {
            global: true,
            ..CatalogEntry::new(format!("global_{i}"), 1.0 + i as f64)
        });
        let personal =
            (0..personals).map(|i| CatalogEntry::new(format!("personal_{i}"), 1.0 + i as f64));
        Catalog::new(global.chain(personal))
    }

    #[test]
    fn global_table_respects_budget_and_distinctness() {
        let catalog = catalog(5, 0);
        let slots: Vec<Slot> = vec![10, 11, 12, 13, 14, 15];
        let engine = AssignmentEngine::new();

        for seed in 0..50 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            engine.refresh_globals(&catalog, &slots, 3, &mut rng);

            let records = engine.snapshot();
            assert_eq!(records.len(), 3);
            let keys: HashSet<_> = records.iter().map(|r| r.key.clone()).collect();
            let used: HashSet<_> = records.iter().map(|r| r.slot).collect();
            assert_eq!(keys.len(), 3);
            assert_eq!(used.len(), 3);
            assert!(used.iter().all(|slot| slots.contains(slot)));
        }
    }

    #[test]
    fn global_table_is_capped_by_entries_and_slots() {
        let engine = AssignmentEngine::new();
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        engine.refresh_globals(&catalog(2, 0), &[1, 2, 3, 4], 10, &mut rng);
        assert_eq!(engine.global_len(), 2);

        engine.refresh_globals(&catalog(6, 0), &[1, 2], 10, &mut rng);
        assert_eq!(engine.global_len(), 2);

        engine.refresh_globals(&catalog(6, 0), &[1, 2], 0, &mut rng);
        assert_eq!(engine.global_len(), 0);
    }

    #[test]
    fn global_slot_takes_precedence_over_personal() {
        let catalog = catalog(1, 3);
        let engine = AssignmentEngine::new();
        let book = VisitorBook::new(StockMode::Global);
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        engine.refresh_globals(&catalog, &[7], 1, &mut rng);

        let visitor = VisitorId::random();
        let allocation = engine
            .resolve(&catalog, &book, visitor, 7, &mut rng)
            .unwrap();
        assert_eq!(allocation.key(), "global_0");
        assert!(book.personal(visitor, 7).is_none());
    }

    #[test]
    fn personal_allocation_is_cached_per_slot() {
        let catalog = catalog(0, 4);
        let engine = AssignmentEngine::new();
        let book = VisitorBook::new(StockMode::Global);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let visitor = VisitorId::random();

        let first = engine.resolve(&catalog, &book, visitor, 1, &mut rng).unwrap();
        for _ in 0..20 {
            let again = engine.resolve(&catalog, &book, visitor, 1, &mut rng).unwrap();
            assert_eq!(again, first);
        }
    }

    #[test]
    fn personal_allocations_never_repeat_visible_keys() {
        let catalog = catalog(2, 6);
        let engine = AssignmentEngine::new();
        let book = VisitorBook::new(StockMode::Global);

        for seed in 0..30 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            book.clear();
            engine.refresh_globals(&catalog, &[0, 1], 2, &mut rng);
            let visitor = VisitorId::random();

            let mut seen = engine.global_keys();
            for slot in 2..6 {
                let allocation = engine
                    .resolve(&catalog, &book, visitor, slot, &mut rng)
                    .unwrap();
                assert!(seen.insert(allocation.key().to_string()));
            }
        }
    }

    #[test]
    fn exhausted_catalog_leaves_slot_unassigned() {
        let catalog = catalog(0, 1);
        let engine = AssignmentEngine::new();
        let book = VisitorBook::new(StockMode::Global);
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let visitor = VisitorId::random();

        assert!(engine.resolve(&catalog, &book, visitor, 1, &mut rng).is_some());
        assert!(engine.resolve(&catalog, &book, visitor, 2, &mut rng).is_none());
        assert!(book.personal(visitor, 2).is_none());
    }

    #[test]
    fn peek_never_samples() {
        let catalog = catalog(0, 3);
        let engine = AssignmentEngine::new();
        let book = VisitorBook::new(StockMode::Global);
        let visitor = VisitorId::random();

        assert!(engine.peek(&book, visitor, 1).is_none());
        assert!(book.is_empty());

        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let resolved = engine.resolve(&catalog, &book, visitor, 1, &mut rng);
        assert_eq!(engine.peek(&book, visitor, 1), resolved);
    }
}
