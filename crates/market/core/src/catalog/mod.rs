//! Configured entries and weighted sampling.
//!
//! A [`Catalog`] is built once from loaded entries and swapped wholesale on
//! reload. Construction drops invalid entries (logging each) so sampling
//! never sees a non-positive weight.

mod entry;
mod index;

use std::collections::HashMap;
use std::sync::Arc;

pub use entry::{CatalogEntry, Discount, INFINITE_STOCK, PermissionRequirement, RequiredItem};
pub use index::WeightedIndex;

use crate::rng::RandomSource;

#[derive(Clone, Debug, Default)]
pub struct Catalog {
    entries: Vec<Arc<CatalogEntry>>,
    by_key: HashMap<String, usize>,
    index: WeightedIndex,
    global: Vec<Arc<CatalogEntry>>,
    personal: Vec<Arc<CatalogEntry>>,
}

impl Catalog {
    pub fn new<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = CatalogEntry>,
    {
        let mut kept: Vec<Arc<CatalogEntry>> = Vec::new();
        let mut by_key = HashMap::new();

        for entry in entries {
            if let Err(error) = entry.validate() {
                tracing::warn!(key = %entry.key, %error, "skipping catalog entry");
                continue;
            }
            if by_key.contains_key(&entry.key) {
                tracing::warn!(key = %entry.key, "skipping duplicate catalog key");
                continue;
            }
            by_key.insert(entry.key.clone(), kept.len());
            kept.push(Arc::new(entry));
        }

        let index = WeightedIndex::new(kept.iter().map(|entry| entry.weight));
        let (global, personal): (Vec<_>, Vec<_>) =
            kept.iter().cloned().partition(|entry| entry.global);

        if kept.is_empty() {
            tracing::warn!("catalog is empty; the market will have nothing to allocate");
        } else {
            tracing::info!(entries = kept.len(), "catalog built");
        }

        Self {
            entries: kept,
            by_key,
            index,
            global,
            personal,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Arc<CatalogEntry>> {
        self.by_key.get(key).map(|&position| &self.entries[position])
    }

    pub fn entries(&self) -> &[Arc<CatalogEntry>] {
        &self.entries
    }

    /// Entries flagged for the shared global slots.
    pub fn global_entries(&self) -> &[Arc<CatalogEntry>] {
        &self.global
    }

    /// Entries eligible for per-visitor slots.
    pub fn personal_entries(&self) -> &[Arc<CatalogEntry>] {
        &self.personal
    }

    /// Weighted draw over the whole catalog.
    pub fn sample(&self, rng: &mut dyn RandomSource) -> Option<Arc<CatalogEntry>> {
        self.index
            .sample(rng)
            .map(|position| Arc::clone(&self.entries[position]))
    }

    /// Weighted draw over an arbitrary subset.
    ///
    /// Builds a throwaway index, so callers that sample repeatedly from the
    /// same subset should keep the subset small.
    pub fn sample_from(
        candidates: &[Arc<CatalogEntry>],
        rng: &mut dyn RandomSource,
    ) -> Option<Arc<CatalogEntry>> {
        let index = WeightedIndex::new(candidates.iter().map(|entry| entry.weight));
        index
            .sample(rng)
            .map(|position| Arc::clone(&candidates[position]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn entry(key: &str, weight: f64, global: bool) -> CatalogEntry {
        CatalogEntry {
            global,
            ..CatalogEntry::new(key, weight)
        }
    }

    #[test]
    fn non_positive_weights_are_dropped_at_build_time() {
        let catalog = Catalog::new([
            entry("a", 1.0, false),
            entry("b", 0.0, false),
            entry("c", -2.0, false),
        ]);
        assert_eq!(catalog.len(), 1);
        assert!(catalog.get("b").is_none());
        assert!(catalog.get("a").is_some());
    }

    #[test]
    fn duplicate_keys_keep_first_definition() {
        let catalog = Catalog::new([entry("a", 1.0, false), entry("a", 5.0, true)]);
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.get("a").unwrap().weight, 1.0);
    }

    #[test]
    fn partitions_global_and_personal_entries() {
        let catalog = Catalog::new([
            entry("a", 1.0, true),
            entry("b", 1.0, false),
            entry("c", 1.0, true),
        ]);
        let globals: Vec<_> = catalog.global_entries().iter().map(|e| e.key.as_str()).collect();
        assert_eq!(globals, ["a", "c"]);
        assert_eq!(catalog.personal_entries().len(), 1);
    }

    #[test]
    fn sampling_empty_subset_returns_none() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        assert!(Catalog::sample_from(&[], &mut rng).is_none());
        assert!(Catalog::default().sample(&mut rng).is_none());
    }

    #[test]
    fn subset_sampling_never_leaves_the_subset() {
        let catalog = Catalog::new([
            entry("a", 1.0, false),
            entry("b", 100.0, false),
            entry("c", 1.0, false),
        ]);
        let subset = vec![
            Arc::clone(catalog.get("a").unwrap()),
            Arc::clone(catalog.get("c").unwrap()),
        ];
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        for _ in 0..1_000 {
            let picked = Catalog::sample_from(&subset, &mut rng).unwrap();
            assert_ne!(picked.key, "b");
        }
    }
}
