use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::catalog::{Catalog, CatalogEntry};
use crate::rng::RandomSource;
use crate::visitor::Slot;

/// An entry bound to a slot, with its discount rolled exactly once.
#[derive(Clone, Debug, PartialEq)]
pub struct Allocation {
    entry: Arc<CatalogEntry>,
    discounted: bool,
    final_price: f64,
}

impl Allocation {
    /// Rolls the entry's discount and fixes the price for this allocation.
    pub fn roll(entry: Arc<CatalogEntry>, rng: &mut dyn RandomSource) -> Self {
        let discounted = entry.discount.rolls(rng.unit());
        let final_price = if discounted {
            entry.discount.apply(entry.price)
        } else {
            entry.price
        };
        Self {
            entry,
            discounted,
            final_price,
        }
    }

    /// Rebuilds a persisted allocation without re-rolling.
    pub fn restore(entry: Arc<CatalogEntry>, discounted: bool, final_price: f64) -> Self {
        Self {
            entry,
            discounted,
            final_price,
        }
    }

    pub fn entry(&self) -> &Arc<CatalogEntry> {
        &self.entry
    }

    pub fn key(&self) -> &str {
        &self.entry.key
    }

    pub fn is_discounted(&self) -> bool {
        self.discounted
    }

    pub fn final_price(&self) -> f64 {
        self.final_price
    }

    pub fn to_record(&self, slot: Slot) -> AllocationRecord {
        AllocationRecord {
            slot,
            key: self.entry.key.clone(),
            discounted: self.discounted,
            price: self.final_price,
        }
    }
}

/// Persisted form of an [`Allocation`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AllocationRecord {
    pub slot: Slot,
    pub key: String,
    pub discounted: bool,
    pub price: f64,
}

impl AllocationRecord {
    /// Resolves the record against `catalog`. Unknown keys are dropped with
    /// a warning.
    pub fn resolve(&self, catalog: &Catalog) -> Option<(Slot, Allocation)> {
        match catalog.get(&self.key) {
            Some(entry) => Some((
                self.slot,
                Allocation::restore(Arc::clone(entry), self.discounted, self.price),
            )),
            None => {
                tracing::warn!(
                    key = %self.key,
                    slot = self.slot,
                    "dropping persisted allocation for unknown catalog key"
                );
                None
            }
        }
    }
}
