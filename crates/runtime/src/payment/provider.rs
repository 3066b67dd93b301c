//! Payment back-end contracts implemented by hosts.

use market_core::{RequiredItem, VisitorId};

/// A currency balance that can be checked and debited.
pub trait CurrencyProvider: Send + Sync {
    /// Display name of the currency back-end.
    fn name(&self) -> &str;

    fn balance(&self, visitor: VisitorId) -> f64;

    fn has(&self, visitor: VisitorId, amount: f64) -> bool {
        self.balance(visitor) >= amount
    }

    /// Debits `amount`. Returns false when nothing was taken.
    fn withdraw(&self, visitor: VisitorId, amount: f64) -> bool;

    fn format(&self, amount: f64) -> String;
}

/// Inventory that can pay with items instead of currency.
pub trait ItemCostProvider: Send + Sync {
    fn has(&self, visitor: VisitorId, items: &[RequiredItem]) -> bool;

    /// Removes every listed item. Returns false when nothing was taken.
    fn withdraw(&self, visitor: VisitorId, items: &[RequiredItem]) -> bool;

    /// Human-readable cost, e.g. `8x GOLD_INGOT, 1x MAP`.
    fn describe(&self, items: &[RequiredItem]) -> String {
        items
            .iter()
            .map(|item| {
                let label = item.name.as_deref().unwrap_or(&item.material);
                format!("{}x {}", item.amount, label)
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}
