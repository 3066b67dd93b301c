//! In-memory payment back-ends for tests and local runs.

use dashmap::DashMap;
use market_core::{RequiredItem, VisitorId};

use super::provider::{CurrencyProvider, ItemCostProvider};

/// Currency balances held in memory.
#[derive(Debug)]
pub struct InMemoryWallet {
    name: String,
    balances: DashMap<VisitorId, f64>,
}

impl InMemoryWallet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            balances: DashMap::new(),
        }
    }

    pub fn deposit(&self, visitor: VisitorId, amount: f64) {
        *self.balances.entry(visitor).or_insert(0.0) += amount;
    }

    pub fn set_balance(&self, visitor: VisitorId, amount: f64) {
        self.balances.insert(visitor, amount);
    }
}

impl CurrencyProvider for InMemoryWallet {
    fn name(&self) -> &str {
        &self.name
    }

    fn balance(&self, visitor: VisitorId) -> f64 {
        self.balances
            .get(&visitor)
            .map(|balance| *balance)
            .unwrap_or(0.0)
    }

    fn withdraw(&self, visitor: VisitorId, amount: f64) -> bool {
        match self.balances.get_mut(&visitor) {
            Some(mut balance) if *balance >= amount => {
                *balance -= amount;
                true
            }
            _ => false,
        }
    }

    fn format(&self, amount: f64) -> String {
        format!("{amount:.0} {}", self.name)
    }
}

/// Item counts per visitor, matched on material only.
#[derive(Debug, Default)]
pub struct InMemoryInventory {
    stacks: DashMap<VisitorId, DashMap<String, u32>>,
}

impl InMemoryInventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn give(&self, visitor: VisitorId, material: &str, amount: u32) {
        let stacks = self.stacks.entry(visitor).or_default();
        *stacks.entry(material.to_string()).or_insert(0) += amount;
    }

    pub fn count(&self, visitor: VisitorId, material: &str) -> u32 {
        self.stacks
            .get(&visitor)
            .and_then(|stacks| stacks.get(material).map(|count| *count))
            .unwrap_or(0)
    }
}

impl ItemCostProvider for InMemoryInventory {
    fn has(&self, visitor: VisitorId, items: &[RequiredItem]) -> bool {
        if items.is_empty() {
            return false;
        }
        items
            .iter()
            .all(|item| self.count(visitor, &item.material) >= required(items, &item.material))
    }

    fn withdraw(&self, visitor: VisitorId, items: &[RequiredItem]) -> bool {
        if !self.has(visitor, items) {
            return false;
        }
        let Some(stacks) = self.stacks.get(&visitor) else {
            return false;
        };
        for item in items {
            if let Some(mut count) = stacks.get_mut(&item.material) {
                *count = count.saturating_sub(item.amount);
            }
        }
        true
    }
}

/// Total amount of `material` across every requirement line.
fn required(items: &[RequiredItem], material: &str) -> u32 {
    items
        .iter()
        .filter(|item| item.material == material)
        .map(|item| item.amount)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(material: &str, amount: u32) -> RequiredItem {
        RequiredItem {
            material: material.to_string(),
            amount,
            name: None,
            lore: Vec::new(),
        }
    }

    #[test]
    fn wallet_never_overdraws() {
        let wallet = InMemoryWallet::new("coins");
        let visitor = VisitorId::random();
        wallet.deposit(visitor, 100.0);

        assert!(wallet.has(visitor, 100.0));
        assert!(!wallet.withdraw(visitor, 150.0));
        assert!(wallet.withdraw(visitor, 60.0));
        assert_eq!(wallet.balance(visitor), 40.0);
        assert!(!wallet.withdraw(VisitorId::random(), 1.0));
    }

    #[test]
    fn inventory_sums_repeated_materials() {
        let inventory = InMemoryInventory::new();
        let visitor = VisitorId::random();
        inventory.give(visitor, "GOLD_INGOT", 5);

        let cost = [item("GOLD_INGOT", 3), item("GOLD_INGOT", 3)];
        assert!(!inventory.has(visitor, &cost));

        inventory.give(visitor, "GOLD_INGOT", 1);
        assert!(inventory.withdraw(visitor, &cost));
        assert_eq!(inventory.count(visitor, "GOLD_INGOT"), 0);
    }

    #[test]
    fn empty_cost_is_never_satisfied() {
        let inventory = InMemoryInventory::new();
        assert!(!inventory.has(VisitorId::random(), &[]));
    }

    #[test]
    fn describe_prefers_display_names() {
        let inventory = InMemoryInventory::new();
        let mut named = item("PAPER", 1);
        named.name = Some("Rift Map".to_string());

        assert_eq!(
            inventory.describe(&[item("GOLD_INGOT", 8), named]),
            "8x GOLD_INGOT, 1x Rift Map"
        );
    }
}
