use serde::{Deserialize, Serialize};

use crate::error::EntryError;

/// Initial stock value meaning "never runs out".
pub const INFINITE_STOCK: i64 = -1;

/// A configured tradable entry. Immutable once loaded; identity is `key`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub key: String,
    #[serde(default)]
    pub display_name: Option<String>,
    /// Relative selection weight. Must be positive.
    #[serde(alias = "chance")]
    pub weight: f64,
    #[serde(default)]
    pub price: f64,
    /// Item-based cost. When non-empty it replaces the currency price.
    #[serde(default)]
    pub required_items: Vec<RequiredItem>,
    #[serde(default = "infinite_stock")]
    pub stock: i64,
    #[serde(default)]
    pub discount: Discount,
    #[serde(default)]
    pub permission: Option<PermissionRequirement>,
    #[serde(default)]
    pub global: bool,
    /// Side-effect commands handed to the host after a completed purchase.
    #[serde(default)]
    pub commands: Vec<String>,
}

fn infinite_stock() -> i64 {
    INFINITE_STOCK
}

impl CatalogEntry {
    /// Minimal entry with the given key and weight; everything else defaulted.
    pub fn new(key: impl Into<String>, weight: f64) -> Self {
        Self {
            key: key.into(),
            display_name: None,
            weight,
            price: 0.0,
            required_items: Vec::new(),
            stock: INFINITE_STOCK,
            discount: Discount::default(),
            permission: None,
            global: false,
            commands: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.key)
    }

    pub fn has_infinite_stock(&self) -> bool {
        self.stock == INFINITE_STOCK
    }

    pub fn uses_item_cost(&self) -> bool {
        !self.required_items.is_empty()
    }

    pub fn validate(&self) -> Result<(), EntryError> {
        if self.key.trim().is_empty() {
            return Err(EntryError::EmptyKey);
        }
        if !self.weight.is_finite() || self.weight <= 0.0 {
            return Err(EntryError::InvalidWeight(self.weight));
        }
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(EntryError::InvalidPrice(self.price));
        }
        if self.stock < INFINITE_STOCK {
            return Err(EntryError::InvalidStock(self.stock));
        }
        self.discount.validate()?;

        for (index, item) in self.required_items.iter().enumerate() {
            if item.material.trim().is_empty() {
                return Err(EntryError::EmptyMaterial { index });
            }
            if item.amount == 0 {
                return Err(EntryError::InvalidAmount {
                    index,
                    material: item.material.clone(),
                });
            }
        }

        if self
            .permission
            .as_ref()
            .is_some_and(|permission| permission.node.trim().is_empty())
        {
            return Err(EntryError::EmptyPermissionNode);
        }

        Ok(())
    }
}

/// One line of an item-based cost.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequiredItem {
    pub material: String,
    pub amount: u32,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub lore: Vec<String>,
}

/// Discount rolled once when an allocation is created.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Discount {
    /// Probability of the discount, in percent.
    pub chance: f64,
    /// Price reduction, in percent.
    pub percentage: f64,
}

impl Discount {
    /// `draw` is uniform in `[0, 1)`.
    pub fn rolls(&self, draw: f64) -> bool {
        self.chance > 0.0 && draw * 100.0 < self.chance
    }

    pub fn apply(&self, price: f64) -> f64 {
        price * (1.0 - self.percentage / 100.0)
    }

    fn validate(&self) -> Result<(), EntryError> {
        for (field, value) in [("chance", self.chance), ("percentage", self.percentage)] {
            if !value.is_finite() || !(0.0..=100.0).contains(&value) {
                return Err(EntryError::InvalidDiscount { field, value });
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionRequirement {
    pub node: String,
    /// When set, holding the node denies the purchase instead.
    #[serde(default)]
    pub invert: bool,
}

impl PermissionRequirement {
    pub fn evaluate(&self, has_node: bool) -> bool {
        has_node ^ self.invert
    }
}
