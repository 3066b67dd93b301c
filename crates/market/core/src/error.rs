//! Validation errors for catalog entries.

use thiserror::Error;

/// Reasons a configured entry is rejected at load time.
///
/// Rejection is per entry: the loader logs the error and keeps going with
/// the rest of the catalog.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EntryError {
    #[error("entry key is empty")]
    EmptyKey,

    #[error("weight must be a positive finite number, got {0}")]
    InvalidWeight(f64),

    #[error("price must be a non-negative finite number, got {0}")]
    InvalidPrice(f64),

    #[error("stock must be -1 (infinite) or non-negative, got {0}")]
    InvalidStock(i64),

    #[error("discount {field} must be within 0..=100, got {value}")]
    InvalidDiscount { field: &'static str, value: f64 },

    #[error("required item #{index} has an empty material id")]
    EmptyMaterial { index: usize },

    #[error("required item #{index} ({material}) must have a positive amount")]
    InvalidAmount { index: usize, material: String },

    #[error("permission node is empty")]
    EmptyPermissionNode,
}
