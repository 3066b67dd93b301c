//! Stock and purchase accounting.
//!
//! The [`StockLedger`] caps total sales across visitors and is only consulted
//! in [`StockMode::Global`](crate::StockMode::Global). A [`PurchaseRecord`]
//! caps what a single visitor may buy and takes the shape of the active mode.

mod purchase;
mod stock;

pub use purchase::PurchaseRecord;
pub use stock::StockLedger;
