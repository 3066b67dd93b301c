//! Data-driven market content and loaders.
//!
//! Provides loaders for the TOML files that describe a market:
//! - Market configuration (schedule, stock mode, slots, messages)
//! - Catalog entries (weights, prices, costs, stock, flags)
//!
//! Loaders are lenient about individual catalog entries: a malformed entry
//! is logged and skipped so one typo cannot empty the market.

pub mod loaders;

pub use loaders::{CatalogLoader, ConfigLoader, LoadResult};
