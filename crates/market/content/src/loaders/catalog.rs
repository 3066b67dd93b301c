//! Catalog loader.
//!
//! Entries live under an `[items]` table keyed by entry key:
//!
//! ```toml
//! [items.ember_blade]
//! chance = 10.0
//! price = 500.0
//! stock = 3
//! global = true
//! ```
//!
//! Each entry is decoded and validated on its own. A malformed entry is
//! logged and skipped; the rest of the catalog still loads.

use std::path::Path;

use market_core::CatalogEntry;

use crate::loaders::{LoadResult, read_file};

/// Loader for catalog entries from TOML files.
pub struct CatalogLoader;

impl CatalogLoader {
    pub const ITEMS_TABLE: &'static str = "items";

    /// Load catalog entries from a TOML file.
    pub fn load(path: &Path) -> LoadResult<Vec<CatalogEntry>> {
        let content = read_file(path)?;
        Self::parse(&content)
    }

    /// Parse catalog entries from TOML text.
    ///
    /// Fails only when the document itself is not valid TOML.
    pub fn parse(content: &str) -> LoadResult<Vec<CatalogEntry>> {
        let mut document: toml::Table = toml::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse catalog TOML: {}", e))?;

        let items = match document.remove(Self::ITEMS_TABLE) {
            Some(toml::Value::Table(items)) => items,
            Some(_) => {
                tracing::warn!("catalog `items` is not a table; the market will be empty");
                return Ok(Vec::new());
            }
            None => {
                tracing::warn!("catalog has no `items` table; the market will be empty");
                return Ok(Vec::new());
            }
        };

        let mut entries = Vec::with_capacity(items.len());
        for (key, value) in items {
            match decode_entry(&key, value) {
                Ok(entry) => entries.push(entry),
                Err(error) => {
                    tracing::warn!(%key, %error, "skipping catalog entry");
                }
            }
        }

        tracing::info!(loaded = entries.len(), "catalog entries loaded");
        Ok(entries)
    }
}

fn decode_entry(key: &str, value: toml::Value) -> LoadResult<CatalogEntry> {
    let toml::Value::Table(mut table) = value else {
        anyhow::bail!("entry is not a table");
    };
    table.insert("key".to_string(), toml::Value::String(key.to_string()));

    let entry: CatalogEntry = toml::Value::Table(table)
        .try_into()
        .map_err(|e| anyhow::anyhow!("invalid field: {}", e))?;
    entry.validate()?;
    Ok(entry)
}
