//! Loads content and assembles the market runtime for a host.
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use market_content::{CatalogLoader, ConfigLoader};
use market_core::{Catalog, CatalogEntry, MarketConfig};
use runtime::{
    FileMarketRepository, InMemoryInventory, InMemoryWallet, ItemCostProvider, PaymentRegistry,
    Runtime, RuntimeConfig,
};

use crate::config::BootstrapConfig;

/// Name the bundled in-memory wallet is registered under.
pub const WALLET_PROVIDER: &str = "WALLET";

/// Builder that loads content from disk and starts a market runtime.
pub struct MarketBuilder {
    config: BootstrapConfig,
    registry: PaymentRegistry,
    wallet: Arc<InMemoryWallet>,
    inventory: Arc<InMemoryInventory>,
    items: Option<Arc<dyn ItemCostProvider>>,
}

impl MarketBuilder {
    /// Starts with an in-memory wallet registered as [`WALLET_PROVIDER`] and
    /// an in-memory inventory for item costs.
    pub fn new(config: BootstrapConfig) -> Result<Self> {
        let wallet = Arc::new(InMemoryWallet::new("coins"));
        let inventory = Arc::new(InMemoryInventory::new());

        let mut registry = PaymentRegistry::new();
        registry
            .register_provider(WALLET_PROVIDER, wallet.clone())
            .context("failed to register the bundled wallet")?;

        Ok(Self {
            config,
            registry,
            wallet,
            items: Some(inventory.clone()),
            inventory,
        })
    }

    /// Replace the payment registry (e.g., with a host-specific economy).
    pub fn payment_registry(mut self, registry: PaymentRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Replace the item-cost provider; `None` rejects item-cost entries.
    pub fn item_provider(mut self, items: Option<Arc<dyn ItemCostProvider>>) -> Self {
        self.items = items;
        self
    }

    pub async fn build(self) -> Result<MarketSetup> {
        let market = load_config(&self.config.config_path)?;
        let entries = load_catalog(&self.config.catalog_path)?;

        let repository = FileMarketRepository::new(&self.config.data_dir).with_context(|| {
            format!(
                "failed to prepare data directory {}",
                self.config.data_dir.display()
            )
        })?;
        tracing::info!("Market state file: {}", repository.path().display());

        let runtime_config = RuntimeConfig {
            market,
            event_buffer_size: self.config.channels.event_buffer,
            command_buffer_size: self.config.channels.command_buffer,
        };

        let mut builder = Runtime::builder()
            .config(runtime_config)
            .catalog(Catalog::new(entries))
            .repository(Arc::new(repository))
            .payment_registry(self.registry, self.items);

        if let Some(seed) = self.config.rng_seed {
            tracing::info!(seed, "using deterministic random source");
            builder = builder.seed(seed);
        }

        let runtime = builder
            .build()
            .await
            .context("failed to start market runtime")?;

        Ok(MarketSetup {
            config: self.config,
            runtime,
            wallet: self.wallet,
            inventory: self.inventory,
        })
    }
}

pub struct MarketSetup {
    pub config: BootstrapConfig,
    pub runtime: Runtime,
    pub wallet: Arc<InMemoryWallet>,
    pub inventory: Arc<InMemoryInventory>,
}

fn load_config(path: &Path) -> Result<MarketConfig> {
    if !path.exists() {
        tracing::warn!("No market config at {}; using defaults", path.display());
        return Ok(MarketConfig::default());
    }
    let config = ConfigLoader::load(path)
        .with_context(|| format!("failed to load market config {}", path.display()))?;
    tracing::info!(
        "Loaded market config from {} ({} slots, {} mode)",
        path.display(),
        config.slots.len(),
        config.stock_mode
    );
    Ok(config)
}

fn load_catalog(path: &Path) -> Result<Vec<CatalogEntry>> {
    if !path.exists() {
        tracing::warn!("No catalog at {}; the market will be empty", path.display());
        return Ok(Vec::new());
    }
    CatalogLoader::load(path).with_context(|| format!("failed to load catalog {}", path.display()))
}
