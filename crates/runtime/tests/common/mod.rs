//! Shared fixtures for runtime integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use market_core::{Catalog, CatalogEntry, MarketConfig, ScheduleConfig, Slot, StockMode};
use runtime::{
    InMemoryMarketRepo, InMemoryWallet, ManualClock, PaymentRegistry, Runtime, RuntimeBuilder,
};

pub const START: i64 = 1_700_000_000;
pub const HOUR: u64 = 3_600;

pub fn global(key: &str, stock: i64, price: f64) -> CatalogEntry {
    CatalogEntry {
        global: true,
        stock,
        price,
        commands: vec![format!("give {{visitor}} {key}")],
        ..CatalogEntry::new(key, 1.0)
    }
}

pub fn personal(key: &str, stock: i64, price: f64) -> CatalogEntry {
    CatalogEntry {
        stock,
        price,
        ..CatalogEntry::new(key, 1.0)
    }
}

/// Hour-long phases so the tick never interferes with a test.
pub fn config(slots: &[Slot], globals: i32, mode: StockMode) -> MarketConfig {
    MarketConfig {
        schedule: ScheduleConfig {
            open_duration: HOUR,
            close_duration: HOUR,
        },
        stock_mode: mode,
        global_items_to_show: globals,
        slots: slots.to_vec(),
        ..MarketConfig::default()
    }
}

pub struct Fixture {
    pub repository: Arc<InMemoryMarketRepo>,
    pub clock: Arc<ManualClock>,
    pub wallet: Arc<InMemoryWallet>,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            repository: Arc::new(InMemoryMarketRepo::new()),
            clock: Arc::new(ManualClock::new(START)),
            wallet: Arc::new(InMemoryWallet::new("coins")),
        }
    }

    pub fn with_repository(repository: InMemoryMarketRepo) -> Self {
        Self {
            repository: Arc::new(repository),
            ..Self::new()
        }
    }

    /// Builder with the fixture's storage, clock and a `WALLET` currency.
    pub fn builder(&self, config: MarketConfig, entries: Vec<CatalogEntry>) -> RuntimeBuilder {
        let mut registry = PaymentRegistry::new();
        registry
            .register_provider("WALLET", self.wallet.clone())
            .expect("wallet registers");

        Runtime::builder()
            .market_config(config)
            .catalog(Catalog::new(entries))
            .repository(self.repository.clone())
            .clock(self.clock.clone())
            .payment_registry(registry, None)
            .seed(7)
    }

    pub async fn start(&self, config: MarketConfig, entries: Vec<CatalogEntry>) -> Runtime {
        self.builder(config, entries)
            .build()
            .await
            .expect("runtime builds")
    }
}
