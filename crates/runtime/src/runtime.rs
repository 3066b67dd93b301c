//! High-level runtime orchestrator.
//!
//! The runtime restores the market, owns the scheduler worker, and exposes a
//! builder-based API for hosts to wire in storage, payments and permissions.

use std::sync::Arc;

use market_core::{Catalog, MarketConfig, RandomSource};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use crate::api::{MarketHandle, Result, RuntimeError};
use crate::clock::{Clock, SystemClock};
use crate::events::{Event, EventBus, Topic};
use crate::market::{Market, RecoveryOutcome, Services};
use crate::payment::{ItemCostProvider, PaymentRegistry, Payments};
use crate::permission::{Authorizer, StaticPermissions};
use crate::repository::{InMemoryMarketRepo, MarketRepository};
use crate::workers::{Command, SchedulerWorker};

/// Runtime configuration shared across the orchestrator and workers.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub market: MarketConfig,
    pub event_buffer_size: usize,
    pub command_buffer_size: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            market: MarketConfig::default(),
            event_buffer_size: 100,
            command_buffer_size: 32,
        }
    }
}

/// Main runtime that drives the market cycle
///
/// Design: Runtime owns the scheduler worker.
/// [`MarketHandle`] provides a cloneable façade for clients.
pub struct Runtime {
    handle: MarketHandle,
    recovery: RecoveryOutcome,
    scheduler_handle: JoinHandle<()>,
}

impl Runtime {
    /// Create a new runtime builder
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Get a cloneable handle to this runtime
    pub fn handle(&self) -> MarketHandle {
        self.handle.clone()
    }

    /// How the market state was restored on build.
    pub fn recovery(&self) -> RecoveryOutcome {
        self.recovery
    }

    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<Event> {
        self.handle.subscribe(topic)
    }

    /// Stop the scheduler, cancel announcements and save a final snapshot.
    pub async fn shutdown(self) -> Result<()> {
        // The worker may already be gone; joining still reports panics.
        if let Err(error) = self.handle.shutdown().await {
            tracing::debug!(%error, "scheduler already stopped");
        }
        drop(self.handle);

        self.scheduler_handle
            .await
            .map_err(RuntimeError::WorkerJoin)?;

        Ok(())
    }
}

/// How the builder obtains payment back-ends.
enum PaymentSource {
    Ready(Payments),
    Registry {
        registry: PaymentRegistry,
        items: Option<Arc<dyn ItemCostProvider>>,
    },
}

/// Builder for [`Runtime`] with flexible configuration.
pub struct RuntimeBuilder {
    config: RuntimeConfig,
    catalog: Option<Catalog>,
    repository: Option<Arc<dyn MarketRepository>>,
    clock: Option<Arc<dyn Clock>>,
    rng: Option<Box<dyn RandomSource>>,
    payments: PaymentSource,
    authorizer: Option<Arc<dyn Authorizer>>,
}

impl RuntimeBuilder {
    fn new() -> Self {
        Self {
            config: RuntimeConfig::default(),
            catalog: None,
            repository: None,
            clock: None,
            rng: None,
            payments: PaymentSource::Ready(Payments::free()),
            authorizer: None,
        }
    }

    /// Override runtime configuration
    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Override only the market configuration
    pub fn market_config(mut self, market: MarketConfig) -> Self {
        self.config.market = market;
        self
    }

    /// Set required catalog
    pub fn catalog(mut self, catalog: Catalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Durable store (default: in-memory, lost on exit)
    pub fn repository(mut self, repository: Arc<dyn MarketRepository>) -> Self {
        self.repository = Some(repository);
        self
    }

    /// Wall clock used for recovery (default: system clock)
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Random source for all draws (default: OS-seeded ChaCha8)
    pub fn rng(mut self, rng: impl RandomSource + 'static) -> Self {
        self.rng = Some(Box::new(rng));
        self
    }

    /// Deterministic ChaCha8 random source
    pub fn seed(self, seed: u64) -> Self {
        self.rng(ChaCha8Rng::seed_from_u64(seed))
    }

    /// Use already hooked payment back-ends, bypassing economy setup
    pub fn payments(mut self, payments: Payments) -> Self {
        self.payments = PaymentSource::Ready(payments);
        self
    }

    /// Hook the currency provider named in the economy config from
    /// `registry` on build, plus an optional item-cost provider.
    pub fn payment_registry(
        mut self,
        registry: PaymentRegistry,
        items: Option<Arc<dyn ItemCostProvider>>,
    ) -> Self {
        self.payments = PaymentSource::Registry { registry, items };
        self
    }

    /// Permission source (default: nobody holds any node)
    pub fn authorizer(mut self, authorizer: Arc<dyn Authorizer>) -> Self {
        self.authorizer = Some(authorizer);
        self
    }

    /// Build the runtime
    ///
    /// Restores saved state before the scheduler starts, so the first tick
    /// already runs against the recovered countdown.
    pub async fn build(self) -> Result<Runtime> {
        let catalog = self.catalog.ok_or(RuntimeError::MissingCatalog)?;

        let payments = match self.payments {
            PaymentSource::Ready(payments) => payments,
            PaymentSource::Registry { registry, items } => {
                let payments = Payments::setup(&self.config.market.economy, &registry)?;
                match items {
                    Some(items) => payments.with_items(items),
                    None => payments,
                }
            }
        };

        let repository: Arc<dyn MarketRepository> = match self.repository {
            Some(repository) => repository,
            None => {
                tracing::warn!("no market repository configured; state will not survive restarts");
                Arc::new(InMemoryMarketRepo::new())
            }
        };
        let clock: Arc<dyn Clock> = match self.clock {
            Some(clock) => clock,
            None => Arc::new(SystemClock),
        };
        let rng: Box<dyn RandomSource> = match self.rng {
            Some(rng) => rng,
            None => Box::new(ChaCha8Rng::from_rng(&mut rand::rng())),
        };
        let authorizer: Arc<dyn Authorizer> = match self.authorizer {
            Some(authorizer) => authorizer,
            None => Arc::new(StaticPermissions::new()),
        };

        let services = Services {
            repository,
            clock,
            rng,
            events: EventBus::with_capacity(self.config.event_buffer_size),
            payments,
            authorizer,
        };

        let market = Arc::new(Market::new(self.config.market, catalog, services));
        let recovery = market.initialize();

        let (command_tx, command_rx) = mpsc::channel::<Command>(self.config.command_buffer_size);
        let handle = MarketHandle::new(Arc::clone(&market), command_tx);

        let scheduler = SchedulerWorker::new(market, command_rx);
        let scheduler_handle = tokio::spawn(async move {
            scheduler.run().await;
        });

        Ok(Runtime {
            handle,
            recovery,
            scheduler_handle,
        })
    }
}
