//! In-memory MarketRepository implementation for tests and local runs.

use std::sync::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};

use market_core::MarketSnapshot;

use crate::repository::{MarketRepository, RepositoryError, Result};

/// Keeps the last saved snapshot in memory and counts saves.
#[derive(Debug, Default)]
pub struct InMemoryMarketRepo {
    snapshot: RwLock<Option<MarketSnapshot>>,
    saves: AtomicUsize,
}

impl InMemoryMarketRepo {
    /// Create a new empty in-memory repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with a previously saved snapshot.
    pub fn with_snapshot(snapshot: MarketSnapshot) -> Self {
        Self {
            snapshot: RwLock::new(Some(snapshot)),
            saves: AtomicUsize::new(0),
        }
    }

    /// The snapshot a restart would load.
    pub fn current(&self) -> Result<Option<MarketSnapshot>> {
        self.load()
    }

    /// Number of successful saves since construction.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl MarketRepository for InMemoryMarketRepo {
    fn load(&self) -> Result<Option<MarketSnapshot>> {
        let snapshot = self
            .snapshot
            .read()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        Ok(snapshot.clone())
    }

    fn save(&self, snapshot: &MarketSnapshot) -> Result<()> {
        let mut stored = self
            .snapshot
            .write()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        *stored = Some(snapshot.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
