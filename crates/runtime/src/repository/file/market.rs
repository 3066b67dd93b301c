//! File-based MarketRepository implementation.

use std::fs;
use std::path::{Path, PathBuf};

use market_core::MarketSnapshot;

use crate::repository::{MarketRepository, RepositoryError, Result};

/// Stores the market snapshot as one JSON document.
///
/// # File Format
///
/// `{base_dir}/market_state.json`, pretty-printed. Saves go through
/// `market_state.json.tmp` and an atomic rename, so a crash mid-write leaves
/// the previous snapshot readable. A document that fails to parse is moved
/// aside to `market_state.json.corrupt` and reported as corrupted.
pub struct FileMarketRepository {
    path: PathBuf,
}

impl FileMarketRepository {
    pub const STATE_FILE: &'static str = "market_state.json";

    /// Create a repository rooted at `base_dir`, creating the directory.
    pub fn new(base_dir: impl AsRef<Path>) -> Result<Self> {
        let base_dir = base_dir.as_ref();
        fs::create_dir_all(base_dir).map_err(RepositoryError::Io)?;
        Ok(Self {
            path: base_dir.join(Self::STATE_FILE),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn quarantine(&self) {
        let target = self.path.with_extension("json.corrupt");
        match fs::rename(&self.path, &target) {
            Ok(()) => tracing::warn!("Moved unreadable state to {}", target.display()),
            Err(e) => tracing::warn!("Failed to move unreadable state aside: {}", e),
        }
    }
}

impl MarketRepository for FileMarketRepository {
    fn load(&self) -> Result<Option<MarketSnapshot>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let bytes = fs::read(&self.path).map_err(RepositoryError::Io)?;
        match serde_json::from_slice::<MarketSnapshot>(&bytes) {
            Ok(snapshot) => {
                tracing::debug!("Loaded market state from {}", self.path.display());
                Ok(Some(snapshot))
            }
            Err(e) => {
                self.quarantine();
                Err(RepositoryError::CorruptedData(e.to_string()))
            }
        }
    }

    fn save(&self, snapshot: &MarketSnapshot) -> Result<()> {
        let temp_path = self.path.with_extension("json.tmp");

        let bytes =
            serde_json::to_vec_pretty(snapshot).map_err(|e| RepositoryError::Json(e.to_string()))?;

        // Write to temp file
        fs::write(&temp_path, bytes).map_err(RepositoryError::Io)?;

        // Atomic rename
        fs::rename(&temp_path, &self.path).map_err(RepositoryError::Io)?;

        tracing::debug!("Saved market state to {}", self.path.display());

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use market_core::{Phase, StockMode};
    use std::collections::BTreeMap;

    fn snapshot(seconds_remaining: u64) -> MarketSnapshot {
        MarketSnapshot {
            phase: Phase::Open,
            seconds_remaining,
            last_persisted_at: 1_700_000_000,
            stock_mode: StockMode::Global,
            global_allocations: Vec::new(),
            visitors: Vec::new(),
            stock: Some(BTreeMap::from([("lantern".to_string(), 3)])),
        }
    }

    #[test]
    fn first_run_has_no_state() {
        let dir = tempfile::tempdir().unwrap();
        let repo = FileMarketRepository::new(dir.path()).unwrap();
        assert!(repo.load().unwrap().is_none());
    }

    #[test]
    fn save_replaces_previous_state() {
        let dir = tempfile::tempdir().unwrap();
        let repo = FileMarketRepository::new(dir.path().join("nested")).unwrap();

        repo.save(&snapshot(100)).unwrap();
        repo.save(&snapshot(40)).unwrap();

        assert_eq!(repo.load().unwrap(), Some(snapshot(40)));
        assert!(!repo.path().with_extension("json.tmp").exists());
    }

    #[test]
    fn corrupt_document_is_moved_aside() {
        let dir = tempfile::tempdir().unwrap();
        let repo = FileMarketRepository::new(dir.path()).unwrap();
        fs::write(repo.path(), b"{ not json").unwrap();

        assert!(matches!(
            repo.load(),
            Err(RepositoryError::CorruptedData(_))
        ));
        assert!(!repo.path().exists());
        assert!(repo.path().with_extension("json.corrupt").exists());
        assert!(repo.load().unwrap().is_none());
    }
}
