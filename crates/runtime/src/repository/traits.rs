//! Repository contract for saving and loading the market state.

use market_core::MarketSnapshot;

use super::Result;

/// Durable store for the market snapshot.
///
/// Implementations must replace the stored snapshot atomically: a failed
/// save leaves the previous one intact.
pub trait MarketRepository: Send + Sync {
    /// Loads the last saved snapshot. `None` on first run.
    fn load(&self) -> Result<Option<MarketSnapshot>>;

    fn save(&self, snapshot: &MarketSnapshot) -> Result<()>;
}
