//! Repository layer for the persisted market state.
//!
//! The whole market (cycle, global table, visitor records, stock) is saved
//! as one [`MarketSnapshot`](market_core::MarketSnapshot). Static content
//! such as the catalog and config is loaded by `market-content`, not here.

mod error;
mod file;
mod memory;
mod traits;

pub use error::{RepositoryError, Result};
pub use file::FileMarketRepository;
pub use memory::InMemoryMarketRepo;
pub use traits::MarketRepository;
