//! File-based repository implementations.

mod market;

pub use market::FileMarketRepository;
