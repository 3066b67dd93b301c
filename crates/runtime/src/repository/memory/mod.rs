//! In-memory repository implementations for tests and local runs.

mod market;

pub use market::InMemoryMarketRepo;
