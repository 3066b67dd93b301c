//! Shared bootstrap utilities for market hosts.
//!
//! Provides environment-driven configuration, content loading, and runtime
//! setup so a daemon (or any other host) can bring a market up in one call.
pub mod builder;
pub mod config;

pub use builder::{MarketBuilder, MarketSetup, WALLET_PROVIDER};
pub use config::{BootstrapConfig, ChannelConfig};
