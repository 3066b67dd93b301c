//! Market rules and data types shared by the runtime and content loaders.
//!
//! `market-core` defines the canonical behaviour of a rotating market: which
//! entries can be drawn, how slots are filled, how stock and purchases are
//! counted, and how the OPEN/CLOSED cycle advances. Everything here is
//! synchronous and free of I/O so the runtime can drive it from a timer and
//! tests can drive it from a seeded random source.
//!
//! Modules are organized leaves first:
//! - [`catalog`] holds configured entries and the weighted sampler
//! - [`allocation`] binds an entry to a slot with its rolled price
//! - [`ledger`] tracks shared stock and per-visitor purchases
//! - [`visitor`] keeps lazily-created per-visitor records
//! - [`assignment`] fills global and personal slots
//! - [`cycle`] is the OPEN/CLOSED countdown state machine
//! - [`snapshot`] is the persisted schema
pub mod allocation;
pub mod assignment;
pub mod catalog;
pub mod config;
pub mod cycle;
pub mod error;
pub mod ledger;
pub mod rng;
pub mod snapshot;
pub mod visitor;

pub use allocation::{Allocation, AllocationRecord};
pub use assignment::{AssignmentEngine, MAX_PERSONAL_ATTEMPTS};
pub use catalog::{
    Catalog, CatalogEntry, Discount, INFINITE_STOCK, PermissionRequirement, RequiredItem,
    WeightedIndex,
};
pub use config::{
    Announcement, AnnouncementConfig, BroadcastConfig, EconomyConfig, MarketConfig,
    ScheduleConfig, StatusTextConfig, StockMode,
};
pub use cycle::{CycleState, Phase, Resumption, format_duration};
pub use error::EntryError;
pub use ledger::{PurchaseRecord, StockLedger};
pub use rng::{RandomSource, shuffle};
pub use snapshot::{MarketSnapshot, VisitorSnapshot};
pub use visitor::{Slot, VisitorBook, VisitorId, VisitorRecord, VisitorSession};
