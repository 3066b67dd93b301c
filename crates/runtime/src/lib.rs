//! Runtime orchestration for the rotating market.
//!
//! This crate wires the synchronous rules from `market-core` to a timer,
//! durable storage, payment back-ends and permission checks. Hosts embed
//! [`Runtime`] to restore and tick the market, then serve visitors through
//! [`MarketHandle`].
//!
//! Modules are organized by responsibility:
//! - [`runtime`] hosts the orchestrator and builder
//! - [`api`] exposes the types downstream clients interact with
//! - [`events`] provides topic-based event bus for flexible event routing
//! - [`market`] holds the shared state, recovery and the purchase flow
//! - [`payment`] and [`permission`] are the host-implemented seams
//! - [`repository`] persists the market snapshot
//! - `workers` keeps background tasks internal to the crate
pub mod api;
pub mod clock;
pub mod events;
pub mod market;
pub mod payment;
pub mod permission;
pub mod repository;
pub mod runtime;

mod workers;

pub use api::{MarketHandle, Result, RuntimeError};
pub use clock::{Clock, ManualClock, SystemClock};
pub use events::{
    BroadcastEvent, BroadcastKind, CloseEvent, Event, EventBus, LifecycleEvent, OpenEvent,
    PurchaseCompleted, PurchaseEvent, Topic,
};
pub use market::{
    PurchaseOutcome, Receipt, RecoveryOutcome, Rejection, SlotView, StatusText,
    VISITOR_PLACEHOLDER,
};
pub use payment::{
    CurrencyProvider, InMemoryInventory, InMemoryWallet, ItemCostProvider, PaymentDecline,
    PaymentError, PaymentMethod, PaymentRegistry, Payments,
};
pub use permission::{Authorizer, StaticPermissions};
pub use repository::{FileMarketRepository, InMemoryMarketRepo, MarketRepository, RepositoryError};
pub use runtime::{Runtime, RuntimeBuilder, RuntimeConfig};
