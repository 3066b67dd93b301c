//! Topic-based event bus for market notifications.
//!
//! Consumers subscribe only to the topics they need: phase changes,
//! visitor-facing broadcast lines, or completed purchases.

mod bus;
mod types;

pub use bus::{Event, EventBus, Topic};
pub use types::{
    BroadcastEvent, BroadcastKind, CloseEvent, LifecycleEvent, OpenEvent, PurchaseCompleted,
    PurchaseEvent,
};
