//! Event types for different topics.

use market_core::{Slot, VisitorId};
use serde::{Deserialize, Serialize};
use strum::Display;

use crate::payment::PaymentMethod;

/// Phase changes of the market cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleEvent {
    Opened(OpenEvent),
    Closed(CloseEvent),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenEvent {
    /// True when an operator opened the market ahead of schedule.
    pub forced: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloseEvent {
    pub forced: bool,
}

/// Why a broadcast was sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[strum(serialize_all = "snake_case")]
pub enum BroadcastKind {
    Opened,
    Closed,
    ForceOpened,
    ForceClosed,
    Announcement,
    Reset,
}

/// Lines meant for every connected visitor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastEvent {
    pub kind: BroadcastKind,
    pub lines: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PurchaseEvent {
    Completed(PurchaseCompleted),
}

/// A settled purchase. Hosts run `commands` to hand the goods over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseCompleted {
    pub visitor: VisitorId,
    pub slot: Slot,
    pub key: String,
    pub price: f64,
    pub discounted: bool,
    pub payment: PaymentMethod,
    /// Entry commands with the visitor placeholder already substituted.
    pub commands: Vec<String>,
}
