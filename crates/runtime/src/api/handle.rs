//! Cloneable façade for querying and operating the market.
//!
//! [`MarketHandle`] answers visitor queries and purchases synchronously
//! against the shared market state. Operations that must line up with the
//! tick timer (forced transitions) go through the scheduler worker's
//! command channel.

use std::collections::HashMap;
use std::sync::Arc;

use market_core::{Allocation, Catalog, CycleState, Phase, Slot, VisitorId};
use tokio::sync::{broadcast, mpsc, oneshot};

use super::errors::{Result, RuntimeError};
use crate::events::{Event, EventBus, Topic};
use crate::market::{Market, PurchaseOutcome, Rejection, SlotView, StatusText};
use crate::workers::Command;

/// Client-facing handle to interact with the market
#[derive(Clone)]
pub struct MarketHandle {
    market: Arc<Market>,
    command_tx: mpsc::Sender<Command>,
}

impl MarketHandle {
    pub(crate) fn new(market: Arc<Market>, command_tx: mpsc::Sender<Command>) -> Self {
        Self { market, command_tx }
    }

    // ---- cycle -------------------------------------------------------------

    pub fn is_open(&self) -> bool {
        self.market.is_open()
    }

    /// Seconds until the next transition.
    pub fn time_remaining(&self) -> u64 {
        self.market.seconds_remaining()
    }

    pub fn formatted_time_remaining(&self) -> String {
        self.market.formatted_time_remaining()
    }

    pub fn cycle_state(&self) -> CycleState {
        self.market.cycle_state()
    }

    pub fn status_text(&self) -> StatusText {
        self.market.status_text()
    }

    /// Open now with a full open duration. Clears visitors, restocks and
    /// redraws the global table.
    pub async fn force_open(&self) -> Result<CycleState> {
        self.force(Phase::Open).await
    }

    /// Close now with a full close duration.
    pub async fn force_close(&self) -> Result<CycleState> {
        self.force(Phase::Closed).await
    }

    async fn force(&self, phase: Phase) -> Result<CycleState> {
        let (reply_tx, reply_rx) = oneshot::channel();

        self.command_tx
            .send(Command::Force {
                phase,
                reply: reply_tx,
            })
            .await
            .map_err(|_| RuntimeError::CommandChannelClosed)?;

        reply_rx.await.map_err(RuntimeError::ReplyChannelClosed)
    }

    /// Announcements scheduled for the current countdown that have not
    /// fired yet.
    pub async fn pending_announcements(&self) -> Result<usize> {
        let (reply_tx, reply_rx) = oneshot::channel();

        self.command_tx
            .send(Command::PendingAnnouncements { reply: reply_tx })
            .await
            .map_err(|_| RuntimeError::CommandChannelClosed)?;

        reply_rx.await.map_err(RuntimeError::ReplyChannelClosed)
    }

    // ---- slots -------------------------------------------------------------

    /// Allocation for the slot, drawing a personal entry on first access
    /// while open.
    pub fn allocation_for_slot(&self, visitor: VisitorId, slot: Slot) -> Option<Allocation> {
        self.market.allocation_for_slot(visitor, slot)
    }

    /// Existing allocation for the slot. Never draws.
    pub fn peek_allocation(&self, visitor: VisitorId, slot: Slot) -> Option<Allocation> {
        self.market.peek_allocation(visitor, slot)
    }

    pub fn slot_view(&self, visitor: VisitorId, slot: Slot) -> SlotView {
        self.market.slot_view(visitor, slot)
    }

    pub fn mark_revealed(&self, visitor: VisitorId, slot: Slot) -> Option<Allocation> {
        self.market.mark_revealed(visitor, slot)
    }

    pub fn is_revealed(&self, visitor: VisitorId, slot: Slot) -> bool {
        self.market.is_revealed(visitor, slot)
    }

    // ---- ledgers -----------------------------------------------------------

    /// Shared stock left for `key`; `-1` is infinite, unknown keys read 0.
    pub fn remaining_stock(&self, key: &str) -> i64 {
        self.market.remaining_stock(key)
    }

    pub fn purchase_count(&self, visitor: VisitorId, key: &str) -> u32 {
        self.market.purchase_count(visitor, key)
    }

    pub fn has_met_limit(&self, visitor: VisitorId, key: &str) -> bool {
        self.market.has_met_limit(visitor, key)
    }

    /// Records a purchase without charging or persisting.
    pub fn record_purchase(&self, visitor: VisitorId, key: &str) {
        self.market.record_purchase(visitor, key);
    }

    /// Takes one unit of shared stock without persisting.
    pub fn decrement_stock(&self, key: &str) -> bool {
        self.market.decrement_stock(key)
    }

    // ---- purchases ---------------------------------------------------------

    pub fn request_purchase(
        &self,
        visitor: VisitorId,
        slot: Slot,
    ) -> std::result::Result<Allocation, Rejection> {
        self.market.request_purchase(visitor, slot)
    }

    pub fn confirm_purchase(&self, visitor: VisitorId) -> PurchaseOutcome {
        self.market.confirm_purchase(visitor)
    }

    pub fn cancel_purchase(&self, visitor: VisitorId) -> bool {
        self.market.cancel_purchase(visitor)
    }

    /// Buys the slot's revealed allocation directly, skipping confirmation.
    pub fn purchase(&self, visitor: VisitorId, slot: Slot) -> PurchaseOutcome {
        self.market.purchase(visitor, slot)
    }

    // ---- administration ----------------------------------------------------

    pub fn reset_visitor(&self, visitor: VisitorId) -> bool {
        self.market.reset_visitor(visitor)
    }

    /// Gives the visitor fresh personal draws for the rest of the cycle.
    pub fn reroll_visitor(&self, visitor: VisitorId) -> bool {
        self.market.reset_visitor(visitor)
    }

    pub fn reset_all(&self) {
        self.market.reset_all();
    }

    pub fn reload_catalog(&self, catalog: Catalog) {
        self.market.reload_catalog(catalog);
    }

    pub fn catalog(&self) -> Arc<Catalog> {
        self.market.catalog()
    }

    pub fn save(&self) -> Result<()> {
        self.market.save().map_err(RuntimeError::from)
    }

    // ---- events ------------------------------------------------------------

    /// Subscribe to events from a specific topic
    ///
    /// # Topics
    ///
    /// - `Topic::Lifecycle` - `OpenEvent` / `CloseEvent`
    /// - `Topic::Broadcast` - transition messages and announcements
    /// - `Topic::Purchase` - completed purchases
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// use runtime::Topic;
    ///
    /// let mut lifecycle = handle.subscribe(Topic::Lifecycle);
    /// while let Ok(event) = lifecycle.recv().await {
    ///     // React to the market opening or closing
    /// }
    /// ```
    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<Event> {
        self.market.events().subscribe(topic)
    }

    /// Subscribe to multiple topics at once
    pub fn subscribe_multiple(&self, topics: &[Topic]) -> HashMap<Topic, broadcast::Receiver<Event>> {
        self.market.events().subscribe_multiple(topics)
    }

    /// Get a reference to the event bus for advanced usage
    pub fn event_bus(&self) -> &EventBus {
        self.market.events()
    }

    /// Ask the scheduler worker to stop.
    pub(crate) async fn shutdown(&self) -> Result<()> {
        self.command_tx
            .send(Command::Shutdown)
            .await
            .map_err(|_| RuntimeError::CommandChannelClosed)
    }
}
