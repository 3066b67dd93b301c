//! Authoritative market state shared by the scheduler and visitor calls.
//!
//! [`Market`] owns the catalog, the cycle countdown, the global table, the
//! visitor book and the stock ledger. Every operation is synchronous: the
//! scheduler worker drives [`Market::tick`] from its timer while handles call
//! the query and purchase methods directly from any task.
//!
//! Locking: the random source is always taken before any allocation map, and
//! no std lock is held across an `.await`.

mod checkout;
mod view;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use market_core::{
    Allocation, AssignmentEngine, Catalog, CatalogEntry, CycleState, MarketConfig, MarketSnapshot,
    Phase, RandomSource, Resumption, Slot, StockLedger, VisitorBook, VisitorId,
};

use crate::clock::Clock;
use crate::events::{
    BroadcastEvent, BroadcastKind, CloseEvent, Event, EventBus, LifecycleEvent, OpenEvent,
};
use crate::payment::Payments;
use crate::permission::{self, Authorizer};
use crate::repository::{self, MarketRepository};

pub use checkout::{PurchaseOutcome, Receipt, Rejection, VISITOR_PLACEHOLDER};
pub use view::{SlotView, StatusText};

/// How the market came up on start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryOutcome {
    /// Nothing was saved; the market starts closed.
    Fresh,
    /// The saved phase was still running and its data was kept.
    Resumed,
    /// The saved phase expired while offline; the market moved to this phase.
    Flipped(Phase),
}

/// Collaborators injected by the runtime builder.
pub(crate) struct Services {
    pub repository: Arc<dyn MarketRepository>,
    pub clock: Arc<dyn Clock>,
    pub rng: Box<dyn RandomSource>,
    pub events: EventBus,
    pub payments: Payments,
    pub authorizer: Arc<dyn Authorizer>,
}

pub(crate) struct Market {
    config: MarketConfig,
    catalog: RwLock<Arc<Catalog>>,
    cycle: Mutex<CycleState>,
    assignment: AssignmentEngine,
    visitors: VisitorBook,
    stock: StockLedger,
    rng: Mutex<Box<dyn RandomSource>>,
    repository: Arc<dyn MarketRepository>,
    clock: Arc<dyn Clock>,
    events: EventBus,
    payments: Payments,
    authorizer: Arc<dyn Authorizer>,
}

fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Market {
    pub(crate) fn new(config: MarketConfig, catalog: Catalog, services: Services) -> Self {
        let cycle = CycleState::fresh(&config, services.clock.now());
        Self {
            visitors: VisitorBook::new(config.stock_mode),
            config,
            catalog: RwLock::new(Arc::new(catalog)),
            cycle: Mutex::new(cycle),
            assignment: AssignmentEngine::new(),
            stock: StockLedger::new(),
            rng: Mutex::new(services.rng),
            repository: services.repository,
            clock: services.clock,
            events: services.events,
            payments: services.payments,
            authorizer: services.authorizer,
        }
    }

    pub fn config(&self) -> &MarketConfig {
        &self.config
    }

    pub fn catalog(&self) -> Arc<Catalog> {
        self.catalog
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn cycle_state(&self) -> CycleState {
        *lock(&self.cycle)
    }

    pub fn is_open(&self) -> bool {
        self.cycle_state().is_open()
    }

    pub fn seconds_remaining(&self) -> u64 {
        self.cycle_state().seconds_remaining
    }

    /// Restores the saved state, reconciling it with the downtime since the
    /// last save, and persists the result.
    pub fn initialize(&self) -> RecoveryOutcome {
        let now = self.clock.now();
        let catalog = self.catalog();

        let saved = match self.repository.load() {
            Ok(saved) => saved,
            Err(error) => {
                tracing::warn!(
                    target: "runtime::market",
                    %error,
                    "failed to load market state; starting fresh"
                );
                None
            }
        };

        let Some(snapshot) = saved else {
            *lock(&self.cycle) = CycleState::fresh(&self.config, now);
            self.stock.reset_all(&catalog);
            tracing::info!(
                target: "runtime::market",
                remaining = self.config.schedule.close_duration,
                "no saved state; market starts closed"
            );
            self.persist();
            return RecoveryOutcome::Fresh;
        };

        if snapshot.stock_mode != self.config.stock_mode {
            tracing::warn!(
                target: "runtime::market",
                saved = %snapshot.stock_mode,
                active = %self.config.stock_mode,
                "stock mode changed since the last save"
            );
        }

        let outcome = match CycleState::resume(snapshot.cycle(), now, &self.config) {
            Resumption::Continue(state) => {
                *lock(&self.cycle) = state;
                self.assignment
                    .restore(&snapshot.global_allocations, &catalog);
                self.visitors.restore(snapshot.visitors, &catalog);
                match snapshot.stock {
                    Some(counts) => self.stock.restore(counts, &catalog),
                    None => {
                        tracing::warn!(
                            target: "runtime::market",
                            "saved state has no stock table; resetting stock"
                        );
                        self.stock.reset_all(&catalog);
                    }
                }
                tracing::info!(
                    target: "runtime::market",
                    phase = %state.phase,
                    remaining = state.seconds_remaining,
                    visitors = self.visitors.len(),
                    globals = self.assignment.global_len(),
                    "resumed saved market"
                );
                RecoveryOutcome::Resumed
            }
            Resumption::Flip(state) => {
                *lock(&self.cycle) = state;
                self.visitors.clear();
                self.assignment.clear_globals();
                self.stock.reset_all(&catalog);
                if state.is_open() {
                    self.refresh_globals(&catalog);
                }
                tracing::info!(
                    target: "runtime::market",
                    from = %snapshot.phase,
                    to = %state.phase,
                    remaining = state.seconds_remaining,
                    "saved phase expired while offline"
                );
                RecoveryOutcome::Flipped(state.phase)
            }
        };

        self.persist();
        outcome
    }

    /// Advances the countdown by one tick. Returns the entered phase when
    /// the countdown expired.
    pub fn tick(&self) -> Option<Phase> {
        let (entered, persist_due) = {
            let mut cycle = lock(&self.cycle);
            let entered = cycle.tick(&self.config);
            (
                entered,
                cycle.persist_due(self.config.persist_interval_ticks),
            )
        };

        match entered {
            Some(phase) => self.apply_transition(phase, false),
            None if persist_due => self.persist(),
            None => {}
        }
        entered
    }

    /// Enters `phase` now with its full duration.
    pub fn force(&self, phase: Phase) -> CycleState {
        lock(&self.cycle).enter(phase, &self.config);
        self.apply_transition(phase, true);
        self.cycle_state()
    }

    fn apply_transition(&self, phase: Phase, forced: bool) {
        if phase.is_open() {
            let catalog = self.catalog();
            self.visitors.clear();
            self.stock.reset_all(&catalog);
            self.refresh_globals(&catalog);
        }

        let kind = match (phase, forced) {
            (Phase::Open, false) => BroadcastKind::Opened,
            (Phase::Open, true) => BroadcastKind::ForceOpened,
            (Phase::Closed, false) => BroadcastKind::Closed,
            (Phase::Closed, true) => BroadcastKind::ForceClosed,
        };
        self.broadcast(kind, self.config.broadcast_for(phase, forced));

        let event = match phase {
            Phase::Open => LifecycleEvent::Opened(OpenEvent { forced }),
            Phase::Closed => LifecycleEvent::Closed(CloseEvent { forced }),
        };
        self.events.publish(Event::Lifecycle(event));

        tracing::info!(
            target: "runtime::market",
            %phase,
            forced,
            remaining = self.seconds_remaining(),
            "market phase changed"
        );
        self.persist();
    }

    fn refresh_globals(&self, catalog: &Catalog) {
        let mut rng = lock(&self.rng);
        self.assignment.refresh_globals(
            catalog,
            &self.config.slots,
            self.config.global_slot_budget(),
            &mut **rng,
        );
    }

    pub(crate) fn broadcast(&self, kind: BroadcastKind, lines: &[String]) {
        if lines.is_empty() {
            return;
        }
        self.events.publish(Event::Broadcast(BroadcastEvent {
            kind,
            lines: lines.to_vec(),
        }));
    }

    /// Drops one visitor's allocations, reveals and purchases for the
    /// current cycle. Returns true when the visitor had a record.
    pub fn reset_visitor(&self, visitor: VisitorId) -> bool {
        let removed = self.visitors.remove(visitor);
        tracing::info!(target: "runtime::market", %visitor, removed, "visitor reset");
        self.persist();
        removed
    }

    /// Wipes every visitor, restocks and redraws the global table.
    ///
    /// The global table is redrawn whatever the phase, so an operator reset
    /// during CLOSED prepares the table shown at the next peek.
    pub fn reset_all(&self) {
        let catalog = self.catalog();
        self.visitors.clear();
        self.stock.reset_all(&catalog);
        self.refresh_globals(&catalog);
        self.broadcast(BroadcastKind::Reset, &self.config.broadcasts.reset_all);
        tracing::info!(target: "runtime::market", "all market data reset");
        self.persist();
    }

    /// Swaps in a new catalog.
    ///
    /// Existing allocations keep the entry they were drawn with until the
    /// next cycle; stock gains new keys and drops retired ones.
    pub fn reload_catalog(&self, catalog: Catalog) {
        let catalog = Arc::new(catalog);
        self.stock.reconcile(&catalog);
        *self
            .catalog
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Arc::clone(&catalog);
        tracing::info!(
            target: "runtime::market",
            entries = catalog.len(),
            globals = catalog.global_entries().len(),
            "catalog reloaded"
        );
        self.persist();
    }

    pub fn snapshot(&self) -> MarketSnapshot {
        let cycle = self.cycle_state();
        MarketSnapshot {
            phase: cycle.phase,
            seconds_remaining: cycle.seconds_remaining,
            last_persisted_at: cycle.last_persisted_at,
            stock_mode: self.config.stock_mode,
            global_allocations: self.assignment.snapshot(),
            visitors: self.visitors.snapshot(),
            stock: Some(self.stock.snapshot()),
        }
    }

    /// Writes the current state. In-memory state is never rolled back when
    /// the write fails.
    pub fn save(&self) -> repository::Result<()> {
        let now = self.clock.now();
        let snapshot = MarketSnapshot {
            last_persisted_at: now,
            ..self.snapshot()
        };
        self.repository.save(&snapshot)?;
        lock(&self.cycle).last_persisted_at = now;
        tracing::debug!(
            target: "runtime::market",
            phase = %snapshot.phase,
            remaining = snapshot.seconds_remaining,
            "market state saved"
        );
        Ok(())
    }

    /// Saves and logs a failure instead of returning it.
    pub(crate) fn persist(&self) {
        if let Err(error) = self.save() {
            tracing::error!(target: "runtime::market", %error, "failed to save market state");
        }
    }

    /// Allocation for a configured slot, drawing a personal entry on first
    /// access while the market is open. While closed this never draws.
    pub fn allocation_for_slot(&self, visitor: VisitorId, slot: Slot) -> Option<Allocation> {
        if !self.config.slots.contains(&slot) {
            return None;
        }
        if !self.is_open() {
            return self.peek_allocation(visitor, slot);
        }

        let catalog = self.catalog();
        let mut rng = lock(&self.rng);
        self.assignment
            .resolve(&catalog, &self.visitors, visitor, slot, &mut **rng)
    }

    pub fn peek_allocation(&self, visitor: VisitorId, slot: Slot) -> Option<Allocation> {
        self.assignment.peek(&self.visitors, visitor, slot)
    }

    /// Reveals the slot for the visitor when something is assigned to it.
    pub fn mark_revealed(&self, visitor: VisitorId, slot: Slot) -> Option<Allocation> {
        let allocation = self.allocation_for_slot(visitor, slot)?;
        if self.visitors.mark_revealed(visitor, slot) {
            tracing::debug!(%visitor, slot, key = allocation.key(), "slot revealed");
        }
        Some(allocation)
    }

    pub fn is_revealed(&self, visitor: VisitorId, slot: Slot) -> bool {
        self.visitors.is_revealed(visitor, slot)
    }

    pub fn remaining_stock(&self, key: &str) -> i64 {
        self.stock.remaining(key)
    }

    pub fn decrement_stock(&self, key: &str) -> bool {
        self.stock.decrement(key)
    }

    pub fn record_purchase(&self, visitor: VisitorId, key: &str) {
        self.visitors.record_purchase(visitor, key);
    }

    pub fn purchase_count(&self, visitor: VisitorId, key: &str) -> u32 {
        self.visitors.purchase_count(visitor, key)
    }

    /// False for keys the catalog does not know.
    pub fn has_met_limit(&self, visitor: VisitorId, key: &str) -> bool {
        self.catalog()
            .get(key)
            .is_some_and(|entry| self.visitors.met_limit(visitor, entry))
    }

    fn permits(&self, visitor: VisitorId, entry: &CatalogEntry) -> bool {
        permission::permits(self.authorizer.as_ref(), visitor, entry)
    }
}
