//! Purchase flow: confirmation, eligibility, payment and settlement.
//!
//! Eligibility and settlement are separate steps without a lock spanning
//! both. Two visitors racing for the last unit of shared stock can both pass
//! the sold-out check; the decrement floors at zero, so the ledger stays
//! valid but both purchases complete.

use market_core::{Allocation, Slot, StockMode, VisitorId};
use thiserror::Error;

use super::Market;
use crate::events::{Event, PurchaseCompleted, PurchaseEvent};
use crate::payment::{PaymentDecline, PaymentMethod};

/// Placeholder in entry commands replaced with the buyer's id.
pub const VISITOR_PLACEHOLDER: &str = "{visitor}";

/// Why a purchase or purchase request was turned down.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Rejection {
    #[error("the market is closed")]
    MarketClosed,

    #[error("slot {0} has nothing assigned")]
    NothingAssigned(Slot),

    #[error("slot {0} has not been revealed")]
    NotRevealed(Slot),

    #[error("no purchase is awaiting confirmation")]
    NoPendingPurchase,

    #[error("missing permission for `{0}`")]
    PermissionDenied(String),

    #[error("`{0}` is sold out")]
    SoldOut(String),

    #[error("`{0}` was already purchased")]
    AlreadyPurchased(String),

    #[error("no stock of `{0}` left for this visitor")]
    LimitReached(String),

    #[error(transparent)]
    Payment(#[from] PaymentDecline),
}

/// A settled purchase as seen by the buyer.
#[derive(Debug, Clone, PartialEq)]
pub struct Receipt {
    pub slot: Slot,
    pub key: String,
    pub price: f64,
    pub discounted: bool,
    pub payment: PaymentMethod,
    pub commands: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PurchaseOutcome {
    Purchased(Receipt),
    Rejected(Rejection),
}

impl PurchaseOutcome {
    pub fn is_purchased(&self) -> bool {
        matches!(self, PurchaseOutcome::Purchased(_))
    }

    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            PurchaseOutcome::Rejected(rejection) => Some(rejection),
            PurchaseOutcome::Purchased(_) => None,
        }
    }
}

impl From<Result<Receipt, Rejection>> for PurchaseOutcome {
    fn from(result: Result<Receipt, Rejection>) -> Self {
        match result {
            Ok(receipt) => PurchaseOutcome::Purchased(receipt),
            Err(rejection) => PurchaseOutcome::Rejected(rejection),
        }
    }
}

impl Market {
    /// Opens a confirmation for a revealed slot.
    ///
    /// The pending slot lives in the visitor's session and replaces any
    /// earlier one.
    pub fn request_purchase(&self, visitor: VisitorId, slot: Slot) -> Result<Allocation, Rejection> {
        if !self.is_open() {
            return Err(Rejection::MarketClosed);
        }
        let allocation = self
            .allocation_for_slot(visitor, slot)
            .ok_or(Rejection::NothingAssigned(slot))?;
        if !self.is_revealed(visitor, slot) {
            return Err(Rejection::NotRevealed(slot));
        }
        self.check_eligibility(visitor, &allocation)?;

        self.visitors.set_pending(visitor, slot);
        tracing::debug!(%visitor, slot, key = allocation.key(), "purchase awaiting confirmation");
        Ok(allocation)
    }

    /// Completes the pending purchase, consuming the confirmation.
    pub fn confirm_purchase(&self, visitor: VisitorId) -> PurchaseOutcome {
        match self.visitors.take_pending(visitor) {
            Some(slot) => self.purchase(visitor, slot),
            None => PurchaseOutcome::Rejected(Rejection::NoPendingPurchase),
        }
    }

    /// Discards the pending purchase. Returns true when one existed.
    pub fn cancel_purchase(&self, visitor: VisitorId) -> bool {
        self.visitors.take_pending(visitor).is_some()
    }

    /// Buys whatever is currently assigned to `slot` for `visitor`. The slot
    /// must have been revealed first.
    pub fn purchase(&self, visitor: VisitorId, slot: Slot) -> PurchaseOutcome {
        let outcome = PurchaseOutcome::from(self.settle(visitor, slot));
        if let PurchaseOutcome::Rejected(rejection) = &outcome {
            tracing::debug!(%visitor, slot, %rejection, "purchase rejected");
        }
        outcome
    }

    fn settle(&self, visitor: VisitorId, slot: Slot) -> Result<Receipt, Rejection> {
        if !self.is_open() {
            return Err(Rejection::MarketClosed);
        }
        let allocation = self
            .peek_allocation(visitor, slot)
            .ok_or(Rejection::NothingAssigned(slot))?;
        if !self.is_revealed(visitor, slot) {
            return Err(Rejection::NotRevealed(slot));
        }
        self.check_eligibility(visitor, &allocation)?;

        let payment = self.payments.charge(visitor, &allocation)?;

        let entry = allocation.entry();
        let buyer = visitor.to_string();
        let commands: Vec<String> = entry
            .commands
            .iter()
            .map(|command| command.replace(VISITOR_PLACEHOLDER, &buyer))
            .collect();

        if self.config.stock_mode == StockMode::Global {
            self.stock.decrement(&entry.key);
        }
        self.visitors.record_purchase(visitor, &entry.key);
        self.persist();

        let receipt = Receipt {
            slot,
            key: entry.key.clone(),
            price: allocation.final_price(),
            discounted: allocation.is_discounted(),
            payment,
            commands,
        };

        self.events
            .publish(Event::Purchase(PurchaseEvent::Completed(PurchaseCompleted {
                visitor,
                slot,
                key: receipt.key.clone(),
                price: receipt.price,
                discounted: receipt.discounted,
                payment: receipt.payment.clone(),
                commands: receipt.commands.clone(),
            })));

        tracing::info!(
            target: "runtime::market",
            %visitor,
            slot,
            key = %receipt.key,
            price = receipt.price,
            discounted = receipt.discounted,
            remaining = self.stock.remaining(&receipt.key),
            "purchase completed"
        );
        Ok(receipt)
    }

    /// Permission first, then the stock-mode limits.
    fn check_eligibility(&self, visitor: VisitorId, allocation: &Allocation) -> Result<(), Rejection> {
        let entry = allocation.entry();
        if !self.permits(visitor, entry) {
            return Err(Rejection::PermissionDenied(entry.key.clone()));
        }

        match self.config.stock_mode {
            StockMode::Global => {
                if self.stock.remaining(&entry.key) == 0 {
                    return Err(Rejection::SoldOut(entry.key.clone()));
                }
                if self.visitors.met_limit(visitor, entry) {
                    return Err(Rejection::AlreadyPurchased(entry.key.clone()));
                }
            }
            StockMode::PerVisitor => {
                if self.visitors.met_limit(visitor, entry) {
                    return Err(Rejection::LimitReached(entry.key.clone()));
                }
            }
        }
        Ok(())
    }
}
