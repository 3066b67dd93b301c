//! Read-side projections: what a visitor sees in a slot and the status line.

use market_core::{Allocation, Slot, StockMode, VisitorId, format_duration};

use super::Market;

/// What a visitor sees in one display slot.
#[derive(Debug, Clone, PartialEq)]
pub enum SlotView {
    /// Something is assigned but the visitor has not revealed it yet.
    Hidden,
    /// Nothing could be assigned to this slot.
    Unassigned,
    Available(Allocation),
    /// Revealed, but the visitor fails the entry's permission requirement.
    PermissionDenied(Allocation),
    /// Shared stock for the entry is exhausted.
    SoldOut(Allocation),
    /// The visitor already bought the entry as often as allowed.
    LimitReached(Allocation),
}

impl SlotView {
    pub fn allocation(&self) -> Option<&Allocation> {
        match self {
            SlotView::Hidden | SlotView::Unassigned => None,
            SlotView::Available(allocation)
            | SlotView::PermissionDenied(allocation)
            | SlotView::SoldOut(allocation)
            | SlotView::LimitReached(allocation) => Some(allocation),
        }
    }

    pub fn is_purchasable(&self) -> bool {
        matches!(self, SlotView::Available(_))
    }
}

/// Open/closed label and countdown line for status displays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusText {
    pub open: bool,
    pub label: String,
    pub countdown: String,
}

impl Market {
    /// Resolves the slot (drawing a personal entry while open) and reports
    /// how it should be shown.
    pub fn slot_view(&self, visitor: VisitorId, slot: Slot) -> SlotView {
        let Some(allocation) = self.allocation_for_slot(visitor, slot) else {
            return SlotView::Unassigned;
        };
        if !self.is_revealed(visitor, slot) {
            return SlotView::Hidden;
        }

        let entry = allocation.entry();
        if !self.permits(visitor, entry) {
            SlotView::PermissionDenied(allocation)
        } else if self.config.stock_mode == StockMode::Global
            && self.remaining_stock(&entry.key) == 0
        {
            SlotView::SoldOut(allocation)
        } else if self.visitors.met_limit(visitor, entry) {
            SlotView::LimitReached(allocation)
        } else {
            SlotView::Available(allocation)
        }
    }

    /// Countdown rendered as `1d 2h 3m 4s`.
    pub fn formatted_time_remaining(&self) -> String {
        format_duration(i64::try_from(self.seconds_remaining()).unwrap_or(i64::MAX))
    }

    pub fn status_text(&self) -> StatusText {
        let open = self.is_open();
        let status = &self.config.status;
        StatusText {
            open,
            label: status.label(open).to_string(),
            countdown: status.countdown(open, &self.formatted_time_remaining()),
        }
    }
}
