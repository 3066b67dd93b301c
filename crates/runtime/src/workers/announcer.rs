//! One-shot announcements fired ahead of the next phase transition.

use std::time::Duration;

use market_core::Announcement;
use tokio::task::JoinHandle;

use crate::events::{BroadcastEvent, BroadcastKind, Event, EventBus};

/// Owns the pending announcement tasks for the current countdown.
///
/// Every [`schedule`](Self::schedule) call aborts the previous set first, so
/// at most one set is ever pending.
pub struct Announcer {
    events: EventBus,
    tick_period: Duration,
    tasks: Vec<JoinHandle<()>>,
}

impl Announcer {
    pub fn new(events: EventBus, tick_period: Duration) -> Self {
        Self {
            events,
            tick_period,
            tasks: Vec::new(),
        }
    }

    /// Schedules each announcement `remaining - seconds_before` ticks from
    /// now. Announcements whose lead time exceeds the countdown are skipped.
    pub fn schedule(&mut self, remaining: u64, announcements: &[Announcement]) {
        self.cancel_all();

        for announcement in announcements {
            let Some(delay_ticks) = remaining.checked_sub(announcement.seconds_before) else {
                tracing::debug!(
                    target: "runtime::announcer",
                    seconds_before = announcement.seconds_before,
                    remaining,
                    "announcement lead time exceeds countdown; skipped"
                );
                continue;
            };

            let delay = self
                .tick_period
                .saturating_mul(u32::try_from(delay_ticks).unwrap_or(u32::MAX));
            let events = self.events.clone();
            let lines = announcement.lines.clone();
            self.tasks.push(tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                events.publish(Event::Broadcast(BroadcastEvent {
                    kind: BroadcastKind::Announcement,
                    lines,
                }));
            }));
        }

        tracing::debug!(
            target: "runtime::announcer",
            scheduled = self.tasks.len(),
            remaining,
            "announcements scheduled"
        );
    }

    /// Aborts every pending announcement.
    pub fn cancel_all(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }

    /// Announcements scheduled for this countdown that have not fired yet.
    pub fn pending(&self) -> usize {
        self.tasks.iter().filter(|task| !task.is_finished()).count()
    }
}

impl Drop for Announcer {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
