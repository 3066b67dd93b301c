//! Scheduler worker that drives the market countdown.
//!
//! Owns the tick timer and the [`Announcer`]. Forced transitions arrive as
//! commands from [`MarketHandle`](crate::MarketHandle) so the timer restart
//! and the announcement reschedule happen on the same task as the ticks.

use std::sync::Arc;
use std::time::Duration;

use market_core::{CycleState, Phase};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, info};

use super::announcer::Announcer;
use crate::market::Market;

/// Commands that can be sent to the scheduler worker
pub enum Command {
    /// Enter `phase` now with its full duration and restart the timer.
    Force {
        phase: Phase,
        reply: oneshot::Sender<CycleState>,
    },
    /// Count announcements still waiting to fire.
    PendingAnnouncements { reply: oneshot::Sender<usize> },
    /// Stop ticking, cancel announcements and save.
    Shutdown,
}

/// Background task that ticks the market.
pub struct SchedulerWorker {
    market: Arc<Market>,
    announcer: Announcer,
    command_rx: mpsc::Receiver<Command>,
    tick_period: Duration,
}

impl SchedulerWorker {
    pub(crate) fn new(market: Arc<Market>, command_rx: mpsc::Receiver<Command>) -> Self {
        let tick_period = Duration::from_secs(market.config().tick_period_secs.max(1));
        let announcer = Announcer::new(market.events().clone(), tick_period);
        Self {
            market,
            announcer,
            command_rx,
            tick_period,
        }
    }

    /// Main worker loop.
    pub async fn run(mut self) {
        info!(
            target: "runtime::scheduler",
            phase = %self.market.cycle_state().phase,
            remaining = self.market.seconds_remaining(),
            period = ?self.tick_period,
            "SchedulerWorker started"
        );

        let mut ticker = self.ticker();
        self.reschedule_announcements();

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if self.market.tick().is_some() {
                        self.reschedule_announcements();
                    }
                }
                command = self.command_rx.recv() => {
                    match command {
                        Some(Command::Force { phase, reply }) => {
                            let state = self.market.force(phase);
                            ticker = self.ticker();
                            self.reschedule_announcements();
                            let _ = reply.send(state);
                        }
                        Some(Command::PendingAnnouncements { reply }) => {
                            let _ = reply.send(self.announcer.pending());
                        }
                        Some(Command::Shutdown) => {
                            info!(target: "runtime::scheduler", "Shutdown command received");
                            break;
                        }
                        None => {
                            debug!(target: "runtime::scheduler", "Command channel closed");
                            break;
                        }
                    }
                }
            }
        }

        self.announcer.cancel_all();
        self.market.persist();
        info!(target: "runtime::scheduler", "SchedulerWorker stopped");
    }

    /// Fresh timer whose first tick lands one full period from now.
    fn ticker(&self) -> Interval {
        let start = Instant::now() + self.tick_period;
        let mut ticker = tokio::time::interval_at(start, self.tick_period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker
    }

    fn reschedule_announcements(&mut self) {
        let state = self.market.cycle_state();
        let announcements = self.market.config().announcements_while(state.phase);
        self.announcer.schedule(state.seconds_remaining, announcements);
    }
}
