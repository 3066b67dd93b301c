//! OPEN/CLOSED countdown state machine.
//!
//! [`CycleState`] only moves the clock; the side effects of entering a phase
//! (clearing visitors, resetting stock, redrawing globals) belong to the
//! runtime that owns the ledgers.

use serde::{Deserialize, Serialize};
use strum::Display;

use crate::config::MarketConfig;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    Open,
    Closed,
}

impl Phase {
    pub fn flipped(self) -> Self {
        match self {
            Self::Open => Self::Closed,
            Self::Closed => Self::Open,
        }
    }

    pub fn is_open(self) -> bool {
        matches!(self, Self::Open)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleState {
    pub phase: Phase,
    pub seconds_remaining: u64,
    /// Unix seconds of the last successful save.
    pub last_persisted_at: i64,
}

/// Outcome of reconciling a persisted cycle with the current time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resumption {
    /// The saved phase is still running.
    Continue(CycleState),
    /// The saved phase expired during downtime; one flip was applied.
    Flip(CycleState),
}

impl CycleState {
    /// First-ever state: closed for a full close duration.
    pub fn fresh(config: &MarketConfig, now: i64) -> Self {
        Self {
            phase: Phase::Closed,
            seconds_remaining: config.duration_of(Phase::Closed),
            last_persisted_at: now,
        }
    }

    pub fn is_open(&self) -> bool {
        self.phase.is_open()
    }

    /// Advances one tick. Returns the new phase when the countdown expired.
    pub fn tick(&mut self, config: &MarketConfig) -> Option<Phase> {
        self.seconds_remaining = self.seconds_remaining.saturating_sub(1);
        if self.seconds_remaining > 0 {
            return None;
        }
        self.enter(self.phase.flipped(), config);
        Some(self.phase)
    }

    /// Sets `phase` with its full configured duration.
    pub fn enter(&mut self, phase: Phase, config: &MarketConfig) {
        self.phase = phase;
        self.seconds_remaining = config.duration_of(phase);
    }

    /// True when the remaining countdown is a positive multiple of
    /// `interval`.
    pub fn persist_due(&self, interval: u64) -> bool {
        interval > 0 && self.seconds_remaining > 0 && self.seconds_remaining % interval == 0
    }

    /// Reconciles a saved state with `now`.
    ///
    /// Downtime shorter than the saved countdown is subtracted. Anything
    /// longer collapses into exactly one phase flip, however many cycles were
    /// missed. A clock that went backwards counts as no downtime.
    pub fn resume(saved: CycleState, now: i64, config: &MarketConfig) -> Resumption {
        let elapsed = u64::try_from(now.saturating_sub(saved.last_persisted_at)).unwrap_or(0);

        if elapsed < saved.seconds_remaining {
            Resumption::Continue(CycleState {
                seconds_remaining: saved.seconds_remaining - elapsed,
                last_persisted_at: now,
                ..saved
            })
        } else {
            let mut flipped = CycleState {
                last_persisted_at: now,
                ..saved
            };
            flipped.enter(saved.phase.flipped(), config);
            Resumption::Flip(flipped)
        }
    }
}

/// Renders seconds as `1d 2h 3m 4s`, omitting zero units. Non-positive
/// input renders as `0s`.
pub fn format_duration(total_seconds: i64) -> String {
    if total_seconds <= 0 {
        return "0s".to_string();
    }

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3_600;
    let minutes = (total_seconds % 3_600) / 60;
    let seconds = total_seconds % 60;

    let mut parts = Vec::with_capacity(4);
    if days > 0 {
        parts.push(format!("{days}d"));
    }
    if hours > 0 {
        parts.push(format!("{hours}h"));
    }
    if minutes > 0 {
        parts.push(format!("{minutes}m"));
    }
    if seconds > 0 || parts.is_empty() {
        parts.push(format!("{seconds}s"));
    }
    parts.join(" ")
}
