//! Market configuration and tunable parameters.
//!
//! Every field carries a serde default so a partial document (or an empty
//! one) still yields a usable configuration.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::cycle::Phase;
use crate::visitor::Slot;

/// Purchase accounting mode, selected once for the whole market.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum StockMode {
    /// Shared stock table; each visitor may buy a given entry once.
    #[default]
    Global,
    /// No shared stock; each visitor may buy an entry up to its initial stock.
    #[serde(alias = "PLAYER")]
    PerVisitor,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketConfig {
    pub schedule: ScheduleConfig,
    pub stock_mode: StockMode,
    /// How many global entries are drawn on each OPEN transition. Values
    /// `<= 0` disable global slots.
    pub global_items_to_show: i32,
    /// Display slots that can host a global or personal allocation.
    pub slots: Vec<Slot>,
    pub announcements: AnnouncementConfig,
    pub broadcasts: BroadcastConfig,
    pub status: StatusTextConfig,
    pub economy: EconomyConfig,
    /// Periodic save cadence, in ticks of remaining countdown.
    pub persist_interval_ticks: u64,
    pub tick_period_secs: u64,
}

impl MarketConfig {
    pub const DEFAULT_OPEN_DURATION: u64 = 604_800;
    pub const DEFAULT_CLOSE_DURATION: u64 = 259_200;
    pub const DEFAULT_GLOBAL_ITEMS: i32 = 1;
    pub const DEFAULT_PERSIST_INTERVAL: u64 = 300;
    pub const DEFAULT_TICK_PERIOD: u64 = 1;

    pub fn new() -> Self {
        Self {
            schedule: ScheduleConfig::default(),
            stock_mode: StockMode::default(),
            global_items_to_show: Self::DEFAULT_GLOBAL_ITEMS,
            slots: (10..=16).collect(),
            announcements: AnnouncementConfig::default(),
            broadcasts: BroadcastConfig::default(),
            status: StatusTextConfig::default(),
            economy: EconomyConfig::default(),
            persist_interval_ticks: Self::DEFAULT_PERSIST_INTERVAL,
            tick_period_secs: Self::DEFAULT_TICK_PERIOD,
        }
    }

    /// Full countdown for a phase.
    pub fn duration_of(&self, phase: Phase) -> u64 {
        match phase {
            Phase::Open => self.schedule.open_duration,
            Phase::Closed => self.schedule.close_duration,
        }
    }

    /// Number of global entries to draw, with non-positive values mapped to 0.
    pub fn global_slot_budget(&self) -> usize {
        usize::try_from(self.global_items_to_show.max(0)).unwrap_or(0)
    }

    /// Announcements that lead up to leaving `phase`.
    pub fn announcements_while(&self, phase: Phase) -> &[Announcement] {
        match phase {
            Phase::Closed => &self.announcements.before_open,
            Phase::Open => &self.announcements.before_close,
        }
    }

    /// Lines broadcast when entering `phase`.
    pub fn broadcast_for(&self, phase: Phase, forced: bool) -> &[String] {
        match (phase, forced) {
            (Phase::Open, false) => &self.broadcasts.opened,
            (Phase::Open, true) => &self.broadcasts.force_opened,
            (Phase::Closed, false) => &self.broadcasts.closed,
            (Phase::Closed, true) => &self.broadcasts.force_closed,
        }
    }
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Seconds the market stays open.
    pub open_duration: u64,
    /// Seconds the market stays closed.
    pub close_duration: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            open_duration: MarketConfig::DEFAULT_OPEN_DURATION,
            close_duration: MarketConfig::DEFAULT_CLOSE_DURATION,
        }
    }
}

/// A one-shot message fired `seconds_before` the next transition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Announcement {
    pub seconds_before: u64,
    pub lines: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnouncementConfig {
    pub before_open: Vec<Announcement>,
    pub before_close: Vec<Announcement>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BroadcastConfig {
    pub opened: Vec<String>,
    pub closed: Vec<String>,
    pub force_opened: Vec<String>,
    pub force_closed: Vec<String>,
    /// Sent after an operator wipes every visitor record.
    pub reset_all: Vec<String>,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            opened: vec!["The market is now open.".to_string()],
            closed: vec!["The market has closed.".to_string()],
            force_opened: vec!["The market has been opened early.".to_string()],
            force_closed: vec!["The market has been closed early.".to_string()],
            reset_all: vec!["All market data has been reset.".to_string()],
        }
    }
}

/// Short labels for status displays. `{time}` is replaced with the
/// formatted countdown.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusTextConfig {
    pub open_text: String,
    pub closed_text: String,
    pub closes_in: String,
    pub opens_in: String,
}

impl StatusTextConfig {
    pub const TIME_PLACEHOLDER: &'static str = "{time}";

    pub fn label(&self, is_open: bool) -> &str {
        if is_open {
            &self.open_text
        } else {
            &self.closed_text
        }
    }

    pub fn countdown(&self, is_open: bool, formatted: &str) -> String {
        let template = if is_open {
            &self.closes_in
        } else {
            &self.opens_in
        };
        template.replace(Self::TIME_PLACEHOLDER, formatted)
    }
}

impl Default for StatusTextConfig {
    fn default() -> Self {
        Self {
            open_text: "YES".to_string(),
            closed_text: "NO".to_string(),
            closes_in: "Closes in: {time}".to_string(),
            opens_in: "Opens in: {time}".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EconomyConfig {
    /// When false every purchase is free.
    pub enabled: bool,
    /// Registered currency provider name, matched case-insensitively.
    pub provider: String,
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            provider: "WALLET".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn empty_document_yields_defaults() {
        let config: MarketConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, MarketConfig::default());
        assert_eq!(config.schedule.open_duration, 604_800);
        assert_eq!(config.schedule.close_duration, 259_200);
        assert_eq!(config.stock_mode, StockMode::Global);
        assert_eq!(config.global_items_to_show, 1);
        assert_eq!(config.persist_interval_ticks, 300);
    }

    #[test]
    fn stock_mode_parses_case_insensitively() {
        assert_eq!(StockMode::from_str("global").unwrap(), StockMode::Global);
        assert_eq!(
            StockMode::from_str("PER_VISITOR").unwrap(),
            StockMode::PerVisitor
        );
        assert!(StockMode::from_str("shared").is_err());
        assert_eq!(StockMode::PerVisitor.to_string(), "PER_VISITOR");
    }

    #[test]
    fn negative_global_budget_selects_nothing() {
        let config = MarketConfig {
            global_items_to_show: -3,
            ..MarketConfig::default()
        };
        assert_eq!(config.global_slot_budget(), 0);
    }

    #[test]
    fn status_text_substitutes_time() {
        let status = StatusTextConfig::default();
        assert_eq!(status.countdown(true, "1h 0m 0s"), "Closes in: 1h 0m 0s");
        assert_eq!(status.countdown(false, "5s"), "Opens in: 5s");
        assert_eq!(status.label(true), "YES");
        assert_eq!(status.label(false), "NO");
    }

    #[test]
    fn announcements_follow_the_upcoming_transition() {
        let mut config = MarketConfig::default();
        config.announcements.before_open.push(Announcement {
            seconds_before: 60,
            lines: vec!["soon".into()],
        });
        assert_eq!(config.announcements_while(Phase::Closed).len(), 1);
        assert!(config.announcements_while(Phase::Open).is_empty());
    }
}
