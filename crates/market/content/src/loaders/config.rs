//! Market configuration loader.

use std::path::Path;

use market_core::{Announcement, MarketConfig};

use crate::loaders::{LoadResult, read_file};

/// Loader for market configuration from TOML files.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load and normalize config data from a TOML file.
    pub fn load(path: &Path) -> LoadResult<MarketConfig> {
        let content = read_file(path)?;
        Self::parse(&content)
    }

    /// Parse config data from TOML text.
    pub fn parse(content: &str) -> LoadResult<MarketConfig> {
        let config: MarketConfig = toml::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse market config TOML: {}", e))?;

        Ok(Self::normalize(config))
    }

    /// Repairs values the runtime cannot work with, logging each repair.
    pub fn normalize(mut config: MarketConfig) -> MarketConfig {
        if config.schedule.open_duration == 0 {
            tracing::warn!("open_duration is 0; using 1 second");
            config.schedule.open_duration = 1;
        }
        if config.schedule.close_duration == 0 {
            tracing::warn!("close_duration is 0; using 1 second");
            config.schedule.close_duration = 1;
        }
        if config.tick_period_secs == 0 {
            tracing::warn!(
                default = MarketConfig::DEFAULT_TICK_PERIOD,
                "tick_period_secs is 0; using default"
            );
            config.tick_period_secs = MarketConfig::DEFAULT_TICK_PERIOD;
        }
        if config.persist_interval_ticks == 0 {
            tracing::warn!("persist_interval_ticks is 0; periodic saves are disabled");
        }

        let before = config.slots.len();
        config.slots.sort_unstable();
        config.slots.dedup();
        if config.slots.len() != before {
            tracing::warn!(
                removed = before - config.slots.len(),
                "duplicate display slots removed"
            );
        }
        if config.slots.is_empty() {
            tracing::warn!("no display slots configured; nothing will be allocated");
        }

        retain_announcements("before_open", &mut config.announcements.before_open);
        retain_announcements("before_close", &mut config.announcements.before_close);

        config
    }
}

fn retain_announcements(list: &str, announcements: &mut Vec<Announcement>) {
    announcements.retain(|announcement| {
        let keep = announcement
            .lines
            .iter()
            .any(|line| !line.trim().is_empty());
        if !keep {
            tracing::warn!(
                list,
                seconds_before = announcement.seconds_before,
                "skipping announcement without message lines"
            );
        }
        keep
    });
}
