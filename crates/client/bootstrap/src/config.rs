//! Host configuration structures and loaders.
use std::env;
use std::path::PathBuf;

/// Application name used for platform directories.
pub const APP_NAME: &str = "night-market";

/// Configuration required to bootstrap a market host.
#[derive(Clone, Debug)]
pub struct BootstrapConfig {
    /// Holds the state file and logs.
    pub data_dir: PathBuf,
    pub config_path: PathBuf,
    pub catalog_path: PathBuf,
    /// Fixed seed for reproducible draws; random when unset.
    pub rng_seed: Option<u64>,
    pub channels: ChannelConfig,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self::in_dir(default_data_dir())
    }
}

impl BootstrapConfig {
    /// Everything under `data_dir`: `config.toml`, `catalog.toml`, state and
    /// logs.
    pub fn in_dir(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            config_path: data_dir.join("config.toml"),
            catalog_path: data_dir.join("catalog.toml"),
            data_dir,
            rng_seed: None,
            channels: ChannelConfig::default(),
        }
    }

    /// Construct configuration from process environment variables.
    ///
    /// Environment variables:
    /// - `MARKET_DATA_DIR` - State and log directory (default: platform-specific)
    /// - `MARKET_CONFIG` - Market config TOML (default: `<data dir>/config.toml`)
    /// - `MARKET_CATALOG` - Catalog TOML (default: `<data dir>/catalog.toml`)
    /// - `MARKET_RNG_SEED` - Deterministic random seed (default: random)
    /// - `MARKET_EVENT_BUFFER` - Event channel capacity (default: 100)
    /// - `MARKET_COMMAND_BUFFER` - Scheduler command queue size (default: 32)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let data_dir = lookup("MARKET_DATA_DIR")
            .filter(|dir| !dir.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(default_data_dir);
        let mut config = Self::in_dir(data_dir);

        if let Some(path) = lookup("MARKET_CONFIG") {
            config.config_path = PathBuf::from(path);
        }
        if let Some(path) = lookup("MARKET_CATALOG") {
            config.catalog_path = PathBuf::from(path);
        }

        config.rng_seed = parse(&lookup, "MARKET_RNG_SEED");

        if let Some(capacity) = parse::<usize>(&lookup, "MARKET_EVENT_BUFFER") {
            config.channels.event_buffer = capacity.max(1);
        }
        if let Some(capacity) = parse::<usize>(&lookup, "MARKET_COMMAND_BUFFER") {
            config.channels.command_buffer = capacity.max(1);
        }

        config
    }

    pub fn log_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }
}

#[derive(Clone, Debug)]
pub struct ChannelConfig {
    pub event_buffer: usize,
    pub command_buffer: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            event_buffer: 100,
            command_buffer: 32,
        }
    }
}

/// Platform data directory, or `./market_data` when none can be resolved.
pub fn default_data_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", APP_NAME)
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("./market_data"))
}

fn parse<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T>
where
    T: std::str::FromStr,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparseable environment value");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn files_default_to_the_data_dir() {
        let config = BootstrapConfig::from_lookup(lookup(&[("MARKET_DATA_DIR", "/srv/market")]));

        assert_eq!(config.data_dir, PathBuf::from("/srv/market"));
        assert_eq!(config.config_path, PathBuf::from("/srv/market/config.toml"));
        assert_eq!(config.catalog_path, PathBuf::from("/srv/market/catalog.toml"));
        assert_eq!(config.log_dir(), PathBuf::from("/srv/market/logs"));
        assert_eq!(config.rng_seed, None);
        assert_eq!(config.channels.event_buffer, 100);
        assert_eq!(config.channels.command_buffer, 32);
    }

    #[test]
    fn explicit_values_override_defaults() {
        let config = BootstrapConfig::from_lookup(lookup(&[
            ("MARKET_DATA_DIR", "/srv/market"),
            ("MARKET_CONFIG", "/etc/market.toml"),
            ("MARKET_CATALOG", "/etc/catalog.toml"),
            ("MARKET_RNG_SEED", " 42 "),
            ("MARKET_EVENT_BUFFER", "0"),
            ("MARKET_COMMAND_BUFFER", "8"),
        ]));

        assert_eq!(config.config_path, PathBuf::from("/etc/market.toml"));
        assert_eq!(config.catalog_path, PathBuf::from("/etc/catalog.toml"));
        assert_eq!(config.rng_seed, Some(42));
        assert_eq!(config.channels.event_buffer, 1);
        assert_eq!(config.channels.command_buffer, 8);
    }

    #[test]
    fn unparseable_numbers_are_ignored() {
        let config = BootstrapConfig::from_lookup(lookup(&[
            ("MARKET_DATA_DIR", "/srv/market"),
            ("MARKET_RNG_SEED", "lucky"),
            ("MARKET_COMMAND_BUFFER", "many"),
        ]));

        assert_eq!(config.rng_seed, None);
        assert_eq!(config.channels.command_buffer, 32);
    }
}
