use std::{fmt::Display, str::FromStr, time::Duration};

use anyhow::anyhow;

/// Server settings. Every field can be overridden through a `BZZR_*`
/// environment variable; anything unset keeps its default.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub room_ttl: Duration,
    pub cleanup_interval: Duration,
    pub event_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            room_ttl: Duration::from_secs(30 * 60),
            cleanup_interval: Duration::from_secs(60),
            event_capacity: 64,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = Self::default();
        let config = Self {
            host: lookup("BZZR_HOST").unwrap_or(defaults.host),
            port: parse_var(&lookup, "BZZR_PORT")?.unwrap_or(defaults.port),
            room_ttl: parse_var(&lookup, "BZZR_ROOM_TTL_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.room_ttl),
            cleanup_interval: parse_var(&lookup, "BZZR_CLEANUP_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.cleanup_interval),
            event_capacity: parse_var(&lookup, "BZZR_EVENT_CAPACITY")?
                .unwrap_or(defaults.event_capacity),
        };
        if config.cleanup_interval.is_zero() {
            return Err(anyhow!("BZZR_CLEANUP_SECS: must be greater than zero"));
        }
        Ok(config)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    T::Err: Display,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| anyhow!("{key}: invalid value {raw:?}: {e}"))
        })
        .transpose()
}
