//! Client configuration.
//!
//! Everything the client needs is carried in one [`ClientConfig`] value that is
//! passed in at construction. There is no process-wide state.

use std::time::Duration as StdDuration;

use chrono::Duration;

use crate::cache::CacheConfig;

/// Default base URL for the bus tracker API.
pub const DEFAULT_BUS_BASE_URL: &str = "http://www.ctabustracker.com/bustime/api/v2";

/// Default base URL for the train tracker API.
pub const DEFAULT_TRAIN_BASE_URL: &str = "http://lapi.transitchicago.com/api/1.0";

/// Default base URL for the customer alerts API.
pub const DEFAULT_ALERTS_BASE_URL: &str = "http://www.transitchicago.com/api/1.0";

/// Error reading configuration from the environment.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid value for {name}: {value:?}")]
pub struct ConfigError {
    pub name: &'static str,
    pub value: String,
}

/// Tuning for trip resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverConfig {
    /// How far the cutoff moves when a report is flagged as delayed (minutes).
    ///
    /// Applied to the report's local time. The default is six hours less ninety
    /// minutes.
    pub delay_shift_mins: i64,
}

impl ResolverConfig {
    /// Largest shift, either way, that `from_lookup` accepts.
    pub const MAX_DELAY_SHIFT_MINS: i64 = 24 * 60;

    /// The shift, clamped to a day either way.
    pub fn delay_shift(&self) -> Duration {
        let mins = self
            .delay_shift_mins
            .clamp(-Self::MAX_DELAY_SHIFT_MINS, Self::MAX_DELAY_SHIFT_MINS);
        Duration::minutes(mins)
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            delay_shift_mins: 6 * 60 - 90,
        }
    }
}

/// Configuration for [`CtaClient`](crate::client::CtaClient).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Bus tracker API key
    pub bus_key: String,
    /// Train tracker API key
    pub train_key: String,
    pub bus_base_url: String,
    pub train_base_url: String,
    pub alerts_base_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    pub cache: CacheConfig,
    pub resolver: ResolverConfig,
    /// Keep the decoded payload on every response.
    pub debug: bool,
}

impl ClientConfig {
    /// Create a new config with the given API keys.
    pub fn new(bus_key: impl Into<String>, train_key: impl Into<String>) -> Self {
        Self {
            bus_key: bus_key.into(),
            train_key: train_key.into(),
            bus_base_url: DEFAULT_BUS_BASE_URL.to_string(),
            train_base_url: DEFAULT_TRAIN_BASE_URL.to_string(),
            alerts_base_url: DEFAULT_ALERTS_BASE_URL.to_string(),
            timeout_secs: 30,
            cache: CacheConfig::default(),
            resolver: ResolverConfig::default(),
            debug: false,
        }
    }

    /// Read keys and overrides from `CTA_*` environment variables.
    ///
    /// Missing keys are tolerated (calls will then be rejected upstream).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`from_env`](Self::from_env) but with an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bus_key = lookup("CTA_BUS_TRACKER_KEY").unwrap_or_else(|| {
            tracing::warn!("CTA_BUS_TRACKER_KEY not set; bus tracker calls will fail");
            String::new()
        });
        let train_key = lookup("CTA_TRAIN_TRACKER_KEY").unwrap_or_else(|| {
            tracing::warn!("CTA_TRAIN_TRACKER_KEY not set; train tracker calls will fail");
            String::new()
        });

        let mut config = Self::new(bus_key, train_key);

        if let Some(url) = lookup("CTA_BUS_BASE_URL") {
            config = config.with_bus_base_url(url);
        }
        if let Some(url) = lookup("CTA_TRAIN_BASE_URL") {
            config = config.with_train_base_url(url);
        }
        if let Some(url) = lookup("CTA_ALERTS_BASE_URL") {
            config = config.with_alerts_base_url(url);
        }
        if let Some(secs) = parse_var(&lookup, "CTA_TIMEOUT_SECS")? {
            config = config.with_timeout(secs);
        }
        if let Some(secs) = parse_var(&lookup, "CTA_CACHE_TTL_SECS")? {
            config.cache.ttl = StdDuration::from_secs(secs);
        }
        if let Some(mins) = parse_var::<i64>(&lookup, "CTA_DELAY_SHIFT_MINS")? {
            let max = ResolverConfig::MAX_DELAY_SHIFT_MINS;
            if !(-max..=max).contains(&mins) {
                return Err(ConfigError {
                    name: "CTA_DELAY_SHIFT_MINS",
                    value: mins.to_string(),
                });
            }
            config.resolver.delay_shift_mins = mins;
        }
        if let Some(raw) = lookup("CTA_DEBUG") {
            config.debug = match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" | "" => false,
                _ => {
                    return Err(ConfigError {
                        name: "CTA_DEBUG",
                        value: raw,
                    });
                }
            };
        }

        Ok(config)
    }

    pub fn with_bus_base_url(mut self, url: impl Into<String>) -> Self {
        self.bus_base_url = url.into();
        self
    }

    pub fn with_train_base_url(mut self, url: impl Into<String>) -> Self {
        self.train_base_url = url.into();
        self
    }

    pub fn with_alerts_base_url(mut self, url: impl Into<String>) -> Self {
        self.alerts_base_url = url.into();
        self
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_resolver(mut self, resolver: ResolverConfig) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn timeout(&self) -> StdDuration {
        StdDuration::from_secs(self.timeout_secs)
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<T>, ConfigError> {
    lookup(name)
        .map(|raw| {
            raw.trim()
                .parse()
                .map_err(|_| ConfigError { name, value: raw })
        })
        .transpose()
}
