//! Configuration layer: typed settings with layered precedence (file → env).

use std::str::FromStr;
use std::time::Duration;

use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::cache::CacheConfig;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "waypost";
const DEFAULT_ROUTING_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MODEL_TIMEOUT_SECS: u64 = 60;
const DEFAULT_PHOTO_TIMEOUT_SECS: u64 = 45;

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub cache: CacheConfig,
    pub providers: ProviderSettings,
    pub logging: LoggingSettings,
}

/// Upstream provider timeouts.
///
/// Each policy wraps its provider call in one of these; the cache layer's
/// single-flight waiter timeout is derived from them via
/// [`CacheConfig::waiter_timeout`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    pub routing_timeout_secs: u64,
    pub model_timeout_secs: u64,
    pub photo_timeout_secs: u64,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            routing_timeout_secs: DEFAULT_ROUTING_TIMEOUT_SECS,
            model_timeout_secs: DEFAULT_MODEL_TIMEOUT_SECS,
            photo_timeout_secs: DEFAULT_PHOTO_TIMEOUT_SECS,
        }
    }
}

impl ProviderSettings {
    pub fn routing_timeout(&self) -> Duration {
        Duration::from_secs(self.routing_timeout_secs)
    }

    pub fn model_timeout(&self) -> Duration {
        Duration::from_secs(self.model_timeout_secs)
    }

    pub fn photo_timeout(&self) -> Duration {
        Duration::from_secs(self.photo_timeout_secs)
    }
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: LevelFilter::INFO,
            format: LogFormat::Compact,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment).
///
/// Environment variables use the `WAYPOST` prefix and `__` as the section
/// separator, e.g. `WAYPOST__CACHE__ROUTE_TTL_SECS=3600`.
pub fn load() -> Result<Settings, LoadError> {
    let raw: RawSettings = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false))
        .add_source(Environment::with_prefix("WAYPOST").separator("__"))
        .build()?
        .try_deserialize()?;

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    cache: CacheConfig,
    providers: ProviderSettings,
    logging: RawLoggingSettings,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            cache,
            providers,
            logging,
        } = raw;

        if cache.owner_timeout_secs == 0 {
            return Err(LoadError::invalid(
                "cache.owner_timeout_secs",
                "must be greater than zero",
            ));
        }
        if cache.hotspots_per_day == 0 {
            return Err(LoadError::invalid(
                "cache.hotspots_per_day",
                "must be greater than zero",
            ));
        }
        validate_timeout(providers.routing_timeout_secs, "providers.routing_timeout_secs")?;
        validate_timeout(providers.model_timeout_secs, "providers.model_timeout_secs")?;
        validate_timeout(providers.photo_timeout_secs, "providers.photo_timeout_secs")?;

        let logging = build_logging_settings(logging)?;

        Ok(Self {
            cache,
            providers,
            logging,
        })
    }
}

fn validate_timeout(value: u64, key: &'static str) -> Result<(), LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    Ok(())
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}
