//! Client configuration.
//!
//! # Responsibility
//! - Hold connection, trigger and logging settings for one client.
//! - Layer defaults, an optional JSON file and environment overrides.
//!
//! # Invariants
//! - Later layers only override fields they set.
//! - `api_base_url` never ends with `/`.

use crate::logging::default_log_level;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:3000";
pub const DEFAULT_TRIGGER_DELAY: Duration = Duration::from_millis(500);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub const ENV_API_URL: &str = "HABITASK_API_URL";
pub const ENV_TRIGGER_DELAY_MS: &str = "HABITASK_TRIGGER_DELAY_MS";
pub const ENV_HTTP_TIMEOUT_MS: &str = "HABITASK_HTTP_TIMEOUT_MS";
pub const ENV_LOG_LEVEL: &str = "HABITASK_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "HABITASK_LOG_DIR";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Read { path: PathBuf, message: String },
    Parse { origin: String, message: String },
    InvalidValue { key: &'static str, value: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read { path, message } => {
                write!(f, "failed to read {}: {message}", path.display())
            }
            Self::Parse { origin, message } => write!(f, "failed to parse {origin}: {message}"),
            Self::InvalidValue { key, value } => write!(f, "invalid value `{value}` for {key}"),
        }
    }
}

impl Error for ConfigError {}

/// File logger settings. Logging stays off while `dir` is `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub level: String,
    pub dir: Option<PathBuf>,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: default_log_level().to_string(),
            dir: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub api_base_url: String,
    /// Settle time between a store mutation and the statistics recompute.
    pub trigger_delay: Duration,
    pub request_timeout: Duration,
    pub log: LogSettings,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            trigger_delay: DEFAULT_TRIGGER_DELAY,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            log: LogSettings::default(),
        }
    }
}

/// One partial configuration source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigLayer {
    api_base_url: Option<String>,
    trigger_delay_ms: Option<u64>,
    request_timeout_ms: Option<u64>,
    log_level: Option<String>,
    log_dir: Option<PathBuf>,
}

impl ClientConfig {
    /// Defaults, then `path` (if any), then the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(path) = path {
            let text = std::fs::read_to_string(path).map_err(|err| ConfigError::Read {
                path: path.to_path_buf(),
                message: err.to_string(),
            })?;
            config.apply(parse_layer(&text, &path.display().to_string())?);
        }
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Defaults overlaid with a JSON document.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply(parse_layer(text, "inline config")?);
        Ok(config)
    }

    /// Applies overrides from an environment-style lookup.
    pub fn apply_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        let layer = ConfigLayer {
            api_base_url: lookup(ENV_API_URL),
            trigger_delay_ms: parse_millis(ENV_TRIGGER_DELAY_MS, lookup(ENV_TRIGGER_DELAY_MS))?,
            request_timeout_ms: parse_millis(ENV_HTTP_TIMEOUT_MS, lookup(ENV_HTTP_TIMEOUT_MS))?,
            log_level: lookup(ENV_LOG_LEVEL),
            log_dir: lookup(ENV_LOG_DIR).map(PathBuf::from),
        };
        self.apply(layer);
        Ok(())
    }

    fn apply(&mut self, layer: ConfigLayer) {
        if let Some(url) = layer.api_base_url {
            self.api_base_url = url.trim().trim_end_matches('/').to_string();
        }
        if let Some(ms) = layer.trigger_delay_ms {
            self.trigger_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = layer.request_timeout_ms {
            self.request_timeout = Duration::from_millis(ms);
        }
        if let Some(level) = layer.log_level {
            self.log.level = level;
        }
        if let Some(dir) = layer.log_dir {
            self.log.dir = Some(dir);
        }
    }
}

fn parse_layer(text: &str, origin: &str) -> Result<ConfigLayer, ConfigError> {
    serde_json::from_str(text).map_err(|err| ConfigError::Parse {
        origin: origin.to_string(),
        message: err.to_string(),
    })
}

fn parse_millis(key: &'static str, raw: Option<String>) -> Result<Option<u64>, ConfigError> {
    raw.map(|value| {
        value
            .trim()
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidValue { key, value })
    })
    .transpose()
}
