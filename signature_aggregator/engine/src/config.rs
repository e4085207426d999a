//! Process configuration: optional JSON file, then `SA_*` environment overrides.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AggregatorError, Result};

/// Default per-peer wait in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 200;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregatorConfig {
    /// Per-peer call timeout in seconds.
    pub default_timeout_secs: u64,
    /// `http` or `https`.
    pub scheme: String,
    pub pool_max_idle_per_host: usize,
    pub pool_idle_timeout_secs: u64,
    pub log_dir: String,
    pub json_logs: bool,
    /// JSON node list for the static directory.
    pub nodes_file: Option<PathBuf>,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            default_timeout_secs: DEFAULT_TIMEOUT_SECS,
            scheme: "http".to_string(),
            pool_max_idle_per_host: 16,
            pool_idle_timeout_secs: 90,
            log_dir: "logs".to_string(),
            json_logs: false,
            nodes_file: None,
        }
    }
}

fn parse_var<T: FromStr>(name: &str, raw: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| AggregatorError::ConfigError(format!("{name}={raw}: {e}")))
}

impl AggregatorConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|e| {
            AggregatorError::ConfigError(format!("Cannot read {}: {e}", path.display()))
        })?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// File (if given) then process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let base = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        base.with_env_overrides(|name| std::env::var(name).ok())
    }

    /// Applies `SA_*` overrides read through `lookup`.
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(raw) = lookup("SA_DEFAULT_TIMEOUT_SECS") {
            self.default_timeout_secs = parse_var("SA_DEFAULT_TIMEOUT_SECS", &raw)?;
        }
        if let Some(raw) = lookup("SA_SCHEME") {
            self.scheme = raw.trim().to_string();
        }
        if let Some(raw) = lookup("SA_POOL_MAX_IDLE") {
            self.pool_max_idle_per_host = parse_var("SA_POOL_MAX_IDLE", &raw)?;
        }
        if let Some(raw) = lookup("SA_LOG_DIR") {
            self.log_dir = raw;
        }
        if let Some(raw) = lookup("SA_JSON_LOGS") {
            self.json_logs = parse_var("SA_JSON_LOGS", &raw)?;
        }
        if let Some(raw) = lookup("SA_NODES_FILE") {
            self.nodes_file = Some(PathBuf::from(raw));
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.default_timeout_secs == 0 {
            return Err(AggregatorError::ConfigError("default_timeout_secs must be at least 1".into()));
        }
        if self.scheme != "http" && self.scheme != "https" {
            return Err(AggregatorError::ConfigError(format!(
                "Unsupported scheme `{}` (expected http or https)",
                self.scheme
            )));
        }
        Ok(())
    }

    pub fn default_timeout(&self) -> Duration {
        Duration::from_secs(self.default_timeout_secs)
    }

    pub fn pool_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.pool_idle_timeout_secs)
    }
}
