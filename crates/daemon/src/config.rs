// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Service configuration.
//!
//! Configuration is read from `config.toml` (see [`crate::env::config_path`]).
//! Every field has a default, so a missing file or a partial file is fine:
//!
//! ```toml
//! [store]
//! backend = "redis"            # redis | sqlite | memory
//! url = "redis://127.0.0.1/"
//! namespace = "hubqueue"
//! path = "queue.db"            # sqlite, relative to the state dir
//!
//! [probe]
//! url = "https://www.google.com/"
//! interval_secs = 5
//! timeout_secs = 10
//!
//! [replay]
//! timeout_secs = 30
//!
//! [github]
//! api_base = "https://api.github.com"
//! user_agent = "hubqueue"
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::store::{KvStore, MemoryStore, RedisStore, SqliteStore};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub probe: ProbeConfig,
    #[serde(default)]
    pub replay: ReplayConfig,
    #[serde(default)]
    pub github: GithubConfig,
}

/// Which [`KvStore`] backs the queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Redis,
    Sqlite,
    /// Volatile. Records do not survive a restart.
    Memory,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    /// Redis connection URL.
    #[serde(default = "default_redis_url")]
    pub url: String,
    /// Redis key prefix.
    #[serde(default = "default_namespace")]
    pub namespace: String,
    /// SQLite database file (relative paths resolve against the state dir).
    #[serde(default = "default_sqlite_path")]
    pub path: PathBuf,
}

fn default_redis_url() -> String {
    "redis://127.0.0.1/".to_string()
}

fn default_namespace() -> String {
    "hubqueue".to_string()
}

fn default_sqlite_path() -> PathBuf {
    PathBuf::from("queue.db")
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            backend: StoreBackend::default(),
            url: default_redis_url(),
            namespace: default_namespace(),
            path: default_sqlite_path(),
        }
    }
}

impl StoreConfig {
    /// Builds the configured, not yet connected, store.
    pub fn build(&self, state_dir: &Path) -> Box<dyn KvStore> {
        match self.backend {
            StoreBackend::Redis => Box::new(RedisStore::new(&self.url, &self.namespace)),
            StoreBackend::Sqlite => Box::new(SqliteStore::new(&state_dir.join(&self.path))),
            StoreBackend::Memory => Box::new(MemoryStore::new()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// Reference URL used to detect connectivity.
    #[serde(default = "default_probe_url")]
    pub url: String,
    /// Pause before each probe.
    #[serde(default = "default_probe_interval_secs")]
    pub interval_secs: u64,
    /// Upper bound for one probe.
    #[serde(default = "default_probe_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_probe_url() -> String {
    "https://www.google.com/".to_string()
}

fn default_probe_interval_secs() -> u64 {
    5
}

fn default_probe_timeout_secs() -> u64 {
    10
}

impl Default for ProbeConfig {
    fn default() -> Self {
        ProbeConfig {
            url: default_probe_url(),
            interval_secs: default_probe_interval_secs(),
            timeout_secs: default_probe_timeout_secs(),
        }
    }
}

impl ProbeConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayConfig {
    /// Upper bound for one replayed request (and any direct API call).
    #[serde(default = "default_replay_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_replay_timeout_secs() -> u64 {
    30
}

impl Default for ReplayConfig {
    fn default() -> Self {
        ReplayConfig {
            timeout_secs: default_replay_timeout_secs(),
        }
    }
}

impl ReplayConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GithubConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_api_base() -> String {
    "https://api.github.com".to_string()
}

fn default_user_agent() -> String {
    "hubqueue".to_string()
}

impl Default for GithubConfig {
    fn default() -> Self {
        GithubConfig {
            api_base: default_api_base(),
            user_agent: default_user_agent(),
        }
    }
}

fn is_http_url(url: &str) -> bool {
    ["http://", "https://"]
        .iter()
        .any(|scheme| url.len() > scheme.len() && url.starts_with(scheme))
}

impl Config {
    /// Loads the configuration at `path`. A missing file yields defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values the service cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.probe.interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "probe.interval_secs must be greater than zero".to_string(),
            ));
        }
        if self.probe.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "probe.timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.replay.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "replay.timeout_secs must be greater than zero".to_string(),
            ));
        }
        if !is_http_url(&self.probe.url) {
            return Err(ConfigError::Invalid(format!(
                "probe.url must be an http(s) URL, got '{}'",
                self.probe.url
            )));
        }
        if !is_http_url(&self.github.api_base) {
            return Err(ConfigError::Invalid(format!(
                "github.api_base must be an http(s) URL, got '{}'",
                self.github.api_base
            )));
        }
        if self.store.backend == StoreBackend::Redis && self.store.namespace.is_empty() {
            return Err(ConfigError::Invalid(
                "store.namespace must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
