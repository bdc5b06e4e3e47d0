// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access.
//!
//! The variable name constants are generated by `build.rs` and live in the
//! [`vars`] submodule.

use std::path::PathBuf;

/// Generated environment variable name constants.
pub mod vars {
    include!(concat!(env!("OUT_DIR"), "/env_vars.rs"));
}

/// Returns the value of `HUBQUEUE_STATE_DIR` if set.
pub fn state_dir_override() -> Option<PathBuf> {
    std::env::var(vars::HUBQUEUE_STATE_DIR).ok().map(PathBuf::from)
}

/// Returns the value of `HUBQUEUE_CONFIG` if set.
pub fn config_override() -> Option<PathBuf> {
    std::env::var(vars::HUBQUEUE_CONFIG).ok().map(PathBuf::from)
}

/// Returns the value of `XDG_STATE_HOME` if set.
pub fn xdg_state_home() -> Option<PathBuf> {
    std::env::var(vars::XDG_STATE_HOME).ok().map(PathBuf::from)
}

/// Directory for the lock file, log file and the SQLite queue.
pub fn state_dir() -> PathBuf {
    resolve_state_dir(state_dir_override(), xdg_state_home(), dirs::home_dir())
}

/// Resolution order: explicit override, `$XDG_STATE_HOME/hubqueue`,
/// `~/.local/state/hubqueue`, then a relative fallback.
pub fn resolve_state_dir(
    explicit: Option<PathBuf>,
    xdg_state: Option<PathBuf>,
    home: Option<PathBuf>,
) -> PathBuf {
    if let Some(dir) = explicit {
        return dir;
    }
    if let Some(dir) = xdg_state {
        return dir.join("hubqueue");
    }
    home.map(|h| h.join(".local/state/hubqueue"))
        .unwrap_or_else(|| PathBuf::from(".local/state/hubqueue"))
}

/// Default config file location, unless `HUBQUEUE_CONFIG` points elsewhere.
pub fn config_path() -> PathBuf {
    resolve_config_path(config_override(), dirs::config_dir())
}

/// Resolution order: explicit override, `<config dir>/hubqueue/config.toml`,
/// then `config.toml` in the working directory.
pub fn resolve_config_path(explicit: Option<PathBuf>, config_dir: Option<PathBuf>) -> PathBuf {
    if let Some(path) = explicit {
        return path;
    }
    config_dir
        .map(|d| d.join("hubqueue").join("config.toml"))
        .unwrap_or_else(|| PathBuf::from("config.toml"))
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
