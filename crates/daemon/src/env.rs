// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

use std::path::PathBuf;

/// Resolve the config file path: `FLEET_CONFIG` > `./fleet.toml`.
pub fn config_path() -> PathBuf {
    std::env::var("FLEET_CONFIG").map(PathBuf::from).unwrap_or_else(|_| PathBuf::from("fleet.toml"))
}

/// Resolve state directory used when a relative `instances_dir` is
/// configured: `FLEET_STATE_DIR` > `XDG_STATE_HOME/fleet` > `~/.local/state/fleet`.
pub fn state_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("FLEET_STATE_DIR") {
        return PathBuf::from(dir);
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return PathBuf::from(xdg).join("fleet");
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".local/state/fleet")
}

/// Bind address for the management/inference HTTP surface.
pub fn listen_addr() -> String {
    std::env::var("FLEET_LISTEN_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string())
}

/// `tracing-subscriber` env-filter directive, defaulting to `info`.
pub fn log_filter() -> String {
    std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string())
}
