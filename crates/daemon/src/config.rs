// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Configuration surface consumed by the core: `local_node`,
//! `nodes`, and `instances.*`, loaded from TOML.

use fleet_core::{Defaults, Limits, ManagerConfig, NodeConfig, NodeName};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}: {source}")]
    Read { path: PathBuf, #[source] source: std::io::Error },
    #[error("failed to parse config file {path:?}: {source}")]
    Parse { path: PathBuf, #[source] source: toml::de::Error },
    #[error("instances.port_range min ({min}) must be <= max ({max}), and both must be > 0")]
    InvalidPortRange { min: u16, max: u16 },
}

#[derive(Debug, Deserialize)]
struct RawNode {
    address: String,
    #[serde(default)]
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawInstances {
    port_range: (u16, u16),
    #[serde(default)]
    instances_dir: String,
    #[serde(default = "default_max")]
    max_instances: i64,
    #[serde(default = "default_max")]
    max_running_instances: i64,
    #[serde(default)]
    timeout_check_interval_minutes: i64,
    #[serde(default)]
    enable_lru_eviction: bool,
    #[serde(default)]
    default_auto_restart: bool,
    #[serde(default)]
    default_max_restarts: u32,
    #[serde(default)]
    default_restart_delay_seconds: u32,
    #[serde(default)]
    default_on_demand_start: bool,
    #[serde(default)]
    default_idle_timeout_minutes: u32,
}

fn default_max() -> i64 {
    -1
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    local_node: String,
    #[serde(default)]
    nodes: HashMap<String, RawNode>,
    instances: RawInstances,
}

/// Parsed daemon configuration: the manager's construction inputs
/// (`ManagerConfig`) plus the surrounding surfaces only the daemon needs
/// (the peer table, the persistence directory).
pub struct Config {
    pub local_node: NodeName,
    pub nodes: HashMap<String, NodeConfig>,
    pub manager: ManagerConfig,
    /// Empty disables persistence.
    pub instances_dir: Option<PathBuf>,
}

/// `-1` means unlimited; any other non-negative value is an exact cap.
fn limit_from(raw: i64) -> Option<usize> {
    if raw < 0 {
        None
    } else {
        Some(raw as usize)
    }
}

impl Config {
    pub fn load(path: &std::path::Path) -> Result<Config, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        Self::parse(&text, path)
    }

    fn parse(text: &str, path: &std::path::Path) -> Result<Config, ConfigError> {
        let raw: RawConfig = toml::from_str(text)
            .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })?;

        let (min, max) = raw.instances.port_range;
        if min == 0 || max == 0 || min > max {
            return Err(ConfigError::InvalidPortRange { min, max });
        }

        let nodes: HashMap<String, NodeConfig> = raw
            .nodes
            .into_iter()
            .map(|(name, node)| (name, NodeConfig { address: node.address, api_key: node.api_key }))
            .collect();

        let instances_dir =
            if raw.instances.instances_dir.trim().is_empty() { None } else { Some(PathBuf::from(raw.instances.instances_dir)) };

        // "≤0 ⇒ default 5" minutes.
        let sweep_minutes = if raw.instances.timeout_check_interval_minutes <= 0 {
            5
        } else {
            raw.instances.timeout_check_interval_minutes as u64
        };

        let manager = ManagerConfig {
            local_node: NodeName::from(raw.local_node.as_str()),
            port_range: (min, max),
            defaults: Defaults {
                auto_restart: raw.instances.default_auto_restart,
                max_restarts: raw.instances.default_max_restarts,
                restart_delay_seconds: raw.instances.default_restart_delay_seconds,
                on_demand_start: raw.instances.default_on_demand_start,
                idle_timeout_minutes: raw.instances.default_idle_timeout_minutes,
            },
            limits: Limits {
                max_instances: limit_from(raw.instances.max_instances),
                max_running_instances: limit_from(raw.instances.max_running_instances),
            },
            sweep_interval: Duration::from_secs(sweep_minutes * 60),
            enable_lru_eviction: raw.instances.enable_lru_eviction,
            health_wait_timeout: Duration::from_secs(30),
        };

        Ok(Config {
            local_node: NodeName::from(raw.local_node.as_str()),
            nodes,
            manager,
            instances_dir,
        })
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
