// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Instance options and the backend-agnostic accessor
//! the core needs: a port.
//!
//! [`OptionsInput`] is what arrives at the manager's create/update entry
//! points: fields the caller may have left unspecified are `None` and are
//! filled in from [`Defaults`] at resolution time, producing the concrete
//! [`Options`] that is stored on the instance and persisted. Defaults are
//! applied only where the per-instance field is absent.

use crate::node::NodeName;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// The backend a core instance fronts. Opaque beyond the port accessor per
/// the argument-construction subsystem for each backend is an external
/// collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendType {
    LlamaCpp,
}

/// Backend-specific launch configuration. A single concrete variant is
/// supplied so the core's port bookkeeping (`get_port`/`set_port`) and
/// persistence round-trip can be implemented and tested without
/// reimplementing each backend's argument construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendOptions {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// 0 means "not yet allocated"; the manager fills this in via the port
    /// allocator before persisting.
    #[serde(default)]
    pub port: u16,
}

impl BackendOptions {
    pub fn get_port(&self) -> u16 {
        self.port
    }

    pub fn set_port(&mut self, port: u16) {
        self.port = port;
    }
}

/// Global per-field fallbacks.
#[derive(Debug, Clone, Copy)]
pub struct Defaults {
    pub auto_restart: bool,
    pub max_restarts: u32,
    pub restart_delay_seconds: u32,
    pub on_demand_start: bool,
    pub idle_timeout_minutes: u32,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            auto_restart: false,
            max_restarts: 0,
            restart_delay_seconds: 0,
            on_demand_start: false,
            idle_timeout_minutes: 0,
        }
    }
}

/// Caller-supplied options for create/update. Fields that may fall back to
/// [`Defaults`] are `Option`; `nodes` and `environment` have no global
/// default and are taken as-is (absent means empty).
#[derive(Debug, Clone, Default)]
pub struct OptionsInput {
    pub auto_restart: Option<bool>,
    pub max_restarts: Option<u32>,
    pub restart_delay_seconds: Option<u32>,
    pub on_demand_start: Option<bool>,
    pub idle_timeout_minutes: Option<u32>,
    pub environment: BTreeMap<String, String>,
    pub nodes: BTreeSet<NodeName>,
    pub backend_type: BackendType,
    pub backend_options: BackendOptions,
}

impl Default for BackendType {
    fn default() -> Self {
        BackendType::LlamaCpp
    }
}

/// Resolved, concrete options: what is stored on the instance and persisted
/// to disk. `nodes` is a `BTreeSet` so `Serialize` naturally produces the
/// sorted array the on-disk format requires while the in-memory
/// type remains an unordered-semantics set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Options {
    pub auto_restart: bool,
    pub max_restarts: u32,
    pub restart_delay_seconds: u32,
    pub on_demand_start: bool,
    pub idle_timeout_minutes: u32,
    #[serde(default)]
    pub environment: BTreeMap<String, String>,
    #[serde(default)]
    pub nodes: BTreeSet<NodeName>,
    pub backend_type: BackendType,
    pub backend_options: BackendOptions,
}

impl Options {
    /// Resolve an [`OptionsInput`] against [`Defaults`], filling in any
    /// field the caller left unspecified.
    pub fn resolve(input: OptionsInput, defaults: &Defaults) -> Self {
        Options {
            auto_restart: input.auto_restart.unwrap_or(defaults.auto_restart),
            max_restarts: input.max_restarts.unwrap_or(defaults.max_restarts),
            restart_delay_seconds: input
                .restart_delay_seconds
                .unwrap_or(defaults.restart_delay_seconds),
            on_demand_start: input.on_demand_start.unwrap_or(defaults.on_demand_start),
            idle_timeout_minutes: input
                .idle_timeout_minutes
                .unwrap_or(defaults.idle_timeout_minutes),
            environment: input.environment,
            nodes: input.nodes,
            backend_type: input.backend_type,
            backend_options: input.backend_options,
        }
    }

    /// True if `idle_timeout_minutes` makes this instance eligible for
    /// sweeper timeout / LRU eviction: nonzero.
    pub fn has_idle_timeout(&self) -> bool {
        self.idle_timeout_minutes > 0
    }

    pub fn get_port(&self) -> u16 {
        self.backend_options.get_port()
    }

    pub fn set_port(&mut self, port: u16) {
        self.backend_options.set_port(port)
    }
}

#[cfg(any(test, feature = "test-support"))]
impl Options {
    /// Convenience builder for tests: a minimal local instance with a given
    /// port and idle timeout.
    pub fn test_local(port: u16, idle_timeout_minutes: u32) -> Self {
        Options {
            auto_restart: false,
            max_restarts: 0,
            restart_delay_seconds: 0,
            on_demand_start: true,
            idle_timeout_minutes,
            environment: BTreeMap::new(),
            nodes: BTreeSet::new(),
            backend_type: BackendType::LlamaCpp,
            backend_options: BackendOptions {
                command: "llama-server".to_string(),
                args: vec![],
                port,
            },
        }
    }
}

#[cfg(test)]
#[path = "options_tests.rs"]
mod tests;
