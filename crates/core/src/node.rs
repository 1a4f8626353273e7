// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Configured peer nodes.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// A configured peer control-plane node.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NodeConfig {
    /// Base address, e.g. `http://10.0.0.4:8080`.
    pub address: String,
    /// Bearer credential attached to outgoing requests, if configured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

/// Name of a configured node. Cheap to clone and compare, matching the rest
/// of the core's preference for interned short strings over `String` on hot
/// paths (registry keys, running-set membership).
pub type NodeName = SmolStr;
