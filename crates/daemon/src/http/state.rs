// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use fleet_core::Manager;
use std::time::Duration;

/// Shared state every handler sees: the manager facade, the health-wait
/// timeout used by the on-demand-start dispatcher, and the client used to forward inference traffic to a
/// routed instance's backend port.
#[derive(Clone)]
pub struct AppState {
    pub manager: Manager,
    pub health_wait_timeout: Duration,
    pub http_client: reqwest::Client,
}
