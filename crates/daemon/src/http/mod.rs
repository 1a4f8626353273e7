// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The axum-based HTTP surface: the peer protocol that lets other
//! nodes' [`fleet_remote::HttpRemoteClient`] manage instances on this node,
//! plus a thin model-routed inference dispatcher.
//!
//! Request parsing/authn/CORS depth, streaming responses, and the
//! backend-native per-instance reverse proxy are external collaborators per
//! this module wires just enough HTTP to exercise the manager.

mod chat;
mod error;
mod instances;
mod state;

pub use state::AppState;

use axum::routing::{get, post};
use axum::Router;

/// Build the full router: the peer management API under
/// `/api/v1/instances` and the inference dispatcher at `/v1/chat/completions`.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/instances/", get(instances::list))
        .route(
            "/api/v1/instances/:name/",
            get(instances::get).put(instances::update).delete(instances::delete).post(instances::create),
        )
        .route("/api/v1/instances/:name/start", post(instances::start))
        .route("/api/v1/instances/:name/stop", post(instances::stop))
        .route("/api/v1/instances/:name/restart", post(instances::restart))
        .route("/api/v1/instances/:name/logs", get(instances::logs))
        .route("/v1/chat/completions", post(chat::dispatch))
        .route("/healthz", get(healthz))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
