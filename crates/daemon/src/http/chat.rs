// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The thin OpenAI-style inference dispatcher: resolve a
//! `model` name to a locally-managed instance through
//! [`fleet_core::Manager::route_request`] (which starts it on demand if
//! idle), then forward the request body to its backend port.
//!
//! Request/response shaping beyond the `model` field, streaming, and
//! per-instance reverse proxying of arbitrary backend-native routes are
//! external collaborators; this exists only to exercise the
//! on-demand-start path end to end.

use super::error::ApiError;
use super::state::AppState;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use fleet_core::ManagerError;
use serde_json::Value;

pub async fn dispatch(State(state): State<AppState>, body: Bytes) -> Result<Response, ApiError> {
    let parsed: Value = serde_json::from_slice(&body).map_err(|e| {
        ApiError(ManagerError::InvalidOptions(format!("request body is not valid JSON: {e}")))
    })?;
    let model = parsed
        .get("model")
        .and_then(Value::as_str)
        .ok_or_else(|| ApiError(ManagerError::InvalidOptions("missing \"model\" field".into())))?;

    let proxy = state.manager.route_request(model, state.health_wait_timeout).await?;

    let response = state
        .http_client
        .post(format!("http://{}/v1/chat/completions", proxy.target_addr()))
        .header("content-type", "application/json")
        .body(body)
        .send()
        .await
        .map_err(|e| ApiError(ManagerError::RemoteTransport(e.to_string())))?;

    let status =
        StatusCode::from_u16(response.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
    let bytes = response
        .bytes()
        .await
        .map_err(|e| ApiError(ManagerError::RemoteTransport(e.to_string())))?;
    Ok((status, bytes).into_response())
}
