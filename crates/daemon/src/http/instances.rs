// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Handlers for the peer protocol's `/api/v1/instances/` surface.

use super::error::ApiError;
use super::state::AppState;
use axum::extract::{Path, Query, State};
use axum::Json;
use fleet_core::{BackendOptions, BackendType, InstanceRecord, NodeName, OptionsInput};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};

/// Wire shape of a create/update request body: same optionality rules as
/// [`OptionsInput`], but `Deserialize`-able (the core's `OptionsInput` is an
/// internal construction type, not a wire format).
#[derive(Debug, Deserialize)]
pub struct OptionsBody {
    #[serde(default)]
    auto_restart: Option<bool>,
    #[serde(default)]
    max_restarts: Option<u32>,
    #[serde(default)]
    restart_delay_seconds: Option<u32>,
    #[serde(default)]
    on_demand_start: Option<bool>,
    #[serde(default)]
    idle_timeout_minutes: Option<u32>,
    #[serde(default)]
    environment: BTreeMap<String, String>,
    /// Accepted on input but always stripped server-side before this body
    /// reaches the manager.
    #[serde(default)]
    nodes: BTreeSet<NodeName>,
    #[serde(default)]
    backend_type: BackendType,
    backend_options: BackendOptions,
}

impl From<OptionsBody> for OptionsInput {
    fn from(body: OptionsBody) -> Self {
        OptionsInput {
            auto_restart: body.auto_restart,
            max_restarts: body.max_restarts,
            restart_delay_seconds: body.restart_delay_seconds,
            on_demand_start: body.on_demand_start,
            idle_timeout_minutes: body.idle_timeout_minutes,
            environment: body.environment,
            nodes: BTreeSet::new(),
            backend_type: body.backend_type,
            backend_options: body.backend_options,
        }
    }
}

pub async fn list(State(state): State<AppState>) -> Json<Vec<InstanceRecord>> {
    Json(state.manager.list_instances().await)
}

pub async fn get(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<InstanceRecord>, ApiError> {
    Ok(Json(state.manager.get_instance(&name).await?))
}

pub async fn create(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(body): Json<OptionsBody>,
) -> Result<Json<InstanceRecord>, ApiError> {
    Ok(Json(state.manager.create_instance(&name, body.into()).await?))
}

pub async fn update(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(body): Json<OptionsBody>,
) -> Result<Json<InstanceRecord>, ApiError> {
    Ok(Json(state.manager.update_instance(&name, body.into()).await?))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<axum::http::StatusCode, ApiError> {
    state.manager.delete_instance(&name).await?;
    Ok(axum::http::StatusCode::NO_CONTENT)
}

pub async fn start(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<InstanceRecord>, ApiError> {
    Ok(Json(state.manager.start_instance(&name).await?))
}

pub async fn stop(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<InstanceRecord>, ApiError> {
    Ok(Json(state.manager.stop_instance(&name).await?))
}

pub async fn restart(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<InstanceRecord>, ApiError> {
    Ok(Json(state.manager.restart_instance(&name).await?))
}

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    lines: Option<usize>,
}

pub async fn logs(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<LogsQuery>,
) -> Result<String, ApiError> {
    let lines = query.lines.unwrap_or(100);
    Ok(state.manager.get_instance_logs(&name, lines).await?)
}
