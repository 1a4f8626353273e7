// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Maps [`ManagerError`] onto the status codes the peer protocol and the
//! inference dispatcher promise.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use fleet_core::ManagerError;
use serde_json::json;

pub struct ApiError(pub ManagerError);

impl From<ManagerError> for ApiError {
    fn from(e: ManagerError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            ManagerError::InvalidName(_)
            | ManagerError::InvalidOptions(_)
            | ManagerError::UnknownNode(_) => StatusCode::BAD_REQUEST,
            ManagerError::NotFound(_) | ManagerError::LruNotFound => StatusCode::NOT_FOUND,
            ManagerError::DuplicateName(_)
            | ManagerError::PortInUse { .. }
            | ManagerError::PortOutOfRange(_)
            | ManagerError::PortsExhausted
            | ManagerError::PortNotHeld(_)
            | ManagerError::DeleteWhileRunning(_)
            | ManagerError::MaxInstancesReached(_)
            | ManagerError::MaxRunningInstancesReached(_)
            | ManagerError::NotRemote(_) => StatusCode::CONFLICT,
            ManagerError::Remote { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            ManagerError::RemoteTransport(_) => StatusCode::BAD_GATEWAY,
            ManagerError::HealthTimeout(_) => StatusCode::SERVICE_UNAVAILABLE,
            ManagerError::Child(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}
