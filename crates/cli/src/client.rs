// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Blocking HTTP client for fleetd's peer protocol.
//!
//! `fleetctl` is a thin wrapper over the same `/api/v1/instances/` surface
//! [`fleet_core::RemoteClient`] speaks between nodes; this client just
//! speaks it from a terminal instead.

use fleet_core::{BackendOptions, BackendType, InstanceRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8080";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("could not reach fleetd at {url}: {source}")]
    Connect { url: String, #[source] source: reqwest::Error },
    #[error("request to fleetd failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("fleetd returned HTTP {status}: {message}")]
    Server { status: u16, message: String },
}

impl ClientError {
    pub fn is_not_running(&self) -> bool {
        matches!(self, ClientError::Connect { .. })
    }
}

#[derive(Debug, Serialize, Default)]
pub struct CreateOrUpdateBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_restart: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_restarts: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restart_delay_seconds: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_demand_start: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idle_timeout_minutes: Option<u32>,
    #[serde(default)]
    pub environment: BTreeMap<String, String>,
    pub backend_type: BackendType,
    pub backend_options: BackendOptions,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// Talks to one fleetd instance over HTTP. Holds no connection state beyond
/// the base URL: every call is a fresh request.
pub struct DaemonClient {
    base_url: String,
    http: reqwest::blocking::Client,
}

impl DaemonClient {
    pub fn connect() -> Result<Self, ClientError> {
        let base_url = std::env::var("FLEET_ADDR")
            .ok()
            .map(|addr| if addr.starts_with("http") { addr } else { format!("http://{addr}") })
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let http = reqwest::blocking::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(DaemonClient { base_url, http })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    fn check(&self, response: reqwest::blocking::Response) -> Result<reqwest::blocking::Response, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response
            .json::<ErrorBody>()
            .map(|b| b.error)
            .unwrap_or_else(|_| status.canonical_reason().unwrap_or("request failed").to_string());
        Err(ClientError::Server { status: status.as_u16(), message })
    }

    fn wrap_connect(&self, e: reqwest::Error) -> ClientError {
        if e.is_connect() {
            ClientError::Connect { url: self.base_url.clone(), source: e }
        } else {
            ClientError::Request(e)
        }
    }

    pub fn list(&self) -> Result<Vec<InstanceRecord>, ClientError> {
        let response = self.http.get(self.url("/api/v1/instances/")).send().map_err(|e| self.wrap_connect(e))?;
        Ok(self.check(response)?.json()?)
    }

    pub fn get(&self, name: &str) -> Result<InstanceRecord, ClientError> {
        let response =
            self.http.get(self.url(&format!("/api/v1/instances/{name}/"))).send().map_err(|e| self.wrap_connect(e))?;
        Ok(self.check(response)?.json()?)
    }

    pub fn create(&self, name: &str, body: &CreateOrUpdateBody) -> Result<InstanceRecord, ClientError> {
        let response = self
            .http
            .post(self.url(&format!("/api/v1/instances/{name}/")))
            .json(body)
            .send()
            .map_err(|e| self.wrap_connect(e))?;
        Ok(self.check(response)?.json()?)
    }

    pub fn update(&self, name: &str, body: &CreateOrUpdateBody) -> Result<InstanceRecord, ClientError> {
        let response = self
            .http
            .put(self.url(&format!("/api/v1/instances/{name}/")))
            .json(body)
            .send()
            .map_err(|e| self.wrap_connect(e))?;
        Ok(self.check(response)?.json()?)
    }

    pub fn delete(&self, name: &str) -> Result<(), ClientError> {
        let response = self
            .http
            .delete(self.url(&format!("/api/v1/instances/{name}/")))
            .send()
            .map_err(|e| self.wrap_connect(e))?;
        self.check(response)?;
        Ok(())
    }

    pub fn start(&self, name: &str) -> Result<InstanceRecord, ClientError> {
        let response = self
            .http
            .post(self.url(&format!("/api/v1/instances/{name}/start")))
            .send()
            .map_err(|e| self.wrap_connect(e))?;
        Ok(self.check(response)?.json()?)
    }

    pub fn stop(&self, name: &str) -> Result<InstanceRecord, ClientError> {
        let response = self
            .http
            .post(self.url(&format!("/api/v1/instances/{name}/stop")))
            .send()
            .map_err(|e| self.wrap_connect(e))?;
        Ok(self.check(response)?.json()?)
    }

    pub fn restart(&self, name: &str) -> Result<InstanceRecord, ClientError> {
        let response = self
            .http
            .post(self.url(&format!("/api/v1/instances/{name}/restart")))
            .send()
            .map_err(|e| self.wrap_connect(e))?;
        Ok(self.check(response)?.json()?)
    }

    pub fn logs(&self, name: &str, lines: usize) -> Result<String, ClientError> {
        let response = self
            .http
            .get(self.url(&format!("/api/v1/instances/{name}/logs?lines={lines}")))
            .send()
            .map_err(|e| self.wrap_connect(e))?;
        Ok(self.check(response)?.text()?)
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
