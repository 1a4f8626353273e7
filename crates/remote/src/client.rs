// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use async_trait::async_trait;
use fleet_core::{InstanceRecord, ManagerError, NodeConfig, Options, RemoteClient, Result};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

/// HTTP method used for one forwarded call.
#[derive(Debug, Clone, Copy)]
enum Method {
    Get,
    Post,
    Put,
    Delete,
}

/// `reqwest`-backed [`RemoteClient`]: forwards every lifecycle call to
/// `<node.address>/api/v1/instances/<name>[/action]` and tracks which peer
/// currently hosts which instance name.
pub struct HttpRemoteClient {
    http: reqwest::Client,
    nodes: HashMap<String, NodeConfig>,
    routes: Mutex<HashMap<String, String>>,
}

impl HttpRemoteClient {
    /// Builds a client over the configured peer table,
    /// with the default 30s per-request timeout.
    pub fn new(nodes: HashMap<String, NodeConfig>) -> Self {
        Self::with_timeout(nodes, Duration::from_secs(30))
    }

    pub fn with_timeout(nodes: HashMap<String, NodeConfig>, timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        HttpRemoteClient { http, nodes, routes: Mutex::new(HashMap::new()) }
    }

    fn node_config(&self, node_name: &str) -> Result<NodeConfig> {
        self.nodes.get(node_name).cloned().ok_or_else(|| ManagerError::UnknownNode(node_name.to_string()))
    }

    fn node_for_route(&self, instance_name: &str) -> Result<NodeConfig> {
        let node_name = self
            .routes
            .lock()
            .get(instance_name)
            .cloned()
            .ok_or_else(|| ManagerError::NotFound(instance_name.to_string()))?;
        self.node_config(&node_name)
    }

    fn url(node: &NodeConfig, instance_name: &str, action: Option<&str>) -> String {
        let base = node.address.trim_end_matches('/');
        match action {
            Some(action) => format!("{base}/api/v1/instances/{instance_name}/{action}"),
            None => format!("{base}/api/v1/instances/{instance_name}/"),
        }
    }

    /// Sends one forwarded request and unmarshals a JSON response body.
    /// A 2xx response with an empty body
    /// is treated as success with a caller-supplied fallback.
    async fn send(
        &self,
        node: &NodeConfig,
        method: Method,
        url: String,
        body: Option<Value>,
    ) -> Result<Vec<u8>> {
        let mut request = match method {
            Method::Get => self.http.get(&url),
            Method::Post => self.http.post(&url),
            Method::Put => self.http.put(&url),
            Method::Delete => self.http.delete(&url),
        };
        if let Some(api_key) = &node.api_key {
            request = request.bearer_auth(api_key);
        }
        if let Some(body) = &body {
            request = request.header("Content-Type", "application/json").json(body);
        }

        let response = request.send().await.map_err(|e| ManagerError::RemoteTransport(e.to_string()))?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(|e| ManagerError::RemoteTransport(e.to_string()))?;
        if !status.is_success() {
            let body = String::from_utf8_lossy(&bytes).into_owned();
            return Err(ManagerError::Remote { status: status.as_u16(), body });
        }
        Ok(bytes.to_vec())
    }

    async fn send_record(
        &self,
        node: &NodeConfig,
        method: Method,
        url: String,
        body: Option<Value>,
    ) -> Result<InstanceRecord> {
        let bytes = self.send(node, method, url, body).await?;
        if bytes.is_empty() {
            return Err(ManagerError::RemoteTransport(
                "peer returned an empty body for a request expecting an instance record".into(),
            ));
        }
        serde_json::from_slice(&bytes).map_err(|e| ManagerError::RemoteTransport(e.to_string()))
    }

    /// Strips `options.nodes` before forwarding a Create/Update body so a
    /// peer can never recursively re-delegate the instance.
    fn body_without_nodes(options: &Options) -> Result<Value> {
        let mut value = serde_json::to_value(options)
            .map_err(|e| ManagerError::RemoteTransport(e.to_string()))?;
        if let Value::Object(map) = &mut value {
            map.remove("nodes");
        }
        Ok(value)
    }
}

#[async_trait]
impl RemoteClient for HttpRemoteClient {
    fn set_instance_node(&self, instance_name: &str, node_name: &str) -> Result<()> {
        if !self.nodes.contains_key(node_name) {
            return Err(ManagerError::UnknownNode(node_name.to_string()));
        }
        self.routes.lock().insert(instance_name.to_string(), node_name.to_string());
        Ok(())
    }

    fn get_node_for_instance(&self, instance_name: &str) -> Option<NodeConfig> {
        let node_name = self.routes.lock().get(instance_name).cloned()?;
        self.nodes.get(&node_name).cloned()
    }

    fn remove_instance(&self, instance_name: &str) {
        self.routes.lock().remove(instance_name);
    }

    async fn list(&self, node_name: &str) -> Result<Vec<InstanceRecord>> {
        let node = self.node_config(node_name)?;
        let url = format!("{}/api/v1/instances/", node.address.trim_end_matches('/'));
        let bytes = self.send(&node, Method::Get, url, None).await?;
        if bytes.is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_slice(&bytes).map_err(|e| ManagerError::RemoteTransport(e.to_string()))
    }

    async fn create(
        &self,
        node_name: &str,
        instance_name: &str,
        options: &Options,
    ) -> Result<InstanceRecord> {
        let node = self.node_config(node_name)?;
        let url = Self::url(&node, instance_name, None);
        let body = Self::body_without_nodes(options)?;
        self.send_record(&node, Method::Post, url, Some(body)).await
    }

    async fn get(&self, instance_name: &str) -> Result<InstanceRecord> {
        let node = self.node_for_route(instance_name)?;
        let url = Self::url(&node, instance_name, None);
        self.send_record(&node, Method::Get, url, None).await
    }

    async fn update(&self, instance_name: &str, options: &Options) -> Result<InstanceRecord> {
        let node = self.node_for_route(instance_name)?;
        let url = Self::url(&node, instance_name, None);
        let body = Self::body_without_nodes(options)?;
        self.send_record(&node, Method::Put, url, Some(body)).await
    }

    async fn delete(&self, instance_name: &str) -> Result<()> {
        let node = self.node_for_route(instance_name)?;
        let url = Self::url(&node, instance_name, None);
        self.send(&node, Method::Delete, url, None).await?;
        Ok(())
    }

    async fn start(&self, instance_name: &str) -> Result<InstanceRecord> {
        let node = self.node_for_route(instance_name)?;
        let url = Self::url(&node, instance_name, Some("start"));
        self.send_record(&node, Method::Post, url, None).await
    }

    async fn stop(&self, instance_name: &str) -> Result<InstanceRecord> {
        let node = self.node_for_route(instance_name)?;
        let url = Self::url(&node, instance_name, Some("stop"));
        self.send_record(&node, Method::Post, url, None).await
    }

    async fn restart(&self, instance_name: &str) -> Result<InstanceRecord> {
        let node = self.node_for_route(instance_name)?;
        let url = Self::url(&node, instance_name, Some("restart"));
        self.send_record(&node, Method::Post, url, None).await
    }

    async fn get_logs(&self, instance_name: &str, lines: usize) -> Result<String> {
        let node = self.node_for_route(instance_name)?;
        let base = Self::url(&node, instance_name, Some("logs"));
        let url = format!("{base}?lines={lines}");
        let bytes = self.send(&node, Method::Get, url, None).await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
