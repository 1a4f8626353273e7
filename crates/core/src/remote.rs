// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The remote client interface (C5).
//!
//! The manager depends only on this trait so it can be unit-tested against
//! an in-process fake; [`fleet-remote`](../../remote) supplies the
//! `reqwest`-backed implementation that actually talks to peer control
//! planes over HTTP.

use crate::error::Result;
use crate::instance::InstanceRecord;
use crate::node::NodeConfig;
use crate::options::Options;
use async_trait::async_trait;

/// Forwards instance lifecycle operations to a named peer node and tracks
/// which peer currently hosts which remote instance.
#[async_trait]
pub trait RemoteClient: Send + Sync {
    /// Record that `instance_name` is hosted on `node_name`. Fails if
    /// `node_name` is not in the configured peer table.
    fn set_instance_node(&self, instance_name: &str, node_name: &str) -> Result<()>;

    /// The peer currently hosting `instance_name`, if any is recorded.
    fn get_node_for_instance(&self, instance_name: &str) -> Option<NodeConfig>;

    /// Forget the routing entry for `instance_name`.
    fn remove_instance(&self, instance_name: &str);

    async fn list(&self, node_name: &str) -> Result<Vec<InstanceRecord>>;

    /// Creates `instance_name` directly on `node_name` — used before a
    /// routing entry exists, since `set_instance_node` is only called once
    /// creation on the peer has succeeded.
    async fn create(
        &self,
        node_name: &str,
        instance_name: &str,
        options: &Options,
    ) -> Result<InstanceRecord>;

    async fn get(&self, instance_name: &str) -> Result<InstanceRecord>;
    async fn update(&self, instance_name: &str, options: &Options) -> Result<InstanceRecord>;
    async fn delete(&self, instance_name: &str) -> Result<()>;
    async fn start(&self, instance_name: &str) -> Result<InstanceRecord>;
    async fn stop(&self, instance_name: &str) -> Result<InstanceRecord>;
    async fn restart(&self, instance_name: &str) -> Result<InstanceRecord>;
    async fn get_logs(&self, instance_name: &str, lines: usize) -> Result<String>;
}

#[cfg(any(test, feature = "test-support"))]
pub mod fake {
    use super::*;
    use crate::error::ManagerError;
    use crate::status::Status;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    /// In-process fake used by manager unit tests: records calls and
    /// returns a canned [`InstanceRecord`] reflecting `options` instead of
    /// making any network call.
    #[derive(Default)]
    pub struct FakeRemoteClient {
        nodes: Mutex<HashMap<String, NodeConfig>>,
        routes: Mutex<HashMap<String, String>>,
        pub calls: Mutex<Vec<String>>,
    }

    impl FakeRemoteClient {
        pub fn new(nodes: HashMap<String, NodeConfig>) -> Self {
            Self { nodes: Mutex::new(nodes), routes: Mutex::new(HashMap::new()), calls: Mutex::new(vec![]) }
        }

        fn log(&self, call: impl Into<String>) {
            self.calls.lock().push(call.into());
        }
    }

    #[async_trait]
    impl RemoteClient for FakeRemoteClient {
        fn set_instance_node(&self, instance_name: &str, node_name: &str) -> Result<()> {
            if !self.nodes.lock().contains_key(node_name) {
                return Err(ManagerError::UnknownNode(node_name.to_string()));
            }
            self.routes.lock().insert(instance_name.to_string(), node_name.to_string());
            Ok(())
        }

        fn get_node_for_instance(&self, instance_name: &str) -> Option<NodeConfig> {
            let node_name = self.routes.lock().get(instance_name).cloned()?;
            self.nodes.lock().get(&node_name).cloned()
        }

        fn remove_instance(&self, instance_name: &str) {
            self.routes.lock().remove(instance_name);
        }

        async fn list(&self, _node_name: &str) -> Result<Vec<InstanceRecord>> {
            self.log("list");
            Ok(vec![])
        }

        async fn create(
            &self,
            node_name: &str,
            instance_name: &str,
            options: &Options,
        ) -> Result<InstanceRecord> {
            self.log(format!("create:{instance_name}"));
            if !self.nodes.lock().contains_key(node_name) {
                return Err(ManagerError::UnknownNode(node_name.to_string()));
            }
            Ok(InstanceRecord {
                name: instance_name.into(),
                created: 0,
                status: Status::Stopped,
                options: options.clone(),
            })
        }

        async fn get(&self, instance_name: &str) -> Result<InstanceRecord> {
            self.log(format!("get:{instance_name}"));
            Err(ManagerError::NotFound(instance_name.to_string()))
        }

        async fn update(&self, instance_name: &str, options: &Options) -> Result<InstanceRecord> {
            self.log(format!("update:{instance_name}"));
            Ok(InstanceRecord {
                name: instance_name.into(),
                created: 0,
                status: Status::Stopped,
                options: options.clone(),
            })
        }

        async fn delete(&self, instance_name: &str) -> Result<()> {
            self.log(format!("delete:{instance_name}"));
            Ok(())
        }

        async fn start(&self, instance_name: &str) -> Result<InstanceRecord> {
            self.log(format!("start:{instance_name}"));
            Ok(InstanceRecord {
                name: instance_name.into(),
                created: 0,
                status: Status::Running,
                options: Options::test_local(0, 0),
            })
        }

        async fn stop(&self, instance_name: &str) -> Result<InstanceRecord> {
            self.log(format!("stop:{instance_name}"));
            Ok(InstanceRecord {
                name: instance_name.into(),
                created: 0,
                status: Status::Stopped,
                options: Options::test_local(0, 0),
            })
        }

        async fn restart(&self, instance_name: &str) -> Result<InstanceRecord> {
            self.log(format!("restart:{instance_name}"));
            Ok(InstanceRecord {
                name: instance_name.into(),
                created: 0,
                status: Status::Running,
                options: Options::test_local(0, 0),
            })
        }

        async fn get_logs(&self, instance_name: &str, _lines: usize) -> Result<String> {
            self.log(format!("logs:{instance_name}"));
            Ok(String::new())
        }
    }
}
