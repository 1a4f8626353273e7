// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The instance handle (C1): one managed backend process or remote stub.
//!
//! The child-process supervisor (auto-restart, health checks, log capture)
//! is an external collaborator — this module only defines
//! the narrow [`ChildSupervisor`] interface the manager consumes and wires
//! status transitions, timestamps, and the reverse-proxy handle around it.

use crate::clock::Clock;
use crate::error::{ManagerError, Result};
use crate::options::Options;
use crate::status::Status;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// A callback fired whenever [`Instance::set_status`] changes the status.
/// The manager installs one per local instance to keep the registry's
/// running-set in sync.
pub type StatusCallback = Arc<dyn Fn(&str, Status) + Send + Sync>;

/// The child-process supervisor interface C1 consumes. Implementations own
/// actually spawning/killing the backend process, capturing its logs, and
/// deciding when health-wait succeeds; none of that is specified here.
pub trait ChildSupervisor: Send + Sync {
    fn start(&self, options: &Options) -> Result<()>;
    fn stop(&self) -> Result<()>;
    fn wait_for_healthy(&self, timeout: Duration) -> Result<()>;
    fn get_logs(&self, num_lines: usize) -> String;
}

/// A reverse-proxy handle bound to a running instance's backend port.
/// Forwarding backend-native HTTP traffic through it is the per-instance
/// reverse proxy is an external collaborator here.
#[derive(Debug, Clone, Copy)]
pub struct Proxy {
    pub port: u16,
}

impl Proxy {
    pub fn target_addr(&self) -> String {
        format!("127.0.0.1:{}", self.port)
    }
}

/// On-disk/wire record for an instance.
/// Unknown fields are ignored on read via `#[serde(default)]` on any field
/// added later; none are defined yet so no defaulting is needed today.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceRecord {
    pub name: SmolStr,
    pub created: u64,
    pub status: Status,
    pub options: Options,
}

struct Inner {
    name: SmolStr,
    created_at: AtomicU64,
    last_request_time: AtomicU64,
    options: parking_lot::RwLock<Options>,
    status: parking_lot::Mutex<Status>,
    on_status_change: parking_lot::Mutex<Option<StatusCallback>>,
    supervisor: Arc<dyn ChildSupervisor>,
}

/// Shared handle to one managed instance. Cheap to clone (an `Arc`); all
/// mutation is internally synchronized so the registry can hand out clones
/// to concurrent callers without an outer lock.
#[derive(Clone)]
pub struct Instance {
    inner: Arc<Inner>,
}

impl Instance {
    pub fn new(
        name: impl Into<SmolStr>,
        created_at: u64,
        status: Status,
        options: Options,
        supervisor: Arc<dyn ChildSupervisor>,
    ) -> Self {
        Instance {
            inner: Arc::new(Inner {
                name: name.into(),
                created_at: AtomicU64::new(created_at),
                last_request_time: AtomicU64::new(created_at),
                options: parking_lot::RwLock::new(options),
                status: parking_lot::Mutex::new(status),
                on_status_change: parking_lot::Mutex::new(None),
                supervisor,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn created_at(&self) -> u64 {
        self.inner.created_at.load(Ordering::Relaxed)
    }

    /// Overwrite `created_at`. Used only when refreshing a remote stub from
    /// its peer's authoritative record.
    pub fn set_created_at(&self, created_at: u64) {
        self.inner.created_at.store(created_at, Ordering::Relaxed);
    }

    pub fn get_options(&self) -> Options {
        self.inner.options.read().clone()
    }

    pub fn set_options(&self, options: Options) {
        *self.inner.options.write() = options;
    }

    pub fn get_status(&self) -> Status {
        *self.inner.status.lock()
    }

    /// Install (or replace) the status-change callback. The manager calls
    /// this once for local instances, both on creation and during
    /// `load_instances` recovery; remote stubs never get one.
    pub fn install_status_callback(&self, callback: StatusCallback) {
        *self.inner.on_status_change.lock() = Some(callback);
    }

    /// Set the status and fire the callback inline on this path.
    pub fn set_status(&self, status: Status) {
        *self.inner.status.lock() = status;
        if let Some(cb) = self.inner.on_status_change.lock().as_ref() {
            cb(self.name(), status);
        }
    }

    pub fn get_port(&self) -> u16 {
        self.inner.options.read().get_port()
    }

    pub fn is_running(&self) -> bool {
        self.get_status().is_running()
    }

    /// True iff `options.nodes` is nonempty and does not contain `local_node`.
    pub fn is_remote(&self, local_node: &str) -> bool {
        let nodes = &self.inner.options.read().nodes;
        !nodes.is_empty() && !nodes.iter().any(|n| n == local_node)
    }

    pub fn last_request_time(&self) -> u64 {
        self.inner.last_request_time.load(Ordering::Relaxed)
    }

    pub fn update_last_request_time(&self, clock: &dyn Clock) {
        self.inner.last_request_time.store(clock.now_secs(), Ordering::Relaxed);
    }

    /// True iff local, Running, `idle_timeout_minutes > 0`, and
    /// `now - last_request_time >= idle_timeout_minutes * 60`.
    pub fn should_timeout(&self, clock: &dyn Clock, local_node: &str) -> bool {
        if self.is_remote(local_node) || !self.is_running() {
            return false;
        }
        let idle_timeout_minutes = self.inner.options.read().idle_timeout_minutes;
        if idle_timeout_minutes == 0 {
            return false;
        }
        let elapsed = clock.now_secs().saturating_sub(self.last_request_time());
        elapsed >= u64::from(idle_timeout_minutes) * 60
    }

    /// Stopped → Starting → Running/Failed. The actual
    /// health/restart decision is the supervisor's; this method only
    /// records the resulting transition.
    pub fn start(&self) -> Result<()> {
        self.set_status(Status::Starting);
        let options = self.get_options();
        match self.inner.supervisor.start(&options) {
            Ok(()) => {
                self.set_status(Status::Running);
                Ok(())
            }
            Err(e) => {
                self.set_status(Status::Failed);
                Err(e)
            }
        }
    }

    pub fn stop(&self) -> Result<()> {
        let result = self.inner.supervisor.stop();
        self.set_status(Status::Stopped);
        result
    }

    /// Stop (if running) and start again under a single transition, so an
    /// external `get`/`list` sees `Restarting` rather than a misleading
    /// `Stopped` in between. Unlike [`Instance::stop`] this does not settle
    /// on `Stopped` before starting back up.
    pub fn restart(&self) -> Result<()> {
        if self.is_running() {
            self.set_status(Status::Restarting);
            if let Err(e) = self.inner.supervisor.stop() {
                tracing::warn!(name = self.name(), error = %e, "failed to stop instance before restart");
            }
        }
        self.start()
    }

    pub fn wait_for_healthy(&self, timeout: Duration) -> Result<()> {
        self.inner.supervisor.wait_for_healthy(timeout)
    }

    pub fn get_logs(&self, num_lines: usize) -> String {
        self.inner.supervisor.get_logs(num_lines)
    }

    /// Reverse-proxy handle bound to the backend's listening port. Errors if
    /// the instance has no port allocated yet (it has never been started).
    pub fn get_proxy(&self) -> Result<Proxy> {
        let port = self.get_port();
        if port == 0 {
            return Err(ManagerError::Child(format!(
                "instance {:?} has no backend port allocated",
                self.name()
            )));
        }
        Ok(Proxy { port })
    }

    pub fn to_record(&self) -> InstanceRecord {
        InstanceRecord {
            name: self.inner.name.clone(),
            created: self.created_at(),
            status: self.get_status(),
            options: self.get_options(),
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub mod fake {
    use super::*;
    use parking_lot::Mutex as PMutex;

    /// In-process fake supervisor for core/registry/manager tests: never
    /// actually spawns a process. `fail_start` lets tests exercise the
    /// Starting → Failed transition.
    #[derive(Default)]
    pub struct FakeSupervisor {
        pub fail_start: std::sync::atomic::AtomicBool,
        pub logs: PMutex<String>,
    }

    impl FakeSupervisor {
        pub fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        pub fn failing() -> Arc<Self> {
            let s = Self::default();
            s.fail_start.store(true, Ordering::Relaxed);
            Arc::new(s)
        }
    }

    impl ChildSupervisor for FakeSupervisor {
        fn start(&self, _options: &Options) -> Result<()> {
            if self.fail_start.load(Ordering::Relaxed) {
                Err(ManagerError::Child("fake supervisor configured to fail".into()))
            } else {
                Ok(())
            }
        }

        fn stop(&self) -> Result<()> {
            Ok(())
        }

        fn wait_for_healthy(&self, _timeout: Duration) -> Result<()> {
            Ok(())
        }

        fn get_logs(&self, _num_lines: usize) -> String {
            self.logs.lock().clone()
        }
    }
}

#[cfg(test)]
#[path = "instance_tests.rs"]
mod tests;
