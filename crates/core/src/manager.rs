// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The manager facade (C7): orchestrates C2–C6, enforces the global
//! global invariants, and owns per-instance locking.

use crate::clock::Clock;
use crate::error::{ManagerError, Result};
use crate::instance::{ChildSupervisor, Instance, InstanceRecord, Proxy};
use crate::name::validate_name;
use crate::node::NodeName;
use crate::options::{Defaults, Options, OptionsInput};
use crate::persist::Persister;
use crate::ports::PortAllocator;
use crate::registry::Registry;
use crate::remote::RemoteClient;
use crate::status::Status;
use crate::sweeper::{Sweeper, SweeperBackend};
use async_trait::async_trait;
use parking_lot::Mutex as PMutex;
use smol_str::SmolStr;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

/// Per-instance local/running caps. `None` means
/// unlimited (the wire-level config uses `-1` for this; translating `-1` to
/// `None` is the daemon config loader's job, not the core's).
#[derive(Debug, Clone, Copy, Default)]
pub struct Limits {
    pub max_instances: Option<usize>,
    pub max_running_instances: Option<usize>,
}

/// Global configuration the manager needs beyond its C2–C6 components.
pub struct ManagerConfig {
    pub local_node: NodeName,
    pub port_range: (u16, u16),
    pub defaults: Defaults,
    pub limits: Limits,
    pub sweep_interval: Duration,
    pub enable_lru_eviction: bool,
    pub health_wait_timeout: Duration,
}

/// Produces the [`ChildSupervisor`] a new [`Instance`] is bound to. In
/// production this is backed by `tokio::process::Command`
/// (`fleet-daemon`); tests use the in-process fake.
pub type SupervisorFactory = Arc<dyn Fn(&str) -> Arc<dyn ChildSupervisor> + Send + Sync>;

struct ManagerInner {
    config: ManagerConfig,
    registry: Registry,
    ports: PortAllocator,
    persister: Arc<dyn Persister>,
    remote: Arc<dyn RemoteClient>,
    clock: Arc<dyn Clock>,
    supervisor_factory: SupervisorFactory,
    instance_locks: PMutex<HashMap<SmolStr, Arc<tokio::sync::Mutex<()>>>>,
}

fn lock_instance(inner: &ManagerInner, name: &str) -> Arc<tokio::sync::Mutex<()>> {
    inner
        .instance_locks
        .lock()
        .entry(SmolStr::from(name))
        .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
        .clone()
}

fn unlock_and_cleanup(inner: &ManagerInner, name: &str) {
    inner.instance_locks.lock().remove(name);
}

fn install_status_callback(inner: &Arc<ManagerInner>, instance: &Instance) {
    let weak_inner = Arc::downgrade(inner);
    instance.install_status_callback(Arc::new(move |name: &str, status: Status| {
        if let Some(inner) = weak_inner.upgrade() {
            if status.is_running() {
                inner.registry.mark_running(name);
            } else {
                inner.registry.mark_stopped(name);
            }
        }
    }));
}

/// Stop a local instance through the fully-locked, persisted path used by
/// both user-initiated stops and the sweeper, which always goes through
/// this path rather than the instance handle directly. No-op if already
/// stopped.
async fn stop_local(inner: &ManagerInner, name: &str) -> Result<()> {
    let lock = lock_instance(inner, name);
    let _guard = lock.lock().await;
    let instance =
        inner.registry.get(name).ok_or_else(|| ManagerError::NotFound(name.to_string()))?;
    if !instance.is_running() {
        return Ok(());
    }
    instance.stop()?;
    if let Err(e) = inner.persister.save(&instance.to_record()) {
        tracing::warn!(name, error = %e, "failed to persist instance after stop");
    }
    Ok(())
}

#[async_trait]
impl SweeperBackend for ManagerInner {
    fn list_local_running(&self) -> Vec<Instance> {
        self.registry
            .list_running()
            .into_iter()
            .filter(|i| !i.is_remote(&self.config.local_node))
            .collect()
    }

    async fn stop_instance(&self, name: &str) -> Result<()> {
        stop_local(self, name).await
    }
}

fn preserve_nodes(mut options: Options, nodes: std::collections::BTreeSet<NodeName>) -> Options {
    options.nodes = nodes;
    options
}

/// The instance manager facade (C7). Cheap to clone; all state lives behind
/// an inner `Arc` so every clone drives the same registry, ports, and
/// background sweeper.
#[derive(Clone)]
pub struct Manager {
    inner: Arc<ManagerInner>,
    sweeper: Sweeper,
    shutdown_started: Arc<AtomicBool>,
}

impl Manager {
    /// Full construction: build C2/C3/C4/C5, build C6 with a
    /// back-reference but don't start it, run `load_instances`, then start
    /// C6.
    pub async fn bootstrap(
        config: ManagerConfig,
        persister: Arc<dyn Persister>,
        remote: Arc<dyn RemoteClient>,
        clock: Arc<dyn Clock>,
        supervisor_factory: SupervisorFactory,
    ) -> Result<Manager> {
        let ports = PortAllocator::new(config.port_range.0, config.port_range.1);
        let sweep_interval = config.sweep_interval;
        let enable_lru = config.enable_lru_eviction;
        let local_node = config.local_node.clone();
        let inner = Arc::new(ManagerInner {
            config,
            registry: Registry::new(),
            ports,
            persister,
            remote,
            clock: clock.clone(),
            supervisor_factory,
            instance_locks: PMutex::new(HashMap::new()),
        });
        let backend: Weak<dyn SweeperBackend> = Arc::downgrade(&inner);
        let sweeper = Sweeper::new(sweep_interval, enable_lru, local_node, clock, backend);
        let manager =
            Manager { inner, sweeper, shutdown_started: Arc::new(AtomicBool::new(false)) };
        manager.load_instances().await?;
        manager.sweeper.start();
        Ok(manager)
    }

    fn local_instance_count(&self) -> usize {
        self.inner
            .registry
            .list()
            .iter()
            .filter(|i| !i.is_remote(&self.inner.config.local_node))
            .count()
    }

    /// Recovers every persisted instance, then kicks off `auto_start_instances`
    /// in the background.
    async fn load_instances(&self) -> Result<()> {
        let records = self.inner.persister.load_all();
        let mut auto_start_local = Vec::new();
        let mut auto_start_remote = Vec::new();
        let mut force_stopped = Vec::new();

        for record in records {
            let is_remote = !record.options.nodes.is_empty()
                && !record.options.nodes.iter().any(|n| n == &self.inner.config.local_node);
            let supervisor = (self.inner.supervisor_factory)(&record.name);
            let instance = Instance::new(
                record.name.clone(),
                record.created,
                record.status,
                record.options.clone(),
                supervisor,
            );

            if is_remote {
                let Some(node_name) = record.options.nodes.iter().next().cloned() else {
                    continue;
                };
                if let Err(e) = self.inner.remote.set_instance_node(&record.name, &node_name) {
                    tracing::warn!(
                        name = %record.name,
                        error = %e,
                        "skipping remote instance with unconfigured node during recovery"
                    );
                    continue;
                }
                if let Err(e) = self.inner.registry.add(instance) {
                    tracing::warn!(name = %record.name, error = %e, "skipping duplicate instance during recovery");
                    continue;
                }
                if record.status.is_running() {
                    auto_start_remote.push(record.name.clone());
                }
            } else {
                let port = record.options.get_port();
                if port > 0 {
                    if let Err(e) = self.inner.ports.allocate_specific(port, &record.name) {
                        // A conflict here is fatal for this instance: log and skip it.
                        tracing::warn!(
                            name = %record.name,
                            error = %e,
                            "port allocation conflict during recovery, skipping instance"
                        );
                        continue;
                    }
                }
                install_status_callback(&self.inner, &instance);
                if let Err(e) = self.inner.registry.add(instance) {
                    tracing::warn!(name = %record.name, error = %e, "skipping duplicate instance during recovery");
                    continue;
                }
                if record.status.is_running() {
                    if record.options.auto_restart {
                        auto_start_local.push(record.name.clone());
                    } else {
                        force_stopped.push(record.name.clone());
                    }
                }
            }
        }

        for name in force_stopped {
            if let Some(instance) = self.inner.registry.get(&name) {
                instance.set_status(Status::Stopped);
                self.inner.registry.mark_stopped(&name);
                if let Err(e) = self.inner.persister.save(&instance.to_record()) {
                    tracing::warn!(name = %name, error = %e, "failed to persist forced-stop during recovery");
                }
            }
        }

        let manager = self.clone();
        tokio::spawn(async move {
            manager.auto_start_instances(auto_start_local, auto_start_remote).await;
        });
        Ok(())
    }

    async fn auto_start_instances(&self, local: Vec<SmolStr>, remote: Vec<SmolStr>) {
        for name in local.into_iter().chain(remote) {
            if let Err(e) = self.start_instance(&name).await {
                tracing::warn!(name = %name, error = %e, "auto-restart failed during recovery");
            }
        }
    }

    /// Snapshot of all instances. Remote instances are best-effort refreshed
    /// from their peer; a per-peer failure returns the cached stub instead
    /// of failing the whole call.
    pub async fn list_instances(&self) -> Vec<InstanceRecord> {
        let instances = self.inner.registry.list();
        let mut out = Vec::with_capacity(instances.len());
        for instance in instances {
            if instance.is_remote(&self.inner.config.local_node) {
                match self.inner.remote.get(instance.name()).await {
                    Ok(remote_record) => {
                        let nodes = instance.get_options().nodes;
                        instance.set_options(preserve_nodes(remote_record.options, nodes));
                        instance.set_status(remote_record.status);
                        instance.set_created_at(remote_record.created);
                    }
                    Err(e) => {
                        tracing::warn!(
                            name = instance.name(),
                            error = %e,
                            "failed to refresh remote instance, returning cached stub"
                        );
                    }
                }
            }
            out.push(instance.to_record());
        }
        out
    }

    pub async fn get_instance(&self, name: &str) -> Result<InstanceRecord> {
        validate_name(name)?;
        let instance =
            self.inner.registry.get(name).ok_or_else(|| ManagerError::NotFound(name.to_string()))?;
        if instance.is_remote(&self.inner.config.local_node) {
            let remote_record = self.inner.remote.get(name).await?;
            let nodes = instance.get_options().nodes;
            instance.set_options(preserve_nodes(remote_record.options, nodes));
            instance.set_status(remote_record.status);
            instance.set_created_at(remote_record.created);
        }
        Ok(instance.to_record())
    }

    /// Creates an instance. Remote creation delegates to the
    /// single named peer and keeps a local stub; local creation allocates a
    /// port under `max_instances` and rolls back on a persistence failure.
    pub async fn create_instance(&self, name: &str, input: OptionsInput) -> Result<InstanceRecord> {
        validate_name(name)?;
        if self.inner.registry.get(name).is_some() {
            return Err(ManagerError::DuplicateName(name.to_string()));
        }
        let options = Options::resolve(input, &self.inner.config.defaults);
        let is_remote = !options.nodes.is_empty()
            && !options.nodes.iter().any(|n| n == &self.inner.config.local_node);

        if is_remote {
            // "when options.nodes contains multiple peers, the core
            // currently delegates to an arbitrary single member" — we take the first in iteration order.
            let node_name = options
                .nodes
                .iter()
                .next()
                .cloned()
                .ok_or_else(|| ManagerError::InvalidOptions("remote instance has no node".into()))?;
            let remote_record = self.inner.remote.create(&node_name, name, &options).await?;
            self.inner.remote.set_instance_node(name, &node_name)?;
            let supervisor = (self.inner.supervisor_factory)(name);
            let stub_options = preserve_nodes(remote_record.options, options.nodes.clone());
            let instance =
                Instance::new(name, remote_record.created, remote_record.status, stub_options, supervisor);
            if let Err(e) = self.inner.registry.add(instance.clone()) {
                self.inner.remote.remove_instance(name);
                return Err(e);
            }
            if let Err(e) = self.inner.persister.save(&instance.to_record()) {
                tracing::warn!(name, error = %e, "failed to persist new remote stub");
            }
            return Ok(instance.to_record());
        }

        if let Some(max) = self.inner.config.limits.max_instances {
            if self.local_instance_count() >= max {
                return Err(ManagerError::MaxInstancesReached(max));
            }
        }

        let mut options = options;
        let port = if options.get_port() == 0 {
            self.inner.ports.allocate(name)?
        } else {
            let requested = options.get_port();
            self.inner.ports.allocate_specific(requested, name)?;
            requested
        };
        options.set_port(port);

        let supervisor = (self.inner.supervisor_factory)(name);
        let instance =
            Instance::new(name, self.inner.clock.now_secs(), Status::Stopped, options, supervisor);
        install_status_callback(&self.inner, &instance);
        if let Err(e) = self.inner.registry.add(instance.clone()) {
            self.inner.ports.release(port).ok();
            return Err(e);
        }
        if let Err(e) = self.inner.persister.save(&instance.to_record()) {
            // Persistence failures on create roll back the registry entry
            // and port, unlike every other mutating path.
            tracing::warn!(name, error = %e, "failed to persist new instance, rolling back");
            let _ = self.inner.registry.remove(name);
            self.inner.ports.release(port).ok();
            return Err(ManagerError::Child(format!(
                "failed to persist instance {name:?}: {e}"
            )));
        }
        Ok(instance.to_record())
    }

    pub async fn update_instance(&self, name: &str, input: OptionsInput) -> Result<InstanceRecord> {
        validate_name(name)?;
        let instance =
            self.inner.registry.get(name).ok_or_else(|| ManagerError::NotFound(name.to_string()))?;

        if instance.is_remote(&self.inner.config.local_node) {
            let options = Options::resolve(input, &self.inner.config.defaults);
            let remote_record = self.inner.remote.update(name, &options).await?;
            let nodes = instance.get_options().nodes;
            instance.set_options(preserve_nodes(remote_record.options, nodes));
            instance.set_status(remote_record.status);
            if let Err(e) = self.inner.persister.save(&instance.to_record()) {
                tracing::warn!(name, error = %e, "failed to persist remote update");
            }
            return Ok(instance.to_record());
        }

        let lock = lock_instance(&self.inner, name);
        let _guard = lock.lock().await;
        let instance =
            self.inner.registry.get(name).ok_or_else(|| ManagerError::NotFound(name.to_string()))?;

        let mut new_options = Options::resolve(input, &self.inner.config.defaults);
        let old_port = instance.get_port();
        let requested_port = new_options.get_port();
        if requested_port != old_port {
            // Allocate-then-release: a conflict on the new port leaves the
            // old port held rather than leaving the instance portless
            //.
            let allocated = if requested_port == 0 {
                self.inner.ports.allocate(name)?
            } else {
                self.inner.ports.allocate_specific(requested_port, name)?;
                requested_port
            };
            new_options.set_port(allocated);
            if old_port != 0 {
                self.inner.ports.release(old_port).ok();
            }
        } else {
            new_options.set_port(old_port);
        }

        let was_running = instance.is_running();
        if was_running {
            if let Err(e) = instance.stop() {
                tracing::warn!(name, error = %e, "failed to stop instance before update");
            }
            self.inner.registry.mark_stopped(name);
        }
        instance.set_options(new_options);
        if was_running {
            if let Err(e) = instance.start() {
                tracing::warn!(name, error = %e, "failed to restart instance after update");
            }
        }
        if let Err(e) = self.inner.persister.save(&instance.to_record()) {
            tracing::warn!(name, error = %e, "failed to persist instance after update");
        }
        Ok(instance.to_record())
    }

    pub async fn delete_instance(&self, name: &str) -> Result<()> {
        validate_name(name)?;
        let instance =
            self.inner.registry.get(name).ok_or_else(|| ManagerError::NotFound(name.to_string()))?;

        if instance.is_remote(&self.inner.config.local_node) {
            self.inner.remote.delete(name).await?;
            self.inner.remote.remove_instance(name);
            self.inner.registry.remove(name)?;
            if let Err(e) = self.inner.persister.delete(name) {
                tracing::warn!(name, error = %e, "failed to delete persisted remote stub");
            }
            return Ok(());
        }

        let lock = lock_instance(&self.inner, name);
        let _guard = lock.lock().await;
        let instance =
            self.inner.registry.get(name).ok_or_else(|| ManagerError::NotFound(name.to_string()))?;
        if matches!(instance.get_status(), Status::Running | Status::Restarting) {
            return Err(ManagerError::DeleteWhileRunning(name.to_string()));
        }
        self.inner.ports.release_by_instance(name);
        self.inner.registry.remove(name)?;
        if let Err(e) = self.inner.persister.delete(name) {
            tracing::warn!(name, error = %e, "failed to delete persisted instance");
        }
        drop(_guard);
        unlock_and_cleanup(&self.inner, name);
        Ok(())
    }

    pub async fn start_instance(&self, name: &str) -> Result<InstanceRecord> {
        validate_name(name)?;
        let instance =
            self.inner.registry.get(name).ok_or_else(|| ManagerError::NotFound(name.to_string()))?;

        if instance.is_remote(&self.inner.config.local_node) {
            let remote_record = self.inner.remote.start(name).await?;
            let nodes = instance.get_options().nodes;
            instance.set_options(preserve_nodes(remote_record.options, nodes));
            instance.set_status(remote_record.status);
            return Ok(instance.to_record());
        }

        let lock = lock_instance(&self.inner, name);
        let _guard = lock.lock().await;
        let instance =
            self.inner.registry.get(name).ok_or_else(|| ManagerError::NotFound(name.to_string()))?;
        if instance.is_running() {
            return Ok(instance.to_record());
        }
        if let Some(max) = self.inner.config.limits.max_running_instances {
            if self.inner.registry.count_running() >= max {
                return Err(ManagerError::MaxRunningInstancesReached(max));
            }
        }
        let start_result = instance.start();
        if let Err(e) = self.inner.persister.save(&instance.to_record()) {
            tracing::warn!(name, error = %e, "failed to persist instance after start");
        }
        start_result?;
        Ok(instance.to_record())
    }

    pub fn is_max_running_instances_reached(&self) -> bool {
        match self.inner.config.limits.max_running_instances {
            Some(max) => self.inner.registry.count_running() >= max,
            None => false,
        }
    }

    pub async fn stop_instance(&self, name: &str) -> Result<InstanceRecord> {
        validate_name(name)?;
        let instance =
            self.inner.registry.get(name).ok_or_else(|| ManagerError::NotFound(name.to_string()))?;

        if instance.is_remote(&self.inner.config.local_node) {
            let remote_record = self.inner.remote.stop(name).await?;
            let nodes = instance.get_options().nodes;
            instance.set_options(preserve_nodes(remote_record.options, nodes));
            instance.set_status(remote_record.status);
            return Ok(instance.to_record());
        }

        stop_local(&self.inner, name).await?;
        let instance =
            self.inner.registry.get(name).ok_or_else(|| ManagerError::NotFound(name.to_string()))?;
        Ok(instance.to_record())
    }

    /// Restart: stop (if running) then start, both via C1 directly under the
    /// same lock acquisition so the whole restart is atomic.
    pub async fn restart_instance(&self, name: &str) -> Result<InstanceRecord> {
        validate_name(name)?;
        let instance =
            self.inner.registry.get(name).ok_or_else(|| ManagerError::NotFound(name.to_string()))?;

        if instance.is_remote(&self.inner.config.local_node) {
            let remote_record = self.inner.remote.restart(name).await?;
            let nodes = instance.get_options().nodes;
            instance.set_options(preserve_nodes(remote_record.options, nodes));
            instance.set_status(remote_record.status);
            return Ok(instance.to_record());
        }

        let lock = lock_instance(&self.inner, name);
        let _guard = lock.lock().await;
        let instance =
            self.inner.registry.get(name).ok_or_else(|| ManagerError::NotFound(name.to_string()))?;
        let start_result = instance.restart();
        if let Err(e) = self.inner.persister.save(&instance.to_record()) {
            tracing::warn!(name, error = %e, "failed to persist instance after restart");
        }
        start_result?;
        Ok(instance.to_record())
    }

    pub async fn get_instance_logs(&self, name: &str, num_lines: usize) -> Result<String> {
        validate_name(name)?;
        let instance =
            self.inner.registry.get(name).ok_or_else(|| ManagerError::NotFound(name.to_string()))?;
        if instance.is_remote(&self.inner.config.local_node) {
            self.inner.remote.get_logs(name, num_lines).await
        } else {
            Ok(instance.get_logs(num_lines))
        }
    }

    pub async fn evict_lru_instance(&self) -> Result<SmolStr> {
        self.sweeper.evict_lru().await
    }

    /// On-demand start: the inference-routing path. Starts a
    /// Stopped instance that allows on-demand start, evicting an LRU victim
    /// first if the running-count cap is already hit, then waits for health
    /// before handing back a proxy.
    pub async fn route_request(&self, name: &str, health_timeout: Duration) -> Result<Proxy> {
        validate_name(name)?;
        let instance =
            self.inner.registry.get(name).ok_or_else(|| ManagerError::NotFound(name.to_string()))?;
        if instance.is_remote(&self.inner.config.local_node) {
            return Err(ManagerError::InvalidOptions(format!(
                "instance {name:?} is hosted remotely; route to its peer directly"
            )));
        }
        if !instance.is_running() {
            if !instance.get_options().on_demand_start {
                return Err(ManagerError::InvalidOptions(format!(
                    "instance {name:?} does not allow on-demand start"
                )));
            }
            if self.is_max_running_instances_reached() && self.inner.config.enable_lru_eviction {
                if let Err(e) = self.evict_lru_instance().await {
                    tracing::warn!(error = %e, "no eligible instance to evict for on-demand start");
                }
            }
            self.start_instance(name).await?;
            instance.wait_for_healthy(health_timeout)?;
        }
        instance.update_last_request_time(self.inner.clock.as_ref());
        instance.get_proxy()
    }

    /// One-shot shutdown barrier: stop the sweeper and
    /// wait for its rendezvous, then stop every local running instance
    /// concurrently. Idempotent; never returns an error.
    pub async fn shutdown(&self) {
        if self.shutdown_started.swap(true, Ordering::SeqCst) {
            return;
        }
        self.sweeper.stop().await;
        let running: Vec<Instance> = self
            .inner
            .registry
            .list_running()
            .into_iter()
            .filter(|i| !i.is_remote(&self.inner.config.local_node))
            .collect();
        let mut set = tokio::task::JoinSet::new();
        for instance in running {
            set.spawn(async move {
                if let Err(e) = instance.stop() {
                    tracing::warn!(name = instance.name(), error = %e, "error stopping instance during shutdown");
                }
            });
        }
        while set.join_next().await.is_some() {}
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;

#[cfg(test)]
#[path = "manager_proptest.rs"]
mod proptest_tests;
