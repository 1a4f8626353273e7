// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The lifecycle sweeper (C6): periodic idle-timeout detection and LRU
//! eviction.
//!
//! The sweeper never mutates instance state directly; it only asks its
//! [`SweeperBackend`] to stop an instance, which the manager implements by
//! routing through the same per-instance-locked, persisted stop path a
//! user-initiated stop takes, so a timeout-triggered stop looks identical
//! to one a caller asked for.

use crate::clock::Clock;
use crate::error::{ManagerError, Result};
use crate::instance::Instance;
use crate::node::NodeName;
use async_trait::async_trait;
use smol_str::SmolStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::Notify;

/// What the sweeper needs from the manager: a snapshot of local Running
/// instances, and a way to stop one through the manager's own lifecycle
/// path. Held as a [`Weak`] reference so the sweeper never keeps the
/// manager alive on its own.
#[async_trait]
pub trait SweeperBackend: Send + Sync {
    fn list_local_running(&self) -> Vec<Instance>;
    async fn stop_instance(&self, name: &str) -> Result<()>;
}

struct Inner {
    interval: Duration,
    #[allow(dead_code)] // read by evict_lru's caller, not the tick loop itself
    enable_lru: bool,
    local_node: NodeName,
    clock: Arc<dyn Clock>,
    backend: Weak<dyn SweeperBackend>,
    shutdown: Notify,
    done: Notify,
    stop_requested: AtomicBool,
}

impl Inner {
    async fn tick(&self) {
        let Some(backend) = self.backend.upgrade() else {
            return;
        };
        let candidates: Vec<Instance> = backend
            .list_local_running()
            .into_iter()
            .filter(|instance| instance.should_timeout(self.clock.as_ref(), &self.local_node))
            .collect();
        for instance in candidates {
            if let Err(e) = backend.stop_instance(instance.name()).await {
                tracing::warn!(
                    name = instance.name(),
                    error = %e,
                    "sweeper failed to stop idle instance"
                );
            }
        }
    }

    async fn evict_lru(&self) -> Result<SmolStr> {
        let Some(backend) = self.backend.upgrade() else {
            return Err(ManagerError::LruNotFound);
        };
        let running = backend.list_local_running();
        let mut best: Option<Instance> = None;
        for instance in running {
            if !instance.get_options().has_idle_timeout() {
                continue;
            }
            match &best {
                None => best = Some(instance),
                // Strict `<` so the first instance encountered at the
                // minimum wins ties.
                Some(current) if instance.last_request_time() < current.last_request_time() => {
                    best = Some(instance);
                }
                _ => {}
            }
        }
        let Some(instance) = best else {
            return Err(ManagerError::LruNotFound);
        };
        let name = SmolStr::from(instance.name());
        backend.stop_instance(&name).await?;
        Ok(name)
    }
}

/// Handle to the background sweeper task. Cheap to clone; `start`/`stop`
/// operate on the shared task regardless of which clone calls them.
#[derive(Clone)]
pub struct Sweeper {
    inner: Arc<Inner>,
}

impl Sweeper {
    /// Builds the sweeper with a back-reference to the manager, but does not
    /// start its background task yet.
    pub fn new(
        interval: Duration,
        enable_lru: bool,
        local_node: NodeName,
        clock: Arc<dyn Clock>,
        backend: Weak<dyn SweeperBackend>,
    ) -> Self {
        // Enforce a 1 second floor regardless of configuration.
        let interval = interval.max(Duration::from_secs(1));
        Sweeper {
            inner: Arc::new(Inner {
                interval,
                enable_lru,
                local_node,
                clock,
                backend,
                shutdown: Notify::new(),
                done: Notify::new(),
                stop_requested: AtomicBool::new(false),
            }),
        }
    }

    /// Spawns the one long-lived background tick task.
    pub fn start(&self) {
        let inner = self.inner.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(inner.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        inner.tick().await;
                    }
                    _ = inner.shutdown.notified() => {
                        break;
                    }
                }
            }
            inner.done.notify_one();
        });
    }

    /// Closes the shutdown channel and blocks until the background task
    /// signals completion, so a tick in flight cannot race a half-shutdown
    /// manager. Idempotent.
    pub async fn stop(&self) {
        if self.inner.stop_requested.swap(true, Ordering::SeqCst) {
            return;
        }
        self.inner.shutdown.notify_one();
        self.inner.done.notified().await;
    }

    /// Enumerate, filter to eligible, and stop the single local Running
    /// instance with the smallest `last_request_time`.
    pub async fn evict_lru(&self) -> Result<SmolStr> {
        self.inner.evict_lru().await
    }
}

#[cfg(test)]
#[path = "sweeper_tests.rs"]
mod tests;
