// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The registry (C2): authoritative name → instance map, plus a lock-free
//! running-set so the hot path (on-demand routing admission, eviction scan)
//! never blocks on the identity map's writer.

use crate::error::{ManagerError, Result};
use crate::instance::Instance;
use dashmap::DashSet;
use parking_lot::RwLock;
use smol_str::SmolStr;
use std::collections::HashMap;

#[derive(Default)]
pub struct Registry {
    identity: RwLock<HashMap<SmolStr, Instance>>,
    running: DashSet<SmolStr>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<Instance> {
        self.identity.read().get(name).cloned()
    }

    /// Snapshot copy of every instance in the registry.
    pub fn list(&self) -> Vec<Instance> {
        self.identity.read().values().cloned().collect()
    }

    /// Snapshot restricted to names currently in the running-set, resolved
    /// back through the identity map (an entry in `running` for a name that
    /// has since been removed is simply skipped).
    pub fn list_running(&self) -> Vec<Instance> {
        let map = self.identity.read();
        self.running.iter().filter_map(|name| map.get(name.as_str()).cloned()).collect()
    }

    /// Insert `instance`, failing if its name already exists. If the
    /// instance's current status is already Running (e.g. recovered from a
    /// crash-restart during `load_instances`), it is also marked running.
    pub fn add(&self, instance: Instance) -> Result<()> {
        let name: SmolStr = instance.name().into();
        let mut map = self.identity.write();
        if map.contains_key(name.as_str()) {
            return Err(ManagerError::DuplicateName(name.to_string()));
        }
        let is_running = instance.is_running();
        map.insert(name.clone(), instance);
        drop(map);
        if is_running {
            self.running.insert(name);
        }
        Ok(())
    }

    /// Remove `name` from both the identity map and the running-set.
    pub fn remove(&self, name: &str) -> Result<Instance> {
        let mut map = self.identity.write();
        let instance =
            map.remove(name).ok_or_else(|| ManagerError::NotFound(name.to_string()))?;
        drop(map);
        self.running.remove(name);
        Ok(instance)
    }

    pub fn mark_running(&self, name: &str) {
        self.running.insert(SmolStr::from(name));
    }

    pub fn mark_stopped(&self, name: &str) {
        self.running.remove(name);
    }

    pub fn is_running(&self, name: &str) -> bool {
        self.running.contains(name)
    }

    pub fn count(&self) -> usize {
        self.identity.read().len()
    }

    pub fn count_running(&self) -> usize {
        self.running.len()
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
