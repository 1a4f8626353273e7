// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The port allocator (C3): a bitmap over `[min, max]` plus a port → name
//! map, serialized behind a single mutex.

use crate::error::{ManagerError, Result};
use parking_lot::Mutex;
use smol_str::SmolStr;
use std::collections::HashMap;

struct Inner {
    min: u16,
    max: u16,
    /// One bit per port in `[min, max]`, indexed from `min`. Set = allocated.
    bitmap: Vec<u64>,
    holders: HashMap<u16, SmolStr>,
}

pub struct PortAllocator {
    inner: Mutex<Inner>,
}

impl PortAllocator {
    /// Builds an allocator over the inclusive range `[min, max]`.
    pub fn new(min: u16, max: u16) -> Self {
        assert!(min <= max, "port range min ({min}) must be <= max ({max})");
        let range = (max - min) as usize + 1;
        let words = range.div_ceil(64);
        PortAllocator { inner: Mutex::new(Inner { min, max, bitmap: vec![0u64; words], holders: HashMap::new() }) }
    }

    fn index(inner: &Inner, port: u16) -> Option<usize> {
        if port < inner.min || port > inner.max {
            return None;
        }
        Some((port - inner.min) as usize)
    }

    fn bit_set(inner: &mut Inner, idx: usize, value: bool) {
        let word = idx / 64;
        let bit = idx % 64;
        if value {
            inner.bitmap[word] |= 1 << bit;
        } else {
            inner.bitmap[word] &= !(1 << bit);
        }
    }

    fn bit_get(inner: &Inner, idx: usize) -> bool {
        let word = idx / 64;
        let bit = idx % 64;
        inner.bitmap[word] & (1 << bit) != 0
    }

    /// Allocates the first free port in the range to `name`.
    ///
    /// Scans word-by-word using trailing-zero-on-complement so the worst
    /// case is O(range/64) rather than O(range).
    pub fn allocate(&self, name: &str) -> Result<u16> {
        let mut inner = self.inner.lock();
        let range = (inner.max - inner.min) as usize + 1;
        let word_count = inner.bitmap.len();
        for word_idx in 0..word_count {
            let word = inner.bitmap[word_idx];
            if word == u64::MAX {
                continue;
            }
            let free_bit = (!word).trailing_zeros() as usize;
            let idx = word_idx * 64 + free_bit;
            if idx >= range {
                break;
            }
            Self::bit_set(&mut inner, idx, true);
            let port = inner.min + idx as u16;
            inner.holders.insert(port, SmolStr::from(name));
            return Ok(port);
        }
        Err(ManagerError::PortsExhausted)
    }

    /// Allocates a specific port to `name`; fails if out of range or held.
    pub fn allocate_specific(&self, port: u16, name: &str) -> Result<()> {
        let mut inner = self.inner.lock();
        let idx = Self::index(&inner, port).ok_or(ManagerError::PortOutOfRange(port))?;
        if Self::bit_get(&inner, idx) {
            let holder = inner.holders.get(&port).cloned().unwrap_or_default();
            return Err(ManagerError::PortInUse { port, holder: holder.to_string() });
        }
        Self::bit_set(&mut inner, idx, true);
        inner.holders.insert(port, SmolStr::from(name));
        Ok(())
    }

    /// Releases a held port. Fails if it was not held.
    pub fn release(&self, port: u16) -> Result<()> {
        let mut inner = self.inner.lock();
        let idx = Self::index(&inner, port).ok_or(ManagerError::PortOutOfRange(port))?;
        if !Self::bit_get(&inner, idx) {
            return Err(ManagerError::PortNotHeld(port.to_string()));
        }
        Self::bit_set(&mut inner, idx, false);
        inner.holders.remove(&port);
        Ok(())
    }

    /// Releases every port held by `name`, returning how many were freed.
    pub fn release_by_instance(&self, name: &str) -> usize {
        let mut inner = self.inner.lock();
        let ports: Vec<u16> =
            inner.holders.iter().filter(|(_, n)| n.as_str() == name).map(|(p, _)| *p).collect();
        for port in &ports {
            if let Some(idx) = Self::index(&inner, *port) {
                Self::bit_set(&mut inner, idx, false);
            }
            inner.holders.remove(port);
        }
        ports.len()
    }

    pub fn is_allocated(&self, port: u16) -> bool {
        let inner = self.inner.lock();
        match Self::index(&inner, port) {
            Some(idx) => Self::bit_get(&inner, idx),
            None => false,
        }
    }
}

#[cfg(test)]
#[path = "ports_tests.rs"]
mod tests;

#[cfg(test)]
#[path = "ports_proptest.rs"]
mod proptest_tests;
