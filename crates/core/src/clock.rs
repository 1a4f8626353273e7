// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Clock abstraction for testable time handling.
//!
//! Instance timestamps (`created_at`, `last_request_time`) are second-resolution
//! epoch values so that idle-timeout and LRU-eviction logic can be driven by a
//! [`FakeClock`] in tests instead of racing real wall-clock time.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// A source of the current second-resolution epoch time.
pub trait Clock: Send + Sync {
    fn now_secs(&self) -> u64;
}

/// Real system clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_secs(&self) -> u64 {
        SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
    }
}

/// Fake clock for testing with controllable time.
#[derive(Clone)]
pub struct FakeClock {
    now: Arc<Mutex<u64>>,
}

impl FakeClock {
    pub fn new(start_secs: u64) -> Self {
        Self { now: Arc::new(Mutex::new(start_secs)) }
    }

    /// Advance the clock by the given number of seconds.
    pub fn advance(&self, secs: u64) {
        *self.now.lock() += secs;
    }

    /// Set the clock to an absolute second value.
    pub fn set(&self, secs: u64) {
        *self.now.lock() = secs;
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new(1_000_000)
    }
}

impl Clock for FakeClock {
    fn now_secs(&self) -> u64 {
        *self.now.lock()
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
