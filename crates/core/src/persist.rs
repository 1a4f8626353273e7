// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The persister interface (C4).
//!
//! The manager depends only on this trait; [`fleet-storage`](../../storage)
//! supplies the atomic-JSON-file implementation. A no-op implementation
//! disables persistence entirely when no directory is configured.

use crate::error::Result;
use crate::instance::InstanceRecord;

pub trait Persister: Send + Sync {
    fn save(&self, record: &InstanceRecord) -> Result<()>;
    fn delete(&self, name: &str) -> Result<()>;
    /// Enumerates every persisted record. Parse errors and name/filename
    /// mismatches are logged and skipped rather than failing the whole
    /// scan.
    fn load_all(&self) -> Vec<InstanceRecord>;
}

/// Persistence disabled: every write is a silent no-op, `load_all` returns
/// nothing. Used when `instances.instances_dir` is empty.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullPersister;

impl Persister for NullPersister {
    fn save(&self, _record: &InstanceRecord) -> Result<()> {
        Ok(())
    }

    fn delete(&self, _name: &str) -> Result<()> {
        Ok(())
    }

    fn load_all(&self) -> Vec<InstanceRecord> {
        Vec::new()
    }
}

#[cfg(any(test, feature = "test-support"))]
pub mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    /// In-memory persister for manager unit tests.
    #[derive(Default)]
    pub struct FakePersister {
        records: Mutex<HashMap<String, InstanceRecord>>,
        pub fail_save: std::sync::atomic::AtomicBool,
    }

    impl FakePersister {
        pub fn new() -> Self {
            Self::default()
        }
    }

    impl Persister for FakePersister {
        fn save(&self, record: &InstanceRecord) -> Result<()> {
            if self.fail_save.load(std::sync::atomic::Ordering::Relaxed) {
                return Err(crate::error::ManagerError::Child("fake persister configured to fail".into()));
            }
            self.records.lock().insert(record.name.to_string(), record.clone());
            Ok(())
        }

        fn delete(&self, name: &str) -> Result<()> {
            self.records.lock().remove(name);
            Ok(())
        }

        fn load_all(&self) -> Vec<InstanceRecord> {
            self.records.lock().values().cloned().collect()
        }
    }
}
