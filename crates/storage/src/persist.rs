// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Directory-backed JSON persister: one `<name>.json` file per instance.
//!
//! Writes go to `<name>.json.tmp`, are fsynced, then renamed into place —
//! POSIX rename is atomic, so a reader never observes a half-written file.
//! A single mutex serializes writes so two concurrent saves
//! can't interleave their tmp-file renames in the same directory.

use fleet_core::{InstanceRecord, ManagerError, Persister, Result};
use parking_lot::Mutex;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("refusing to persist instance name {0:?}: fails path-traversal check")]
    UnsafeName(String),
    #[error("io error persisting instance {name:?}: {source}")]
    Io { name: String, #[source] source: std::io::Error },
    #[error("failed to serialize instance {name:?}: {source}")]
    Serialize { name: String, #[source] source: serde_json::Error },
}

impl From<PersistError> for ManagerError {
    fn from(e: PersistError) -> Self {
        ManagerError::Child(e.to_string())
    }
}

/// Validates that `name`, once run through filesystem normalization, is
/// unchanged and contains no path separator. This is a defense-in-depth check
/// independent of [`fleet_core::validate_name`], which the manager already
/// runs at every API boundary.
fn safe_filename(name: &str) -> std::result::Result<(), PersistError> {
    let unsafe_name = || PersistError::UnsafeName(name.to_string());
    if name.is_empty() || name == "." || name == ".." {
        return Err(unsafe_name());
    }
    if name.contains('/') || name.contains('\\') {
        return Err(unsafe_name());
    }
    let normalized: PathBuf = Path::new(name).components().collect();
    if normalized.as_os_str() != name {
        return Err(unsafe_name());
    }
    Ok(())
}

/// One JSON file per instance under a configured directory. Constructing a
/// [`FilePersister`] creates the directory if it doesn't exist yet.
pub struct FilePersister {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl FilePersister {
    pub fn new(dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(FilePersister { dir, write_lock: Mutex::new(()) })
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.json"))
    }

    fn tmp_path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.json.tmp"))
    }

    fn load_one(&self, path: &Path) -> std::result::Result<InstanceRecord, String> {
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| format!("{}: non-UTF8 filename", path.display()))?;
        let contents = fs::read_to_string(path).map_err(|e| format!("{}: {e}", path.display()))?;
        let record: InstanceRecord =
            serde_json::from_str(&contents).map_err(|e| format!("{}: {e}", path.display()))?;
        if record.name.as_str() != stem {
            return Err(format!(
                "{}: record name {:?} does not match filename stem {stem:?}",
                path.display(),
                record.name
            ));
        }
        Ok(record)
    }
}

impl Persister for FilePersister {
    fn save(&self, record: &InstanceRecord) -> Result<()> {
        let name = record.name.as_str();
        safe_filename(name).map_err(ManagerError::from)?;

        let json = serde_json::to_string_pretty(record).map_err(|source| {
            ManagerError::from(PersistError::Serialize { name: name.to_string(), source })
        })?;

        let _guard = self.write_lock.lock();
        let tmp_path = self.tmp_path_for(name);
        let final_path = self.path_for(name);
        let write = || -> std::io::Result<()> {
            use std::io::Write;
            let mut file = fs::File::create(&tmp_path)?;
            file.write_all(json.as_bytes())?;
            file.sync_all()?;
            fs::rename(&tmp_path, &final_path)?;
            Ok(())
        };
        write().map_err(|source| {
            ManagerError::from(PersistError::Io { name: name.to_string(), source })
        })
    }

    fn delete(&self, name: &str) -> Result<()> {
        safe_filename(name).map_err(ManagerError::from)?;
        let _guard = self.write_lock.lock();
        let path = self.path_for(name);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => {
                Err(ManagerError::from(PersistError::Io { name: name.to_string(), source }))
            }
        }
    }

    fn load_all(&self) -> Vec<InstanceRecord> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(dir = %self.dir.display(), error = %e, "failed to read instances directory");
                return Vec::new();
            }
        };

        let mut records = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match self.load_one(&path) {
                Ok(record) => records.push(record),
                Err(message) => {
                    tracing::warn!(error = %message, "skipping unreadable instance record");
                }
            }
        }
        records
    }
}

#[cfg(test)]
#[path = "persist_tests.rs"]
mod tests;
