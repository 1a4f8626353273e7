// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error kinds surfaced by the core.
//!
//! Validation, not-found, conflict, and capacity errors are caller-visible.
//! Persistence and sweeper failures are logged internally and never take
//! this shape — they never leave the manager as an `Err`.

use crate::name::NameError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("invalid instance name: {0}")]
    InvalidName(#[from] NameError),

    #[error("invalid options: {0}")]
    InvalidOptions(String),

    #[error("instance {0:?} not found")]
    NotFound(String),

    #[error("instance {0:?} already exists")]
    DuplicateName(String),

    #[error("port {port} is already in use by instance {holder:?}")]
    PortInUse { port: u16, holder: String },

    #[error("port {0} is out of the configured allocation range")]
    PortOutOfRange(u16),

    #[error("port allocator has no free ports remaining")]
    PortsExhausted,

    #[error("instance {0:?} is not allocated to this allocator")]
    PortNotHeld(String),

    #[error("cannot delete instance {0:?} while it is running")]
    DeleteWhileRunning(String),

    #[error("maximum number of instances ({0}) reached")]
    MaxInstancesReached(usize),

    #[error("maximum number of running instances ({0}) reached")]
    MaxRunningInstancesReached(usize),

    #[error("node {0:?} is not configured")]
    UnknownNode(String),

    #[error("instance {0:?} has no nodes and cannot be delegated remotely")]
    NotRemote(String),

    #[error("remote peer returned HTTP {status}: {body}")]
    Remote { status: u16, body: String },

    #[error("remote request failed: {0}")]
    RemoteTransport(String),

    #[error("child process error: {0}")]
    Child(String),

    #[error("timed out waiting for instance {0:?} to become healthy")]
    HealthTimeout(String),

    #[error("failed to find lru instance")]
    LruNotFound,
}

impl ManagerError {
    /// True for the distinguished capacity error the handler layer maps to
    /// HTTP 409 and may respond to by triggering LRU eviction.
    pub fn is_max_running_instances(&self) -> bool {
        matches!(self, ManagerError::MaxRunningInstancesReached(_))
    }
}

pub type Result<T> = std::result::Result<T, ManagerError>;
