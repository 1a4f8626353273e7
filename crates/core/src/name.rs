// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Instance name validation.
//!
//! A name is the primary key of an instance: it is also the JSON persistence
//! filename stem and a URL path segment, so it must be safe in all three
//! contexts. Validated at every entry point rather than once at
//! construction, since names also arrive over the peer HTTP protocol.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NameError {
    #[error("instance name must not be empty")]
    Empty,
    #[error("instance name {0:?} must not contain a path separator")]
    PathSeparator(String),
    #[error("instance name {0:?} must not be \".\" or \"..\"")]
    DotSegment(String),
    #[error("instance name {0:?} contains characters that are unsafe in a URL path segment")]
    UnsafeChars(String),
}

/// Validates an instance name: non-empty, no path separator, not `.`/`..`,
/// and limited to `[A-Za-z0-9_-]` so it is safe to interpolate directly into
/// a URL path and
/// a filesystem filename.
pub fn validate_name(name: &str) -> Result<(), NameError> {
    if name.is_empty() {
        return Err(NameError::Empty);
    }
    if name == "." || name == ".." {
        return Err(NameError::DotSegment(name.to_string()));
    }
    if name.contains('/') || name.contains('\\') {
        return Err(NameError::PathSeparator(name.to_string()));
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
        return Err(NameError::UnsafeChars(name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
#[path = "name_tests.rs"]
mod tests;
