// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fleet remote: the HTTP client to peer control planes (C5).
//!
//! [`fleet_core::RemoteClient`] is the trait the manager depends on; this
//! crate supplies the only production implementation, forwarding instance
//! lifecycle calls to a peer's `/api/v1/instances/...` surface over
//! `reqwest`.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod client;

pub use client::HttpRemoteClient;
