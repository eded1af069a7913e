// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! relay-gateway: HTTP surface and process lifecycle
//!
//! The `relayd` binary serves the agent-thread API (initiate / execute /
//! stream) plus the legacy event-stream endpoint, and owns process-wide
//! state: the two log backends, the thread registry with its snapshot
//! checkpoints, and the dispatch queue the worker runtime drains.

pub mod env;
pub mod lifecycle;
pub mod routes;
pub mod worker;

pub use lifecycle::{AppState, Config, GatewaySink, LifecycleError, StartupResult};
pub use routes::router;
