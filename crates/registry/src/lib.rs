// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! relay-registry: thread and run metadata with TTL expiry and snapshots
//!
//! The registry is the authority on thread identity: every streaming or
//! publishing path validates thread IDs here first. State lives in memory
//! behind a mutex and is periodically checkpointed to a zstd-compressed
//! snapshot for restart continuity; records are TTL-bounded, so losing the
//! tail of a checkpoint interval is acceptable.

mod registry;
mod snapshot;
mod state;

pub use registry::{RegistryError, ThreadRegistry};
pub use snapshot::{Snapshot, SnapshotError, CURRENT_SNAPSHOT_VERSION};
pub use state::{RegistryState, ThreadRuns, MAX_RUNS_PER_THREAD};
