// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Adapters for the gateway's external collaborators
//!
//! The streaming core talks to two outside systems through trait seams:
//! the work queue that carries dispatched agent tasks to worker processes,
//! and the internal API that persists terminal results. Production
//! implementations live here next to fakes for tests.

pub mod queue;
pub mod sink;
pub mod traced;

pub use queue::{ChannelTaskQueue, DispatchJob, QueueError, TaskQueue, DISPATCH_TASK_NAME};
pub use sink::{HttpResultSink, NoOpResultSink, ResultSink, SinkError};
pub use traced::{TracedQueue, TracedSink};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use queue::FakeTaskQueue;
#[cfg(any(test, feature = "test-support"))]
pub use sink::{FakeResultSink, SinkCall};
