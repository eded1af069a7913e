// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Work queue adapters
//!
//! The dispatch bridge enqueues one [`DispatchJob`] per accepted task; a
//! worker pool drains the queue and drives the agent loop, ultimately
//! publishing events back against the same thread.

mod channel;

pub use channel::ChannelTaskQueue;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeTaskQueue;

use std::collections::HashMap;

use async_trait::async_trait;
use relay_core::{RunId, ThreadId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Task name carried on the wire for agent work items.
pub const DISPATCH_TASK_NAME: &str = "process_flow_data";

/// Errors from queue operations
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("queue is full")]
    Full,
    #[error("queue is closed")]
    Closed,
    #[error("enqueue failed: {0}")]
    SendFailed(String),
}

/// One unit of agent work handed to the worker pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchJob {
    pub thread_id: ThreadId,
    pub run_id: RunId,
    pub user_id: String,
    pub task: String,
    #[serde(default)]
    pub context_data: Vec<serde_json::Value>,
    #[serde(default)]
    pub parameters: HashMap<String, serde_json::Value>,
}

/// Adapter for enqueuing agent work
#[async_trait]
pub trait TaskQueue: Clone + Send + Sync + 'static {
    /// Enqueue a job under [`DISPATCH_TASK_NAME`].
    async fn enqueue(&self, job: DispatchJob) -> Result<(), QueueError>;
}
