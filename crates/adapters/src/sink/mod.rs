// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Terminal-result persistence adapters
//!
//! When a published event reaches a terminal state, the publisher hands it
//! to a [`ResultSink`] so the internal API can persist the outcome. Sink
//! failures are logged and swallowed by the publisher; they never block the
//! log append or the notify.

mod http;
mod noop;

pub use http::HttpResultSink;
pub use noop::NoOpResultSink;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeResultSink, SinkCall};

use async_trait::async_trait;
use relay_core::{AgentEvent, RunId, ThreadId};
use thiserror::Error;

/// Errors from result sink operations
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("unexpected status {0}")]
    Status(u16),
}

/// Adapter for persisting terminal event results
#[async_trait]
pub trait ResultSink: Clone + Send + Sync + 'static {
    async fn save_terminal(
        &self,
        thread: &ThreadId,
        run: &RunId,
        event: &AgentEvent,
    ) -> Result<(), SinkError>;
}
