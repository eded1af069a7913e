// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced adapter wrappers for consistent observability

use crate::queue::{DispatchJob, QueueError, TaskQueue};
use crate::sink::{ResultSink, SinkError};
use async_trait::async_trait;
use relay_core::{AgentEvent, RunId, ThreadId};

/// Wrapper that adds tracing to any TaskQueue
#[derive(Clone)]
pub struct TracedQueue<Q> {
    inner: Q,
}

impl<Q> TracedQueue<Q> {
    pub fn new(inner: Q) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<Q: TaskQueue> TaskQueue for TracedQueue<Q> {
    async fn enqueue(&self, job: DispatchJob) -> Result<(), QueueError> {
        let thread = job.thread_id.clone();
        let run = job.run_id.clone();
        let start = std::time::Instant::now();
        let result = self.inner.enqueue(job).await;
        let elapsed_ms = start.elapsed().as_millis() as u64;
        match &result {
            Ok(()) => {
                tracing::debug!(thread = %thread, run = %run, elapsed_ms, "job enqueued")
            }
            Err(e) => {
                tracing::error!(thread = %thread, run = %run, elapsed_ms, error = %e, "enqueue failed")
            }
        }
        result
    }
}

/// Wrapper that adds tracing to any ResultSink
#[derive(Clone)]
pub struct TracedSink<S> {
    inner: S,
}

impl<S> TracedSink<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<S: ResultSink> ResultSink for TracedSink<S> {
    async fn save_terminal(
        &self,
        thread: &ThreadId,
        run: &RunId,
        event: &AgentEvent,
    ) -> Result<(), SinkError> {
        let start = std::time::Instant::now();
        let result = self.inner.save_terminal(thread, run, event).await;
        let elapsed_ms = start.elapsed().as_millis() as u64;
        match &result {
            Ok(()) => tracing::debug!(
                thread = %thread,
                run = %run,
                uuid = %event.uuid,
                elapsed_ms,
                "terminal result saved"
            ),
            Err(e) => tracing::warn!(
                thread = %thread,
                run = %run,
                uuid = %event.uuid,
                elapsed_ms,
                error = %e,
                "terminal result save failed"
            ),
        }
        result
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
