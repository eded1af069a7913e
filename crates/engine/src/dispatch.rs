// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dispatch bridge: accepted tasks become queued agent work
//!
//! `execute` validates the thread, persists a pending run, records it on
//! the thread, enqueues the work item, and flips the run to processing.
//! The task body itself runs in the worker pool and ultimately drives
//! publisher activity against the same thread.

use std::collections::HashMap;

use relay_adapters::{DispatchJob, TaskQueue};
use relay_core::{Clock, IdGen, RunId, RunRecord, RunStatus, ThreadId};
use relay_registry::ThreadRegistry;
use tracing::info;

use crate::error::StreamError;

/// An accepted task submission.
#[derive(Debug, Clone, Default)]
pub struct ExecuteRequest {
    pub task: String,
    pub context_data: Vec<serde_json::Value>,
    pub parameters: HashMap<String, serde_json::Value>,
    pub user_id: Option<String>,
}

pub struct DispatchBridge<Q, C: Clock, I: IdGen> {
    registry: ThreadRegistry<C, I>,
    queue: Q,
    clock: C,
}

impl<Q: Clone, C: Clock, I: IdGen> Clone for DispatchBridge<Q, C, I> {
    fn clone(&self) -> Self {
        Self {
            registry: self.registry.clone(),
            queue: self.queue.clone(),
            clock: self.clock.clone(),
        }
    }
}

impl<Q, C, I> DispatchBridge<Q, C, I>
where
    Q: TaskQueue,
    C: Clock,
    I: IdGen,
{
    pub fn new(registry: ThreadRegistry<C, I>, queue: Q, clock: C) -> Self {
        Self {
            registry,
            queue,
            clock,
        }
    }

    /// Accept a task for a thread and return the new run's ID.
    pub async fn execute(
        &self,
        thread: &ThreadId,
        request: ExecuteRequest,
    ) -> Result<RunId, StreamError> {
        if !self.registry.validate(thread) {
            return Err(StreamError::UnknownThread(thread.clone()));
        }

        let run_id = self.registry.next_run_id();
        let mut record = RunRecord::pending(
            thread.clone(),
            run_id.clone(),
            request.task.clone(),
            self.clock.now(),
        );
        record.context_data = request.context_data.clone();
        record.parameters = request.parameters.clone();
        self.registry
            .record_run(record)
            .map_err(|e| StreamError::Internal(e.to_string()))?;

        let job = DispatchJob {
            thread_id: thread.clone(),
            run_id: run_id.clone(),
            user_id: request.user_id.unwrap_or_else(|| "anonymous".to_string()),
            task: request.task,
            context_data: request.context_data,
            parameters: request.parameters,
        };
        self.queue
            .enqueue(job)
            .await
            .map_err(|e| StreamError::Internal(e.to_string()))?;

        self.registry
            .update_run_status(thread, &run_id, RunStatus::Processing, None)
            .map_err(|e| StreamError::Internal(e.to_string()))?;

        info!(thread = %thread, run = %run_id, "task dispatched");
        Ok(run_id)
    }
}

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod tests;
