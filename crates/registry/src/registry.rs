// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The thread registry

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use relay_core::{
    Clock, Domain, IdGen, RunId, RunRecord, RunStatus, ThreadId, ThreadMetadata, ThreadStatus,
};
use thiserror::Error;
use tracing::info;

use crate::state::RegistryState;

/// Errors from registry operations
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("unknown thread: {0}")]
    UnknownThread(ThreadId),
    #[error("unknown run {run} in thread {thread}")]
    UnknownRun { thread: ThreadId, run: RunId },
}

/// Thread/run metadata authority.
///
/// Cheap to clone; clones share state.
pub struct ThreadRegistry<C: Clock, I: IdGen> {
    state: Arc<Mutex<RegistryState>>,
    clock: C,
    ids: I,
}

impl<C: Clock, I: IdGen> Clone for ThreadRegistry<C, I> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            clock: self.clock.clone(),
            ids: self.ids.clone(),
        }
    }
}

impl<C: Clock, I: IdGen> ThreadRegistry<C, I> {
    pub fn new(clock: C, ids: I) -> Self {
        Self::with_state(RegistryState::default(), clock, ids)
    }

    /// Start from a recovered snapshot state.
    pub fn with_state(state: RegistryState, clock: C, ids: I) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
            clock,
            ids,
        }
    }

    /// Create a thread and return its ID.
    pub fn create_thread(
        &self,
        metadata: HashMap<String, serde_json::Value>,
        context: Option<serde_json::Value>,
    ) -> ThreadId {
        let thread_id = ThreadId::new(Domain::Thread.generate(&self.ids));
        let now = self.clock.now();
        let meta = ThreadMetadata {
            thread_id: thread_id.clone(),
            status: ThreadStatus::Active,
            created_at: now,
            updated_at: now,
            metadata,
            run_count: 0,
            last_run_id: None,
        };

        let mut state = self.state.lock();
        state.threads.insert(thread_id.clone(), meta);
        if let Some(context) = context {
            state.contexts.insert(thread_id.clone(), context);
        }
        info!(thread = %thread_id, "thread created");
        thread_id
    }

    /// True iff the thread exists and is active.
    pub fn validate(&self, thread: &ThreadId) -> bool {
        let state = self.state.lock();
        state
            .threads
            .get(thread)
            .map(|meta| meta.status == ThreadStatus::Active)
            .unwrap_or(false)
    }

    pub fn metadata(&self, thread: &ThreadId) -> Option<ThreadMetadata> {
        self.state.lock().threads.get(thread).cloned()
    }

    pub fn context(&self, thread: &ThreadId) -> Option<serde_json::Value> {
        self.state.lock().contexts.get(thread).cloned()
    }

    /// Generate a fresh run ID.
    pub fn next_run_id(&self) -> RunId {
        RunId::new(Domain::Run.generate(&self.ids))
    }

    /// Record a new run on its thread: prepend to the run list (trimmed to
    /// the last 100), bump `run_count`, set `last_run_id`.
    pub fn record_run(&self, record: RunRecord) -> Result<(), RegistryError> {
        let mut state = self.state.lock();
        let thread_id = record.thread_id.clone();
        let run_id = record.run_id.clone();
        let now = self.clock.now();

        let meta = state
            .threads
            .get_mut(&thread_id)
            .ok_or_else(|| RegistryError::UnknownThread(thread_id.clone()))?;
        meta.run_count += 1;
        meta.last_run_id = Some(run_id);
        meta.updated_at = now;

        state.push_run(record);
        Ok(())
    }

    pub fn run(&self, thread: &ThreadId, run: &RunId) -> Option<RunRecord> {
        self.state
            .lock()
            .runs
            .get(thread)
            .and_then(|runs| runs.records.get(run))
            .cloned()
    }

    /// Most recent runs, newest first.
    pub fn runs(&self, thread: &ThreadId, limit: usize) -> Vec<RunRecord> {
        let state = self.state.lock();
        let Some(runs) = state.runs.get(thread) else {
            return Vec::new();
        };
        runs.order
            .iter()
            .take(limit)
            .filter_map(|id| runs.records.get(id))
            .cloned()
            .collect()
    }

    /// Update a run's status, stamping `started_at` / `completed_at` as the
    /// status transitions.
    pub fn update_run_status(
        &self,
        thread: &ThreadId,
        run: &RunId,
        status: RunStatus,
        error: Option<String>,
    ) -> Result<(), RegistryError> {
        let now = self.clock.now();
        let mut state = self.state.lock();
        let record = state
            .runs
            .get_mut(thread)
            .and_then(|runs| runs.records.get_mut(run))
            .ok_or_else(|| RegistryError::UnknownRun {
                thread: thread.clone(),
                run: run.clone(),
            })?;

        record.status = status;
        if status == RunStatus::Processing && record.started_at.is_none() {
            record.started_at = Some(now);
        }
        if status.is_terminal() && record.completed_at.is_none() {
            record.completed_at = Some(now);
        }
        if error.is_some() {
            record.error = error;
        }
        Ok(())
    }

    pub fn update_thread_status(
        &self,
        thread: &ThreadId,
        status: ThreadStatus,
    ) -> Result<(), RegistryError> {
        let now = self.clock.now();
        let mut state = self.state.lock();
        let meta = state
            .threads
            .get_mut(thread)
            .ok_or_else(|| RegistryError::UnknownThread(thread.clone()))?;
        meta.status = status;
        meta.updated_at = now;
        Ok(())
    }

    /// Sweep TTL-expired threads and runs.
    pub fn expire_stale(&self, thread_ttl: Duration, run_ttl: Duration) {
        let now = self.clock.now();
        self.state.lock().expire_stale(now, thread_ttl, run_ttl);
    }

    /// Clone the state for checkpointing.
    pub fn snapshot_state(&self) -> RegistryState {
        self.state.lock().clone()
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
