// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake task queue for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{DispatchJob, QueueError, TaskQueue};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;

struct FakeQueueState {
    jobs: Vec<DispatchJob>,
    fail: bool,
}

/// Fake task queue recording enqueued jobs
#[derive(Clone)]
pub struct FakeTaskQueue {
    inner: Arc<Mutex<FakeQueueState>>,
}

impl Default for FakeTaskQueue {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeQueueState {
                jobs: Vec::new(),
                fail: false,
            })),
        }
    }
}

impl FakeTaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent enqueues fail.
    pub fn fail_enqueues(&self) {
        self.inner.lock().fail = true;
    }

    /// All recorded jobs, in enqueue order.
    pub fn jobs(&self) -> Vec<DispatchJob> {
        self.inner.lock().jobs.clone()
    }
}

#[async_trait]
impl TaskQueue for FakeTaskQueue {
    async fn enqueue(&self, job: DispatchJob) -> Result<(), QueueError> {
        let mut state = self.inner.lock();
        if state.fail {
            return Err(QueueError::SendFailed("fake failure".to_string()));
        }
        state.jobs.push(job);
        Ok(())
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
