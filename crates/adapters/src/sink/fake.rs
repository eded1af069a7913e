// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake result sink for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{ResultSink, SinkError};
use async_trait::async_trait;
use parking_lot::Mutex;
use relay_core::{AgentEvent, RunId, ThreadId};
use std::sync::Arc;

/// Recorded save call
#[derive(Debug, Clone)]
pub struct SinkCall {
    pub thread: ThreadId,
    pub run: RunId,
    pub event: AgentEvent,
}

struct FakeSinkState {
    calls: Vec<SinkCall>,
    fail: bool,
}

/// Fake result sink recording terminal saves
#[derive(Clone)]
pub struct FakeResultSink {
    inner: Arc<Mutex<FakeSinkState>>,
}

impl Default for FakeResultSink {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeSinkState {
                calls: Vec::new(),
                fail: false,
            })),
        }
    }
}

impl FakeResultSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent saves fail.
    pub fn fail_saves(&self) {
        self.inner.lock().fail = true;
    }

    /// All recorded saves, in call order.
    pub fn calls(&self) -> Vec<SinkCall> {
        self.inner.lock().calls.clone()
    }
}

#[async_trait]
impl ResultSink for FakeResultSink {
    async fn save_terminal(
        &self,
        thread: &ThreadId,
        run: &RunId,
        event: &AgentEvent,
    ) -> Result<(), SinkError> {
        let mut state = self.inner.lock();
        if state.fail {
            return Err(SinkError::Request("fake failure".to_string()));
        }
        state.calls.push(SinkCall {
            thread: thread.clone(),
            run: run.clone(),
            event: event.clone(),
        });
        Ok(())
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
