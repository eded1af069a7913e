// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! No-op result sink for deployments without the internal API.

use super::{ResultSink, SinkError};
use async_trait::async_trait;
use relay_core::{AgentEvent, RunId, ThreadId};

#[derive(Clone, Copy, Default)]
pub struct NoOpResultSink;

#[async_trait]
impl ResultSink for NoOpResultSink {
    async fn save_terminal(
        &self,
        _thread: &ThreadId,
        _run: &RunId,
        _event: &AgentEvent,
    ) -> Result<(), SinkError> {
        Ok(())
    }
}
