// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Event Log interface

use std::time::Duration;

use async_trait::async_trait;
use relay_core::{AgentEvent, ThreadId};
use thiserror::Error;

use crate::cursor::Cursor;

/// Errors from event log operations.
///
/// Callers must treat any of these as a connection-terminating condition,
/// except where a single entry surfaces as [`EntryPayload::Malformed`]
/// (local recovery).
#[derive(Debug, Error)]
pub enum LogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid cursor '{cursor}'")]
    InvalidCursor { cursor: String },
    #[error("log backend error: {0}")]
    Backend(String),
}

/// Decoded content of one log position.
#[derive(Debug, Clone, PartialEq)]
pub enum EntryPayload {
    /// A business event.
    Event(AgentEvent),
    /// The stored entry failed to decode; delivered as an inline `error`
    /// frame and the reader continues with the next position.
    Malformed { error: String },
}

/// One entry returned by `range`/`tail`: a position plus its payload.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub cursor: Cursor,
    pub payload: EntryPayload,
}

impl LogEntry {
    pub fn event(&self) -> Option<&AgentEvent> {
        match &self.payload {
            EntryPayload::Event(ev) => Some(ev),
            EntryPayload::Malformed { .. } => None,
        }
    }
}

/// Durable, ordered per-thread event store.
///
/// Positions are totally ordered within a thread. `append` is idempotent on
/// event UUID: a colliding publish overwrites the stored payload in place,
/// keeps the first-appearance position, and preserves the original
/// `create_at`. Retention is bounded: once a thread's log exceeds its cap,
/// oldest entries are elided and readers holding an evicted cursor receive
/// only the surviving suffix.
#[async_trait]
pub trait EventLog: Clone + Send + Sync + 'static {
    /// Whether a log has been created for this thread.
    async fn exists(&self, thread: &ThreadId) -> Result<bool, LogError>;

    /// Append (or overwrite by UUID) and return the entry's position.
    async fn append(&self, thread: &ThreadId, event: AgentEvent) -> Result<Cursor, LogError>;

    /// Entries strictly after `after` (`None` = from the beginning), in
    /// position order, capped per call; callers loop to drain.
    async fn range(
        &self,
        thread: &ThreadId,
        after: Option<&Cursor>,
    ) -> Result<Vec<LogEntry>, LogError>;

    /// Like `range`, but blocks up to `block` waiting for new entries.
    /// May return empty on timeout; safe to call repeatedly with the last
    /// returned position.
    async fn tail(
        &self,
        thread: &ThreadId,
        after: Option<&Cursor>,
        block: Duration,
    ) -> Result<Vec<LogEntry>, LogError>;

    /// Number of live entries (absolute index space for the list shape).
    async fn len(&self, thread: &ThreadId) -> Result<u64, LogError>;
}
