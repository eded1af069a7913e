// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy for the streaming core
//!
//! Only two failures recover locally: a malformed stored entry (surfaced as
//! an inline `error` frame) and a terminal-result sink failure (logged and
//! swallowed by the publisher). Every other kind terminates the session.

use relay_core::ThreadId;
use relay_log::{LogError, NotifyError};
use thiserror::Error;

/// Errors that terminate a stream session or reject a request.
#[derive(Debug, Error)]
pub enum StreamError {
    /// Thread validation failed; no stream is opened.
    #[error("unknown thread: {0}")]
    UnknownThread(ThreadId),
    /// The client went away; logged at info, not an error.
    #[error("client disconnected")]
    ClientDisconnected,
    /// Await-log ceiling, business inactivity, or absolute duration hit.
    #[error("timeout exceeded")]
    TimeoutExceeded,
    #[error("log backend error: {0}")]
    LogBackend(#[from] LogError),
    #[error("notifier backend error: {0}")]
    NotifierBackend(#[from] NotifyError),
    #[error("internal error: {0}")]
    Internal(String),
}

impl StreamError {
    /// Whether the condition is part of normal client behavior rather than
    /// a server-side failure.
    pub fn is_benign(&self) -> bool {
        matches!(
            self,
            StreamError::ClientDisconnected | StreamError::TimeoutExceeded
        )
    }
}
