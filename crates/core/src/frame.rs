// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! SSE wire frames and control signals
//!
//! Business frames carry worker-published events; system frames (`waiting`,
//! `keep_alive`, `error`, `status`) originate from the stream session only.
//! Frame names for business events are their `execute_type` strings, so the
//! reserved system names must never collide with those.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::event::{AgentEvent, CurrentState};

/// Envelope `type` tag for stored business records (list backend).
pub const BUSINESS_EVENT_NAME: &str = "task_agent_execute";

/// Reserved system frame names; disjoint from every business event type.
pub const RESERVED_FRAME_NAMES: [&str; 4] = ["waiting", "keep_alive", "error", "status"];

/// Out-of-band worker lifecycle signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlSignal {
    #[serde(rename = "STOP")]
    Stop,
    #[serde(rename = "END_STREAM")]
    EndStream,
    #[serde(rename = "ERROR")]
    Error,
}

impl ControlSignal {
    pub fn as_str(&self) -> &'static str {
        match self {
            ControlSignal::Stop => "STOP",
            ControlSignal::EndStream => "END_STREAM",
            ControlSignal::Error => "ERROR",
        }
    }

    /// Terminal status a control signal maps onto.
    pub fn status(&self) -> StatusKind {
        match self {
            ControlSignal::Stop => StatusKind::Stopped,
            ControlSignal::EndStream => StatusKind::Completed,
            ControlSignal::Error => StatusKind::Failed,
        }
    }
}

impl std::fmt::Display for ControlSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal outcome reported on the final `status` frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusKind {
    Completed,
    Failed,
    Stopped,
    Error,
}

impl StatusKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusKind::Completed => "completed",
            StatusKind::Failed => "failed",
            StatusKind::Stopped => "stopped",
            StatusKind::Error => "error",
        }
    }

    /// Status for a delivered terminal event.
    pub fn from_terminal(state: CurrentState) -> Self {
        match state {
            CurrentState::Error => StatusKind::Failed,
            _ => StatusKind::Completed,
        }
    }
}

/// One frame of an SSE stream, encoded as `event: <name>\ndata: <json>\n\n`.
#[derive(Debug, Clone, PartialEq)]
pub enum SseFrame {
    /// A worker-published event; frame name is the event's type string.
    Business(AgentEvent),
    /// The stream has not been created yet.
    Waiting { message: String },
    /// Liveness tick; never resets the business-inactivity clock.
    KeepAlive { timestamp: DateTime<Utc> },
    /// A stored entry failed to decode; the stream continues.
    Error { message: String },
    /// Terminal frame; always the last frame of a session.
    Status {
        status: StatusKind,
        message: Option<String>,
    },
}

impl SseFrame {
    pub fn status(status: StatusKind) -> Self {
        SseFrame::Status {
            status,
            message: None,
        }
    }

    pub fn event_name(&self) -> &str {
        match self {
            SseFrame::Business(ev) => ev.execute_type.as_str(),
            SseFrame::Waiting { .. } => "waiting",
            SseFrame::KeepAlive { .. } => "keep_alive",
            SseFrame::Error { .. } => "error",
            SseFrame::Status { .. } => "status",
        }
    }

    pub fn is_business(&self) -> bool {
        matches!(self, SseFrame::Business(_))
    }

    pub fn is_status(&self) -> bool {
        matches!(self, SseFrame::Status { .. })
    }

    /// JSON body of the `data:` line, null fields omitted.
    pub fn data_json(&self) -> Result<String, serde_json::Error> {
        let value = match self {
            SseFrame::Business(ev) => serde_json::to_value(ev)?,
            SseFrame::Waiting { message } => serde_json::json!({
                "type": "waiting",
                "message": message,
            }),
            SseFrame::KeepAlive { timestamp } => serde_json::json!({
                "type": "keep_alive",
                "timestamp": timestamp,
            }),
            SseFrame::Error { message } => serde_json::json!({
                "type": "error",
                "message": message,
            }),
            SseFrame::Status { status, message } => match message {
                Some(message) => serde_json::json!({
                    "type": "status",
                    "status": status,
                    "message": message,
                }),
                None => serde_json::json!({
                    "type": "status",
                    "status": status,
                }),
            },
        };
        serde_json::to_string(&value)
    }

    /// Full SSE encoding of the frame.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        Ok(format!(
            "event: {}\ndata: {}\n\n",
            self.event_name(),
            self.data_json()?
        ))
    }
}

#[cfg(test)]
#[path = "frame_tests.rs"]
mod tests;
