// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Legacy flow-mode SSE endpoint
//!
//! Addresses a stream by `(flowUuid, flowInputUuid)`. The composite key is
//! a synonym for the thread key: `flowUuid` selects the stream and
//! `flowInputUuid` is shape-checked only. Legacy flows predate the thread
//! registry, so there is no registry validation here; a stream that never
//! materializes ends with the await-log timeout.

use axum::extract::{Query, State};
use axum::response::Response;
use relay_core::ThreadId;
use relay_log::EventLog;
use serde::Deserialize;
use tracing::info;

use super::{parse_cursor, spawn_stream, ApiError};
use crate::lifecycle::AppState;

#[derive(Debug, Deserialize)]
pub struct EventStreamQuery {
    #[serde(rename = "flowUuid")]
    pub flow_uuid: String,
    #[serde(rename = "flowInputUuid")]
    pub flow_input_uuid: String,
    pub last_id: Option<String>,
}

/// `GET /agent/event-stream?flowUuid=&flowInputUuid=&last_id=`: SSE
/// stream over the stream-log backend.
pub async fn event_stream(
    State(state): State<AppState>,
    Query(query): Query<EventStreamQuery>,
) -> Result<Response, ApiError> {
    let flow_uuid = query.flow_uuid.trim();
    let flow_input_uuid = query.flow_input_uuid.trim();
    if flow_uuid.is_empty() {
        return Err(ApiError::bad_request("flowUuid must not be empty"));
    }
    if flow_input_uuid.is_empty() {
        return Err(ApiError::bad_request("flowInputUuid must not be empty"));
    }

    info!(
        flow = flow_uuid,
        flow_input = flow_input_uuid,
        last_id = ?query.last_id,
        "legacy SSE connection accepted"
    );

    let thread = ThreadId::new(flow_uuid);
    let cursor = parse_cursor(query.last_id.as_deref());

    // Pre-flight: surface an invalid cursor or an unreachable backend as a
    // status code while we still can
    state
        .stream_log
        .range(&thread, cursor.as_ref())
        .await
        .map_err(relay_engine::StreamError::from)?;

    Ok(spawn_stream(
        &state,
        state.stream_log.clone(),
        state.stream_notifier.clone(),
        thread,
        cursor,
    ))
}
