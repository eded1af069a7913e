// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Thread-mode endpoints: initiate, execute, stream

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::Json;
use chrono::{DateTime, Utc};
use relay_core::{Clock, RunStatus, ThreadId, ThreadStatus};
use relay_engine::ExecuteRequest;
use relay_log::EventLog;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{parse_cursor, spawn_stream, ApiError};
use crate::lifecycle::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct InitiateBody {
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub context: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct InitiateResponse {
    pub thread_id: ThreadId,
    pub created_at: DateTime<Utc>,
    pub status: ThreadStatus,
}

/// `POST /agent/initiate`: create a new thread.
pub async fn initiate(
    State(state): State<AppState>,
    body: Option<Json<InitiateBody>>,
) -> Result<Json<InitiateResponse>, ApiError> {
    let Json(body) = body.unwrap_or_default();
    let thread_id = state.registry.create_thread(body.metadata, body.context);
    let created_at = state
        .registry
        .metadata(&thread_id)
        .map(|meta| meta.created_at)
        .unwrap_or_else(|| state.clock.now());

    Ok(Json(InitiateResponse {
        thread_id,
        created_at,
        status: ThreadStatus::Active,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ExecuteBody {
    pub task: String,
    #[serde(default)]
    pub context_data: Vec<serde_json::Value>,
    #[serde(default)]
    pub parameters: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub user_uuid: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ExecuteResponse {
    pub thread_id: ThreadId,
    pub run_id: relay_core::RunId,
    pub status: RunStatus,
    pub created_at: DateTime<Utc>,
}

/// `POST /agent/{thread_id}/execute`: submit a task to a thread.
pub async fn execute(
    State(state): State<AppState>,
    Path(thread_id): Path<String>,
    Json(body): Json<ExecuteBody>,
) -> Result<Json<ExecuteResponse>, ApiError> {
    if body.task.trim().is_empty() {
        return Err(ApiError::bad_request("task must not be empty"));
    }

    let thread = ThreadId::new(thread_id);
    let run_id = state
        .dispatch
        .execute(
            &thread,
            ExecuteRequest {
                task: body.task,
                context_data: body.context_data,
                parameters: body.parameters,
                user_id: body.user_uuid,
            },
        )
        .await?;

    Ok(Json(ExecuteResponse {
        thread_id: thread,
        run_id,
        status: RunStatus::Processing,
        created_at: state.clock.now(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct StreamQuery {
    pub last_id: Option<String>,
}

/// `GET /agent/{thread_id}/stream?last_id=`: SSE stream over the
/// list+pubsub backend.
pub async fn stream(
    State(state): State<AppState>,
    Path(thread_id): Path<String>,
    Query(query): Query<StreamQuery>,
) -> Result<Response, ApiError> {
    let thread = ThreadId::new(thread_id.trim());
    if !state.registry.validate(&thread) {
        return Err(ApiError::not_found(format!(
            "thread {thread} not found or inactive"
        )));
    }

    info!(thread = %thread, last_id = ?query.last_id, "SSE connection accepted");
    let cursor = parse_cursor(query.last_id.as_deref());

    // Pre-flight: surface an invalid cursor or an unreachable backend as a
    // status code while we still can
    state
        .list_log
        .range(&thread, cursor.as_ref())
        .await
        .map_err(relay_engine::StreamError::from)?;

    Ok(spawn_stream(
        &state,
        state.list_log.clone(),
        state.list_notifier.clone(),
        thread,
        cursor,
    ))
}
