// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP routing and the SSE plumbing shared by the stream endpoints

mod error;
mod events;
mod health;
mod threads;

pub use error::ApiError;

use std::convert::Infallible;

use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use futures::StreamExt;
use relay_core::{SseFrame, ThreadId};
use relay_engine::StreamSession;
use relay_log::{Cursor, EventLog, Notifier};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::lifecycle::AppState;

/// Build the gateway router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/agent/initiate", post(threads::initiate))
        .route("/agent/:thread_id/execute", post(threads::execute))
        .route("/agent/:thread_id/stream", get(threads::stream))
        .route("/agent/event-stream", get(events::event_stream))
        .route("/health", get(health::health))
        .with_state(state)
}

/// Transport-side buffer between the session and the SSE encoder.
const FRAME_BUFFER: usize = 32;

/// Spawn a stream session over the given backend pair and return the SSE
/// response. The session logs its own outcome; dropping the response body
/// closes the channel, which the session observes as a disconnect.
pub(crate) fn spawn_stream<L, N>(
    state: &AppState,
    log: L,
    notifier: N,
    thread: ThreadId,
    cursor: Option<Cursor>,
) -> Response
where
    L: EventLog,
    N: Notifier,
{
    let (tx, rx) = mpsc::channel(FRAME_BUFFER);
    let session = StreamSession::new(
        log,
        notifier,
        state.clock,
        state.stream_config.clone(),
        thread,
        cursor,
    );
    tokio::spawn(async move {
        let _ = session.run(tx).await;
    });

    let stream = ReceiverStream::new(rx).map(sse_event);
    with_stream_headers(Sse::new(stream).into_response())
}

fn sse_event(frame: SseFrame) -> Result<Event, Infallible> {
    let event = match frame.data_json() {
        Ok(data) => Event::default().event(frame.event_name()).data(data),
        Err(e) => Event::default().event("error").data(
            serde_json::json!({
                "type": "error",
                "message": e.to_string(),
            })
            .to_string(),
        ),
    };
    Ok(event)
}

/// SSE responses must reach the client unbuffered.
fn with_stream_headers(mut response: Response) -> Response {
    use axum::http::{header, HeaderName, HeaderValue};
    let headers = response.headers_mut();
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-cache, no-transform"),
    );
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    headers.insert(
        HeaderName::from_static("x-accel-buffering"),
        HeaderValue::from_static("no"),
    );
    response
}

/// Parse an optional `last_id` query value into a resume cursor.
pub(crate) fn parse_cursor(last_id: Option<&str>) -> Option<Cursor> {
    last_id
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(Cursor::from)
}

#[cfg(test)]
#[path = "routes_tests.rs"]
mod tests;
