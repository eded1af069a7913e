// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Translation of core errors to HTTP status codes

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use relay_engine::StreamError;
use relay_log::LogError;

/// Nginx convention for a client that closed the connection.
const CLIENT_CLOSED_REQUEST: u16 = 499;

/// An error surfaced to the HTTP client as `{"error": <message>}`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }
}

impl From<StreamError> for ApiError {
    fn from(err: StreamError) -> Self {
        let status = match &err {
            StreamError::UnknownThread(_) => StatusCode::NOT_FOUND,
            StreamError::ClientDisconnected => StatusCode::from_u16(CLIENT_CLOSED_REQUEST)
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            StreamError::TimeoutExceeded => StatusCode::REQUEST_TIMEOUT,
            StreamError::LogBackend(LogError::InvalidCursor { .. }) => StatusCode::BAD_REQUEST,
            StreamError::LogBackend(_) | StreamError::NotifierBackend(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            StreamError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "error": self.message }));
        (self.status, body).into_response()
    }
}
