// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP result sink posting terminal results to the internal API.

use super::{ResultSink, SinkError};
use async_trait::async_trait;
use relay_core::{AgentEvent, RunId, ThreadId};
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct HttpResultSink {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpResultSink {
    /// `base_url` is the internal API root, e.g. `http://backend:8080`.
    pub fn new(base_url: &str) -> Result<Self, SinkError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| SinkError::Request(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: format!("{}/task/agent/internal-api", base_url.trim_end_matches('/')),
        })
    }
}

#[async_trait]
impl ResultSink for HttpResultSink {
    async fn save_terminal(
        &self,
        thread: &ThreadId,
        run: &RunId,
        event: &AgentEvent,
    ) -> Result<(), SinkError> {
        let body = serde_json::json!({
            "flow_uuid": thread,
            "flow_input_uuid": run,
            "task_agent_execute_do": event,
        });

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| SinkError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SinkError::Status(response.status().as_u16()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_is_derived_from_base_url() {
        let sink = HttpResultSink::new("http://backend:8080/").unwrap();
        assert_eq!(sink.endpoint, "http://backend:8080/task/agent/internal-api");
    }
}
