// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker-side attachment to the dispatch queue
//!
//! Production deployments run the agent loop in separate worker processes
//! that drain the dispatch queue and publish events back. This module
//! provides the in-process options: a drain logger that only records
//! dispatched jobs (the default), and a loopback worker that acknowledges
//! each job with a pair of events so the full publish/stream path can be
//! exercised without an agent runtime.

use relay_adapters::DispatchJob;
use relay_core::{
    AgentEvent, ControlSignal, CurrentState, Domain, ExecuteResult, ExecuteType, RunStatus,
    UuidIdGen,
};
use relay_engine::StreamError;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::lifecycle::{GatewayRegistry, ListPublisher, StreamPublisher};

/// Drain the dispatch queue, logging each job for an external worker pool
/// to pick up out of band.
pub fn spawn_drain_logger(mut rx: mpsc::Receiver<DispatchJob>) {
    tokio::spawn(async move {
        while let Some(job) = rx.recv().await {
            info!(
                thread = %job.thread_id,
                run = %job.run_id,
                user = %job.user_id,
                "job dispatched; no in-process worker configured"
            );
        }
    });
}

/// Loopback worker: acknowledges every job with an assistant response and
/// a terminal completion, publishing into both backends.
pub struct LoopbackWorker {
    registry: GatewayRegistry,
    list_publisher: ListPublisher,
    stream_publisher: StreamPublisher,
}

impl LoopbackWorker {
    pub fn new(
        registry: GatewayRegistry,
        list_publisher: ListPublisher,
        stream_publisher: StreamPublisher,
    ) -> Self {
        Self {
            registry,
            list_publisher,
            stream_publisher,
        }
    }

    pub fn spawn(self, mut rx: mpsc::Receiver<DispatchJob>) {
        tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                if let Err(e) = self.process(&job).await {
                    warn!(
                        thread = %job.thread_id,
                        run = %job.run_id,
                        error = %e,
                        "loopback worker failed to process job"
                    );
                }
            }
        });
    }

    async fn process(&self, job: &DispatchJob) -> Result<(), StreamError> {
        let mut ack = AgentEvent::new(
            Domain::AgentExecute.generate(&UuidIdGen),
            ExecuteType::AssistantResponse,
            CurrentState::Processing,
        );
        ack.execute_result = Some(ExecuteResult::AssistantResponse(format!(
            "Accepted task: {}",
            job.task
        )));
        self.publish_both(job, ack).await?;

        let mut done = AgentEvent::new(
            Domain::AgentExecute.generate(&UuidIdGen),
            ExecuteType::FlowCompletion,
            CurrentState::Complete,
        );
        done.execute_result = Some(ExecuteResult::FlowCompletion(
            "Task acknowledged by loopback worker".to_string(),
        ));
        self.publish_both(job, done).await?;

        self.list_publisher
            .publish_control(&job.thread_id, ControlSignal::EndStream)
            .await?;
        self.stream_publisher
            .publish_control(&job.thread_id, ControlSignal::EndStream)
            .await?;

        if let Err(e) = self.registry.update_run_status(
            &job.thread_id,
            &job.run_id,
            RunStatus::Completed,
            None,
        ) {
            warn!(run = %job.run_id, error = %e, "failed to mark run completed");
        }
        Ok(())
    }

    async fn publish_both(&self, job: &DispatchJob, event: AgentEvent) -> Result<(), StreamError> {
        self.list_publisher
            .publish(&job.thread_id, &job.run_id, event.clone())
            .await?;
        self.stream_publisher
            .publish(&job.thread_id, &job.run_id, event)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
