// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared scenario harness: a publisher/session stack over either backend.

use std::path::Path;
use std::time::Duration;

use relay_adapters::FakeResultSink;
use relay_core::event::test_support::event_uuid;
use relay_core::{
    AgentEvent, ControlSignal, CurrentState, ExecuteType, SseFrame, StatusKind, StreamConfig,
    SystemClock, ThreadId,
};
use relay_engine::{Publisher, StreamError, StreamSession};
use relay_log::{
    Cursor, EventLog, ListLog, ListNotifier, Notifier, StreamLog, StreamNotifier,
};
use tokio::sync::mpsc;

/// Intervals shrunk for fast wall-clock scenario runs.
pub fn scenario_config() -> StreamConfig {
    StreamConfig {
        max_log_length: 100,
        read_count: 50,
        tail_block: Duration::from_millis(50),
        keep_alive_interval: Duration::from_secs(60),
        message_queue_max_size: 32,
        business_timeout: Duration::from_secs(10),
        connection_max_duration: Duration::from_secs(60),
        stream_check_interval: Duration::from_millis(20),
        connection_timeout_check_interval: Duration::from_millis(25),
        ..StreamConfig::default()
    }
}

/// One worker/gateway stack over a concrete backend pair.
pub struct Stack<L: EventLog, N: Notifier> {
    pub log: L,
    pub notifier: N,
    pub publisher: Publisher<L, N, FakeResultSink, SystemClock>,
    pub sink: FakeResultSink,
    pub config: StreamConfig,
    pub thread: ThreadId,
}

pub fn list_stack(config: StreamConfig) -> Stack<ListLog, ListNotifier> {
    let log = ListLog::new(&config);
    let notifier = ListNotifier::new();
    let sink = FakeResultSink::new();
    let publisher = Publisher::new(log.clone(), notifier.clone(), sink.clone(), SystemClock);
    Stack {
        log,
        notifier,
        publisher,
        sink,
        config,
        thread: ThreadId::new("thread-spec"),
    }
}

pub fn stream_stack(dir: &Path, config: StreamConfig) -> Stack<StreamLog, StreamNotifier> {
    let log = StreamLog::new(dir, &config);
    let notifier = StreamNotifier::new(log.clone());
    let sink = FakeResultSink::new();
    let publisher = Publisher::new(log.clone(), notifier.clone(), sink.clone(), SystemClock);
    Stack {
        log,
        notifier,
        publisher,
        sink,
        config,
        thread: ThreadId::new("thread-spec"),
    }
}

impl<L: EventLog, N: Notifier> Stack<L, N> {
    pub fn session(&self, resume: Option<Cursor>) -> StreamSession<L, N, SystemClock> {
        StreamSession::new(
            self.log.clone(),
            self.notifier.clone(),
            SystemClock,
            self.config.clone(),
            self.thread.clone(),
            resume,
        )
    }

    pub async fn publish(&self, event: AgentEvent) -> Cursor {
        self.publisher
            .publish(&self.thread, &relay_core::RunId::new("run-spec"), event)
            .await
            .expect("publish failed")
    }

    pub async fn control(&self, signal: ControlSignal) {
        self.publisher
            .publish_control(&self.thread, signal)
            .await
            .expect("control publish failed");
    }

    /// Spawn a session and collect frames until the stream closes.
    pub fn spawn(
        &self,
        resume: Option<Cursor>,
    ) -> (
        tokio::task::JoinHandle<Result<(), StreamError>>,
        tokio::task::JoinHandle<Vec<SseFrame>>,
    ) {
        let (tx, mut rx) = mpsc::channel(64);
        let run = tokio::spawn(self.session(resume).run(tx));
        let collect = tokio::spawn(async move {
            let mut frames = Vec::new();
            while let Some(frame) = rx.recv().await {
                frames.push(frame);
            }
            frames
        });
        (run, collect)
    }
}

/// Minimal business event.
pub fn ev(n: u64, state: CurrentState) -> AgentEvent {
    AgentEvent::new(event_uuid(n), ExecuteType::AssistantResponse, state)
}

pub fn uuid(n: u64) -> String {
    event_uuid(n)
}

pub fn frame_names(frames: &[SseFrame]) -> Vec<&str> {
    frames.iter().map(|f| f.event_name()).collect()
}

pub fn business_uuids(frames: &[SseFrame]) -> Vec<String> {
    frames
        .iter()
        .filter_map(|f| match f {
            SseFrame::Business(ev) => Some(ev.uuid.clone()),
            _ => None,
        })
        .collect()
}

pub fn last_status(frames: &[SseFrame]) -> Option<StatusKind> {
    match frames.last() {
        Some(SseFrame::Status { status, .. }) => Some(*status),
        _ => None,
    }
}

/// The encoded SSE text of a frame sequence, for wire-format assertions.
pub fn encode_all(frames: &[SseFrame]) -> String {
    frames
        .iter()
        .map(|f| f.encode().expect("frame encodes"))
        .collect()
}
