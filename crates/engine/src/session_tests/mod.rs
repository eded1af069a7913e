// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::publisher::Publisher;
use relay_adapters::NoOpResultSink;
use relay_core::event::test_support::{event, event_uuid};
use relay_core::{AgentEvent, CurrentState, FakeClock, RunId};
use relay_log::{ListLog, ListNotifier};

mod await_log;
mod replay;
mod tail;
mod timeouts;

/// Config with intervals shrunk for fast tests.
pub(crate) fn test_config() -> StreamConfig {
    StreamConfig {
        max_log_length: 100,
        read_count: 50,
        tail_block: Duration::from_millis(50),
        keep_alive_interval: Duration::from_secs(60),
        message_queue_max_size: 16,
        stream_check_interval: Duration::from_millis(10),
        connection_timeout_check_interval: Duration::from_millis(20),
        ..StreamConfig::default()
    }
}

pub(crate) struct Harness {
    pub log: ListLog<FakeClock>,
    pub notifier: ListNotifier,
    pub clock: FakeClock,
    pub config: StreamConfig,
    pub thread: ThreadId,
}

pub(crate) type TestSession = StreamSession<ListLog<FakeClock>, ListNotifier, FakeClock>;
pub(crate) type TestPublisher = Publisher<ListLog<FakeClock>, ListNotifier, NoOpResultSink, FakeClock>;

impl Harness {
    pub fn new(config: StreamConfig) -> Self {
        let clock = FakeClock::new();
        Self {
            log: ListLog::with_clock(&config, clock.clone()),
            notifier: ListNotifier::new(),
            clock,
            config,
            thread: ThreadId::new("thread-test"),
        }
    }

    pub fn session(&self, resume: Option<Cursor>) -> TestSession {
        StreamSession::new(
            self.log.clone(),
            self.notifier.clone(),
            self.clock.clone(),
            self.config.clone(),
            self.thread.clone(),
            resume,
        )
    }

    pub fn publisher(&self) -> TestPublisher {
        Publisher::new(
            self.log.clone(),
            self.notifier.clone(),
            NoOpResultSink,
            self.clock.clone(),
        )
    }

    pub async fn publish(&self, event: AgentEvent) -> Cursor {
        self.publisher()
            .publish(&self.thread, &RunId::new("run-test"), event)
            .await
            .unwrap()
    }
}

/// Spawn a session and a frame collector; returns (session handle, frames handle).
pub(crate) fn spawn_session(
    session: TestSession,
) -> (
    tokio::task::JoinHandle<Result<(), StreamError>>,
    tokio::task::JoinHandle<Vec<SseFrame>>,
) {
    let (tx, mut rx) = mpsc::channel(64);
    let run = tokio::spawn(session.run(tx));
    let collect = tokio::spawn(async move {
        let mut frames = Vec::new();
        while let Some(frame) = rx.recv().await {
            frames.push(frame);
        }
        frames
    });
    (run, collect)
}

/// Names of the frames, in order, for compact assertions.
pub(crate) fn names(frames: &[SseFrame]) -> Vec<String> {
    frames.iter().map(|f| f.event_name().to_string()).collect()
}

/// The delivered business event UUIDs, in order.
pub(crate) fn business_uuids(frames: &[SseFrame]) -> Vec<String> {
    frames
        .iter()
        .filter_map(|f| match f {
            SseFrame::Business(ev) => Some(ev.uuid.clone()),
            _ => None,
        })
        .collect()
}

/// The trailing status frame, if any.
pub(crate) fn last_status(frames: &[SseFrame]) -> Option<StatusKind> {
    match frames.last() {
        Some(SseFrame::Status { status, .. }) => Some(*status),
        _ => None,
    }
}
