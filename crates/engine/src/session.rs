// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-connection stream session
//!
//! One `StreamSession` runs for each SSE connection, driving the phases
//! AWAIT_LOG → REPLAY → TAIL → TERMINAL:
//!
//! - **AWAIT_LOG**: emit one `waiting` frame and poll until the log
//!   exists, bounded by the business timeout;
//! - **REPLAY**: deliver stored history from the resume cursor in
//!   position order;
//! - **TAIL**: three producer tasks (reader, keep-alive ticker, timeout
//!   monitor) feed one bounded queue; a single drain loop yields frames
//!   to the client;
//! - **TERMINAL**: abort producers, await their cleanup, return.
//!
//! Frames flow through a bounded `mpsc::Sender<SseFrame>`; the receiver
//! side backs the HTTP response body, and a closed receiver doubles as the
//! client-disconnect probe. Keep-alive producers drop on a full queue;
//! the reader blocks, which throttles the log tail. A terminal `status`
//! frame is always the last frame of a session; timeouts close silently.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use relay_core::{Clock, ControlSignal, SseFrame, StatusKind, StreamConfig, ThreadId};
use relay_log::{Cursor, EntryPayload, EventLog, Notifier, Subscription, Wakeup};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::error::StreamError;

/// Tagged message on the session's bounded queue.
enum QueueItem {
    Entry(Cursor, EntryPayload),
    KeepAlive,
    Control(ControlSignal),
    Fault(StreamError),
}

/// True when more than `limit` has elapsed between `since` and `now`.
fn elapsed_exceeds(now: DateTime<Utc>, since: DateTime<Utc>, limit: Duration) -> bool {
    now.signed_duration_since(since).to_std().ok() > Some(limit)
}

/// Shared session clocks checked by the timeout monitor.
///
/// System frames never touch `last_business`; only delivered business
/// events (including those found during replay) reset it.
#[derive(Clone)]
pub(crate) struct SessionTimers {
    inner: Arc<Mutex<TimerState>>,
}

struct TimerState {
    started: DateTime<Utc>,
    last_business: DateTime<Utc>,
}

impl SessionTimers {
    pub(crate) fn new(now: DateTime<Utc>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(TimerState {
                started: now,
                last_business: now,
            })),
        }
    }

    /// A business event was delivered at `now`.
    pub(crate) fn business_event(&self, now: DateTime<Utc>) {
        self.inner.lock().last_business = now;
    }

    /// Check the business-inactivity and absolute-duration ceilings.
    pub(crate) fn check(&self, now: DateTime<Utc>, config: &StreamConfig) -> Option<StreamError> {
        let state = self.inner.lock();
        if elapsed_exceeds(now, state.last_business, config.business_timeout) {
            return Some(StreamError::TimeoutExceeded);
        }
        if elapsed_exceeds(now, state.started, config.connection_max_duration) {
            return Some(StreamError::TimeoutExceeded);
        }
        None
    }
}

enum ReplayOutcome {
    /// A terminal event ended the stream during replay.
    Terminal,
    /// Replay drained; continue tailing after this cursor.
    Continue(Option<Cursor>),
}

/// Per-connection state machine producing SSE frames.
pub struct StreamSession<L, N, C> {
    log: L,
    notifier: N,
    clock: C,
    config: StreamConfig,
    thread: ThreadId,
    resume: Option<Cursor>,
}

impl<L, N, C> StreamSession<L, N, C>
where
    L: EventLog,
    N: Notifier,
    C: Clock,
{
    pub fn new(
        log: L,
        notifier: N,
        clock: C,
        config: StreamConfig,
        thread: ThreadId,
        resume: Option<Cursor>,
    ) -> Self {
        Self {
            log,
            notifier,
            clock,
            config,
            thread,
            resume,
        }
    }

    /// Drive the session to completion, pushing frames into `tx`.
    pub async fn run(self, tx: mpsc::Sender<SseFrame>) -> Result<(), StreamError> {
        let timers = SessionTimers::new(self.clock.now());
        let result = self.run_phases(&tx, &timers).await;
        match &result {
            Ok(()) => debug!(thread = %self.thread, "session complete"),
            Err(StreamError::ClientDisconnected) => {
                info!(thread = %self.thread, "client disconnected")
            }
            Err(StreamError::TimeoutExceeded) => {
                warn!(thread = %self.thread, "session timed out")
            }
            Err(e) => warn!(thread = %self.thread, error = %e, "session failed"),
        }
        result
    }

    async fn run_phases(
        &self,
        tx: &mpsc::Sender<SseFrame>,
        timers: &SessionTimers,
    ) -> Result<(), StreamError> {
        self.await_log(tx).await?;
        match self.replay(tx, timers).await? {
            ReplayOutcome::Terminal => Ok(()),
            ReplayOutcome::Continue(cursor) => self.tail(tx, cursor, timers).await,
        }
    }

    async fn send(&self, tx: &mpsc::Sender<SseFrame>, frame: SseFrame) -> Result<(), StreamError> {
        tx.send(frame)
            .await
            .map_err(|_| StreamError::ClientDisconnected)
    }

    /// AWAIT_LOG: emit one `waiting` frame, then poll `exists` until the
    /// log shows up or the business-timeout ceiling passes.
    async fn await_log(&self, tx: &mpsc::Sender<SseFrame>) -> Result<(), StreamError> {
        if self.log.exists(&self.thread).await? {
            return Ok(());
        }

        self.send(
            tx,
            SseFrame::Waiting {
                message: "stream not yet created".to_string(),
            },
        )
        .await?;

        let started = self.clock.now();
        loop {
            tokio::time::sleep(self.config.stream_check_interval).await;
            if tx.is_closed() {
                return Err(StreamError::ClientDisconnected);
            }
            if self.log.exists(&self.thread).await? {
                return Ok(());
            }
            if elapsed_exceeds(self.clock.now(), started, self.config.business_timeout) {
                return Err(StreamError::TimeoutExceeded);
            }
        }
    }

    /// REPLAY: deliver stored history from the resume cursor.
    async fn replay(
        &self,
        tx: &mpsc::Sender<SseFrame>,
        timers: &SessionTimers,
    ) -> Result<ReplayOutcome, StreamError> {
        let mut cursor = self.resume.clone();
        loop {
            let batch = self.log.range(&self.thread, cursor.as_ref()).await?;
            if batch.is_empty() {
                return Ok(ReplayOutcome::Continue(cursor));
            }
            for entry in batch {
                cursor = Some(entry.cursor);
                match entry.payload {
                    EntryPayload::Event(event) => {
                        timers.business_event(self.clock.now());
                        let state = event.current_state;
                        let terminal = event.is_terminal();
                        self.send(tx, SseFrame::Business(event)).await?;
                        if terminal {
                            self.send(tx, SseFrame::status(StatusKind::from_terminal(state)))
                                .await?;
                            return Ok(ReplayOutcome::Terminal);
                        }
                    }
                    EntryPayload::Malformed { error } => {
                        self.send(tx, SseFrame::Error { message: error }).await?;
                    }
                }
            }
        }
    }

    /// TAIL: spawn the three producers and drain the bounded queue until a
    /// terminal condition.
    async fn tail(
        &self,
        tx: &mpsc::Sender<SseFrame>,
        cursor: Option<Cursor>,
        timers: &SessionTimers,
    ) -> Result<(), StreamError> {
        let subscription = self.notifier.subscribe(&self.thread).await?;
        let (qtx, mut qrx) = mpsc::channel::<QueueItem>(self.config.message_queue_max_size);

        let reader = tokio::spawn(reader_task(
            self.log.clone(),
            self.thread.clone(),
            subscription,
            cursor,
            qtx.clone(),
            self.config.tail_block,
        ));
        let keepalive = tokio::spawn(keepalive_task(
            qtx.clone(),
            self.config.keep_alive_interval,
        ));
        let monitor = tokio::spawn(monitor_task(
            qtx,
            timers.clone(),
            self.clock.clone(),
            self.config.clone(),
            tx.clone(),
        ));

        let result = self.drain(tx, &mut qrx, timers).await;

        // TERMINAL: cancel producers and let each run its cleanup
        // (aborting the reader drops the subscription, which unsubscribes).
        reader.abort();
        keepalive.abort();
        monitor.abort();
        for handle in [reader, keepalive, monitor] {
            let _ = handle.await;
        }
        result
    }

    async fn drain(
        &self,
        tx: &mpsc::Sender<SseFrame>,
        qrx: &mut mpsc::Receiver<QueueItem>,
        timers: &SessionTimers,
    ) -> Result<(), StreamError> {
        while let Some(item) = qrx.recv().await {
            match item {
                QueueItem::Entry(_cursor, EntryPayload::Event(event)) => {
                    timers.business_event(self.clock.now());
                    let state = event.current_state;
                    let terminal = event.is_terminal();
                    self.send(tx, SseFrame::Business(event)).await?;
                    if terminal {
                        self.send(tx, SseFrame::status(StatusKind::from_terminal(state)))
                            .await?;
                        return Ok(());
                    }
                }
                QueueItem::Entry(_cursor, EntryPayload::Malformed { error }) => {
                    self.send(tx, SseFrame::Error { message: error }).await?;
                }
                QueueItem::KeepAlive => {
                    self.send(
                        tx,
                        SseFrame::KeepAlive {
                            timestamp: self.clock.now(),
                        },
                    )
                    .await?;
                }
                QueueItem::Control(signal) => {
                    self.send(tx, SseFrame::status(signal.status())).await?;
                    return Ok(());
                }
                QueueItem::Fault(err) => {
                    if !err.is_benign() {
                        // Best-effort terminal status before the abortive close
                        let _ = self
                            .send(
                                tx,
                                SseFrame::Status {
                                    status: StatusKind::Error,
                                    message: Some(err.to_string()),
                                },
                            )
                            .await;
                    }
                    return Err(err);
                }
            }
        }
        // All producers gone without a terminal condition
        Err(StreamError::Internal(
            "session queue closed unexpectedly".to_string(),
        ))
    }
}

/// Reader producer: wait for wake-ups, pull new entries, enqueue them.
///
/// Enqueueing blocks when the queue is full, which throttles the tail.
async fn reader_task<L: EventLog>(
    log: L,
    thread: ThreadId,
    mut subscription: Subscription,
    mut cursor: Option<Cursor>,
    qtx: mpsc::Sender<QueueItem>,
    block: Duration,
) {
    // Catch up once unconditionally: events published between replay and
    // subscribe would otherwise wait for the next notify.
    if !pull_entries(&log, &thread, &mut cursor, &qtx, None).await {
        return;
    }

    loop {
        match subscription.next(block).await {
            Wakeup::Data => {
                if !pull_entries(&log, &thread, &mut cursor, &qtx, Some(block)).await {
                    return;
                }
            }
            Wakeup::Timeout => continue,
            Wakeup::Control(signal) => {
                let _ = qtx.send(QueueItem::Control(signal)).await;
                return;
            }
            Wakeup::Closed => return,
        }
    }
}

/// Drain everything currently available after `cursor` into the queue.
/// Returns false when the reader should stop.
async fn pull_entries<L: EventLog>(
    log: &L,
    thread: &ThreadId,
    cursor: &mut Option<Cursor>,
    qtx: &mpsc::Sender<QueueItem>,
    block: Option<Duration>,
) -> bool {
    let mut first = true;
    loop {
        let result = match block {
            Some(block) if first => log.tail(thread, cursor.as_ref(), block).await,
            _ => log.range(thread, cursor.as_ref()).await,
        };
        first = false;

        match result {
            Ok(batch) => {
                if batch.is_empty() {
                    return true;
                }
                for entry in batch {
                    *cursor = Some(entry.cursor.clone());
                    if qtx
                        .send(QueueItem::Entry(entry.cursor, entry.payload))
                        .await
                        .is_err()
                    {
                        return false;
                    }
                }
            }
            Err(e) => {
                let _ = qtx.send(QueueItem::Fault(e.into())).await;
                return false;
            }
        }
    }
}

/// Keep-alive producer: non-blocking enqueue on each tick; drops when the
/// queue is full, never blocks the ticker.
async fn keepalive_task(qtx: mpsc::Sender<QueueItem>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker.tick().await; // completes immediately
    loop {
        ticker.tick().await;
        if let Err(mpsc::error::TrySendError::Closed(_)) = qtx.try_send(QueueItem::KeepAlive) {
            return;
        }
    }
}

/// Timeout monitor producer: each tick checks client disconnect, business
/// inactivity, and absolute connection age.
async fn monitor_task<C: Clock>(
    qtx: mpsc::Sender<QueueItem>,
    timers: SessionTimers,
    clock: C,
    config: StreamConfig,
    client: mpsc::Sender<SseFrame>,
) {
    let mut ticker = tokio::time::interval(config.connection_timeout_check_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker.tick().await; // completes immediately
    loop {
        ticker.tick().await;
        if client.is_closed() {
            let _ = qtx.send(QueueItem::Fault(StreamError::ClientDisconnected)).await;
            return;
        }
        if let Some(err) = timers.check(clock.now(), &config) {
            let _ = qtx.send(QueueItem::Fault(err)).await;
            return;
        }
    }
}

#[cfg(test)]
#[path = "session_tests/mod.rs"]
mod tests;
