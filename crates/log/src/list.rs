// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! List-shaped event log: indexed list per thread with pub/sub channels
//!
//! The list keyspace mirrors `agent_run:<thread>:responses`: each element is
//! an envelope `{type, uuid, data, timestamp}`, positions are integer
//! indices, and a UUID-colliding publish overwrites its element in place.
//! Two notification channels per thread carry data wake-ups
//! (`:new_response`) and terminal control signals (`:control`).
//!
//! Indices are absolute: trimming drops elements from the front but the
//! remaining elements keep their positions, so `len` works as a resume
//! cursor across retention.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use relay_core::{
    AgentEvent, Clock, ControlSignal, StreamConfig, SystemClock, ThreadId, BUSINESS_EVENT_NAME,
};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc, Notify};

use crate::cursor::Cursor;
use crate::log::{EntryPayload, EventLog, LogEntry, LogError};
use crate::notify::{NotifyError, Notifier, SubMessage, Subscription};

/// Stored list element: the response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ListRecord {
    #[serde(rename = "type")]
    kind: String,
    uuid: String,
    data: AgentEvent,
    timestamp: DateTime<Utc>,
}

struct ListState {
    records: Vec<ListRecord>,
    /// Event UUID -> index into `records`.
    by_uuid: HashMap<String, usize>,
    /// Count of elements trimmed from the front; absolute position of
    /// `records[i]` is `base + i`.
    base: u64,
    last_touch: DateTime<Utc>,
}

struct ThreadList {
    state: Mutex<ListState>,
    notify: Notify,
}

struct Inner<C: Clock> {
    max_len: usize,
    read_count: usize,
    ttl: Duration,
    clock: C,
    threads: Mutex<HashMap<ThreadId, Arc<ThreadList>>>,
}

/// In-memory indexed list log with integer positions.
pub struct ListLog<C: Clock = SystemClock> {
    inner: Arc<Inner<C>>,
}

impl<C: Clock> Clone for ListLog<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl ListLog<SystemClock> {
    pub fn new(config: &StreamConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: Clock> ListLog<C> {
    pub fn with_clock(config: &StreamConfig, clock: C) -> Self {
        Self {
            inner: Arc::new(Inner {
                max_len: config.max_log_length,
                read_count: config.read_count,
                ttl: config.thread_ttl,
                clock,
                threads: Mutex::new(HashMap::new()),
            }),
        }
    }

    fn handle(&self, thread: &ThreadId, create: bool) -> Option<Arc<ThreadList>> {
        let mut threads = self.inner.threads.lock();
        if let Some(tl) = threads.get(thread) {
            return Some(Arc::clone(tl));
        }
        if !create {
            return None;
        }
        let tl = Arc::new(ThreadList {
            state: Mutex::new(ListState {
                records: Vec::new(),
                by_uuid: HashMap::new(),
                base: 0,
                last_touch: self.inner.clock.now(),
            }),
            notify: Notify::new(),
        });
        threads.insert(thread.clone(), Arc::clone(&tl));
        Some(tl)
    }

    fn collect_after(&self, state: &ListState, after: i64) -> Vec<LogEntry> {
        let start_abs = (after + 1).max(0) as u64;
        let skip = start_abs.saturating_sub(state.base) as usize;
        state
            .records
            .iter()
            .enumerate()
            .skip(skip)
            .take(self.inner.read_count)
            .map(|(i, record)| LogEntry {
                cursor: Cursor::new((state.base + i as u64).to_string()),
                payload: EntryPayload::Event(record.data.clone()),
            })
            .collect()
    }

    /// Drop threads idle past the TTL.
    pub fn expire_stale(&self, now: DateTime<Utc>) {
        let mut threads = self.inner.threads.lock();
        threads.retain(|_, tl| {
            let state = tl.state.lock();
            now.signed_duration_since(state.last_touch).to_std().ok() <= Some(self.inner.ttl)
        });
    }
}

/// Parse a list cursor: a decimal index. `None` means from the beginning.
fn parse_index(after: Option<&Cursor>) -> Result<i64, LogError> {
    match after {
        None => Ok(-1),
        Some(c) => c
            .as_str()
            .parse::<i64>()
            .map_err(|_| LogError::InvalidCursor {
                cursor: c.as_str().to_string(),
            }),
    }
}

#[async_trait]
impl<C: Clock> EventLog for ListLog<C> {
    async fn exists(&self, thread: &ThreadId) -> Result<bool, LogError> {
        Ok(self.handle(thread, false).is_some())
    }

    async fn append(&self, thread: &ThreadId, mut event: AgentEvent) -> Result<Cursor, LogError> {
        let tl = self
            .handle(thread, true)
            .ok_or_else(|| LogError::Backend("thread list unavailable".to_string()))?;
        let position = {
            let mut state = tl.state.lock();
            let now = self.inner.clock.now();
            state.last_touch = now;

            match state.by_uuid.get(&event.uuid).copied() {
                Some(i) => {
                    // Overwrite in place; position and create_at survive.
                    if let Some(create_at) = state.records[i].data.create_at {
                        event.create_at = Some(create_at);
                    }
                    state.records[i].data = event;
                    state.records[i].timestamp = now;
                    state.base + i as u64
                }
                None => {
                    let uuid = event.uuid.clone();
                    state.records.push(ListRecord {
                        kind: BUSINESS_EVENT_NAME.to_string(),
                        uuid: uuid.clone(),
                        data: event,
                        timestamp: now,
                    });
                    let idx = state.records.len() - 1;
                    state.by_uuid.insert(uuid, idx);

                    if state.records.len() > self.inner.max_len {
                        let excess = state.records.len() - self.inner.max_len;
                        state.records.drain(..excess);
                        state.base += excess as u64;
                        let rebuilt = state
                            .records
                            .iter()
                            .enumerate()
                            .map(|(i, r)| (r.uuid.clone(), i))
                            .collect();
                        state.by_uuid = rebuilt;
                    }
                    state.base + (state.records.len() - 1) as u64
                }
            }
        };

        tl.notify.notify_waiters();
        Ok(Cursor::new(position.to_string()))
    }

    async fn range(
        &self,
        thread: &ThreadId,
        after: Option<&Cursor>,
    ) -> Result<Vec<LogEntry>, LogError> {
        let after_idx = parse_index(after)?;
        match self.handle(thread, false) {
            Some(tl) => {
                let state = tl.state.lock();
                Ok(self.collect_after(&state, after_idx))
            }
            None => Ok(Vec::new()),
        }
    }

    async fn tail(
        &self,
        thread: &ThreadId,
        after: Option<&Cursor>,
        block: Duration,
    ) -> Result<Vec<LogEntry>, LogError> {
        let after_idx = parse_index(after)?;
        let deadline = tokio::time::Instant::now() + block;
        let Some(tl) = self.handle(thread, true) else {
            return Ok(Vec::new());
        };

        loop {
            let notified = tl.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let state = tl.state.lock();
                let batch = self.collect_after(&state, after_idx);
                if !batch.is_empty() {
                    return Ok(batch);
                }
            }

            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Ok(Vec::new());
            }
        }
    }

    async fn len(&self, thread: &ThreadId) -> Result<u64, LogError> {
        match self.handle(thread, false) {
            Some(tl) => {
                let state = tl.state.lock();
                Ok(state.base + state.records.len() as u64)
            }
            None => Ok(0),
        }
    }
}

const DATA_CHANNEL_CAPACITY: usize = 64;
const CONTROL_CHANNEL_CAPACITY: usize = 16;

struct ChannelPair {
    data: broadcast::Sender<()>,
    control: broadcast::Sender<ControlSignal>,
}

/// Pub/sub notifier for the list shape: one data channel and one control
/// channel per thread, multiplexed into each subscription's queue.
#[derive(Clone)]
pub struct ListNotifier {
    channels: Arc<Mutex<HashMap<ThreadId, ChannelPair>>>,
}

impl ListNotifier {
    pub fn new() -> Self {
        Self {
            channels: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn pair(&self, thread: &ThreadId) -> (broadcast::Sender<()>, broadcast::Sender<ControlSignal>) {
        let mut channels = self.channels.lock();
        let pair = channels.entry(thread.clone()).or_insert_with(|| ChannelPair {
            data: broadcast::channel(DATA_CHANNEL_CAPACITY).0,
            control: broadcast::channel(CONTROL_CHANNEL_CAPACITY).0,
        });
        (pair.data.clone(), pair.control.clone())
    }
}

impl Default for ListNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Notifier for ListNotifier {
    async fn subscribe(&self, thread: &ThreadId) -> Result<Subscription, NotifyError> {
        let (data_sender, control_sender) = self.pair(thread);
        let mut data_rx = data_sender.subscribe();
        let mut control_rx = control_sender.subscribe();

        let (tx, rx) = mpsc::channel(16);

        let data_tx = tx.clone();
        let data_task = tokio::spawn(async move {
            loop {
                match data_rx.recv().await {
                    // Lagging only coalesces wake-ups; readers drain the
                    // log by position anyway.
                    Ok(()) | Err(broadcast::error::RecvError::Lagged(_)) => {
                        if data_tx.send(SubMessage::Data).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        let control_task = tokio::spawn(async move {
            loop {
                match control_rx.recv().await {
                    Ok(signal) => {
                        let _ = tx.send(SubMessage::Control(signal)).await;
                        break;
                    }
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        Ok(Subscription::new(rx, vec![data_task, control_task]))
    }

    async fn publish_data(&self, thread: &ThreadId) -> Result<(), NotifyError> {
        let (data_sender, _) = self.pair(thread);
        // A send error only means nobody is subscribed right now.
        let _ = data_sender.send(());
        Ok(())
    }

    async fn publish_control(
        &self,
        thread: &ThreadId,
        signal: ControlSignal,
    ) -> Result<(), NotifyError> {
        let (_, control_sender) = self.pair(thread);
        let _ = control_sender.send(signal);
        Ok(())
    }
}

#[cfg(test)]
#[path = "list_tests.rs"]
mod tests;
