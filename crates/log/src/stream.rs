// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stream-shaped event log: append-only JSONL file per thread
//!
//! Each thread's history lives in `<dir>/<prefix>.<thread>.log`, one JSON
//! record per line: `{"seq":N,"event":{...}}`. The server-assigned `seq` is
//! the position (and the cursor token). A UUID-colliding append writes a
//! superseding record carrying the original seq; readers collapse by seq
//! keeping the latest payload, so first-appearance order is preserved and
//! no reordering is observable.
//!
//! In-memory state is rebuilt by scanning the file on first touch. Lines
//! that fail to parse as records are skipped at scan time; records whose
//! event body no longer decodes surface as `Malformed` entries at their
//! position so readers can emit an inline error frame and continue.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Seek, SeekFrom, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use relay_core::{AgentEvent, Clock, ControlSignal, StreamConfig, SystemClock, ThreadId};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc, Notify};
use tracing::warn;

use crate::cursor::Cursor;
use crate::log::{EntryPayload, EventLog, LogEntry, LogError};
use crate::notify::{NotifyError, Notifier, SubMessage, Subscription};

/// Serialization helper for writing records without cloning the event.
#[derive(Serialize)]
struct RecordRef<'a> {
    seq: u64,
    event: &'a AgentEvent,
}

/// Deserialization helper; the event body is decoded in a second step so a
/// stale or corrupt body still yields a positioned entry.
#[derive(Deserialize)]
struct Record {
    seq: u64,
    event: serde_json::Value,
}

struct StreamEntry {
    seq: u64,
    payload: EntryPayload,
}

struct StreamState {
    path: PathBuf,
    /// Append handle; opened lazily on first write or on load of an
    /// existing file.
    file: Option<File>,
    /// Ordered by seq (append order equals seq order).
    entries: Vec<StreamEntry>,
    /// Event UUID -> index into `entries`.
    by_uuid: HashMap<String, usize>,
    next_seq: u64,
    last_touch: DateTime<Utc>,
}

pub(crate) struct ThreadStream {
    state: Mutex<StreamState>,
    pub(crate) notify: Notify,
}

struct Inner<C: Clock> {
    dir: PathBuf,
    prefix: String,
    max_len: usize,
    read_count: usize,
    ttl: Duration,
    clock: C,
    threads: Mutex<HashMap<ThreadId, Arc<ThreadStream>>>,
}

/// File-backed stream log with server-assigned positions and blocking tail.
pub struct StreamLog<C: Clock = SystemClock> {
    inner: Arc<Inner<C>>,
}

impl<C: Clock> Clone for StreamLog<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl StreamLog<SystemClock> {
    pub fn new(dir: impl Into<PathBuf>, config: &StreamConfig) -> Self {
        Self::with_clock(dir, config, SystemClock)
    }
}

impl<C: Clock> StreamLog<C> {
    pub fn with_clock(dir: impl Into<PathBuf>, config: &StreamConfig, clock: C) -> Self {
        Self {
            inner: Arc::new(Inner {
                dir: dir.into(),
                prefix: config.log_prefix.clone(),
                max_len: config.max_log_length,
                read_count: config.read_count,
                ttl: config.thread_ttl,
                clock,
                threads: Mutex::new(HashMap::new()),
            }),
        }
    }

    fn thread_path(&self, thread: &ThreadId) -> PathBuf {
        self.inner
            .dir
            .join(format!("{}.{}.log", self.inner.prefix, thread))
    }

    /// Get or create the in-memory handle for a thread, loading any
    /// on-disk history on first touch. Never creates the file itself.
    pub(crate) fn handle(&self, thread: &ThreadId) -> Result<Arc<ThreadStream>, LogError> {
        if let Some(ts) = self.inner.threads.lock().get(thread) {
            return Ok(Arc::clone(ts));
        }

        let path = self.thread_path(thread);
        let mut state = StreamState {
            path: path.clone(),
            file: None,
            entries: Vec::new(),
            by_uuid: HashMap::new(),
            next_seq: 1,
            last_touch: self.inner.clock.now(),
        };
        if path.exists() {
            let file = OpenOptions::new().read(true).append(true).open(&path)?;
            load_entries(&file, &mut state)?;
            state.file = Some(file);
        }

        let ts = Arc::new(ThreadStream {
            state: Mutex::new(state),
            notify: Notify::new(),
        });
        let mut threads = self.inner.threads.lock();
        // Another caller may have raced us here; keep the first one.
        let entry = threads
            .entry(thread.clone())
            .or_insert_with(|| Arc::clone(&ts));
        Ok(Arc::clone(entry))
    }

    /// Wake tail readers of a thread (used by the stream notifier).
    pub(crate) fn wake(&self, thread: &ThreadId) -> Result<(), LogError> {
        let ts = self.handle(thread)?;
        ts.notify.notify_waiters();
        Ok(())
    }

    fn collect_after(&self, state: &StreamState, after_seq: u64) -> Vec<LogEntry> {
        state
            .entries
            .iter()
            .filter(|e| e.seq > after_seq)
            .take(self.inner.read_count)
            .map(|e| LogEntry {
                cursor: Cursor::new(e.seq.to_string()),
                payload: e.payload.clone(),
            })
            .collect()
    }

    /// Drop threads idle past the TTL and delete their files. Also removes
    /// on-disk logs that were never touched this process, judged by file
    /// mtime.
    pub fn expire_stale(&self, now: DateTime<Utc>) {
        let stale: Vec<(ThreadId, PathBuf)> = {
            let threads = self.inner.threads.lock();
            threads
                .iter()
                .filter(|(_, ts)| {
                    let state = ts.state.lock();
                    now.signed_duration_since(state.last_touch).to_std().ok()
                        > Some(self.inner.ttl)
                })
                .map(|(id, ts)| (id.clone(), ts.state.lock().path.clone()))
                .collect()
        };
        for (thread, path) in stale {
            self.inner.threads.lock().remove(&thread);
            if let Err(e) = fs::remove_file(&path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(thread = %thread, error = %e, "failed to remove expired stream log");
                }
            }
        }

        self.expire_untouched_files();
    }

    fn expire_untouched_files(&self) {
        let Ok(dir) = fs::read_dir(&self.inner.dir) else {
            return;
        };
        let loaded: Vec<PathBuf> = {
            let threads = self.inner.threads.lock();
            threads
                .values()
                .map(|ts| ts.state.lock().path.clone())
                .collect()
        };
        for entry in dir.flatten() {
            let path = entry.path();
            if loaded.contains(&path) {
                continue;
            }
            let stale = entry
                .metadata()
                .and_then(|m| m.modified())
                .ok()
                .and_then(|mtime| mtime.elapsed().ok())
                .map(|age| age > self.inner.ttl)
                .unwrap_or(false);
            if stale {
                if let Err(e) = fs::remove_file(&path) {
                    warn!(path = %path.display(), error = %e, "failed to remove expired stream log");
                }
            }
        }
    }
}

/// Parse a stream cursor: a decimal seq. `None` means from the beginning.
fn parse_seq(after: Option<&Cursor>) -> Result<u64, LogError> {
    match after {
        None => Ok(0),
        Some(c) => c
            .as_str()
            .parse::<u64>()
            .map_err(|_| LogError::InvalidCursor {
                cursor: c.as_str().to_string(),
            }),
    }
}

/// Rebuild in-memory entries from the file, collapsing superseding records
/// by seq.
fn load_entries(file: &File, state: &mut StreamState) -> Result<(), LogError> {
    let mut reader = BufReader::new(file.try_clone()?);
    reader.seek(SeekFrom::Start(0))?;

    let mut index: HashMap<u64, usize> = HashMap::new();
    let mut line = String::new();
    loop {
        line.clear();
        match reader.read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::InvalidData => break,
            Err(e) => return Err(e.into()),
        }
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let record: Record = match serde_json::from_str(trimmed) {
            Ok(r) => r,
            Err(e) => {
                warn!(path = %state.path.display(), error = %e, "skipping unreadable stream log line");
                continue;
            }
        };

        let payload = match serde_json::from_value::<AgentEvent>(record.event) {
            Ok(ev) => EntryPayload::Event(ev),
            Err(e) => EntryPayload::Malformed {
                error: e.to_string(),
            },
        };

        match index.get(&record.seq) {
            Some(&i) => state.entries[i].payload = payload,
            None => {
                index.insert(record.seq, state.entries.len());
                state.entries.push(StreamEntry {
                    seq: record.seq,
                    payload,
                });
            }
        }
        state.next_seq = state.next_seq.max(record.seq + 1);
    }

    rebuild_uuid_index(state);
    Ok(())
}

fn rebuild_uuid_index(state: &mut StreamState) {
    state.by_uuid.clear();
    for (i, entry) in state.entries.iter().enumerate() {
        if let EntryPayload::Event(ev) = &entry.payload {
            state.by_uuid.insert(ev.uuid.clone(), i);
        }
    }
}

fn append_record(state: &mut StreamState, seq: u64, event: &AgentEvent) -> Result<(), LogError> {
    if state.file.is_none() {
        if let Some(parent) = state.path.parent() {
            fs::create_dir_all(parent)?;
        }
        state.file = Some(
            OpenOptions::new()
                .create(true)
                .read(true)
                .append(true)
                .open(&state.path)?,
        );
    }
    let mut json = serde_json::to_vec(&RecordRef { seq, event })?;
    json.push(b'\n');
    if let Some(file) = state.file.as_mut() {
        file.write_all(&json)?;
    }
    Ok(())
}

/// Rewrite the file with only the current entries (post-trim), atomically.
fn rewrite_file(state: &mut StreamState) -> Result<(), LogError> {
    let tmp_path = state.path.with_extension("tmp");
    {
        let mut tmp = File::create(&tmp_path)?;
        for entry in &state.entries {
            if let EntryPayload::Event(ev) = &entry.payload {
                let mut json = serde_json::to_vec(&RecordRef {
                    seq: entry.seq,
                    event: ev,
                })?;
                json.push(b'\n');
                tmp.write_all(&json)?;
            }
        }
        tmp.sync_all()?;
    }
    fs::rename(&tmp_path, &state.path)?;
    state.file = Some(
        OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&state.path)?,
    );
    Ok(())
}

#[async_trait]
impl<C: Clock> EventLog for StreamLog<C> {
    async fn exists(&self, thread: &ThreadId) -> Result<bool, LogError> {
        if let Some(ts) = self.inner.threads.lock().get(thread) {
            let state = ts.state.lock();
            if !state.entries.is_empty() || state.file.is_some() {
                return Ok(true);
            }
        }
        Ok(self.thread_path(thread).exists())
    }

    async fn append(&self, thread: &ThreadId, mut event: AgentEvent) -> Result<Cursor, LogError> {
        let ts = self.handle(thread)?;
        let seq = {
            let mut state = ts.state.lock();
            state.last_touch = self.inner.clock.now();

            let seq = match state.by_uuid.get(&event.uuid).copied() {
                Some(i) => {
                    // Overwrite in place; the original position and
                    // create_at survive the collision.
                    let seq = state.entries[i].seq;
                    if let EntryPayload::Event(old) = &state.entries[i].payload {
                        if old.create_at.is_some() {
                            event.create_at = old.create_at;
                        }
                    }
                    append_record(&mut state, seq, &event)?;
                    state.entries[i].payload = EntryPayload::Event(event);
                    seq
                }
                None => {
                    let seq = state.next_seq;
                    state.next_seq += 1;
                    append_record(&mut state, seq, &event)?;
                    let uuid = event.uuid.clone();
                    state.entries.push(StreamEntry {
                        seq,
                        payload: EntryPayload::Event(event),
                    });
                    let idx = state.entries.len() - 1;
                    state.by_uuid.insert(uuid, idx);
                    seq
                }
            };

            if state.entries.len() > self.inner.max_len {
                let excess = state.entries.len() - self.inner.max_len;
                state.entries.drain(..excess);
                rebuild_uuid_index(&mut state);
                rewrite_file(&mut state)?;
            }
            seq
        };

        ts.notify.notify_waiters();
        Ok(Cursor::new(seq.to_string()))
    }

    async fn range(
        &self,
        thread: &ThreadId,
        after: Option<&Cursor>,
    ) -> Result<Vec<LogEntry>, LogError> {
        let after_seq = parse_seq(after)?;
        if !self.exists(thread).await? {
            return Ok(Vec::new());
        }
        let ts = self.handle(thread)?;
        let state = ts.state.lock();
        Ok(self.collect_after(&state, after_seq))
    }

    async fn tail(
        &self,
        thread: &ThreadId,
        after: Option<&Cursor>,
        block: Duration,
    ) -> Result<Vec<LogEntry>, LogError> {
        let after_seq = parse_seq(after)?;
        let ts = self.handle(thread)?;
        let deadline = tokio::time::Instant::now() + block;

        loop {
            let notified = ts.notify.notified();
            tokio::pin!(notified);
            // Register before checking so an append between the check and
            // the await cannot be missed.
            notified.as_mut().enable();

            {
                let state = ts.state.lock();
                let batch = self.collect_after(&state, after_seq);
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
        if !self.exists(thread).await? {
            return Ok(0);
        }
        let ts = self.handle(thread)?;
        let state = ts.state.lock();
        Ok(state.entries.len() as u64)
    }
}

/// Notifier for the stream shape.
///
/// Data wake-ups ride the log's per-thread notify; a broadcast control
/// channel is carried as well so both notifier variants expose the same
/// subscription surface.
pub struct StreamNotifier<C: Clock = SystemClock> {
    log: StreamLog<C>,
    control: Arc<Mutex<HashMap<ThreadId, broadcast::Sender<ControlSignal>>>>,
}

impl<C: Clock> Clone for StreamNotifier<C> {
    fn clone(&self) -> Self {
        Self {
            log: self.log.clone(),
            control: Arc::clone(&self.control),
        }
    }
}

const CONTROL_CHANNEL_CAPACITY: usize = 16;

impl<C: Clock> StreamNotifier<C> {
    pub fn new(log: StreamLog<C>) -> Self {
        Self {
            log,
            control: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn control_sender(&self, thread: &ThreadId) -> broadcast::Sender<ControlSignal> {
        let mut map = self.control.lock();
        map.entry(thread.clone())
            .or_insert_with(|| broadcast::channel(CONTROL_CHANNEL_CAPACITY).0)
            .clone()
    }
}

#[async_trait]
impl<C: Clock> Notifier for StreamNotifier<C> {
    async fn subscribe(&self, thread: &ThreadId) -> Result<Subscription, NotifyError> {
        let ts = self
            .log
            .handle(thread)
            .map_err(|e| NotifyError::Backend(e.to_string()))?;
        let mut control_rx = self.control_sender(thread).subscribe();

        let (tx, rx) = mpsc::channel(16);

        let data_tx = tx.clone();
        let data_task = tokio::spawn(async move {
            loop {
                ts.notify.notified().await;
                if data_tx.send(SubMessage::Data).await.is_err() {
                    break;
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
        self.log
            .wake(thread)
            .map_err(|e| NotifyError::Backend(e.to_string()))
    }

    async fn publish_control(
        &self,
        thread: &ThreadId,
        signal: ControlSignal,
    ) -> Result<(), NotifyError> {
        // A send error only means no subscriber is listening right now;
        // late subscribers learn terminality from the log.
        let _ = self.control_sender(thread).send(signal);
        Ok(())
    }
}

#[cfg(test)]
#[path = "stream_tests.rs"]
mod tests;
