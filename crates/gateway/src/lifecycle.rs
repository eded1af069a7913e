// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Gateway lifecycle management: configuration, startup, maintenance,
//! shutdown.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use fs2::FileExt;
use relay_adapters::{
    ChannelTaskQueue, DispatchJob, HttpResultSink, NoOpResultSink, ResultSink, SinkError,
    TracedQueue, TracedSink,
};
use relay_core::{RunId, StreamConfig, SystemClock, ThreadId, UuidIdGen};
use relay_engine::{DispatchBridge, Publisher};
use relay_log::{ListLog, ListNotifier, StreamLog, StreamNotifier};
use relay_registry::{Snapshot, SnapshotError, ThreadRegistry};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::env;

/// Errors during gateway startup and shutdown
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("no usable state directory (set RELAY_STATE_DIR or HOME)")]
    NoStateDir,
    #[error("failed to acquire state lock: {0}")]
    LockFailed(std::io::Error),
    #[error("snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),
    #[error("result sink setup failed: {0}")]
    Sink(String),
}

/// Gateway configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Root state directory (e.g. ~/.local/state/relay)
    pub state_dir: PathBuf,
    /// Path to lock/PID file
    pub lock_path: PathBuf,
    /// Path to gateway log file
    pub log_path: PathBuf,
    /// Path to registry snapshot file
    pub snapshot_path: PathBuf,
    /// Directory holding per-thread stream log files
    pub streams_path: PathBuf,
    /// HTTP listen address
    pub bind_addr: SocketAddr,
    /// Internal API root for terminal results, if configured
    pub result_api_url: Option<String>,
    /// Dispatch queue capacity
    pub dispatch_queue_capacity: usize,
    /// Run the in-process loopback worker
    pub loopback_worker: bool,
    /// Streaming tuning knobs
    pub stream: StreamConfig,
}

impl Config {
    /// Load configuration from the environment.
    pub fn load() -> Result<Self, LifecycleError> {
        let state_dir = env::state_dir()?;
        Ok(Self {
            lock_path: state_dir.join("relayd.pid"),
            log_path: state_dir.join("relayd.log"),
            snapshot_path: state_dir.join("registry.snapshot"),
            streams_path: state_dir.join("streams"),
            bind_addr: env::bind_addr(),
            result_api_url: env::result_api_url(),
            dispatch_queue_capacity: env::dispatch_queue_capacity(),
            loopback_worker: env::loopback_worker(),
            stream: env::stream_config(),
            state_dir,
        })
    }
}

/// Result sink selected at startup: the internal API when configured,
/// otherwise a no-op.
#[derive(Clone)]
pub enum GatewaySink {
    Http(HttpResultSink),
    NoOp(NoOpResultSink),
}

#[async_trait]
impl ResultSink for GatewaySink {
    async fn save_terminal(
        &self,
        thread: &ThreadId,
        run: &RunId,
        event: &relay_core::AgentEvent,
    ) -> Result<(), SinkError> {
        match self {
            GatewaySink::Http(sink) => sink.save_terminal(thread, run, event).await,
            GatewaySink::NoOp(sink) => sink.save_terminal(thread, run, event).await,
        }
    }
}

pub type GatewayRegistry = ThreadRegistry<SystemClock, UuidIdGen>;
pub type GatewayQueue = TracedQueue<ChannelTaskQueue>;
pub type GatewayDispatch = DispatchBridge<GatewayQueue, SystemClock, UuidIdGen>;
pub type ListPublisher = Publisher<ListLog, ListNotifier, TracedSink<GatewaySink>, SystemClock>;
pub type StreamPublisher = Publisher<StreamLog, StreamNotifier, NoOpResultSink, SystemClock>;

/// Process-wide shared state handed to every request handler.
#[derive(Clone)]
pub struct AppState {
    pub registry: GatewayRegistry,
    pub dispatch: GatewayDispatch,
    pub list_log: ListLog,
    pub list_notifier: ListNotifier,
    pub stream_log: StreamLog,
    pub stream_notifier: StreamNotifier,
    pub stream_config: StreamConfig,
    pub clock: SystemClock,
    pub started: Instant,
}

/// Everything startup produces: shared state for the router, the lock to
/// hold for the process lifetime, and the worker-side attachment points.
pub struct StartupResult {
    pub state: AppState,
    // NOTE(lifetime): held to maintain the exclusive state lock; released on drop
    pub lock_file: File,
    /// Receiver the worker runtime drains
    pub dispatch_rx: mpsc::Receiver<DispatchJob>,
    /// Publisher for the thread-mode (list) backend
    pub list_publisher: ListPublisher,
    /// Publisher for the legacy (stream) backend
    pub stream_publisher: StreamPublisher,
}

impl std::fmt::Debug for StartupResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StartupResult").finish_non_exhaustive()
    }
}

/// Build all process-wide components.
pub fn startup(config: &Config) -> Result<StartupResult, LifecycleError> {
    std::fs::create_dir_all(&config.state_dir)?;
    std::fs::create_dir_all(&config.streams_path)?;
    let lock_file = acquire_lock(&config.lock_path)?;

    let clock = SystemClock;

    // Recover registry state from the last checkpoint, if any
    let registry = match Snapshot::load(&config.snapshot_path)? {
        Some(snapshot) => {
            info!(
                threads = snapshot.state.threads.len(),
                created_at = %snapshot.created_at,
                "recovered registry snapshot"
            );
            ThreadRegistry::with_state(snapshot.state, clock, UuidIdGen)
        }
        None => ThreadRegistry::new(clock, UuidIdGen),
    };

    let (queue, dispatch_rx) = ChannelTaskQueue::new(config.dispatch_queue_capacity);
    let dispatch = DispatchBridge::new(registry.clone(), TracedQueue::new(queue), clock);

    let list_log = ListLog::new(&config.stream);
    let list_notifier = ListNotifier::new();
    let stream_log = StreamLog::new(&config.streams_path, &config.stream);
    let stream_notifier = StreamNotifier::new(stream_log.clone());

    let sink = match &config.result_api_url {
        Some(url) => GatewaySink::Http(
            HttpResultSink::new(url).map_err(|e| LifecycleError::Sink(e.to_string()))?,
        ),
        None => GatewaySink::NoOp(NoOpResultSink),
    };
    let list_publisher = Publisher::new(
        list_log.clone(),
        list_notifier.clone(),
        TracedSink::new(sink),
        clock,
    );
    let stream_publisher = Publisher::new(
        stream_log.clone(),
        stream_notifier.clone(),
        NoOpResultSink,
        clock,
    );

    let state = AppState {
        registry,
        dispatch,
        list_log,
        list_notifier,
        stream_log,
        stream_notifier,
        stream_config: config.stream.clone(),
        clock,
        started: Instant::now(),
    };

    Ok(StartupResult {
        state,
        lock_file,
        dispatch_rx,
        list_publisher,
        stream_publisher,
    })
}

fn acquire_lock(path: &Path) -> Result<File, LifecycleError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(path)?;
    file.try_lock_exclusive()
        .map_err(LifecycleError::LockFailed)?;
    file.set_len(0)?;
    writeln!(file, "{}", std::process::id())?;
    Ok(file)
}

/// Checkpoint interval for registry snapshots
const CHECKPOINT_INTERVAL: Duration = Duration::from_secs(60);

/// Spawn the periodic registry checkpoint task.
///
/// The state clone happens on the async task; serialization, compression,
/// and fsync run on a blocking thread.
pub fn spawn_checkpoint(registry: GatewayRegistry, snapshot_path: PathBuf) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(CHECKPOINT_INTERVAL);
        interval.tick().await; // completes immediately
        loop {
            interval.tick().await;
            let snapshot = Snapshot::new(registry.snapshot_state(), chrono::Utc::now());
            let path = snapshot_path.clone();
            let result = tokio::task::spawn_blocking(move || snapshot.save(&path)).await;
            match result {
                Ok(Ok(())) => tracing::debug!("registry checkpoint complete"),
                Ok(Err(e)) => warn!(error = %e, "registry checkpoint failed"),
                Err(e) => warn!(error = %e, "registry checkpoint task panicked"),
            }
        }
    });
}

/// Sweep interval for TTL expiry
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Spawn the periodic TTL sweep over the registry and both log backends.
pub fn spawn_ttl_sweep(state: AppState) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SWEEP_INTERVAL);
        interval.tick().await; // completes immediately
        loop {
            interval.tick().await;
            let now = chrono::Utc::now();
            state
                .registry
                .expire_stale(state.stream_config.thread_ttl, state.stream_config.run_ttl);
            state.list_log.expire_stale(now);
            let stream_log = state.stream_log.clone();
            if let Err(e) = tokio::task::spawn_blocking(move || stream_log.expire_stale(now)).await
            {
                warn!(error = %e, "stream log sweep task panicked");
            }
        }
    });
}

/// Save a final snapshot on shutdown.
pub fn shutdown(state: &AppState, config: &Config) {
    let snapshot = Snapshot::new(state.registry.snapshot_state(), chrono::Utc::now());
    if let Err(e) = snapshot.save(&config.snapshot_path) {
        warn!(error = %e, "final registry snapshot failed");
    } else {
        info!("final registry snapshot saved");
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
