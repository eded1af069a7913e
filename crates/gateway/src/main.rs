// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent Relay Gateway (relayd)
//!
//! HTTP process serving the agent-thread API and the SSE event streams.
//!
//! Architecture:
//! - Router: axum handlers translating HTTP onto the streaming core
//! - Maintenance tasks: registry checkpoints and TTL sweeps
//! - Worker seam: the dispatch queue receiver, drained in-process by the
//!   loopback worker or logged for an external worker pool

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use relay_gateway::{lifecycle, routes, worker, Config, LifecycleError};
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Handle info flags before any config/lock acquisition
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("relayd {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                println!("relayd {}", env!("CARGO_PKG_VERSION"));
                println!("Agent Relay Gateway - streams agent-execution events over SSE");
                println!();
                println!("USAGE:");
                println!("    relayd");
                println!();
                println!("Configuration comes from RELAY_* environment variables");
                println!("(RELAY_STATE_DIR, RELAY_BIND_ADDR, RELAY_LOG_PREFIX, ...).");
                println!();
                println!("OPTIONS:");
                println!("    -h, --help       Print help information");
                println!("    -v, --version    Print version information");
                return Ok(());
            }
            _ => {
                eprintln!("error: unexpected argument '{arg}'");
                eprintln!("Usage: relayd [--help | --version]");
                std::process::exit(1);
            }
        }
    }

    let config = Config::load()?;

    // Rotate log file if it has grown too large
    rotate_log_if_needed(&config.log_path);

    // Set up logging
    let _log_guard = setup_logging(&config)?;

    info!("Starting gateway");

    let startup = match lifecycle::startup(&config) {
        Ok(r) => r,
        Err(LifecycleError::LockFailed(_)) => {
            let pid = std::fs::read_to_string(&config.lock_path)
                .unwrap_or_default()
                .trim()
                .to_string();
            eprintln!("relayd is already running");
            if !pid.is_empty() {
                eprintln!("  pid: {pid}");
            }
            std::process::exit(1);
        }
        Err(e) => {
            error!("Failed to start gateway: {}", e);
            return Err(e.into());
        }
    };

    let lifecycle::StartupResult {
        state,
        lock_file: _lock_file,
        dispatch_rx,
        list_publisher,
        stream_publisher,
    } = startup;

    // Maintenance: periodic registry checkpoints and TTL sweeps
    lifecycle::spawn_checkpoint(state.registry.clone(), config.snapshot_path.clone());
    lifecycle::spawn_ttl_sweep(state.clone());

    // Worker seam: loopback worker when configured, otherwise log dispatches
    if config.loopback_worker {
        info!("loopback worker enabled");
        worker::LoopbackWorker::new(state.registry.clone(), list_publisher, stream_publisher)
            .spawn(dispatch_rx);
    } else {
        worker::spawn_drain_logger(dispatch_rx);
    }

    let app = routes::router(state.clone());
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    let local_addr = listener.local_addr()?;
    info!("Gateway ready, listening on {}", local_addr);
    println!("relayd listening on {local_addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Final snapshot so a restart picks up current thread state
    lifecycle::shutdown(&state, &config);
    info!("Gateway stopped");
    Ok(())
}

/// Resolve when SIGTERM or SIGINT arrives.
async fn shutdown_signal() {
    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            error!("failed to install SIGTERM handler: {}", e);
            return std::future::pending::<()>().await;
        }
    };
    let mut sigint = match signal(SignalKind::interrupt()) {
        Ok(s) => s,
        Err(e) => {
            error!("failed to install SIGINT handler: {}", e);
            return std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        _ = sigint.recv() => info!("Received SIGINT, shutting down..."),
    }
}

/// Maximum log file size before rotation (10 MB).
const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024;

/// Number of rotated log files to keep (relayd.log.1, .2, .3).
const MAX_ROTATED_LOGS: u32 = 3;

/// Rotate the gateway log file if it exceeds [`MAX_LOG_SIZE`].
///
/// Shifts `relayd.log` → `relayd.log.1` → `relayd.log.2` → `relayd.log.3`,
/// deleting the oldest. Best-effort: rotation failures are silently ignored
/// so the gateway still starts.
fn rotate_log_if_needed(log_path: &std::path::Path) {
    let size = match std::fs::metadata(log_path) {
        Ok(m) => m.len(),
        Err(_) => return,
    };

    if size < MAX_LOG_SIZE {
        return;
    }

    let log_str = log_path.display().to_string();

    for i in (1..MAX_ROTATED_LOGS).rev() {
        let from = format!("{log_str}.{i}");
        let to = format!("{log_str}.{}", i + 1);
        let _ = std::fs::rename(&from, &to);
    }

    let _ = std::fs::rename(log_path, format!("{log_str}.1"));
}

fn setup_logging(
    config: &Config,
) -> Result<tracing_appender::non_blocking::WorkerGuard, LifecycleError> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    if let Some(parent) = config.log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file_appender = tracing_appender::rolling::never(
        config
            .log_path
            .parent()
            .ok_or(LifecycleError::NoStateDir)?,
        config
            .log_path
            .file_name()
            .ok_or(LifecycleError::NoStateDir)?,
    );
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    Ok(guard)
}
