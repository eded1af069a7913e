// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the gateway crate.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use relay_core::StreamConfig;

use crate::lifecycle::LifecycleError;

/// Resolve state directory: RELAY_STATE_DIR > XDG_STATE_HOME/relay > ~/.local/state/relay
pub fn state_dir() -> Result<PathBuf, LifecycleError> {
    if let Ok(dir) = std::env::var("RELAY_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("relay"));
    }
    let home = std::env::var("HOME").map_err(|_| LifecycleError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".local/state/relay"))
}

/// Listen address (default 0.0.0.0:8080)
pub fn bind_addr() -> SocketAddr {
    std::env::var("RELAY_BIND_ADDR")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 8080)))
}

/// Internal API root for persisting terminal results, if configured
pub fn result_api_url() -> Option<String> {
    std::env::var("RELAY_RESULT_API_URL")
        .ok()
        .filter(|s| !s.trim().is_empty())
}

/// Whether to run the in-process loopback worker (RELAY_LOOPBACK_WORKER=1)
pub fn loopback_worker() -> bool {
    std::env::var("RELAY_LOOPBACK_WORKER")
        .map(|v| v == "1")
        .unwrap_or(false)
}

/// Capacity of the dispatch queue between the gateway and the worker pool
pub fn dispatch_queue_capacity() -> usize {
    parse_var("RELAY_DISPATCH_QUEUE_CAPACITY").unwrap_or(256)
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.parse().ok())
}

/// Streaming configuration with env overrides over the documented defaults.
pub fn stream_config() -> StreamConfig {
    let mut config = StreamConfig::default();

    if let Ok(prefix) = std::env::var("RELAY_LOG_PREFIX") {
        if !prefix.trim().is_empty() {
            config.log_prefix = prefix;
        }
    }
    if let Some(n) = parse_var("RELAY_MAX_LOG_LENGTH") {
        config.max_log_length = n;
    }
    if let Some(n) = parse_var("RELAY_READ_COUNT") {
        config.read_count = n;
    }
    if let Some(ms) = parse_var("RELAY_TAIL_BLOCK_MS") {
        config.tail_block = Duration::from_millis(ms);
    }
    if let Some(secs) = parse_var("RELAY_KEEP_ALIVE_INTERVAL_SECONDS") {
        config.keep_alive_interval = Duration::from_secs(secs);
    }
    if let Some(n) = parse_var("RELAY_MESSAGE_QUEUE_MAX_SIZE") {
        config.message_queue_max_size = n;
    }
    if let Some(mins) = parse_var::<u64>("RELAY_BUSINESS_TIMEOUT_MINUTES") {
        config.business_timeout = Duration::from_secs(mins * 60);
    }
    if let Some(mins) = parse_var::<u64>("RELAY_CONNECTION_MAX_DURATION_MINUTES") {
        config.connection_max_duration = Duration::from_secs(mins * 60);
    }
    if let Some(secs) = parse_var("RELAY_STREAM_CHECK_INTERVAL_SECONDS") {
        config.stream_check_interval = Duration::from_secs(secs);
    }
    if let Some(secs) = parse_var("RELAY_CONNECTION_TIMEOUT_CHECK_INTERVAL_SECONDS") {
        config.connection_timeout_check_interval = Duration::from_secs(secs);
    }
    if let Some(secs) = parse_var("RELAY_THREAD_TTL_SECONDS") {
        config.thread_ttl = Duration::from_secs(secs);
    }
    if let Some(secs) = parse_var("RELAY_RUN_TTL_SECONDS") {
        config.run_ttl = Duration::from_secs(secs);
    }

    config
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
