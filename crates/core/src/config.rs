// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Streaming configuration
//!
//! One `StreamConfig` is resolved at startup and shared by the log backends,
//! the stream sessions, and the maintenance tasks. Environment parsing lives
//! in the gateway crate; this is the typed form with the documented defaults.

use std::time::Duration;

/// Tuning knobs for the event streaming core.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Prefix for stream log keys (file stems)
    pub log_prefix: String,
    /// Retention cap on entries per thread; oldest are elided beyond this
    pub max_log_length: usize,
    /// Max entries returned per range/tail call
    pub read_count: usize,
    /// Blocking tail timeout
    pub tail_block: Duration,
    /// Keep-alive frame period
    pub keep_alive_interval: Duration,
    /// Bounded in-process queue size per session
    pub message_queue_max_size: usize,
    /// Business-event inactivity ceiling (also the await-log-creation ceiling)
    pub business_timeout: Duration,
    /// Absolute per-connection ceiling
    pub connection_max_duration: Duration,
    /// AWAIT_LOG poll period
    pub stream_check_interval: Duration,
    /// Timeout monitor period
    pub connection_timeout_check_interval: Duration,
    /// Thread metadata TTL
    pub thread_ttl: Duration,
    /// Run record TTL
    pub run_ttl: Duration,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            log_prefix: "relay".to_string(),
            max_log_length: 1000,
            read_count: 100,
            tail_block: Duration::from_millis(5000),
            keep_alive_interval: Duration::from_secs(15),
            message_queue_max_size: 100,
            business_timeout: Duration::from_secs(2 * 60),
            connection_max_duration: Duration::from_secs(30 * 60),
            stream_check_interval: Duration::from_secs(2),
            connection_timeout_check_interval: Duration::from_secs(5),
            thread_ttl: Duration::from_secs(7 * 24 * 3600),
            run_ttl: Duration::from_secs(24 * 3600),
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
