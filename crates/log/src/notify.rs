// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wake-up notification between publishers and stream sessions
//!
//! A subscription delivers opaque data wake-ups (go read the log) and
//! control signals (terminate with a mapped status). Controls reach only
//! currently-subscribed handles; late subscribers learn terminality from
//! the terminal event the publisher wrote to the log first.

use std::time::Duration;

use async_trait::async_trait;
use relay_core::{ControlSignal, ThreadId};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Errors from notifier operations
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notifier backend error: {0}")]
    Backend(String),
}

/// What a waiting subscriber observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wakeup {
    /// New events may be available; read the log.
    Data,
    /// Out-of-band terminal signal.
    Control(ControlSignal),
    /// Nothing arrived within the timeout.
    Timeout,
    /// The notifier side shut down.
    Closed,
}

pub(crate) enum SubMessage {
    Data,
    Control(ControlSignal),
}

/// A live subscription to one thread's wake-up channels.
///
/// Internally a bounded queue fed by background forwarder tasks; dropping
/// the subscription aborts them.
pub struct Subscription {
    rx: mpsc::Receiver<SubMessage>,
    tasks: Vec<JoinHandle<()>>,
}

impl Subscription {
    pub(crate) fn new(rx: mpsc::Receiver<SubMessage>, tasks: Vec<JoinHandle<()>>) -> Self {
        Self { rx, tasks }
    }

    /// Wait up to `timeout` for the next wake-up.
    pub async fn next(&mut self, timeout: Duration) -> Wakeup {
        match tokio::time::timeout(timeout, self.rx.recv()).await {
            Ok(Some(SubMessage::Data)) => Wakeup::Data,
            Ok(Some(SubMessage::Control(signal))) => Wakeup::Control(signal),
            Ok(None) => Wakeup::Closed,
            Err(_) => Wakeup::Timeout,
        }
    }

    /// Unsubscribe. Equivalent to dropping, spelled out at cleanup sites.
    pub fn close(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

/// Wake-up signalling to waiting readers of one thread.
#[async_trait]
pub trait Notifier: Clone + Send + Sync + 'static {
    /// Subscribe to data and control wake-ups for a thread.
    async fn subscribe(&self, thread: &ThreadId) -> Result<Subscription, NotifyError>;

    /// Opaque data wake-up: new events are available in the log.
    async fn publish_data(&self, thread: &ThreadId) -> Result<(), NotifyError>;

    /// Terminal control signal to currently-subscribed handles.
    async fn publish_control(
        &self,
        thread: &ThreadId,
        signal: ControlSignal,
    ) -> Result<(), NotifyError>;
}

#[cfg(test)]
#[path = "notify_tests.rs"]
mod tests;
