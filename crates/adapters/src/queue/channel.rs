// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process bounded channel queue.
//!
//! Stands in for the message broker: the gateway holds the sender, the
//! worker runtime attaches to the receiver returned from [`new`]. A full
//! channel rejects the enqueue rather than blocking the HTTP handler.
//!
//! [`new`]: ChannelTaskQueue::new

use super::{DispatchJob, QueueError, TaskQueue};
use async_trait::async_trait;
use tokio::sync::mpsc;

#[derive(Clone)]
pub struct ChannelTaskQueue {
    tx: mpsc::Sender<DispatchJob>,
}

impl ChannelTaskQueue {
    /// Create the queue and the receiver the worker pool drains.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<DispatchJob>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }
}

#[async_trait]
impl TaskQueue for ChannelTaskQueue {
    async fn enqueue(&self, job: DispatchJob) -> Result<(), QueueError> {
        match self.tx.try_send(job) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => Err(QueueError::Full),
            Err(mpsc::error::TrySendError::Closed(_)) => Err(QueueError::Closed),
        }
    }
}

#[cfg(test)]
#[path = "channel_tests.rs"]
mod tests;
