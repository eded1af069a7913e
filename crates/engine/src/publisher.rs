// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker-side publish facade
//!
//! Every event a worker emits flows through [`Publisher::publish`]:
//! timestamps are stamped, terminal events are handed to the result sink
//! (best-effort), the event is upserted into the log, and waiting readers
//! are woken. Control signals follow the terminal event so late-joining
//! readers still learn terminality from the log.

use relay_adapters::ResultSink;
use relay_core::{validate_prefixed_id, AgentEvent, Clock, ControlSignal, Domain, RunId, ThreadId};
use relay_log::{Cursor, EventLog, Notifier};
use tracing::{debug, warn};

use crate::error::StreamError;

pub struct Publisher<L, N, S, C> {
    log: L,
    notifier: N,
    sink: S,
    clock: C,
}

impl<L, N, S, C> Clone for Publisher<L, N, S, C>
where
    L: Clone,
    N: Clone,
    S: Clone,
    C: Clone,
{
    fn clone(&self) -> Self {
        Self {
            log: self.log.clone(),
            notifier: self.notifier.clone(),
            sink: self.sink.clone(),
            clock: self.clock.clone(),
        }
    }
}

impl<L, N, S, C> Publisher<L, N, S, C>
where
    L: EventLog,
    N: Notifier,
    S: ResultSink,
    C: Clock,
{
    pub fn new(log: L, notifier: N, sink: S, clock: C) -> Self {
        Self {
            log,
            notifier,
            sink,
            clock,
        }
    }

    /// Publish one event against a thread and return its position.
    pub async fn publish(
        &self,
        thread: &ThreadId,
        run: &RunId,
        mut event: AgentEvent,
    ) -> Result<Cursor, StreamError> {
        validate_prefixed_id(Domain::AgentExecute, &event.uuid)
            .map_err(|e| StreamError::Internal(e.to_string()))?;

        let now = self.clock.now();
        if event.create_at.is_none() {
            event.create_at = Some(now);
        }
        event.modify_at = Some(now);

        if event.is_terminal() {
            if event.execute_end_at.is_none() {
                event.execute_end_at = Some(now);
            }
            // Best-effort: a sink failure must not abort the publish.
            if let Err(e) = self.sink.save_terminal(thread, run, &event).await {
                warn!(
                    thread = %thread,
                    run = %run,
                    uuid = %event.uuid,
                    error = %e,
                    "terminal result save failed; continuing publish"
                );
            }
        }

        let cursor = self.log.append(thread, event).await?;
        self.notifier.publish_data(thread).await?;
        debug!(thread = %thread, run = %run, position = %cursor, "event published");
        Ok(cursor)
    }

    /// Signal stream termination to currently-subscribed readers.
    ///
    /// Callers publish the terminal event first; the signal is an
    /// accelerator, not the source of truth.
    pub async fn publish_control(
        &self,
        thread: &ThreadId,
        signal: ControlSignal,
    ) -> Result<(), StreamError> {
        self.notifier.publish_control(thread, signal).await?;
        debug!(thread = %thread, signal = %signal, "control published");
        Ok(())
    }
}

#[cfg(test)]
#[path = "publisher_tests.rs"]
mod tests;
