// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Registry state: plain data, serde-friendly, no locking

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use relay_core::{RunId, RunRecord, ThreadId, ThreadMetadata};
use serde::{Deserialize, Serialize};

/// A thread retains only its most recent runs.
pub const MAX_RUNS_PER_THREAD: usize = 100;

/// Run bookkeeping for one thread.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThreadRuns {
    /// Run IDs newest first, trimmed to [`MAX_RUNS_PER_THREAD`].
    #[serde(default)]
    pub order: Vec<RunId>,
    #[serde(default)]
    pub records: HashMap<RunId, RunRecord>,
}

/// Complete registry state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryState {
    /// Threads in creation order.
    #[serde(default)]
    pub threads: IndexMap<ThreadId, ThreadMetadata>,
    #[serde(default)]
    pub runs: HashMap<ThreadId, ThreadRuns>,
    /// Initial context payloads supplied at thread creation.
    #[serde(default)]
    pub contexts: HashMap<ThreadId, serde_json::Value>,
}

impl RegistryState {
    /// Prepend a run to its thread's list, trimming the oldest beyond the cap.
    ///
    /// The caller has already verified the thread exists.
    pub fn push_run(&mut self, record: RunRecord) {
        let runs = self.runs.entry(record.thread_id.clone()).or_default();
        runs.order.insert(0, record.run_id.clone());
        runs.records.insert(record.run_id.clone(), record);
        while runs.order.len() > MAX_RUNS_PER_THREAD {
            if let Some(evicted) = runs.order.pop() {
                runs.records.remove(&evicted);
            }
        }
    }

    /// Drop threads idle past `thread_ttl` and runs older than `run_ttl`.
    pub fn expire_stale(&mut self, now: DateTime<Utc>, thread_ttl: Duration, run_ttl: Duration) {
        let expired = |at: DateTime<Utc>, ttl: Duration| {
            now.signed_duration_since(at).to_std().ok() > Some(ttl)
        };

        self.threads
            .retain(|_, meta| !expired(meta.updated_at, thread_ttl));
        self.contexts.retain(|id, _| self.threads.contains_key(id));

        self.runs.retain(|id, _| self.threads.contains_key(id));
        for runs in self.runs.values_mut() {
            runs.records
                .retain(|_, record| !expired(record.created_at, run_ttl));
            runs.order.retain(|id| runs.records.contains_key(id));
        }
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
