// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Snapshot persistence for restart continuity
//!
//! Snapshots are zstd-compressed JSON written atomically: serialize to a
//! `.tmp` sibling, fsync, rename over the final path. A corrupt snapshot is
//! rotated to a `.bak` file and treated as absent so the gateway starts
//! fresh rather than refusing to boot.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::state::RegistryState;

/// Bumped when the snapshot layout changes incompatibly.
pub const CURRENT_SNAPSHOT_VERSION: u32 = 1;

/// zstd compression level; favors speed over ratio for frequent checkpoints.
const COMPRESSION_LEVEL: i32 = 3;

/// Errors from snapshot operations
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported snapshot version {0}")]
    UnsupportedVersion(u32),
}

/// A point-in-time copy of the registry state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub state: RegistryState,
}

impl Snapshot {
    pub fn new(state: RegistryState, created_at: DateTime<Utc>) -> Self {
        Self {
            version: CURRENT_SNAPSHOT_VERSION,
            created_at,
            state,
        }
    }

    /// Save atomically: write compressed bytes to `.tmp`, fsync, rename.
    pub fn save(&self, path: &Path) -> Result<(), SnapshotError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_vec(self)?;
        let compressed = zstd::encode_all(json.as_slice(), COMPRESSION_LEVEL)?;

        let tmp_path = path.with_extension("tmp");
        {
            let mut file = File::create(&tmp_path)?;
            file.write_all(&compressed)?;
            file.sync_all()?;
        }
        fs::rename(&tmp_path, path)?;

        // Make the rename durable across power loss
        if let Some(parent) = path.parent() {
            if let Ok(dir) = File::open(parent) {
                let _ = dir.sync_all();
            }
        }
        Ok(())
    }

    /// Load a snapshot if one exists.
    ///
    /// Returns `Ok(None)` when the file is absent or corrupt; corrupt files
    /// are rotated to `.bak` so the evidence survives.
    pub fn load(path: &Path) -> Result<Option<Self>, SnapshotError> {
        if !path.exists() {
            return Ok(None);
        }

        let compressed = fs::read(path)?;
        let snapshot = zstd::decode_all(compressed.as_slice())
            .map_err(SnapshotError::Io)
            .and_then(|json| serde_json::from_slice::<Snapshot>(&json).map_err(SnapshotError::Json))
            .and_then(|snap| {
                if snap.version > CURRENT_SNAPSHOT_VERSION {
                    Err(SnapshotError::UnsupportedVersion(snap.version))
                } else {
                    Ok(snap)
                }
            });

        match snapshot {
            Ok(snap) => Ok(Some(snap)),
            Err(e) => {
                let bak_path = rotate_bak_path(path);
                warn!(
                    error = %e,
                    path = %path.display(),
                    bak = %bak_path.display(),
                    "Corrupt snapshot, moving to .bak and starting fresh",
                );
                fs::rename(path, &bak_path)?;
                Ok(None)
            }
        }
    }
}

const MAX_BAK_FILES: u32 = 3;

/// Pick the next `.bak` / `.bak.N` path, rotating older backups out.
fn rotate_bak_path(path: &Path) -> PathBuf {
    let bak = |n: u32| {
        if n == 1 {
            path.with_extension("bak")
        } else {
            path.with_extension(format!("bak.{n}"))
        }
    };

    let oldest = bak(MAX_BAK_FILES);
    if oldest.exists() {
        let _ = fs::remove_file(&oldest);
    }
    for n in (1..MAX_BAK_FILES).rev() {
        let from = bak(n);
        if from.exists() {
            let _ = fs::rename(&from, bak(n + 1));
        }
    }
    bak(1)
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
