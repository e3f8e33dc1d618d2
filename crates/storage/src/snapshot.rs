// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Context snapshot artifact with zstd compression and durable writes.
//!
//! The write protocol keeps the artifact crash-consistent: serialize +
//! compress, write to a `.tmp` sibling, fsync it, atomically rename over
//! the final path, then fsync the directory so the rename itself is
//! durable. All file operations go through [`SnapshotWriter`], enabling
//! fault-injection tests.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use weft_core::{Context, UnitKind};

/// Workflow progress recorded in the artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Finished,
}

/// One persisted checkpoint: everything needed to resume an interrupted
/// workflow at the unit it was about to run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextSnapshot {
    pub status: RunStatus,
    pub current_unit: Option<String>,
    pub current_unit_kind: Option<UnitKind>,
    pub data: HashMap<String, Value>,
    pub created_at: DateTime<Utc>,
}

impl ContextSnapshot {
    pub fn capture(ctx: &Context, status: RunStatus) -> Self {
        ContextSnapshot {
            status,
            current_unit: ctx.current_unit(),
            current_unit_kind: ctx.current_unit_kind(),
            data: ctx.data_snapshot(),
            created_at: Utc::now(),
        }
    }
}

/// Errors from snapshot I/O.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("compression error: {0}")]
    Compress(String),
}

/// Trait abstracting snapshot file operations for testability.
pub trait SnapshotWriter: Send + Sync {
    /// Write compressed snapshot data to a temporary file.
    fn write_tmp(&self, path: &Path, data: &[u8]) -> Result<(), SnapshotError>;

    /// Fsync a file to ensure data is durable.
    fn fsync_file(&self, path: &Path) -> Result<(), SnapshotError>;

    /// Atomically rename tmp file to final path.
    fn rename(&self, from: &Path, to: &Path) -> Result<(), SnapshotError>;

    /// Fsync directory to make the rename durable.
    fn fsync_dir(&self, path: &Path) -> Result<(), SnapshotError>;
}

/// Production writer using real filesystem operations.
#[derive(Debug, Clone, Default)]
pub struct FsSnapshotWriter;

impl SnapshotWriter for FsSnapshotWriter {
    fn write_tmp(&self, path: &Path, data: &[u8]) -> Result<(), SnapshotError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = File::create(path)?;
        file.write_all(data)?;
        Ok(())
    }

    fn fsync_file(&self, path: &Path) -> Result<(), SnapshotError> {
        let file = File::open(path)?;
        file.sync_all()?;
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<(), SnapshotError> {
        std::fs::rename(from, to)?;
        Ok(())
    }

    fn fsync_dir(&self, path: &Path) -> Result<(), SnapshotError> {
        let dir = File::open(path)?;
        dir.sync_all()?;
        Ok(())
    }
}

// zstd level 3 is a good balance of speed and compression
const COMPRESSION_LEVEL: i32 = 3;

/// Serialize, compress, and durably publish a snapshot.
pub fn write_snapshot<W: SnapshotWriter>(
    writer: &W,
    path: &Path,
    snapshot: &ContextSnapshot,
) -> Result<(), SnapshotError> {
    let tmp_path = tmp_path_for(path);

    let json_bytes = serde_json::to_vec(snapshot)?;
    let compressed = zstd::encode_all(json_bytes.as_slice(), COMPRESSION_LEVEL)
        .map_err(|e| SnapshotError::Compress(e.to_string()))?;

    writer.write_tmp(&tmp_path, &compressed)?;
    writer.fsync_file(&tmp_path)?;
    writer.rename(&tmp_path, path)?;
    if let Some(parent) = path.parent() {
        writer.fsync_dir(parent)?;
    }
    Ok(())
}

/// Load a snapshot; `Ok(None)` when the artifact does not exist.
pub fn load_snapshot(path: &Path) -> Result<Option<ContextSnapshot>, SnapshotError> {
    if !path.exists() {
        return Ok(None);
    }
    let file = File::open(path)?;
    let decoder = zstd::stream::read::Decoder::new(file)
        .map_err(|e| SnapshotError::Io(std::io::Error::other(e.to_string())))?;
    let snapshot: ContextSnapshot = serde_json::from_reader(decoder)?;
    Ok(Some(snapshot))
}

fn tmp_path_for(path: &Path) -> PathBuf {
    path.with_extension("tmp")
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
