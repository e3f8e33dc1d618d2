// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Checkpointing listener.

use crate::snapshot::{
    write_snapshot, ContextSnapshot, FsSnapshotWriter, RunStatus, SnapshotWriter,
};
use std::path::PathBuf;
use weft_core::{Context, Listener};

/// Listener that checkpoints the context before every main-thread unit
/// and marks the artifact finished when the workflow completes.
///
/// The checkpoint happens on `on_unit_start`, before the unit runs, so a
/// resumed workflow re-executes the persisted unit: execution is
/// at-least-once and resumed units must tolerate replay. Fork workers
/// (non-null thread id) are never persisted. Persist failures are logged
/// and never interrupt the workflow.
pub struct PersistListener<W: SnapshotWriter = FsSnapshotWriter> {
    writer: W,
    path: PathBuf,
}

impl PersistListener<FsSnapshotWriter> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        PersistListener {
            writer: FsSnapshotWriter,
            path: path.into(),
        }
    }
}

impl<W: SnapshotWriter> PersistListener<W> {
    /// Use a custom writer (for testing).
    pub fn with_writer(writer: W, path: impl Into<PathBuf>) -> Self {
        PersistListener {
            writer,
            path: path.into(),
        }
    }

    fn dump(&self, ctx: &Context, status: RunStatus) {
        let snapshot = ContextSnapshot::capture(ctx, status);
        match write_snapshot(&self.writer, &self.path, &snapshot) {
            Ok(()) => {
                tracing::debug!(
                    path = %self.path.display(),
                    unit = snapshot.current_unit.as_deref().unwrap_or("<none>"),
                    status = ?status,
                    "context persisted"
                );
            }
            Err(error) => {
                tracing::error!(
                    path = %self.path.display(),
                    error = %error,
                    "failed to persist context"
                );
            }
        }
    }
}

impl<W: SnapshotWriter + 'static> Listener for PersistListener<W> {
    fn on_unit_start(&self, ctx: &Context) {
        if ctx.thread_id().is_none() {
            self.dump(ctx, RunStatus::Running);
        } else {
            tracing::debug!(
                unit = ctx.current_unit().as_deref().unwrap_or("<none>"),
                "persist skipped for fork worker"
            );
        }
    }

    fn on_finish(&self, ctx: &Context) {
        if ctx.thread_id().is_none() {
            self.dump(ctx, RunStatus::Finished);
        }
    }
}

#[cfg(test)]
#[path = "persist_tests.rs"]
mod tests;
