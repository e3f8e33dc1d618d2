// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Recovery policy: turns a persisted artifact back into a start point
//! and a context factory.

use crate::snapshot::{load_snapshot, RunStatus};
use std::path::PathBuf;
use std::sync::Arc;
use weft_core::{Context, ContextFactory, ContextSeed, WorkError};

/// Where to resume and how to rebuild the context.
pub struct RecoverInfo {
    /// Unit to resume at; `None` means start fresh.
    pub begin_unit: Option<String>,
    /// Factory pre-seeded with the persisted data map (merged under any
    /// caller-supplied seed data).
    pub context_factory: ContextFactory,
}

impl std::fmt::Debug for RecoverInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecoverInfo")
            .field("begin_unit", &self.begin_unit)
            .field("context_factory", &"<factory>")
            .finish()
    }
}

impl RecoverInfo {
    /// Fresh-start info: no begin unit, default factory.
    pub fn fresh() -> Self {
        RecoverInfo {
            begin_unit: None,
            context_factory: Context::default_factory(),
        }
    }
}

/// Supplies the resume strategy for a workflow driver.
pub trait RecoverPolicy {
    /// Fails with `workflow-finished` when the persisted workflow already
    /// completed and there is nothing to resume.
    fn load(&self) -> Result<RecoverInfo, WorkError>;
}

/// File-backed recovery from a [`crate::PersistListener`] artifact.
pub struct FileRecoverPolicy {
    path: PathBuf,
}

impl FileRecoverPolicy {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileRecoverPolicy { path: path.into() }
    }
}

impl RecoverPolicy for FileRecoverPolicy {
    fn load(&self) -> Result<RecoverInfo, WorkError> {
        let snapshot = load_snapshot(&self.path)
            .map_err(|e| WorkError::failed("snapshot-load", e.to_string()))?;
        let Some(snapshot) = snapshot else {
            // Nothing persisted: start from scratch.
            return Ok(RecoverInfo::fresh());
        };

        if snapshot.status == RunStatus::Finished {
            return Err(WorkError::WorkflowFinished(format!(
                "'{}' holds a completed workflow",
                self.path.display()
            )));
        }

        tracing::info!(
            path = %self.path.display(),
            unit = snapshot.current_unit.as_deref().unwrap_or("<none>"),
            "recovering workflow"
        );

        let persisted = snapshot.data;
        let factory: ContextFactory = Arc::new(move |mut seed: ContextSeed| {
            let mut data = persisted.clone();
            // Caller-supplied seed data wins over persisted entries.
            data.extend(std::mem::take(&mut seed.data));
            seed.data = data;
            Context::new(seed)
        });

        Ok(RecoverInfo {
            begin_unit: snapshot.current_unit,
            context_factory: factory,
        })
    }
}

#[cfg(test)]
#[path = "recover_tests.rs"]
mod tests;
