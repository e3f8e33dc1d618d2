// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy shared by every weft crate.
//!
//! One enum covers the whole engine: the sequencer maps
//! [`WorkError::InvalidArgument`] to a bad-request end and everything else
//! to an error end carrying [`WorkError::kind_name`].

use thiserror::Error;

/// Errors raised by workflow construction, plugins, and unit execution.
#[derive(Debug, Error)]
pub enum WorkError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("plugin not found: {0}")]
    PluginNotFound(String),
    #[error("plugin already registered: {0}")]
    AlreadyRegistered(String),
    #[error("plugin already prepared: {0}")]
    AlreadyPrepared(String),
    #[error("plugin already cleaned up: {0}")]
    AlreadyDead(String),
    #[error("plugin not prepared: {0}")]
    Unprepared(String),
    #[error("invalid plugin: {0}")]
    InvalidPlugin(String),
    #[error("invalid status: {0}")]
    InvalidStatus(String),
    #[error("workflow already finished: {0}")]
    WorkflowFinished(String),
    #[error("workflow unit already exists: {0}")]
    UnitExists(String),
    #[error("workflow stopped: {0}")]
    Stopped(String),
    /// Domain failure raised by a user operation, tagged with a kind name
    /// (e.g. `divide-by-zero`) that surfaces in the error end.
    #[error("{kind}: {message}")]
    Failed { kind: String, message: String },
}

impl WorkError {
    /// Shorthand for the most common construction error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        WorkError::InvalidArgument(message.into())
    }

    /// A domain failure with an explicit kind name.
    pub fn failed(kind: impl Into<String>, message: impl Into<String>) -> Self {
        WorkError::Failed {
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// The wire-visible kind string carried by error ends.
    pub fn kind_name(&self) -> &str {
        match self {
            WorkError::InvalidArgument(_) => "invalid-argument",
            WorkError::PluginNotFound(_) => "not-found",
            WorkError::AlreadyRegistered(_) => "already-registered",
            WorkError::AlreadyPrepared(_) => "already-prepared",
            WorkError::AlreadyDead(_) => "already-dead",
            WorkError::Unprepared(_) => "unprepared",
            WorkError::InvalidPlugin(_) => "invalid-plugin",
            WorkError::InvalidStatus(_) => "invalid-status",
            WorkError::WorkflowFinished(_) => "workflow-finished",
            WorkError::UnitExists(_) => "workflow-unit-exists",
            WorkError::Stopped(_) => "workflow-stopped",
            WorkError::Failed { kind, .. } => kind,
        }
    }

    /// True for errors that terminate a workflow as a bad request rather
    /// than a system error.
    pub fn is_bad_request(&self) -> bool {
        matches!(self, WorkError::InvalidArgument(_))
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
