// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Terminal record produced by a workflow execution.

use crate::error::WorkError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The sole return carrier of a workflow: status plus payload.
///
/// Exceptions never cross the workflow boundary; the sequencer folds them
/// into `BadRequest` (argument problems) or `Error` (everything else).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum End {
    Ok {
        result: Value,
    },
    BadRequest {
        message: String,
    },
    Error {
        kind: String,
        message: String,
        trace: String,
    },
}

impl End {
    pub fn ok(result: Value) -> Self {
        End::Ok { result }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        End::BadRequest {
            message: message.into(),
        }
    }

    pub fn error(
        kind: impl Into<String>,
        message: impl Into<String>,
        trace: impl Into<String>,
    ) -> Self {
        End::Error {
            kind: kind.into(),
            message: message.into(),
            trace: trace.into(),
        }
    }

    /// Fold a [`WorkError`] into its terminal form: invalid arguments become
    /// a bad request, anything else an error end tagged with the kind name.
    pub fn from_error(error: &WorkError, trace: impl Into<String>) -> Self {
        if error.is_bad_request() {
            End::bad_request(error.to_string())
        } else {
            End::error(error.kind_name(), error.to_string(), trace)
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, End::Ok { .. })
    }

    /// Result payload of a successful end.
    pub fn result(&self) -> Option<&Value> {
        match self {
            End::Ok { result } => Some(result),
            _ => None,
        }
    }

    pub fn status_name(&self) -> &'static str {
        match self {
            End::Ok { .. } => "ok",
            End::BadRequest { .. } => "bad_request",
            End::Error { .. } => "error",
        }
    }
}

#[cfg(test)]
#[path = "end_tests.rs"]
mod tests;
