// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    invalid_argument = { WorkError::invalid_argument("x"), "invalid-argument" },
    not_found = { WorkError::PluginNotFound("p".into()), "not-found" },
    already_registered = { WorkError::AlreadyRegistered("p".into()), "already-registered" },
    already_prepared = { WorkError::AlreadyPrepared("p".into()), "already-prepared" },
    already_dead = { WorkError::AlreadyDead("p".into()), "already-dead" },
    unprepared = { WorkError::Unprepared("p".into()), "unprepared" },
    invalid_plugin = { WorkError::InvalidPlugin("x".into()), "invalid-plugin" },
    invalid_status = { WorkError::InvalidStatus("x".into()), "invalid-status" },
    finished = { WorkError::WorkflowFinished("x".into()), "workflow-finished" },
    unit_exists = { WorkError::UnitExists("u".into()), "workflow-unit-exists" },
    stopped = { WorkError::Stopped("x".into()), "workflow-stopped" },
)]
fn kind_names(error: WorkError, expected: &str) {
    assert_eq!(error.kind_name(), expected);
}

#[test]
fn failed_carries_custom_kind() {
    let error = WorkError::failed("divide-by-zero", "division by zero");
    assert_eq!(error.kind_name(), "divide-by-zero");
    assert_eq!(error.to_string(), "divide-by-zero: division by zero");
}

#[test]
fn only_invalid_argument_is_bad_request() {
    assert!(WorkError::invalid_argument("x").is_bad_request());
    assert!(!WorkError::failed("k", "m").is_bad_request());
    assert!(!WorkError::Stopped("x".into()).is_bad_request());
}
