// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persist, crash, and resume.

use crate::prelude::*;
use serde_json::json;
use similar_asserts::assert_eq;
use weft_core::{ArgSpec, End};
use weft_engine::{Job, Workflow};
use weft_storage::{
    load_snapshot, FileRecoverPolicy, PersistListener, RecoverPolicy, RunStatus,
};

/// add → div, checkpointed before every unit.
fn persisted_workflow(dump: &std::path::Path) -> Workflow {
    let mut workflow = Workflow::new(vec![
        Job::from_caller("add", |_ctx, args| {
            let a = positional_i64(&args, 0);
            let b = positional_i64(&args, 1);
            Ok(json!(a + b))
        })
        .into(),
        Job::from_caller("div", div_op).into(),
    ])
    .unwrap();
    workflow.add_listener(PersistListener::new(dump));
    workflow
}

#[test]
fn crash_then_resume_re_executes_the_failed_unit() {
    let dir = tempfile::tempdir().unwrap();
    let dump = dir.path().join("dump.dat");

    // First run: div fails on a zero divisor.
    let workflow = persisted_workflow(&dump);
    let mut args = args_for("add", ArgSpec::positional([1, 2]));
    args.extend(args_for("div", ArgSpec::keyword([("a", json!(6)), ("b", json!(0))])));
    let end = workflow.execute(Some(args));
    assert!(matches!(end, End::Error { .. }));

    // The artifact captured the state just before div ran.
    let snapshot = load_snapshot(&dump).unwrap().unwrap();
    assert_eq!(snapshot.status, RunStatus::Running);
    assert_eq!(snapshot.current_unit.as_deref(), Some("div"));
    assert_eq!(snapshot.data.get("add.result"), Some(&json!(3)));

    // Second run: recover, fix the divisor, resume at div.
    let info = FileRecoverPolicy::new(&dump).load().unwrap();
    assert_eq!(info.begin_unit.as_deref(), Some("div"));

    let workflow = persisted_workflow(&dump).with_context_factory(info.context_factory);
    let args = args_for("div", ArgSpec::keyword([("a", json!(6)), ("b", json!(2))]));
    let end = workflow.execute_bounded(Some(args), info.begin_unit.as_deref(), None);
    assert_eq!(end, End::ok(json!(3.0)));

    // The completed run marks the artifact finished, and recovering it
    // again is refused.
    let snapshot = load_snapshot(&dump).unwrap().unwrap();
    assert_eq!(snapshot.status, RunStatus::Finished);
    let err = FileRecoverPolicy::new(&dump).load().unwrap_err();
    assert_eq!(err.kind_name(), "workflow-finished");
}

#[test]
fn persist_then_recover_preserves_the_data_map() {
    let dir = tempfile::tempdir().unwrap();
    let dump = dir.path().join("dump.dat");

    // Run up to the failure to leave a running artifact behind.
    let workflow = persisted_workflow(&dump);
    let mut args = args_for("add", ArgSpec::positional([20, 22]));
    args.extend(args_for("div", ArgSpec::keyword([("a", json!(1)), ("b", json!(0))])));
    workflow.execute(Some(args));

    let snapshot = load_snapshot(&dump).unwrap().unwrap();
    let info = FileRecoverPolicy::new(&dump).load().unwrap();
    let ctx = (info.context_factory)(weft_core::ContextSeed::default());

    // The recovered context equals the persisted data map.
    assert_eq!(ctx.data_snapshot(), snapshot.data);
    assert_eq!(ctx.get("add.result"), Some(json!(42)));
}

#[test]
fn missing_artifact_resumes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let info = FileRecoverPolicy::new(dir.path().join("absent.dat"))
        .load()
        .unwrap();
    assert!(info.begin_unit.is_none());
}
