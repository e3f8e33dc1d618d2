// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Failure folding: every outcome is an End, never a propagated error.

use crate::prelude::*;
use serde_json::json;
use weft_core::{ArgSpec, End, ErrorInfo, HookSet};
use weft_engine::{Job, Workflow};

/// add → div with a zero divisor from the runtime arguments.
fn divide_by_zero_workflow() -> Workflow {
    Workflow::new(vec![
        add_one_job().args(ArgSpec::positional([5])).into(),
        Job::from_caller("div", div_op)
            .args(ArgSpec::keyword([("a", json!("$add_one.result"))]))
            .into(),
    ])
    .unwrap()
}

#[test]
fn divide_by_zero_yields_an_error_end_with_the_kind_name() {
    let workflow = divide_by_zero_workflow();
    let end = workflow.execute(Some(args_for("div", ArgSpec::keyword([("b", 0)]))));
    match end {
        End::Error {
            kind,
            message,
            trace,
        } => {
            assert_eq!(kind, "divide-by-zero");
            assert!(message.contains("division by zero"));
            assert!(trace.contains("at unit 'div' [job]"));
        }
        other => panic!("expected an error end, got {other:?}"),
    }
}

#[test]
fn on_error_fires_with_the_error_triple() {
    let seen = std::sync::Arc::new(std::sync::Mutex::new(Vec::<ErrorInfo>::new()));
    let sink = std::sync::Arc::clone(&seen);

    let mut workflow = divide_by_zero_workflow();
    workflow.add_hooks(HookSet::new().on_error(move |_ctx, info| {
        sink.lock().unwrap().push(info.clone());
    }));

    workflow.execute(Some(args_for("div", ArgSpec::keyword([("b", 0)]))));
    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].kind, "divide-by-zero");
    assert!(seen[0].trace.contains("at unit 'div'"));
}

#[test]
fn valid_divisor_divides_normally() {
    let workflow = divide_by_zero_workflow();
    let end = workflow.execute(Some(args_for("div", ArgSpec::keyword([("b", 2)]))));
    assert_eq!(end, End::ok(json!(3.0)));
}

#[test]
fn unknown_transition_target_is_diagnosed_not_looped() {
    let workflow = Workflow::new(vec![
        add_one_job().with_goto("nowhere").into(),
        add_three_job().into(),
    ])
    .unwrap();
    let end = workflow.execute(Some(args_for("add_one", ArgSpec::positional([1]))));
    match end {
        End::BadRequest { message } => assert!(message.contains("unknown unit target")),
        other => panic!("expected a bad request, got {other:?}"),
    }
}
