// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Decision branches select among declared continuations.

use crate::prelude::*;
use serde_json::{json, Value};
use weft_core::{ArgSpec, End};
use weft_engine::{Decision, EndUnit, Job, Workflow};

/// The branch layout from the decision scenario:
/// add_one → add_two → decide → (division | add_three → out).
fn branch_workflow() -> Workflow {
    Workflow::new(vec![
        add_one_job().into(),
        Job::from_caller("add_two", |_ctx, args| {
            Ok(json!(positional_i64(&args, 0) + 2))
        })
        .args(ArgSpec::positional([json!("$add_one.result")]))
        .into(),
        Decision::new("decide", |ctx| {
            let total = ctx
                .get("add_two.result")
                .and_then(|v| v.as_i64())
                .unwrap_or(0);
            if total <= 10 {
                "division".to_string()
            } else {
                "add_three".to_string()
            }
        })
        .into(),
        Job::from_caller("division", |_ctx, args| {
            let a = args.get(0).and_then(Value::as_f64).unwrap_or(0.0);
            let b = args.get(1).and_then(Value::as_f64).unwrap_or(1.0);
            Ok(json!(a / b))
        })
        .args(ArgSpec::positional([json!("$add_two.result"), json!(2)]))
        .with_goto("end")
        .into(),
        add_three_job()
            .args(ArgSpec::positional([json!("$add_two.result")]))
            .into(),
        EndUnit::ok_with("out", |ctx, _args| {
            Ok(ctx.get("add_two.result").unwrap_or(Value::Null))
        })
        .into(),
    ])
    .unwrap()
}

#[test]
fn small_input_routes_through_division() {
    let end = branch_workflow().execute(Some(args_for("add_one", ArgSpec::positional([1]))));
    // 1 → 2 → 4 → 4 / 2 = 2
    assert_eq!(end, End::ok(json!(2.0)));
}

#[test]
fn large_input_routes_through_add_three_to_the_end_unit() {
    let end = branch_workflow().execute(Some(args_for("add_one", ArgSpec::positional([10]))));
    // 10 → 11 → 13: too big for division, so add_three runs and the end
    // unit reports the add_two result.
    assert_eq!(end, End::ok(json!(13)));
}
