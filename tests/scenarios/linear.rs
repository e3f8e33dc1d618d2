// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Linear chains: results flow unit to unit through the context.

use crate::prelude::*;
use serde_json::{json, Value};
use similar_asserts::assert_eq;
use std::sync::{Arc, Mutex};
use weft_core::{ArgSpec, End, HookSet};
use weft_engine::{Job, Workflow};

#[test]
fn linear_addition_threads_results_through_references() {
    let mut workflow = Workflow::new(vec![
        add_one_job().into(),
        add_three_job()
            .args(ArgSpec::positional([json!("$add_one.result")]))
            .into(),
    ])
    .unwrap();

    let observed: Arc<Mutex<Vec<Value>>> = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&observed);
    workflow.add_hooks(HookSet::new().on_finish(move |ctx| {
        let mut seen = log.lock().unwrap();
        seen.push(ctx.get("add_one.result").unwrap_or(Value::Null));
        seen.push(ctx.get("add_three.result").unwrap_or(Value::Null));
    }));

    let end = workflow.execute(Some(args_for("add_one", ArgSpec::positional([1]))));
    assert_eq!(end, End::ok(json!(5)));
    // The context recorded both intermediate results.
    assert_eq!(*observed.lock().unwrap(), vec![json!(2), json!(5)]);
}

#[test]
fn keyword_arguments_merge_template_and_runtime() {
    let workflow = Workflow::new(vec![Job::from_caller("greet", |_ctx, args| {
        let name = args
            .kw("name")
            .and_then(|v| v.as_str())
            .unwrap_or("?")
            .to_string();
        let greeting = args
            .kw("greeting")
            .and_then(|v| v.as_str())
            .unwrap_or("hello")
            .to_string();
        Ok(json!(format!("{greeting}, {name}")))
    })
    .args(ArgSpec::keyword([
        ("greeting", "hello"),
        ("name", "template"),
    ]))
    .into()])
    .unwrap();

    let end = workflow.execute(Some(args_for(
        "greet",
        ArgSpec::keyword([("name", "runtime")]),
    )));
    assert_eq!(end, End::ok(json!("hello, runtime")));
}

#[test]
fn double_dollar_escapes_resolve_to_a_literal_dollar() {
    let workflow = Workflow::new(vec![Job::from_caller("echo", |_ctx, args| {
        Ok(args.get(0).cloned().unwrap_or(Value::Null))
    })
    .args(ArgSpec::positional([json!("$$price")]))
    .into()])
    .unwrap();

    let end = workflow.execute(None);
    assert_eq!(end, End::ok(json!("$price")));
}

#[test]
fn stream_templates_collect_per_item_results() {
    let workflow = Workflow::new(vec![Job::from_caller("double", |_ctx, args| {
        Ok(json!(positional_i64(&args, 0) * 2))
    })
    .args(ArgSpec::stream(
        (1..=3).map(|i| ArgSpec::positional([i])),
    ))
    .into()])
    .unwrap();

    let end = workflow.execute(None);
    assert_eq!(end, End::ok(json!([2, 4, 6])));
}
