// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::unit::Job;
use serde_json::{json, Value};
use weft_core::{ArgSpec, End};

fn echo_config() -> Unit {
    Job::from_caller("echo", |ctx, args| {
        let key = args
            .get(0)
            .and_then(Value::as_str)
            .unwrap_or("db.host")
            .to_string();
        Ok(ctx.config().get(&key).cloned().unwrap_or(Value::Null))
    })
    .into()
}

#[test]
fn env_carries_args_and_config() {
    let env = Env::new("staging")
        .with_description("pre-production")
        .with_arg("load", ArgSpec::positional([100]))
        .with_config(Config::new().with_item("db", "host", "db.staging"));

    assert_eq!(env.name(), "staging");
    assert_eq!(env.description(), "pre-production");
    assert!(env.args().contains_key("load"));
    assert_eq!(env.config().get("db.host"), Some(&json!("db.staging")));
}

#[test]
fn build_without_environ_uses_the_base_config() {
    let (workflow, args) = WorkflowBuilder::new()
        .unit(echo_config())
        .config(Config::new().with_item("db", "host", "db.prod"))
        .build()
        .unwrap();

    assert!(args.is_empty());
    let end = workflow.execute(None);
    assert_eq!(end, End::ok(json!("db.prod")));
}

#[test]
fn selected_environ_overlays_config_and_supplies_args() {
    let (workflow, args) = WorkflowBuilder::new()
        .unit(echo_config())
        .config(
            Config::new()
                .with_item("db", "host", "db.prod")
                .with_item("db", "port", 5432),
        )
        .env(
            Env::test().with_config(Config::new().with_item("db", "host", "db.test")),
        )
        .env(
            Env::new("staging")
                .with_arg("echo", ArgSpec::positional(["db.port"]))
                .with_config(Config::new().with_item("db", "host", "db.staging")),
        )
        .environ("staging")
        .build()
        .unwrap();

    let end = workflow.execute(Some(args));
    // The env arg redirects the lookup to the port, which the base config
    // still provides.
    assert_eq!(end, End::ok(json!(5432)));
}

#[test]
fn unknown_environ_is_invalid_argument() {
    let err = WorkflowBuilder::new()
        .unit(echo_config())
        .environ("nope")
        .build()
        .unwrap_err();
    assert_eq!(err.kind_name(), "invalid-argument");
}

#[test]
fn builder_wires_listeners_and_plugins() {
    use std::sync::atomic::{AtomicUsize, Ordering};
    let started = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&started);

    let (workflow, _args) = WorkflowBuilder::new()
        .unit(echo_config())
        .hooks(HookSet::new().on_start(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }))
        .build()
        .unwrap();

    workflow.execute(None);
    assert_eq!(started.load(Ordering::SeqCst), 1);
}
