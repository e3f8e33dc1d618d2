// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Buffered producers under count and timeout limits.

use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use weft_core::{Context, ContextSeed};
use weft_engine::{BufferingJob, Executable, JobBehavior};

fn ctx() -> Context {
    Context::new(ContextSeed::default())
}

#[test]
fn timed_pull_with_immediate_cutoff_gives_back_unseen_items() {
    let produced = Arc::new(Mutex::new(0u32));
    let production_counter = Arc::clone(&produced);
    let producer = Executable::caller(move |_ctx, _args| {
        std::thread::sleep(Duration::from_millis(20));
        *production_counter.lock().unwrap() += 1;
        Ok(json!("x"))
    });

    let given_back: Arc<Mutex<Vec<Value>>> = Arc::new(Mutex::new(Vec::new()));
    let give_back_sink = Arc::clone(&given_back);

    let job = BufferingJob::new("pull", producer)
        .max_items(100)
        .timeout(Duration::from_millis(300))
        .immediately(true)
        .give_back(move |_ctx, item| {
            give_back_sink.lock().unwrap().push(item);
        });

    let c = ctx();
    let result = job.run(&c).unwrap();
    let collected = result.as_array().map(Vec::len).unwrap_or(0);

    // The timeout fired before the count limit.
    assert!(collected > 0, "nothing collected before the timeout");
    assert!(collected < 100, "the count limit should not have been hit");

    // Give the detached producer time to hand back its in-flight item.
    std::thread::sleep(Duration::from_millis(200));
    let leftovers = given_back.lock().unwrap().len();
    assert!(leftovers <= 1, "at most one item was in flight: {leftovers}");
    assert_eq!(
        collected + leftovers,
        *produced.lock().unwrap() as usize,
        "every produced item is either collected or given back"
    );
}

#[test]
fn zero_max_items_returns_an_empty_list_immediately() {
    let producer = Executable::caller(|_ctx, _args| Ok(json!("never")));
    let job = BufferingJob::new("empty", producer).max_items(0);
    let c = ctx();
    assert_eq!(job.run(&c).unwrap(), json!([]));
    assert_eq!(c.get("empty.result"), Some(json!([])));
}

#[test]
fn count_limit_ends_the_pull_without_a_timeout() {
    let producer = Executable::caller(|_ctx, _args| Ok(json!(1)));
    let job = BufferingJob::new("counted", producer).max_items(7);
    assert_eq!(job.run(&ctx()).unwrap(), json!([1, 1, 1, 1, 1, 1, 1]));
}
