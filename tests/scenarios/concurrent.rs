// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fork/join and concurrent foreach across real worker threads.

use serde_json::{json, Value};
use std::time::{Duration, Instant};
use weft_core::{CountDownLatch, End};
use weft_engine::{
    ConcurrentForeachJob, ConcurrentFork, ConcurrentJoin, Executable, Job, JobBehavior, Workflow,
};

#[test]
fn ten_workers_overlap_their_sleeps() {
    let workflow = Workflow::new(vec![
        Job::from_caller("init", |ctx, _args| {
            ctx.set("base", 1);
            Ok(json!(1))
        })
        .into(),
        ConcurrentFork::new("f", 10).into(),
        Job::from_caller("first_leg", |ctx, _args| {
            std::thread::sleep(Duration::from_millis(300));
            let base = ctx.get("base").and_then(|v| v.as_i64()).unwrap_or(0);
            Ok(json!(base + 2))
        })
        .into(),
        Job::from_caller("second_leg", |ctx, _args| {
            std::thread::sleep(Duration::from_millis(200));
            let first = ctx
                .get("first_leg.result")
                .and_then(|v| v.as_i64())
                .unwrap_or(0);
            Ok(json!(first + 2))
        })
        .into(),
        ConcurrentJoin::new("j").into(),
    ])
    .unwrap();

    let started = Instant::now();
    let end = workflow.execute(None);
    let elapsed = started.elapsed();

    // Every worker computes 1 + 2 + 2; ten workers in parallel finish in
    // roughly one worker's time, nowhere near the 5s serial cost.
    assert_eq!(end, End::ok(json!(vec![5; 10])));
    assert!(
        elapsed < Duration::from_millis(2500),
        "fork did not overlap: {elapsed:?}"
    );
}

#[test]
fn foreach_applies_one_operation_across_threads() {
    let job = ConcurrentForeachJob::new(
        "squares",
        Executable::caller(|_ctx, args| {
            let a = args.get(0).and_then(Value::as_i64).unwrap_or(0);
            Ok(json!(a * a))
        }),
    )
    .args(weft_core::ArgSpec::Positional(
        (1..=20).map(Value::from).collect(),
    ))
    .thread_num(4);

    let ctx = weft_core::Context::new(weft_core::ContextSeed::default());
    let result = job.run(&ctx).unwrap();
    let expected: Vec<i64> = (1..=20).map(|i| i * i).collect();
    assert_eq!(result, json!(expected));
}

#[test]
fn foreach_with_empty_args_returns_an_empty_list() {
    let job = ConcurrentForeachJob::new(
        "nothing",
        Executable::caller(|_ctx, _args| Ok(json!(1))),
    );
    let ctx = weft_core::Context::new(weft_core::ContextSeed::default());
    assert_eq!(job.run(&ctx).unwrap(), json!([]));
}

#[test]
fn counted_down_latch_does_not_block() {
    let latch = CountDownLatch::new(1).unwrap();
    latch.count_down();
    // Returns immediately.
    latch.wait();
}
