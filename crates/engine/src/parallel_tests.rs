// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::unit::Job;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use weft_core::{Context, ContextSeed};

fn ctx() -> Context {
    Context::new(ContextSeed::default())
}

fn constant(name: &str, value: i64) -> Job {
    Job::from_caller(name, move |_ctx, _args| Ok(json!(value)))
}

#[test]
fn collects_sub_job_results_in_declaration_order() {
    let job = ConcurrentJob::new("all")
        .sub_job(constant("one", 1))
        .sub_job(constant("two", 2))
        .sub_job(constant("three", 3));
    let c = ctx();
    assert_eq!(job.run(&c).unwrap(), json!([1, 2, 3]));
    // Each sub-job also recorded its own result.
    assert_eq!(c.get("two.result"), Some(json!(2)));
    assert_eq!(c.get("all.result"), Some(json!([1, 2, 3])));
}

#[test]
fn empty_sub_jobs_return_an_empty_list() {
    let job = ConcurrentJob::new("none");
    assert_eq!(job.run(&ctx()).unwrap(), json!([]));
}

#[test]
fn sub_jobs_overlap_in_time() {
    let mut job = ConcurrentJob::new("slow");
    for i in 0..4 {
        job = job.sub_job(Job::from_caller(format!("sleep_{i}"), |_ctx, _args| {
            std::thread::sleep(Duration::from_millis(150));
            Ok(json!("done"))
        }));
    }
    let started = Instant::now();
    job.run(&ctx()).unwrap();
    assert!(started.elapsed() < Duration::from_millis(450));
}

#[test]
fn join_reduces_the_results() {
    let job = ConcurrentJob::new("sum")
        .sub_job(constant("a", 10))
        .sub_job(constant("b", 20))
        .with_join(|_ctx, values| {
            let total: i64 = values.iter().filter_map(Value::as_i64).sum();
            Ok(json!(total))
        });
    assert_eq!(job.run(&ctx()).unwrap(), json!(30));
}

#[test]
fn stop_policy_surfaces_the_first_failure_in_order() {
    let job = ConcurrentJob::new("strict")
        .sub_job(constant("ok", 1))
        .sub_job(Job::from_caller("bad", |_ctx, _args| {
            Err(WorkError::failed("io", "sub-job two failed"))
        }))
        .sub_job(constant("also_ok", 3));
    let err = job.run(&ctx()).unwrap_err();
    assert_eq!(err.kind_name(), "io");
}

#[test]
fn continue_policy_fills_and_calls_the_handler() {
    let handled = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&handled);
    let job = ConcurrentJob::new("lenient")
        .sub_job(constant("ok", 1))
        .sub_job(Job::from_caller("bad", |_ctx, _args| {
            Err(WorkError::failed("io", "ignored"))
        }))
        .continue_on_error(
            Some(Arc::new(move |_ctx, _err| {
                counter.fetch_add(1, Ordering::SeqCst);
            })),
            json!(0),
        );
    assert_eq!(job.run(&ctx()).unwrap(), json!([1, 0]));
    assert_eq!(handled.load(Ordering::SeqCst), 1);
}

#[test]
fn external_pool_is_reused_not_shut_down() {
    let pool = Arc::new(WorkerPool::new(2).unwrap());
    let job = ConcurrentJob::new("pooled")
        .sub_job(constant("a", 1))
        .sub_job(constant("b", 2))
        .with_pool(Arc::clone(&pool));
    assert_eq!(job.run(&ctx()).unwrap(), json!([1, 2]));
    assert!(pool.submit(|| {}).is_ok());
}
