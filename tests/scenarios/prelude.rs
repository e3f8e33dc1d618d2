// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared helpers for the scenario suite.

use serde_json::{json, Value};
use weft_core::{ArgMap, ArgSpec, CallArgs, Context, WorkError};
use weft_engine::Job;

pub fn positional_i64(args: &CallArgs, idx: usize) -> i64 {
    args.get(idx).and_then(Value::as_i64).unwrap_or(0)
}

/// `add_one(a) = a + 1`
pub fn add_one_job() -> Job {
    Job::from_caller("add_one", |_ctx: &Context, args: CallArgs| {
        Ok(json!(positional_i64(&args, 0) + 1))
    })
}

/// `add_three(a) = a + 3`
pub fn add_three_job() -> Job {
    Job::from_caller("add_three", |_ctx: &Context, args: CallArgs| {
        Ok(json!(positional_i64(&args, 0) + 3))
    })
}

/// `div(a, b) = a / b`, failing with kind `divide-by-zero` on b = 0.
pub fn div_op(_ctx: &Context, args: CallArgs) -> Result<Value, WorkError> {
    let a = args.kw("a").and_then(Value::as_f64).unwrap_or(0.0);
    let b = args.kw("b").and_then(Value::as_f64).unwrap_or(0.0);
    if b == 0.0 {
        return Err(WorkError::failed("divide-by-zero", "division by zero"));
    }
    Ok(json!(a / b))
}

pub fn args_for(unit: &str, spec: ArgSpec) -> ArgMap {
    let mut args = ArgMap::new();
    args.insert(unit.to_string(), spec);
    args
}
