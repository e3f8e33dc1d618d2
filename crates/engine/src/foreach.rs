// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Parallel application of one operation over an argument stream.

use crate::pool::WorkerPool;
use crate::unit::{Executable, JobBehavior, Unit};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use weft_core::args::{expand_str, ArgSpec, ArgStream, CallArgs};
use weft_core::{Context, WorkError};

/// Chunk/result reducer: context plus the collected values.
pub type ReduceFn = Arc<dyn Fn(&Context, Vec<Value>) -> Result<Value, WorkError> + Send + Sync>;

type ErrorHandlerFn = Arc<dyn Fn(&Context, &WorkError) + Send + Sync>;

/// What a failing item does to the rest of the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// Abort: in-flight items finish, no new ones start, the error
    /// surfaces through the workflow.
    Stop,
    /// Record locally (handler + fill value) and keep going; the
    /// workflow-level error hook never fires.
    Continue,
}

/// Job that partitions an argument sequence into contiguous chunks and
/// applies one operation per item across a worker pool.
///
/// Item shapes follow the standard rules: null applies the operation with
/// no arguments, an array positionally, an object by keyword, and any
/// scalar as a single positional argument.
pub struct ConcurrentForeachJob {
    name: String,
    executable: Executable,
    args: Option<ArgSpec>,
    thread_num: usize,
    task_num_per_thread: Option<usize>,
    sub_join: Option<ReduceFn>,
    result_join: Option<ReduceFn>,
    error_policy: ErrorPolicy,
    error_handler: Option<ErrorHandlerFn>,
    error_default: Value,
    goto: Option<String>,
}

impl ConcurrentForeachJob {
    pub fn new(name: impl Into<String>, executable: Executable) -> Self {
        ConcurrentForeachJob {
            name: name.into(),
            executable,
            args: None,
            thread_num: 10,
            task_num_per_thread: None,
            sub_join: None,
            result_join: None,
            error_policy: ErrorPolicy::Stop,
            error_handler: None,
            error_default: Value::Null,
            goto: None,
        }
    }

    pub fn args(mut self, args: ArgSpec) -> Self {
        self.args = Some(args);
        self
    }

    pub fn thread_num(mut self, thread_num: usize) -> Self {
        self.thread_num = thread_num;
        self
    }

    /// Chunk size override; required when the argument source is a stream
    /// of unknown length.
    pub fn task_num_per_thread(mut self, per_thread: usize) -> Self {
        self.task_num_per_thread = Some(per_thread);
        self
    }

    /// Reducer applied to each chunk's results inside its task.
    pub fn sub_join(
        mut self,
        f: impl Fn(&Context, Vec<Value>) -> Result<Value, WorkError> + Send + Sync + 'static,
    ) -> Self {
        self.sub_join = Some(Arc::new(f));
        self
    }

    /// Final reducer over the chunk results; the default flattens one
    /// level.
    pub fn result_join(
        mut self,
        f: impl Fn(&Context, Vec<Value>) -> Result<Value, WorkError> + Send + Sync + 'static,
    ) -> Self {
        self.result_join = Some(Arc::new(f));
        self
    }

    /// Switch to the `continue` policy: failed items invoke the handler
    /// (if any) and contribute the fill value.
    pub fn continue_on_error(
        mut self,
        handler: Option<Arc<dyn Fn(&Context, &WorkError) + Send + Sync>>,
        fill: Value,
    ) -> Self {
        self.error_policy = ErrorPolicy::Continue;
        self.error_handler = handler;
        self.error_default = fill;
        self
    }

    pub fn with_goto(mut self, next: impl Into<String>) -> Self {
        self.goto = Some(next.into());
        self
    }

    fn chunks(&self, ctx: &Context) -> Result<Vec<Vec<Value>>, WorkError> {
        if self.thread_num == 0 {
            return Err(WorkError::invalid_argument(format!(
                "'{}': thread_num must be positive",
                self.name
            )));
        }
        let per_thread = |n: usize| -> Result<usize, WorkError> {
            if n == 0 {
                Err(WorkError::invalid_argument(format!(
                    "'{}': task_num_per_thread must be positive",
                    self.name
                )))
            } else {
                Ok(n)
            }
        };

        match expand_items(ctx, &self.name, self.args.as_ref())? {
            ItemSource::Items(items) => {
                if items.is_empty() {
                    return Ok(Vec::new());
                }
                let per = match self.task_num_per_thread {
                    Some(n) => per_thread(n)?,
                    None => items.len().div_ceil(self.thread_num),
                };
                Ok(items.chunks(per).map(<[Value]>::to_vec).collect())
            }
            ItemSource::Stream(stream) => {
                // Unknown length: the caller must size the chunks, and the
                // stream is consumed exactly once.
                let per = per_thread(self.task_num_per_thread.ok_or_else(|| {
                    WorkError::invalid_argument(format!(
                        "'{}': an argument stream of unknown length needs task_num_per_thread",
                        self.name
                    ))
                })?)?;
                let mut chunks = Vec::new();
                let mut current = Vec::new();
                while let Some(item) = stream.next() {
                    current.push(item_value(ctx, &self.name, item)?);
                    if current.len() == per {
                        chunks.push(std::mem::take(&mut current));
                    }
                }
                if !current.is_empty() {
                    chunks.push(current);
                }
                Ok(chunks)
            }
        }
    }
}

impl JobBehavior for ConcurrentForeachJob {
    fn name(&self) -> &str {
        &self.name
    }

    fn goto(&self) -> Option<&str> {
        self.goto.as_deref()
    }

    fn set_goto(&mut self, next: String) {
        self.goto = Some(next);
    }

    fn run(&self, ctx: &Context) -> Result<Value, WorkError> {
        let chunks = self.chunks(ctx)?;
        let key = format!("{}.result", self.name);
        if chunks.is_empty() {
            let empty = Value::Array(Vec::new());
            ctx.set(key, empty.clone());
            return Ok(empty);
        }

        let chunk_count = chunks.len();
        tracing::info!(
            unit = %self.name,
            workers = self.thread_num,
            chunks = chunk_count,
            "concurrent foreach starting"
        );

        let pool = WorkerPool::new(self.thread_num)?;
        let abort = Arc::new(AtomicBool::new(false));
        let (tx, rx) = mpsc::channel::<(usize, Result<Value, WorkError>)>();

        for (chunk_idx, chunk) in chunks.into_iter().enumerate() {
            let tx = tx.clone();
            let abort = Arc::clone(&abort);
            let ctx = ctx.clone();
            let executable = self.executable.clone();
            let sub_join = self.sub_join.clone();
            let policy = self.error_policy;
            let handler = self.error_handler.clone();
            let fill = self.error_default.clone();
            let unit = self.name.clone();
            pool.submit(move || {
                let result = run_chunk(
                    &ctx, &unit, &executable, &chunk, &abort, policy, &handler, &fill, &sub_join,
                );
                let _ = tx.send((chunk_idx, result));
            })?;
        }
        drop(tx);

        let mut slots: Vec<Option<Result<Value, WorkError>>> =
            (0..chunk_count).map(|_| None).collect();
        for _ in 0..chunk_count {
            let (idx, result) = rx.recv().map_err(|_| {
                WorkError::InvalidStatus(format!(
                    "'{}': a foreach task terminated without reporting",
                    self.name
                ))
            })?;
            slots[idx] = Some(result);
        }

        // First failure in chunk order wins; completed chunks are dropped.
        let mut chunk_values = Vec::with_capacity(chunk_count);
        for slot in slots {
            match slot {
                Some(Ok(value)) => chunk_values.push(value),
                Some(Err(error)) => return Err(error),
                None => {
                    return Err(WorkError::InvalidStatus(format!(
                        "'{}': a foreach task reported no result",
                        self.name
                    )))
                }
            }
        }

        let result = match &self.result_join {
            Some(f) => f(ctx, chunk_values)?,
            None => flatten_one_level(chunk_values),
        };
        ctx.set(key, result.clone());
        Ok(result)
    }
}

enum ItemSource {
    Items(Vec<Value>),
    Stream(ArgStream),
}

fn expand_items(
    ctx: &Context,
    unit: &str,
    spec: Option<&ArgSpec>,
) -> Result<ItemSource, WorkError> {
    match spec {
        None => Ok(ItemSource::Items(Vec::new())),
        Some(ArgSpec::Positional(values)) => Ok(ItemSource::Items(values.clone())),
        Some(ArgSpec::Stream(stream)) => Ok(ItemSource::Stream(stream.clone())),
        Some(ArgSpec::Text(s)) => match expand_str(ctx, s) {
            Value::Array(values) => Ok(ItemSource::Items(values)),
            Value::Null => Ok(ItemSource::Items(Vec::new())),
            _ => Err(WorkError::invalid_argument(format!(
                "'{unit}': foreach arguments must reference a sequence"
            ))),
        },
        Some(ArgSpec::Thunk(f)) => {
            let produced = f(ctx);
            expand_items(ctx, unit, produced.as_ref())
        }
        Some(ArgSpec::Keyword(_)) => Err(WorkError::invalid_argument(format!(
            "'{unit}': foreach arguments must be a sequence or stream"
        ))),
    }
}

/// Ground one stream item to a value, keeping its argument shape.
fn item_value(ctx: &Context, unit: &str, item: ArgSpec) -> Result<Value, WorkError> {
    match item {
        ArgSpec::Positional(values) => Ok(Value::Array(values)),
        ArgSpec::Keyword(map) => Ok(Value::Object(map.into_iter().collect())),
        ArgSpec::Text(s) => Ok(expand_str(ctx, &s)),
        ArgSpec::Thunk(f) => match f(ctx) {
            Some(spec) => item_value(ctx, unit, spec),
            None => Ok(Value::Null),
        },
        ArgSpec::Stream(_) => Err(WorkError::invalid_argument(format!(
            "'{unit}': nested argument streams are not supported"
        ))),
    }
}

fn apply_item(ctx: &Context, executable: &Executable, item: &Value) -> Result<Value, WorkError> {
    let call = match item {
        Value::Null => CallArgs::None,
        Value::Array(values) => CallArgs::Positional(values.clone()),
        Value::Object(map) => CallArgs::Keyword(
            map.iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        ),
        other => CallArgs::Positional(vec![other.clone()]),
    };
    executable.run(ctx, call)
}

#[allow(clippy::too_many_arguments)]
fn run_chunk(
    ctx: &Context,
    unit: &str,
    executable: &Executable,
    chunk: &[Value],
    abort: &AtomicBool,
    policy: ErrorPolicy,
    handler: &Option<ErrorHandlerFn>,
    fill: &Value,
    sub_join: &Option<ReduceFn>,
) -> Result<Value, WorkError> {
    let mut out = Vec::with_capacity(chunk.len());
    for item in chunk {
        // Best-effort abort: checked between argument applications.
        if abort.load(Ordering::Relaxed) {
            break;
        }
        match apply_item(ctx, executable, item) {
            Ok(value) => out.push(value),
            Err(error) => match policy {
                ErrorPolicy::Stop => {
                    abort.store(true, Ordering::Relaxed);
                    tracing::error!(unit, error = %error, "foreach item failed, aborting");
                    return Err(error);
                }
                ErrorPolicy::Continue => {
                    tracing::warn!(unit, error = %error, "foreach item failed, continuing");
                    if let Some(handler) = handler {
                        handler(ctx, &error);
                    }
                    out.push(fill.clone());
                }
            },
        }
    }
    match sub_join {
        Some(f) => f(ctx, out),
        None => Ok(Value::Array(out)),
    }
}

fn flatten_one_level(chunks: Vec<Value>) -> Value {
    let mut flat = Vec::new();
    for chunk in chunks {
        match chunk {
            Value::Array(items) => flat.extend(items),
            other => flat.push(other),
        }
    }
    Value::Array(flat)
}

impl From<ConcurrentForeachJob> for Unit {
    fn from(job: ConcurrentForeachJob) -> Self {
        Unit::Job(Box::new(job))
    }
}

#[cfg(test)]
#[path = "foreach_tests.rs"]
mod tests;
