// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Parallel execution of several distinct jobs within one sequencer step.

use crate::foreach::{ErrorPolicy, ReduceFn};
use crate::pool::WorkerPool;
use crate::unit::{JobBehavior, Unit};
use serde_json::Value;
use std::sync::{mpsc, Arc};
use weft_core::{Context, WorkError};

type ErrorHandlerFn = Arc<dyn Fn(&Context, &WorkError) + Send + Sync>;

/// Job that runs a fixed set of sub-jobs concurrently over a pool and
/// collects their results in declaration order.
///
/// Sub-jobs share the calling context; each stores its own
/// `"{name}.result"` as usual. Unlike the foreach job there is no abort
/// flag: every sub-job runs, and under the `stop` policy the first
/// failure in declaration order surfaces after all of them settle.
pub struct ConcurrentJob {
    name: String,
    sub_jobs: Vec<Arc<dyn JobBehavior>>,
    pool: Option<Arc<WorkerPool>>,
    join: Option<ReduceFn>,
    error_policy: ErrorPolicy,
    error_handler: Option<ErrorHandlerFn>,
    error_default: Value,
    goto: Option<String>,
}

impl ConcurrentJob {
    pub fn new(name: impl Into<String>) -> Self {
        ConcurrentJob {
            name: name.into(),
            sub_jobs: Vec::new(),
            pool: None,
            join: None,
            error_policy: ErrorPolicy::Stop,
            error_handler: None,
            error_default: Value::Null,
            goto: None,
        }
    }

    pub fn sub_job(mut self, job: impl JobBehavior + 'static) -> Self {
        self.sub_jobs.push(Arc::new(job));
        self
    }

    /// Run on an externally owned pool; the caller keeps responsibility
    /// for shutting it down.
    pub fn with_pool(mut self, pool: Arc<WorkerPool>) -> Self {
        self.pool = Some(pool);
        self
    }

    /// Reducer over the collected sub-job results.
    pub fn with_join(
        mut self,
        f: impl Fn(&Context, Vec<Value>) -> Result<Value, WorkError> + Send + Sync + 'static,
    ) -> Self {
        self.join = Some(Arc::new(f));
        self
    }

    /// Switch to the `continue` policy: failed sub-jobs invoke the handler
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
}

impl JobBehavior for ConcurrentJob {
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
        let key = format!("{}.result", self.name);
        if self.sub_jobs.is_empty() {
            let empty = Value::Array(Vec::new());
            ctx.set(key, empty.clone());
            return Ok(empty);
        }

        let owned_pool;
        let pool: &WorkerPool = match &self.pool {
            Some(external) => external,
            None => {
                owned_pool = WorkerPool::new(self.sub_jobs.len())?;
                &owned_pool
            }
        };

        let (tx, rx) = mpsc::channel::<(usize, Result<Value, WorkError>)>();
        for (idx, job) in self.sub_jobs.iter().enumerate() {
            let tx = tx.clone();
            let job = Arc::clone(job);
            let ctx = ctx.clone();
            pool.submit(move || {
                let _ = tx.send((idx, job.run(&ctx)));
            })?;
        }
        drop(tx);

        let mut slots: Vec<Option<Result<Value, WorkError>>> =
            (0..self.sub_jobs.len()).map(|_| None).collect();
        for _ in 0..self.sub_jobs.len() {
            let (idx, result) = rx.recv().map_err(|_| {
                WorkError::InvalidStatus(format!(
                    "'{}': a sub-job terminated without reporting",
                    self.name
                ))
            })?;
            slots[idx] = Some(result);
        }

        let mut results = Vec::with_capacity(self.sub_jobs.len());
        for slot in slots {
            match slot {
                Some(Ok(value)) => results.push(value),
                Some(Err(error)) => match self.error_policy {
                    ErrorPolicy::Stop => {
                        tracing::error!(unit = %self.name, error = %error, "sub-job failed");
                        return Err(error);
                    }
                    ErrorPolicy::Continue => {
                        tracing::warn!(unit = %self.name, error = %error, "sub-job failed, continuing");
                        if let Some(handler) = &self.error_handler {
                            handler(ctx, &error);
                        }
                        results.push(self.error_default.clone());
                    }
                },
                None => {
                    return Err(WorkError::InvalidStatus(format!(
                        "'{}': a sub-job reported no result",
                        self.name
                    )))
                }
            }
        }

        let result = match &self.join {
            Some(f) => f(ctx, results)?,
            None => Value::Array(results),
        };
        ctx.set(key, result.clone());
        Ok(result)
    }
}

impl From<ConcurrentJob> for Unit {
    fn from(job: ConcurrentJob) -> Self {
        Unit::Job(Box::new(job))
    }
}

#[cfg(test)]
#[path = "parallel_tests.rs"]
mod tests;
