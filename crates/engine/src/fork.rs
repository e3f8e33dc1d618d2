// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Concurrent fork/join units and their main-thread variants.
//!
//! A fork spawns one sub-workflow per worker over the `[start_point,
//! end_point]` slice of the parent graph. The coordination state (latch,
//! result slots, owned pool) travels to the paired join as a
//! [`ForkHandle`]; the join releases it on every path, which also shuts
//! down a fork-owned pool.

use crate::graph::UnitGraph;
use crate::pool::WorkerPool;
use crate::unit::{ForkBehavior, JoinBehavior, Unit};
use crate::workflow::Workflow;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use weft_core::{Context, ContextFactory, CountDownLatch, End, ListenerReg, WorkError};

/// User join logic: parent context plus the worker ends in worker-id order.
pub type JoinFn = Arc<dyn Fn(&Context, Vec<End>) -> Result<Value, WorkError> + Send + Sync>;

/// Coordination state allocated by a fork and consumed by its join.
pub struct ForkHandle {
    latch: Arc<CountDownLatch>,
    slots: Arc<Mutex<Vec<Option<End>>>>,
    // Kept alive until the join drops the handle; dropping joins the pool
    // workers.
    #[allow(dead_code)]
    owned_pool: Option<Arc<WorkerPool>>,
}

impl ForkHandle {
    fn new(
        latch: Arc<CountDownLatch>,
        slots: Arc<Mutex<Vec<Option<End>>>>,
        owned_pool: Option<Arc<WorkerPool>>,
    ) -> Self {
        ForkHandle {
            latch,
            slots,
            owned_pool,
        }
    }

    /// Block until every worker has counted down.
    pub fn wait(&self) {
        self.latch.wait();
    }

    /// Worker ends in worker-id order. A worker that died without
    /// reporting yields an error end.
    pub fn take_ends(&self) -> Vec<End> {
        self.slots
            .lock()
            .iter_mut()
            .map(|slot| {
                slot.take().unwrap_or_else(|| {
                    End::error(
                        "invalid-status",
                        "fork worker terminated without a result",
                        "",
                    )
                })
            })
            .collect()
    }
}

/// Counts the latch down when dropped, so a worker that unwinds still
/// releases the join.
struct LatchGuard(Arc<CountDownLatch>);

impl Drop for LatchGuard {
    fn drop(&mut self) {
        self.0.count_down();
    }
}

fn inherit_listeners(
    extends: bool,
    parent: &[ListenerReg],
    local: &[ListenerReg],
) -> Vec<ListenerReg> {
    if extends {
        parent.iter().chain(local.iter()).cloned().collect()
    } else {
        local.to_vec()
    }
}

/// Shared join semantics: wait, aggregate, store, release.
fn join_pending(
    name: &str,
    join: Option<&JoinFn>,
    ctx: &Context,
    pending: Option<ForkHandle>,
) -> Result<Value, WorkError> {
    let Some(handle) = pending else {
        return Err(WorkError::InvalidStatus(format!(
            "join '{name}' has no pending fork"
        )));
    };
    handle.wait();
    let ends = handle.take_ends();
    let result = match join {
        Some(f) => f(ctx, ends)?,
        None => default_aggregate(ends)?,
    };
    ctx.set(format!("{name}.result"), result.clone());
    Ok(result)
    // `handle` drops here on success and on error alike, releasing the
    // fork state and any fork-owned pool.
}

/// Default aggregation: worker results in worker-id order. A bad-request
/// end resurfaces as invalid-argument, an error end rethrows its failure.
fn default_aggregate(ends: Vec<End>) -> Result<Value, WorkError> {
    let mut results = Vec::with_capacity(ends.len());
    for end in ends {
        match end {
            End::Ok { result } => results.push(result),
            End::BadRequest { message } => return Err(WorkError::InvalidArgument(message)),
            End::Error { kind, message, .. } => return Err(WorkError::Failed { kind, message }),
        }
    }
    Ok(Value::Array(results))
}

/// Fork that runs its sub-graph on `thread_num` pool workers.
pub struct ConcurrentFork {
    name: String,
    thread_num: usize,
    pool: Option<Arc<WorkerPool>>,
    start_point: Option<String>,
    end_point: Option<String>,
    context_factory: ContextFactory,
    extends_listeners: bool,
    listeners: Vec<ListenerReg>,
    goto: Option<String>,
}

impl ConcurrentFork {
    pub fn new(name: impl Into<String>, thread_num: usize) -> Self {
        ConcurrentFork {
            name: name.into(),
            thread_num,
            pool: None,
            start_point: None,
            end_point: None,
            context_factory: Context::default_factory(),
            extends_listeners: false,
            listeners: Vec::new(),
            goto: None,
        }
    }

    /// Run on an externally owned pool instead of constructing one. The
    /// caller keeps responsibility for shutting it down.
    pub fn with_pool(mut self, pool: Arc<WorkerPool>) -> Self {
        self.pool = Some(pool);
        self
    }

    pub fn with_start_point(mut self, point: impl Into<String>) -> Self {
        self.start_point = Some(point.into());
        self
    }

    pub fn with_end_point(mut self, point: impl Into<String>) -> Self {
        self.end_point = Some(point.into());
        self
    }

    pub fn with_goto(mut self, next: impl Into<String>) -> Self {
        self.goto = Some(next.into());
        self
    }

    pub fn with_context_factory(mut self, factory: ContextFactory) -> Self {
        self.context_factory = factory;
        self
    }

    /// Inherit the parent workflow's listeners ahead of fork-local ones.
    pub fn extend_listeners(mut self, extends: bool) -> Self {
        self.extends_listeners = extends;
        self
    }

    pub fn add_listener(mut self, reg: ListenerReg) -> Self {
        self.listeners.push(reg);
        self
    }
}

impl ForkBehavior for ConcurrentFork {
    fn name(&self) -> &str {
        &self.name
    }

    fn goto(&self) -> Option<&str> {
        self.goto.as_deref()
    }

    fn set_goto(&mut self, next: String) {
        self.goto = Some(next);
    }

    fn start_point(&self) -> Option<&str> {
        self.start_point.as_deref()
    }

    fn set_start_point(&mut self, point: String) {
        self.start_point = Some(point);
    }

    fn end_point(&self) -> Option<&str> {
        self.end_point.as_deref()
    }

    fn set_end_point(&mut self, point: String) {
        self.end_point = Some(point);
    }

    fn run(
        &self,
        graph: &Arc<UnitGraph>,
        ctx: &Context,
        parent_listeners: &[ListenerReg],
    ) -> Result<ForkHandle, WorkError> {
        let latch = Arc::new(CountDownLatch::new(self.thread_num)?);
        let slots = Arc::new(Mutex::new(vec![None; self.thread_num]));
        let listeners = inherit_listeners(self.extends_listeners, parent_listeners, &self.listeners);

        let (pool, owned_pool) = match &self.pool {
            Some(external) => (Arc::clone(external), None),
            None => {
                let pool = Arc::new(WorkerPool::new(self.thread_num)?);
                (Arc::clone(&pool), Some(pool))
            }
        };

        tracing::info!(fork = %self.name, workers = self.thread_num, "fork spawning");

        for worker_id in 0..self.thread_num {
            let graph = Arc::clone(graph);
            let parent = ctx.clone();
            let factory = Arc::clone(&self.context_factory);
            let listeners = listeners.clone();
            let latch = Arc::clone(&latch);
            let slots = Arc::clone(&slots);
            let start = self.start_point.clone();
            let end = self.end_point.clone();
            pool.submit(move || {
                let _count_down = LatchGuard(latch);
                let workflow =
                    Workflow::sub_workflow(graph, &parent, factory, listeners, Some(worker_id));
                let end_state = workflow.execute_bounded(None, start.as_deref(), end.as_deref());
                slots.lock()[worker_id] = Some(end_state);
            })?;
        }

        Ok(ForkHandle::new(latch, slots, owned_pool))
    }
}

/// Join paired with [`ConcurrentFork`].
pub struct ConcurrentJoin {
    name: String,
    join: Option<JoinFn>,
    goto: Option<String>,
}

impl ConcurrentJoin {
    pub fn new(name: impl Into<String>) -> Self {
        ConcurrentJoin {
            name: name.into(),
            join: None,
            goto: None,
        }
    }

    pub fn with_join(
        mut self,
        f: impl Fn(&Context, Vec<End>) -> Result<Value, WorkError> + Send + Sync + 'static,
    ) -> Self {
        self.join = Some(Arc::new(f));
        self
    }

    pub fn with_goto(mut self, next: impl Into<String>) -> Self {
        self.goto = Some(next.into());
        self
    }
}

impl JoinBehavior for ConcurrentJoin {
    fn name(&self) -> &str {
        &self.name
    }

    fn goto(&self) -> Option<&str> {
        self.goto.as_deref()
    }

    fn set_goto(&mut self, next: String) {
        self.goto = Some(next);
    }

    fn run(&self, ctx: &Context, pending: Option<ForkHandle>) -> Result<Value, WorkError> {
        join_pending(&self.name, self.join.as_ref(), ctx, pending)
    }
}

/// Deterministic fork variant: runs the sub-graph once, inline, with no
/// pool. Same semantics as [`ConcurrentFork`] minus concurrency.
pub struct MainThreadFork {
    name: String,
    start_point: Option<String>,
    end_point: Option<String>,
    context_factory: ContextFactory,
    extends_listeners: bool,
    listeners: Vec<ListenerReg>,
    goto: Option<String>,
}

impl MainThreadFork {
    pub fn new(name: impl Into<String>) -> Self {
        MainThreadFork {
            name: name.into(),
            start_point: None,
            end_point: None,
            context_factory: Context::default_factory(),
            extends_listeners: false,
            listeners: Vec::new(),
            goto: None,
        }
    }

    pub fn with_start_point(mut self, point: impl Into<String>) -> Self {
        self.start_point = Some(point.into());
        self
    }

    pub fn with_end_point(mut self, point: impl Into<String>) -> Self {
        self.end_point = Some(point.into());
        self
    }

    pub fn with_goto(mut self, next: impl Into<String>) -> Self {
        self.goto = Some(next.into());
        self
    }

    pub fn with_context_factory(mut self, factory: ContextFactory) -> Self {
        self.context_factory = factory;
        self
    }

    pub fn extend_listeners(mut self, extends: bool) -> Self {
        self.extends_listeners = extends;
        self
    }

    pub fn add_listener(mut self, reg: ListenerReg) -> Self {
        self.listeners.push(reg);
        self
    }
}

impl ForkBehavior for MainThreadFork {
    fn name(&self) -> &str {
        &self.name
    }

    fn goto(&self) -> Option<&str> {
        self.goto.as_deref()
    }

    fn set_goto(&mut self, next: String) {
        self.goto = Some(next);
    }

    fn start_point(&self) -> Option<&str> {
        self.start_point.as_deref()
    }

    fn set_start_point(&mut self, point: String) {
        self.start_point = Some(point);
    }

    fn end_point(&self) -> Option<&str> {
        self.end_point.as_deref()
    }

    fn set_end_point(&mut self, point: String) {
        self.end_point = Some(point);
    }

    fn run(
        &self,
        graph: &Arc<UnitGraph>,
        ctx: &Context,
        parent_listeners: &[ListenerReg],
    ) -> Result<ForkHandle, WorkError> {
        let listeners = inherit_listeners(self.extends_listeners, parent_listeners, &self.listeners);
        let workflow = Workflow::sub_workflow(
            Arc::clone(graph),
            ctx,
            Arc::clone(&self.context_factory),
            listeners,
            Some(0),
        );
        let end_state = workflow.execute_bounded(
            None,
            self.start_point.as_deref(),
            self.end_point.as_deref(),
        );

        let latch = Arc::new(CountDownLatch::new(1)?);
        latch.count_down();
        Ok(ForkHandle::new(
            latch,
            Arc::new(Mutex::new(vec![Some(end_state)])),
            None,
        ))
    }
}

/// Join paired with [`MainThreadFork`]; shares the default aggregation.
pub struct MainThreadJoin {
    name: String,
    join: Option<JoinFn>,
    goto: Option<String>,
}

impl MainThreadJoin {
    pub fn new(name: impl Into<String>) -> Self {
        MainThreadJoin {
            name: name.into(),
            join: None,
            goto: None,
        }
    }

    pub fn with_join(
        mut self,
        f: impl Fn(&Context, Vec<End>) -> Result<Value, WorkError> + Send + Sync + 'static,
    ) -> Self {
        self.join = Some(Arc::new(f));
        self
    }

    pub fn with_goto(mut self, next: impl Into<String>) -> Self {
        self.goto = Some(next.into());
        self
    }
}

impl JoinBehavior for MainThreadJoin {
    fn name(&self) -> &str {
        &self.name
    }

    fn goto(&self) -> Option<&str> {
        self.goto.as_deref()
    }

    fn set_goto(&mut self, next: String) {
        self.goto = Some(next);
    }

    fn run(&self, ctx: &Context, pending: Option<ForkHandle>) -> Result<Value, WorkError> {
        join_pending(&self.name, self.join.as_ref(), ctx, pending)
    }
}

impl From<ConcurrentFork> for Unit {
    fn from(fork: ConcurrentFork) -> Self {
        Unit::Fork(Box::new(fork))
    }
}

impl From<ConcurrentJoin> for Unit {
    fn from(join: ConcurrentJoin) -> Self {
        Unit::Join(Box::new(join))
    }
}

impl From<MainThreadFork> for Unit {
    fn from(fork: MainThreadFork) -> Self {
        Unit::Fork(Box::new(fork))
    }
}

impl From<MainThreadJoin> for Unit {
    fn from(join: MainThreadJoin) -> Self {
        Unit::Join(Box::new(join))
    }
}

#[cfg(test)]
#[path = "fork_tests.rs"]
mod tests;
