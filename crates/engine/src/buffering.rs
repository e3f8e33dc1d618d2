// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Buffered job: repeated invocation of one operation until a count or a
//! wall-clock timeout.

use crate::unit::{Executable, JobBehavior, Unit};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;
use weft_core::args::{resolve_call_args, ArgSpec};
use weft_core::{Context, WorkError};

type FilterFn = Arc<dyn Fn(&Value) -> bool + Send + Sync>;
type GiveBackFn = Arc<dyn Fn(&Context, Value) + Send + Sync>;

struct BufferInner {
    items: Vec<Value>,
    /// Set by the caller on an immediate timeout; items appended past this
    /// point belong to the give-back handler.
    snapshot_len: Option<usize>,
    error: Option<WorkError>,
}

struct BufferShared {
    inner: Mutex<BufferInner>,
    finished: AtomicBool,
    /// Held by the producer around each invocation when the caller drains
    /// (`immediately = false`), so a timeout waits out the in-flight item.
    append_lock: Mutex<()>,
}

/// Job that runs a producer loop on a dedicated thread, accumulating
/// results until `max_items` or the timeout.
///
/// On timeout with `immediately = false` the caller waits for the
/// in-flight invocation and keeps its item. With `immediately = true` the
/// caller snapshots at once; anything produced after the snapshot goes to
/// the give-back handler.
pub struct BufferingJob {
    name: String,
    executable: Executable,
    args: Option<ArgSpec>,
    max_items: usize,
    timeout: Option<Duration>,
    filter: Option<FilterFn>,
    immediately: bool,
    give_back: Option<GiveBackFn>,
    goto: Option<String>,
}

impl BufferingJob {
    pub fn new(name: impl Into<String>, executable: Executable) -> Self {
        BufferingJob {
            name: name.into(),
            executable,
            args: None,
            max_items: 10,
            timeout: None,
            filter: None,
            immediately: false,
            give_back: None,
            goto: None,
        }
    }

    pub fn args(mut self, args: ArgSpec) -> Self {
        self.args = Some(args);
        self
    }

    pub fn max_items(mut self, max_items: usize) -> Self {
        self.max_items = max_items;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Keep only items the predicate accepts.
    pub fn filter(mut self, f: impl Fn(&Value) -> bool + Send + Sync + 'static) -> Self {
        self.filter = Some(Arc::new(f));
        self
    }

    /// Return at the timeout instant instead of draining the in-flight
    /// invocation.
    pub fn immediately(mut self, immediately: bool) -> Self {
        self.immediately = immediately;
        self
    }

    /// Receives items the caller's snapshot did not include.
    pub fn give_back(mut self, f: impl Fn(&Context, Value) + Send + Sync + 'static) -> Self {
        self.give_back = Some(Arc::new(f));
        self
    }

    pub fn with_goto(mut self, next: impl Into<String>) -> Self {
        self.goto = Some(next.into());
        self
    }
}

impl JobBehavior for BufferingJob {
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
        if matches!(self.args, Some(ArgSpec::Stream(_))) {
            return Err(WorkError::invalid_argument(format!(
                "'{}': a buffering job cannot take an argument stream",
                self.name
            )));
        }

        let key = format!("{}.result", self.name);
        if self.max_items == 0 {
            let empty = Value::Array(Vec::new());
            ctx.set(key, empty.clone());
            return Ok(empty);
        }

        let shared = Arc::new(BufferShared {
            inner: Mutex::new(BufferInner {
                items: Vec::new(),
                snapshot_len: None,
                error: None,
            }),
            finished: AtomicBool::new(false),
            append_lock: Mutex::new(()),
        });
        let (done_tx, done_rx) = mpsc::channel::<()>();
        let guard_appends = self.timeout.is_some() && !self.immediately;

        let worker = {
            let shared = Arc::clone(&shared);
            let ctx = ctx.clone();
            let executable = self.executable.clone();
            let template = self.args.clone();
            let filter = self.filter.clone();
            let give_back = if self.immediately {
                self.give_back.clone()
            } else {
                None
            };
            let unit = self.name.clone();
            let max_items = self.max_items;
            thread::Builder::new()
                .name(format!("weft-buffer-{}", self.name))
                .spawn(move || {
                    produce_loop(
                        &shared,
                        &ctx,
                        &executable,
                        template.as_ref(),
                        filter.as_ref(),
                        &unit,
                        max_items,
                        guard_appends,
                    );
                    if let Some(handler) = &give_back {
                        give_back_extras(&shared, &ctx, handler);
                    }
                    let _ = done_tx.send(());
                })
                .map_err(|e| WorkError::failed("thread-spawn", e.to_string()))?
        };

        let snapshot = match self.timeout {
            None => {
                // No deadline: the producer stops at max_items.
                let _ = done_rx.recv();
                let _ = worker.join();
                self.drain(&shared)?
            }
            Some(timeout) => match done_rx.recv_timeout(timeout) {
                Ok(()) => {
                    let _ = worker.join();
                    self.drain(&shared)?
                }
                Err(_) => {
                    shared.finished.store(true, Ordering::Release);
                    if self.immediately {
                        // Snapshot now; the producer finishes its in-flight
                        // item, hands extras to the give-back handler, and
                        // exits on its own.
                        let mut inner = shared.inner.lock();
                        if let Some(error) = inner.error.take() {
                            return Err(error);
                        }
                        let snapshot = inner.items.clone();
                        inner.snapshot_len = Some(snapshot.len());
                        drop(inner);
                        drop(worker);
                        snapshot
                    } else {
                        // Wait out the in-flight append, then collect.
                        {
                            let _in_flight = shared.append_lock.lock();
                        }
                        let _ = worker.join();
                        self.drain(&shared)?
                    }
                }
            },
        };

        let result = Value::Array(snapshot);
        ctx.set(key, result.clone());
        Ok(result)
    }
}

impl BufferingJob {
    fn drain(&self, shared: &BufferShared) -> Result<Vec<Value>, WorkError> {
        let mut inner = shared.inner.lock();
        if let Some(error) = inner.error.take() {
            return Err(error);
        }
        Ok(std::mem::take(&mut inner.items))
    }
}

#[allow(clippy::too_many_arguments)]
fn produce_loop(
    shared: &BufferShared,
    ctx: &Context,
    executable: &Executable,
    template: Option<&ArgSpec>,
    filter: Option<&FilterFn>,
    unit: &str,
    max_items: usize,
    guard_appends: bool,
) {
    loop {
        if shared.finished.load(Ordering::Acquire) {
            return;
        }
        if shared.inner.lock().items.len() >= max_items {
            return;
        }
        if guard_appends {
            let _guard = shared.append_lock.lock();
            // Re-check under the lock so no item lands in a buffer the
            // caller has already given up on.
            if shared.finished.load(Ordering::Acquire) {
                return;
            }
            if !produce_one(shared, ctx, executable, template, filter, unit) {
                return;
            }
        } else if !produce_one(shared, ctx, executable, template, filter, unit) {
            return;
        }
    }
}

/// Invoke the operation once; returns false when the loop should stop.
fn produce_one(
    shared: &BufferShared,
    ctx: &Context,
    executable: &Executable,
    template: Option<&ArgSpec>,
    filter: Option<&FilterFn>,
    unit: &str,
) -> bool {
    let produced = resolve_call_args(ctx, unit, template)
        .and_then(|call| executable.run(ctx, call));
    match produced {
        Ok(value) => {
            if filter.map_or(true, |f| f(&value)) {
                shared.inner.lock().items.push(value);
            }
            true
        }
        Err(error) => {
            tracing::error!(unit, error = %error, "buffering producer failed");
            shared.inner.lock().error = Some(error);
            false
        }
    }
}

fn give_back_extras(shared: &BufferShared, ctx: &Context, handler: &GiveBackFn) {
    let extras: Vec<Value> = {
        let inner = shared.inner.lock();
        match inner.snapshot_len {
            Some(len) if inner.items.len() > len => inner.items[len..].to_vec(),
            _ => Vec::new(),
        }
    };
    for item in extras {
        handler(ctx, item);
    }
}

impl From<BufferingJob> for Unit {
    fn from(job: BufferingJob) -> Self {
        Unit::Job(Box::new(job))
    }
}

#[cfg(test)]
#[path = "buffering_tests.rs"]
mod tests;
