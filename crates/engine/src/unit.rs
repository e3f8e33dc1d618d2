// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Work unit contracts: the five unit kinds and the behavior seams the
//! sequencer dispatches through.

use crate::fork::ForkHandle;
use crate::graph::UnitGraph;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use weft_core::args::{resolve_stream_item, resolve_template, ArgSpec, CallArgs, TemplateArgs};
use weft_core::{Context, End, ExecuteFn, ListenerReg, UnitKind, WorkError};

/// Decision logic: inspects the context, names the next unit (or `"end"`).
pub type DecideFn = Arc<dyn Fn(&Context) -> Result<String, WorkError> + Send + Sync>;

/// What a job runs: a registered plugin (by name) or an inline caller.
#[derive(Clone)]
pub enum Executable {
    Plugin(String),
    Caller(ExecuteFn),
}

impl Executable {
    pub fn plugin(name: impl Into<String>) -> Self {
        Executable::Plugin(name.into())
    }

    pub fn caller(
        f: impl Fn(&Context, CallArgs) -> Result<Value, WorkError> + Send + Sync + 'static,
    ) -> Self {
        Executable::Caller(Arc::new(f))
    }

    pub fn run(&self, ctx: &Context, args: CallArgs) -> Result<Value, WorkError> {
        match self {
            Executable::Plugin(name) => ctx.plugin(name)?.execute(ctx, args),
            Executable::Caller(f) => f(ctx, args),
        }
    }
}

impl fmt::Debug for Executable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Executable::Plugin(name) => f.debug_tuple("Plugin").field(name).finish(),
            Executable::Caller(_) => f.write_str("Caller(..)"),
        }
    }
}

/// Job-kind behavior: plain, buffering, and foreach jobs implement this.
pub trait JobBehavior: Send + Sync {
    fn name(&self) -> &str;

    fn goto(&self) -> Option<&str>;

    /// Set by graph linearization when no explicit transition was given.
    fn set_goto(&mut self, next: String);

    /// Execute and return the result; implementations store it under
    /// `"{name}.result"` themselves.
    fn run(&self, ctx: &Context) -> Result<Value, WorkError>;
}

/// Fork-kind behavior: spawns the bounded sub-graph and hands back the
/// coordination state the paired join consumes.
pub trait ForkBehavior: Send + Sync {
    fn name(&self) -> &str;

    fn goto(&self) -> Option<&str>;

    fn set_goto(&mut self, next: String);

    fn start_point(&self) -> Option<&str>;

    fn set_start_point(&mut self, point: String);

    fn end_point(&self) -> Option<&str>;

    fn set_end_point(&mut self, point: String);

    fn run(
        &self,
        graph: &Arc<UnitGraph>,
        ctx: &Context,
        parent_listeners: &[ListenerReg],
    ) -> Result<ForkHandle, WorkError>;
}

/// Join-kind behavior: blocks on the pending fork and aggregates.
pub trait JoinBehavior: Send + Sync {
    fn name(&self) -> &str;

    fn goto(&self) -> Option<&str>;

    fn set_goto(&mut self, next: String);

    fn run(&self, ctx: &Context, pending: Option<ForkHandle>) -> Result<Value, WorkError>;
}

/// The basic task unit: resolves its arguments and invokes one executable.
///
/// A stream template drives the executable once per yielded item; the
/// collected results become the stored value.
pub struct Job {
    name: String,
    executable: Executable,
    args: Option<ArgSpec>,
    goto: Option<String>,
}

impl Job {
    /// A job backed by the plugin of the same name.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let executable = Executable::Plugin(name.clone());
        Job {
            name,
            executable,
            args: None,
            goto: None,
        }
    }

    /// A job backed by an explicitly named plugin.
    pub fn with_plugin(name: impl Into<String>, plugin: impl Into<String>) -> Self {
        Job {
            name: name.into(),
            executable: Executable::Plugin(plugin.into()),
            args: None,
            goto: None,
        }
    }

    /// A job backed by an inline caller.
    pub fn from_caller(
        name: impl Into<String>,
        f: impl Fn(&Context, CallArgs) -> Result<Value, WorkError> + Send + Sync + 'static,
    ) -> Self {
        Job {
            name: name.into(),
            executable: Executable::caller(f),
            args: None,
            goto: None,
        }
    }

    pub fn args(mut self, args: ArgSpec) -> Self {
        self.args = Some(args);
        self
    }

    pub fn with_goto(mut self, next: impl Into<String>) -> Self {
        self.goto = Some(next.into());
        self
    }
}

impl JobBehavior for Job {
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
        let result = match resolve_template(ctx, &self.name, self.args.as_ref())? {
            TemplateArgs::Call(call) => self.executable.run(ctx, call)?,
            TemplateArgs::Stream(stream) => {
                let mut results = Vec::new();
                while let Some(item) = stream.next() {
                    let call = resolve_stream_item(ctx, &self.name, &item)?;
                    results.push(self.executable.run(ctx, call)?);
                }
                Value::Array(results)
            }
        };
        ctx.set(format!("{}.result", self.name), result.clone());
        Ok(result)
    }
}

/// Branch point: the decide function returns the next unit name.
pub struct Decision {
    name: String,
    decide: DecideFn,
}

impl Decision {
    pub fn new(
        name: impl Into<String>,
        f: impl Fn(&Context) -> String + Send + Sync + 'static,
    ) -> Self {
        Decision {
            name: name.into(),
            decide: Arc::new(move |ctx| Ok(f(ctx))),
        }
    }

    /// A decision whose logic may itself fail.
    pub fn fallible(
        name: impl Into<String>,
        f: impl Fn(&Context) -> Result<String, WorkError> + Send + Sync + 'static,
    ) -> Self {
        Decision {
            name: name.into(),
            decide: Arc::new(f),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn decide(&self, ctx: &Context) -> Result<String, WorkError> {
        (self.decide)(ctx)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EndKind {
    Ok,
    BadRequest,
    Error,
}

/// Declared terminal node. Reaching it ends the workflow with this unit's
/// status; the optional finalizer computes the result.
pub struct EndUnit {
    name: String,
    kind: EndKind,
    message: String,
    error_kind: String,
    finalizer: Option<ExecuteFn>,
}

impl EndUnit {
    pub fn ok(name: impl Into<String>) -> Self {
        EndUnit {
            name: name.into(),
            kind: EndKind::Ok,
            message: String::new(),
            error_kind: String::new(),
            finalizer: None,
        }
    }

    /// A successful end whose result is computed by the finalizer.
    pub fn ok_with(
        name: impl Into<String>,
        f: impl Fn(&Context, CallArgs) -> Result<Value, WorkError> + Send + Sync + 'static,
    ) -> Self {
        let mut unit = EndUnit::ok(name);
        unit.finalizer = Some(Arc::new(f));
        unit
    }

    pub fn bad_request(name: impl Into<String>, message: impl Into<String>) -> Self {
        EndUnit {
            name: name.into(),
            kind: EndKind::BadRequest,
            message: message.into(),
            error_kind: String::new(),
            finalizer: None,
        }
    }

    pub fn error(
        name: impl Into<String>,
        kind: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        EndUnit {
            name: name.into(),
            kind: EndKind::Error,
            message: message.into(),
            error_kind: kind.into(),
            finalizer: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run the finalizer and build the terminal record.
    pub fn finalize(&self, ctx: &Context) -> Result<End, WorkError> {
        let result = match &self.finalizer {
            Some(f) => f(ctx, CallArgs::None)?,
            None => Value::Null,
        };
        Ok(match self.kind {
            EndKind::Ok => End::ok(result),
            EndKind::BadRequest => End::bad_request(self.message.clone()),
            EndKind::Error => End::error(self.error_kind.clone(), self.message.clone(), ""),
        })
    }
}

/// A node in the workflow graph.
pub enum Unit {
    Job(Box<dyn JobBehavior>),
    Decision(Decision),
    Fork(Box<dyn ForkBehavior>),
    Join(Box<dyn JoinBehavior>),
    End(EndUnit),
}

impl Unit {
    pub fn job(job: impl JobBehavior + 'static) -> Self {
        Unit::Job(Box::new(job))
    }

    pub fn fork(fork: impl ForkBehavior + 'static) -> Self {
        Unit::Fork(Box::new(fork))
    }

    pub fn join(join: impl JoinBehavior + 'static) -> Self {
        Unit::Join(Box::new(join))
    }

    pub fn name(&self) -> &str {
        match self {
            Unit::Job(job) => job.name(),
            Unit::Decision(decision) => decision.name(),
            Unit::Fork(fork) => fork.name(),
            Unit::Join(join) => join.name(),
            Unit::End(end) => end.name(),
        }
    }

    pub fn kind(&self) -> UnitKind {
        match self {
            Unit::Job(_) => UnitKind::Job,
            Unit::Decision(_) => UnitKind::Decision,
            Unit::Fork(_) => UnitKind::Fork,
            Unit::Join(_) => UnitKind::Join,
            Unit::End(_) => UnitKind::End,
        }
    }
}

impl fmt::Debug for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unit")
            .field("name", &self.name())
            .field("kind", &self.kind())
            .finish()
    }
}

impl From<Job> for Unit {
    fn from(job: Job) -> Self {
        Unit::Job(Box::new(job))
    }
}

impl From<Decision> for Unit {
    fn from(decision: Decision) -> Self {
        Unit::Decision(decision)
    }
}

impl From<EndUnit> for Unit {
    fn from(end: EndUnit) -> Self {
        Unit::End(end)
    }
}

#[cfg(test)]
#[path = "unit_tests.rs"]
mod tests;
