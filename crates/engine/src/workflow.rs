// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The sequencer: drives a unit graph over a mutable context.
//!
//! Single-threaded within one workflow instance; parallelism enters only
//! through fork units, which run their own sub-sequencers. The sequencer
//! never lets an error escape: every outcome is folded into an [`End`].

use crate::fork::ForkHandle;
use crate::graph::UnitGraph;
use crate::unit::{ForkBehavior, JobBehavior, JoinBehavior, Unit};
use serde_json::Value;
use std::backtrace::Backtrace;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use weft_core::{
    ArgMap, Config, Context, ContextFactory, ContextSeed, End, ErrorInfo, HookSet, Listener,
    ListenerReg, PluginCatalog, PluginRegistry, WorkError,
};

/// Requests a stop; observed by the sequencer between units.
#[derive(Clone)]
pub struct StopHandle {
    flag: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_stopped(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Fires listener events; listeners registered as factories are
/// materialized once per execution, keyed by registration index.
struct Dispatcher<'a> {
    regs: &'a [ListenerReg],
    instances: HashMap<usize, Box<dyn Listener>>,
}

impl<'a> Dispatcher<'a> {
    fn new(regs: &'a [ListenerReg]) -> Self {
        Dispatcher {
            regs,
            instances: HashMap::new(),
        }
    }

    fn each(&mut self, mut f: impl FnMut(&dyn Listener)) {
        for (idx, reg) in self.regs.iter().enumerate() {
            match reg {
                ListenerReg::Shared(listener) => f(listener.as_ref()),
                ListenerReg::PerExecution(factory) => {
                    let instance = self.instances.entry(idx).or_insert_with(|| factory());
                    f(instance.as_ref());
                }
            }
        }
    }

    fn start(&mut self, ctx: &Context) {
        self.each(|l| l.on_start(ctx));
    }

    fn unit_start(&mut self, ctx: &Context) {
        self.each(|l| l.on_unit_start(ctx));
    }

    fn unit_finish(&mut self, ctx: &Context) {
        self.each(|l| l.on_unit_finish(ctx));
    }

    fn error(&mut self, ctx: &Context, info: &ErrorInfo) {
        self.each(|l| l.on_error(ctx, info));
    }

    fn finish(&mut self, ctx: &Context) {
        self.each(|l| l.on_finish(ctx));
    }
}

enum Step {
    Next {
        goto: String,
        result: Option<Value>,
    },
    Finished(End),
}

/// A runnable workflow: the frozen graph plus execution environment.
pub struct Workflow {
    graph: Arc<UnitGraph>,
    config: Arc<Config>,
    plugins: Arc<dyn PluginCatalog>,
    listeners: Vec<ListenerReg>,
    context_factory: ContextFactory,
    parent: Option<Context>,
    thread_id: Option<usize>,
    stop: Arc<AtomicBool>,
}

impl Workflow {
    /// Linearize the unit list and build a workflow with an empty
    /// environment. Fails on duplicate names or uninferable transitions.
    pub fn new(units: Vec<Unit>) -> Result<Self, WorkError> {
        Ok(Workflow {
            graph: Arc::new(UnitGraph::new(units)?),
            config: Arc::new(Config::default()),
            plugins: Arc::new(PluginRegistry::new()),
            listeners: Vec::new(),
            context_factory: Context::default_factory(),
            parent: None,
            thread_id: None,
            stop: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Worker-side constructor used by fork units: shares the parent's
    /// graph, config, and plugin catalog.
    pub(crate) fn sub_workflow(
        graph: Arc<UnitGraph>,
        parent: &Context,
        context_factory: ContextFactory,
        listeners: Vec<ListenerReg>,
        thread_id: Option<usize>,
    ) -> Workflow {
        Workflow {
            graph,
            config: parent.config_arc(),
            plugins: parent.catalog(),
            listeners,
            context_factory,
            parent: Some(parent.clone()),
            thread_id,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = Arc::new(config);
        self
    }

    pub fn with_plugins(mut self, plugins: Arc<dyn PluginCatalog>) -> Self {
        self.plugins = plugins;
        self
    }

    /// Convenience wrapper around [`Workflow::with_plugins`].
    pub fn with_registry(self, registry: PluginRegistry) -> Self {
        self.with_plugins(Arc::new(registry))
    }

    pub fn with_context_factory(mut self, factory: ContextFactory) -> Self {
        self.context_factory = factory;
        self
    }

    pub fn add_listener(&mut self, listener: impl Listener + 'static) {
        self.listeners.push(ListenerReg::shared(listener));
    }

    /// Register a per-execution listener; a fresh instance is built for
    /// every execution (and every fork worker execution).
    pub fn add_listener_factory(
        &mut self,
        factory: impl Fn() -> Box<dyn Listener> + Send + Sync + 'static,
    ) {
        self.listeners.push(ListenerReg::factory(factory));
    }

    pub fn add_listener_reg(&mut self, reg: ListenerReg) {
        self.listeners.push(reg);
    }

    /// Register an event-name → closure bundle.
    pub fn add_hooks(&mut self, hooks: HookSet) {
        self.listeners.push(ListenerReg::shared(hooks));
    }

    pub fn listeners(&self) -> &[ListenerReg] {
        &self.listeners
    }

    pub fn graph(&self) -> &Arc<UnitGraph> {
        &self.graph
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            flag: Arc::clone(&self.stop),
        }
    }

    /// Execute from the first unit to the graph's natural end.
    pub fn execute(&self, args: Option<ArgMap>) -> End {
        self.execute_bounded(args, None, None)
    }

    /// Execute between explicit bounds: `start_point` overrides the first
    /// unit, and the unit named `end_point` terminates the run after it
    /// completes.
    pub fn execute_bounded(
        &self,
        args: Option<ArgMap>,
        start_point: Option<&str>,
        end_point: Option<&str>,
    ) -> End {
        let span = tracing::info_span!("workflow", thread_id = self.thread_id);
        let _guard = span.enter();

        let ctx = (self.context_factory)(ContextSeed {
            parent: self.parent.clone(),
            config: Some(Arc::clone(&self.config)),
            args: args.map(Arc::new),
            plugins: Some(Arc::clone(&self.plugins)),
            thread_id: self.thread_id,
            data: HashMap::new(),
        });

        let mut dispatcher = Dispatcher::new(&self.listeners);
        let mut pending_fork: Option<ForkHandle> = None;

        let mut current = match start_point {
            Some(name) => match self.graph.lookup(name) {
                Ok(unit) => unit,
                Err(error) => return self.fail(&ctx, &mut dispatcher, error),
            },
            None => self.graph.first(),
        };

        tracing::info!(start = current.name(), "workflow starting");
        dispatcher.start(&ctx);

        let mut last_result = Value::Null;
        loop {
            ctx.set_current_unit(current.name(), current.kind());

            if self.stop.load(Ordering::Relaxed) {
                let error = WorkError::Stopped(format!(
                    "stop requested before unit '{}'",
                    current.name()
                ));
                return self.fail(&ctx, &mut dispatcher, error);
            }

            tracing::info!(unit = current.name(), kind = %current.kind(), "unit starting");
            dispatcher.unit_start(&ctx);

            let step = self.dispatch(current, &ctx, end_point, &mut pending_fork);
            match step {
                Ok(Step::Finished(end)) => {
                    dispatcher.unit_finish(&ctx);
                    dispatcher.finish(&ctx);
                    tracing::info!(unit = current.name(), status = end.status_name(), "workflow finished");
                    return end;
                }
                Ok(Step::Next { goto, result }) => {
                    if let Some(value) = result {
                        last_result = value;
                    }
                    dispatcher.unit_finish(&ctx);
                    tracing::info!(unit = current.name(), next = %goto, "unit finished");
                    if goto == "end" {
                        dispatcher.finish(&ctx);
                        tracing::info!("workflow finished");
                        return End::ok(last_result);
                    }
                    current = match self.graph.lookup(&goto) {
                        Ok(unit) => unit,
                        Err(error) => return self.fail(&ctx, &mut dispatcher, error),
                    };
                }
                Err(error) => return self.fail(&ctx, &mut dispatcher, error),
            }
        }
    }

    fn dispatch(
        &self,
        unit: &Unit,
        ctx: &Context,
        end_point: Option<&str>,
        pending_fork: &mut Option<ForkHandle>,
    ) -> Result<Step, WorkError> {
        match unit {
            Unit::Job(job) => {
                let result = job.run(ctx)?;
                let goto = if end_point == Some(job.name()) {
                    "end".to_string()
                } else {
                    job.goto().unwrap_or("end").to_string()
                };
                Ok(Step::Next {
                    goto,
                    result: Some(result),
                })
            }
            Unit::Decision(decision) => {
                let goto = decision.decide(ctx)?;
                if goto != "end" {
                    self.graph.lookup(&goto)?;
                }
                Ok(Step::Next { goto, result: None })
            }
            Unit::Fork(fork) => {
                *pending_fork = Some(fork.run(&self.graph, ctx, &self.listeners)?);
                Ok(Step::Next {
                    goto: fork.goto().unwrap_or("end").to_string(),
                    result: None,
                })
            }
            Unit::Join(join) => {
                let result = join.run(ctx, pending_fork.take())?;
                let goto = if end_point == Some(join.name()) {
                    "end".to_string()
                } else {
                    join.goto().unwrap_or("end").to_string()
                };
                Ok(Step::Next {
                    goto,
                    result: Some(result),
                })
            }
            Unit::End(end) => Ok(Step::Finished(end.finalize(ctx)?)),
        }
    }

    /// Fold an error into its terminal end, firing `on_error` first.
    fn fail(&self, ctx: &Context, dispatcher: &mut Dispatcher<'_>, error: WorkError) -> End {
        let trace = trace_at(ctx);
        if error.is_bad_request() {
            tracing::error!(error = %error, "unit argument error");
        } else {
            tracing::error!(error = %error, trace = %trace, "workflow aborted");
        }
        let info = ErrorInfo::new(&error, trace.clone());
        dispatcher.error(ctx, &info);
        End::from_error(&error, trace)
    }
}

fn trace_at(ctx: &Context) -> String {
    let unit = ctx.current_unit().unwrap_or_else(|| "<start>".to_string());
    let kind = ctx
        .current_unit_kind()
        .map(|k| k.to_string())
        .unwrap_or_else(|| "?".to_string());
    format!("at unit '{unit}' [{kind}]\n{}", Backtrace::capture())
}

#[cfg(test)]
#[path = "workflow_tests.rs"]
mod tests;
