// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workflow lifecycle event protocol.

use crate::context::Context;
use crate::error::WorkError;
use std::fmt;
use std::sync::Arc;

/// Error details handed to `on_error`: the wire-visible kind, the display
/// message, and the captured trace text.
#[derive(Debug, Clone)]
pub struct ErrorInfo {
    pub kind: String,
    pub message: String,
    pub trace: String,
}

impl ErrorInfo {
    pub fn new(error: &WorkError, trace: impl Into<String>) -> Self {
        ErrorInfo {
            kind: error.kind_name().to_string(),
            message: error.to_string(),
            trace: trace.into(),
        }
    }
}

/// Lifecycle hooks fired by the sequencer. All methods default to no-ops;
/// implement the events of interest.
///
/// `on_unit_finish` and `on_finish` fire only on the success path; an
/// error fires `on_error` instead.
pub trait Listener: Send + Sync {
    fn on_start(&self, _ctx: &Context) {}

    fn on_unit_start(&self, _ctx: &Context) {}

    fn on_unit_finish(&self, _ctx: &Context) {}

    fn on_error(&self, _ctx: &Context, _error: &ErrorInfo) {}

    fn on_finish(&self, _ctx: &Context) {}
}

/// Builds a fresh listener per execution.
pub type ListenerFactory = Arc<dyn Fn() -> Box<dyn Listener> + Send + Sync>;

/// A listener registration: a shared instance reused across executions,
/// or a factory materialized once per execution (identity tracked by
/// registration index).
#[derive(Clone)]
pub enum ListenerReg {
    Shared(Arc<dyn Listener>),
    PerExecution(ListenerFactory),
}

impl ListenerReg {
    pub fn shared(listener: impl Listener + 'static) -> Self {
        ListenerReg::Shared(Arc::new(listener))
    }

    pub fn factory(f: impl Fn() -> Box<dyn Listener> + Send + Sync + 'static) -> Self {
        ListenerReg::PerExecution(Arc::new(f))
    }
}

impl fmt::Debug for ListenerReg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListenerReg::Shared(_) => f.write_str("Shared(..)"),
            ListenerReg::PerExecution(_) => f.write_str("PerExecution(..)"),
        }
    }
}

type Hook = Arc<dyn Fn(&Context) + Send + Sync>;
type ErrorHook = Arc<dyn Fn(&Context, &ErrorInfo) + Send + Sync>;

/// Event-name → closure bundle; wraps loose functions into a listener.
#[derive(Clone, Default)]
pub struct HookSet {
    start: Option<Hook>,
    unit_start: Option<Hook>,
    unit_finish: Option<Hook>,
    error: Option<ErrorHook>,
    finish: Option<Hook>,
}

impl HookSet {
    pub fn new() -> Self {
        HookSet::default()
    }

    pub fn on_start(mut self, f: impl Fn(&Context) + Send + Sync + 'static) -> Self {
        self.start = Some(Arc::new(f));
        self
    }

    pub fn on_unit_start(mut self, f: impl Fn(&Context) + Send + Sync + 'static) -> Self {
        self.unit_start = Some(Arc::new(f));
        self
    }

    pub fn on_unit_finish(mut self, f: impl Fn(&Context) + Send + Sync + 'static) -> Self {
        self.unit_finish = Some(Arc::new(f));
        self
    }

    pub fn on_error(mut self, f: impl Fn(&Context, &ErrorInfo) + Send + Sync + 'static) -> Self {
        self.error = Some(Arc::new(f));
        self
    }

    pub fn on_finish(mut self, f: impl Fn(&Context) + Send + Sync + 'static) -> Self {
        self.finish = Some(Arc::new(f));
        self
    }
}

impl Listener for HookSet {
    fn on_start(&self, ctx: &Context) {
        if let Some(f) = &self.start {
            f(ctx);
        }
    }

    fn on_unit_start(&self, ctx: &Context) {
        if let Some(f) = &self.unit_start {
            f(ctx);
        }
    }

    fn on_unit_finish(&self, ctx: &Context) {
        if let Some(f) = &self.unit_finish {
            f(ctx);
        }
    }

    fn on_error(&self, ctx: &Context, error: &ErrorInfo) {
        if let Some(f) = &self.error {
            f(ctx, error);
        }
    }

    fn on_finish(&self, ctx: &Context) {
        if let Some(f) = &self.finish {
            f(ctx);
        }
    }
}

#[cfg(test)]
#[path = "listener_tests.rs"]
mod tests;
