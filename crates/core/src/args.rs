// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Unit argument model and resolver.
//!
//! A unit carries a *template* argument declared at workflow construction;
//! the context may carry a *runtime* argument under the unit's name. Both
//! are [`ArgSpec`] values. Resolution expands thunks and string references,
//! merges the two sides (runtime wins), then `$`-dereferences every string
//! inside the resulting shape. The ground form handed to an executable is
//! [`CallArgs`].

use crate::context::Context;
use crate::error::WorkError;
use indexmap::IndexMap;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Unit name to runtime argument, carried by the context.
pub type ArgMap = HashMap<String, ArgSpec>;

/// Callable argument source; receives the context, returns another spec.
pub type ArgThunk = Arc<dyn Fn(&Context) -> Option<ArgSpec> + Send + Sync>;

/// A lazy, finite, non-restartable sequence of argument specs. The job
/// loop consumes it exactly once, invoking the executable per item.
#[derive(Clone)]
pub struct ArgStream {
    inner: Arc<Mutex<Box<dyn Iterator<Item = ArgSpec> + Send>>>,
}

impl ArgStream {
    pub fn new(iter: impl Iterator<Item = ArgSpec> + Send + 'static) -> Self {
        ArgStream {
            inner: Arc::new(Mutex::new(Box::new(iter))),
        }
    }

    pub fn next(&self) -> Option<ArgSpec> {
        self.inner.lock().next()
    }
}

impl fmt::Debug for ArgStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ArgStream(..)")
    }
}

/// Tagged argument variant; absence is modeled as `Option<ArgSpec>`.
#[derive(Clone)]
pub enum ArgSpec {
    /// Applied positionally.
    Positional(Vec<Value>),
    /// Applied by keyword.
    Keyword(IndexMap<String, Value>),
    /// A string: `$key` dereferences the context, `$$…` escapes a literal
    /// `$`, anything else is used as-is.
    Text(String),
    /// Resolved against the context at execution time.
    Thunk(ArgThunk),
    /// Iteration driver; legal only as a template.
    Stream(ArgStream),
}

impl ArgSpec {
    pub fn positional<I, T>(values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Value>,
    {
        ArgSpec::Positional(values.into_iter().map(Into::into).collect())
    }

    pub fn keyword<I, K, T>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, T)>,
        K: Into<String>,
        T: Into<Value>,
    {
        ArgSpec::Keyword(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn text(s: impl Into<String>) -> Self {
        ArgSpec::Text(s.into())
    }

    pub fn thunk(f: impl Fn(&Context) -> Option<ArgSpec> + Send + Sync + 'static) -> Self {
        ArgSpec::Thunk(Arc::new(f))
    }

    pub fn stream(iter: impl Iterator<Item = ArgSpec> + Send + 'static) -> Self {
        ArgSpec::Stream(ArgStream::new(iter))
    }
}

impl fmt::Debug for ArgSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgSpec::Positional(v) => f.debug_tuple("Positional").field(v).finish(),
            ArgSpec::Keyword(m) => f.debug_tuple("Keyword").field(m).finish(),
            ArgSpec::Text(s) => f.debug_tuple("Text").field(s).finish(),
            ArgSpec::Thunk(_) => f.write_str("Thunk(..)"),
            ArgSpec::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// Fully resolved arguments, applied positionally or by keyword.
#[derive(Clone, Debug, PartialEq, Default)]
pub enum CallArgs {
    #[default]
    None,
    Positional(Vec<Value>),
    Keyword(IndexMap<String, Value>),
}

impl CallArgs {
    pub fn is_none(&self) -> bool {
        matches!(self, CallArgs::None)
    }

    pub fn len(&self) -> usize {
        match self {
            CallArgs::None => 0,
            CallArgs::Positional(v) => v.len(),
            CallArgs::Keyword(m) => m.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Positional argument at `idx`.
    pub fn get(&self, idx: usize) -> Option<&Value> {
        match self {
            CallArgs::Positional(v) => v.get(idx),
            _ => None,
        }
    }

    /// Keyword argument by name.
    pub fn kw(&self, name: &str) -> Option<&Value> {
        match self {
            CallArgs::Keyword(m) => m.get(name),
            _ => None,
        }
    }
}

/// A resolved template: either ground arguments or an iteration driver.
pub enum TemplateArgs {
    Call(CallArgs),
    Stream(ArgStream),
}

enum Expanded {
    Args(CallArgs),
    Stream(ArgStream),
}

/// Expand a `$`-reference string to its context value, `$$…` to the
/// literal with the first `$` stripped, anything else to itself.
pub fn expand_str(ctx: &Context, s: &str) -> Value {
    if let Some(rest) = s.strip_prefix("$$") {
        Value::String(format!("${rest}"))
    } else if let Some(key) = s.strip_prefix('$') {
        ctx.get(key).unwrap_or(Value::Null)
    } else {
        Value::String(s.to_string())
    }
}

/// Apply the string expansion rule to one value; non-strings pass through.
pub fn expand_value(ctx: &Context, value: &Value) -> Value {
    match value {
        Value::String(s) => expand_str(ctx, s),
        other => other.clone(),
    }
}

fn value_args(value: Value) -> CallArgs {
    match value {
        Value::Null => CallArgs::None,
        Value::Array(items) => CallArgs::Positional(items),
        Value::Object(map) => CallArgs::Keyword(map.into_iter().collect()),
        other => CallArgs::Positional(vec![other]),
    }
}

fn expand(ctx: &Context, spec: Option<&ArgSpec>) -> Result<Expanded, WorkError> {
    match spec {
        None => Ok(Expanded::Args(CallArgs::None)),
        Some(ArgSpec::Positional(v)) => Ok(Expanded::Args(CallArgs::Positional(v.clone()))),
        Some(ArgSpec::Keyword(m)) => Ok(Expanded::Args(CallArgs::Keyword(m.clone()))),
        Some(ArgSpec::Text(s)) => {
            if let Some(rest) = s.strip_prefix("$$") {
                Ok(Expanded::Args(CallArgs::Positional(vec![Value::String(
                    format!("${rest}"),
                )])))
            } else if let Some(key) = s.strip_prefix('$') {
                Ok(Expanded::Args(value_args(ctx.get(key).unwrap_or(Value::Null))))
            } else {
                Ok(Expanded::Args(CallArgs::Positional(vec![Value::String(
                    s.clone(),
                )])))
            }
        }
        Some(ArgSpec::Thunk(f)) => {
            let produced = f(ctx);
            expand(ctx, produced.as_ref())
        }
        Some(ArgSpec::Stream(s)) => Ok(Expanded::Stream(s.clone())),
    }
}

fn merge(unit: &str, template: CallArgs, runtime: CallArgs) -> Result<CallArgs, WorkError> {
    match (template, runtime) {
        (CallArgs::None, runtime) => Ok(runtime),
        (template, CallArgs::None) => Ok(template),
        (CallArgs::Positional(_), CallArgs::Positional(runtime)) => {
            Ok(CallArgs::Positional(runtime))
        }
        (CallArgs::Keyword(mut template), CallArgs::Keyword(runtime)) => {
            template.extend(runtime);
            Ok(CallArgs::Keyword(template))
        }
        _ => Err(WorkError::invalid_argument(format!(
            "unit '{unit}': template and runtime argument shapes differ"
        ))),
    }
}

fn deref_args(ctx: &Context, args: CallArgs) -> CallArgs {
    match args {
        CallArgs::None => CallArgs::None,
        CallArgs::Positional(values) => {
            CallArgs::Positional(values.iter().map(|v| expand_value(ctx, v)).collect())
        }
        CallArgs::Keyword(map) => CallArgs::Keyword(
            map.iter()
                .map(|(k, v)| (k.clone(), expand_value(ctx, v)))
                .collect(),
        ),
    }
}

fn merge_with_runtime(
    ctx: &Context,
    unit: &str,
    template: CallArgs,
) -> Result<CallArgs, WorkError> {
    let runtime_spec = ctx.unit_args(unit);
    let runtime = match expand(ctx, runtime_spec.as_ref())? {
        Expanded::Args(args) => args,
        Expanded::Stream(_) => {
            return Err(WorkError::invalid_argument(format!(
                "unit '{unit}': runtime arguments cannot be a stream"
            )))
        }
    };
    Ok(deref_args(ctx, merge(unit, template, runtime)?))
}

/// Resolve a unit's template against the context, preserving streams for
/// the job loop to drive.
pub fn resolve_template(
    ctx: &Context,
    unit: &str,
    template: Option<&ArgSpec>,
) -> Result<TemplateArgs, WorkError> {
    match expand(ctx, template)? {
        Expanded::Stream(stream) => Ok(TemplateArgs::Stream(stream)),
        Expanded::Args(args) => Ok(TemplateArgs::Call(merge_with_runtime(ctx, unit, args)?)),
    }
}

/// Resolve to ground arguments; a stream template is an error here.
pub fn resolve_call_args(
    ctx: &Context,
    unit: &str,
    template: Option<&ArgSpec>,
) -> Result<CallArgs, WorkError> {
    match resolve_template(ctx, unit, template)? {
        TemplateArgs::Call(args) => Ok(args),
        TemplateArgs::Stream(_) => Err(WorkError::invalid_argument(format!(
            "unit '{unit}' does not accept an argument stream"
        ))),
    }
}

/// Resolve one item yielded by a stream template. Each item merges with
/// the unit's runtime arguments like a standalone template would.
pub fn resolve_stream_item(
    ctx: &Context,
    unit: &str,
    item: &ArgSpec,
) -> Result<CallArgs, WorkError> {
    match expand(ctx, Some(item))? {
        Expanded::Args(args) => merge_with_runtime(ctx, unit, args),
        Expanded::Stream(_) => Err(WorkError::invalid_argument(format!(
            "unit '{unit}': nested argument streams are not supported"
        ))),
    }
}

#[cfg(test)]
#[path = "args_tests.rs"]
mod tests;
