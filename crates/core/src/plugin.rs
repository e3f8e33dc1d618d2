// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Plugin descriptor and lifecycle.
//!
//! A plugin is the normalized triple (execute, prepare, cleanup) plus
//! validators; the construction shape — bare closure, builder, or
//! [`PluginDef`] instance — is discarded after construction. Lifecycle:
//! `unprepared → prepared → dead`, with `cleanup` idempotent once dead.

use crate::args::CallArgs;
use crate::config::Config;
use crate::context::Context;
use crate::error::WorkError;
use crate::rules::{ArgsValidator, ConfigValidator, Rule};
use parking_lot::Mutex;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// The execute operation: context plus resolved arguments.
pub type ExecuteFn = Arc<dyn Fn(&Context, CallArgs) -> Result<Value, WorkError> + Send + Sync>;

/// Prepare/cleanup hooks receive the configuration only.
pub type LifecycleFn = Arc<dyn Fn(&Config) -> Result<(), WorkError> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginStatus {
    Unprepared,
    Prepared,
    Dead,
}

impl fmt::Display for PluginStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PluginStatus::Unprepared => write!(f, "unprepared"),
            PluginStatus::Prepared => write!(f, "prepared"),
            PluginStatus::Dead => write!(f, "dead"),
        }
    }
}

/// Class-shaped plugin source: implement on a type and construct the
/// plugin with [`Plugin::from_def`]; the lifecycle operations stay bound
/// to the instance.
pub trait PluginDef: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    fn execute(&self, ctx: &Context, args: CallArgs) -> Result<Value, WorkError>;

    fn prepare(&self, _config: &Config) -> Result<(), WorkError> {
        Ok(())
    }

    fn cleanup(&self, _config: &Config) -> Result<(), WorkError> {
        Ok(())
    }

    fn args_rules(&self) -> Vec<Rule> {
        Vec::new()
    }

    fn config_rules(&self) -> Vec<Rule> {
        Vec::new()
    }
}

/// A named, lifecycle-managed executable unit of work.
pub struct Plugin {
    name: String,
    description: String,
    execute_fn: ExecuteFn,
    prepare_fn: Option<LifecycleFn>,
    cleanup_fn: Option<LifecycleFn>,
    args_validator: ArgsValidator,
    config_validator: ConfigValidator,
    status: Mutex<PluginStatus>,
}

impl Plugin {
    /// Wrap a bare callable. The callable must accept the context first;
    /// the signature enforces it.
    pub fn from_fn(
        name: impl Into<String>,
        description: impl Into<String>,
        f: impl Fn(&Context, CallArgs) -> Result<Value, WorkError> + Send + Sync + 'static,
    ) -> Result<Plugin, WorkError> {
        Plugin::builder(name)
            .description(description)
            .execute(f)
            .build()
    }

    /// Module-shaped construction.
    pub fn builder(name: impl Into<String>) -> PluginBuilder {
        PluginBuilder {
            name: name.into(),
            description: String::new(),
            execute_fn: None,
            prepare_fn: None,
            cleanup_fn: None,
            args_validator: ArgsValidator::default(),
            config_validator: ConfigValidator::default(),
        }
    }

    /// Class-shaped construction: bind the definition instance's
    /// operations into the normalized triple.
    pub fn from_def(def: Arc<dyn PluginDef>) -> Result<Plugin, WorkError> {
        let mut builder = Plugin::builder(def.name())
            .description(def.description())
            .args_rules(def.args_rules())
            .config_rules(def.config_rules());
        let exec = Arc::clone(&def);
        builder = builder.execute(move |ctx, args| exec.execute(ctx, args));
        let prep = Arc::clone(&def);
        builder = builder.prepare(move |config| prep.prepare(config));
        builder = builder.cleanup(move |config| def.cleanup(config));
        builder.build()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn status(&self) -> PluginStatus {
        *self.status.lock()
    }

    /// Validate the configuration and run the prepare hook. Legal only
    /// while unprepared; the status advances only on success.
    pub fn prepare(&self, config: &Config) -> Result<(), WorkError> {
        let mut status = self.status.lock();
        if *status != PluginStatus::Unprepared {
            return Err(WorkError::AlreadyPrepared(self.name.clone()));
        }
        self.config_validator.validate(config)?;
        if let Some(f) = &self.prepare_fn {
            f(config)?;
        }
        *status = PluginStatus::Prepared;
        Ok(())
    }

    /// Validate the arguments and run the execute operation.
    pub fn execute(&self, ctx: &Context, args: CallArgs) -> Result<Value, WorkError> {
        match *self.status.lock() {
            PluginStatus::Unprepared => return Err(WorkError::Unprepared(self.name.clone())),
            PluginStatus::Dead => return Err(WorkError::AlreadyDead(self.name.clone())),
            PluginStatus::Prepared => {}
        }
        self.args_validator.validate(&args)?;
        (self.execute_fn)(ctx, args)
    }

    /// Run the cleanup hook. Legal from prepared; idempotent once dead.
    pub fn cleanup(&self, config: &Config) -> Result<(), WorkError> {
        let mut status = self.status.lock();
        match *status {
            PluginStatus::Unprepared => Err(WorkError::Unprepared(self.name.clone())),
            PluginStatus::Dead => Ok(()),
            PluginStatus::Prepared => {
                if let Some(f) = &self.cleanup_fn {
                    f(config)?;
                }
                *status = PluginStatus::Dead;
                Ok(())
            }
        }
    }
}

impl fmt::Debug for Plugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plugin")
            .field("name", &self.name)
            .field("status", &*self.status.lock())
            .finish()
    }
}

pub struct PluginBuilder {
    name: String,
    description: String,
    execute_fn: Option<ExecuteFn>,
    prepare_fn: Option<LifecycleFn>,
    cleanup_fn: Option<LifecycleFn>,
    args_validator: ArgsValidator,
    config_validator: ConfigValidator,
}

impl PluginBuilder {
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn execute(
        mut self,
        f: impl Fn(&Context, CallArgs) -> Result<Value, WorkError> + Send + Sync + 'static,
    ) -> Self {
        self.execute_fn = Some(Arc::new(f));
        self
    }

    pub fn prepare(mut self, f: impl Fn(&Config) -> Result<(), WorkError> + Send + Sync + 'static) -> Self {
        self.prepare_fn = Some(Arc::new(f));
        self
    }

    pub fn cleanup(mut self, f: impl Fn(&Config) -> Result<(), WorkError> + Send + Sync + 'static) -> Self {
        self.cleanup_fn = Some(Arc::new(f));
        self
    }

    pub fn args_rules(mut self, rules: Vec<Rule>) -> Self {
        if !rules.is_empty() {
            self.args_validator = ArgsValidator::Rules(rules);
        }
        self
    }

    pub fn args_validator(mut self, validator: ArgsValidator) -> Self {
        self.args_validator = validator;
        self
    }

    pub fn config_rules(mut self, rules: Vec<Rule>) -> Self {
        if !rules.is_empty() {
            self.config_validator = ConfigValidator::Rules(rules);
        }
        self
    }

    pub fn config_validator(mut self, validator: ConfigValidator) -> Self {
        self.config_validator = validator;
        self
    }

    pub fn build(self) -> Result<Plugin, WorkError> {
        if self.name.trim().is_empty() {
            return Err(WorkError::InvalidPlugin(
                "plugin name cannot be blank".to_string(),
            ));
        }
        let Some(execute_fn) = self.execute_fn else {
            return Err(WorkError::InvalidPlugin(format!(
                "plugin '{}' must provide an execute operation",
                self.name
            )));
        };
        Ok(Plugin {
            name: self.name.trim().to_string(),
            description: self.description,
            execute_fn,
            prepare_fn: self.prepare_fn,
            cleanup_fn: self.cleanup_fn,
            args_validator: self.args_validator,
            config_validator: self.config_validator,
            status: Mutex::new(PluginStatus::Unprepared),
        })
    }
}

#[cfg(test)]
#[path = "plugin_tests.rs"]
mod tests;
