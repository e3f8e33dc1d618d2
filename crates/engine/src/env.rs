// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Named execution environments and the workflow declaration builder.

use crate::unit::Unit;
use crate::workflow::Workflow;
use weft_core::{ArgMap, ArgSpec, Config, ContextFactory, HookSet, ListenerReg, PluginCatalog, WorkError};
use std::sync::Arc;

/// A named environment (test, staging, production, …) carrying the
/// runtime arguments and configuration overlay that apply there.
#[derive(Debug, Default)]
pub struct Env {
    name: String,
    description: String,
    args: ArgMap,
    config: Config,
}

impl Env {
    pub fn new(name: impl Into<String>) -> Self {
        Env {
            name: name.into(),
            ..Env::default()
        }
    }

    pub fn test() -> Self {
        Env::new("test").with_description("testing environment")
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_arg(mut self, unit: impl Into<String>, args: ArgSpec) -> Self {
        self.args.insert(unit.into(), args);
        self
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn args(&self) -> &ArgMap {
        &self.args
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

/// Assembles a workflow declaration: units, base config, environments,
/// plugins, and listeners. `build` selects the active environment and
/// returns the workflow together with that environment's runtime args.
#[derive(Default)]
pub struct WorkflowBuilder {
    units: Vec<Unit>,
    config: Config,
    envs: Vec<Env>,
    environ: Option<String>,
    plugins: Option<Arc<dyn PluginCatalog>>,
    context_factory: Option<ContextFactory>,
    listeners: Vec<ListenerReg>,
}

impl WorkflowBuilder {
    pub fn new() -> Self {
        WorkflowBuilder::default()
    }

    pub fn units(mut self, units: Vec<Unit>) -> Self {
        self.units = units;
        self
    }

    pub fn unit(mut self, unit: impl Into<Unit>) -> Self {
        self.units.push(unit.into());
        self
    }

    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn env(mut self, env: Env) -> Self {
        self.envs.push(env);
        self
    }

    /// Select the environment `build` applies.
    pub fn environ(mut self, name: impl Into<String>) -> Self {
        self.environ = Some(name.into());
        self
    }

    pub fn plugins(mut self, plugins: Arc<dyn PluginCatalog>) -> Self {
        self.plugins = Some(plugins);
        self
    }

    pub fn context_factory(mut self, factory: ContextFactory) -> Self {
        self.context_factory = Some(factory);
        self
    }

    pub fn listener(mut self, reg: ListenerReg) -> Self {
        self.listeners.push(reg);
        self
    }

    pub fn hooks(mut self, hooks: HookSet) -> Self {
        self.listeners.push(ListenerReg::shared(hooks));
        self
    }

    pub fn build(self) -> Result<(Workflow, ArgMap), WorkError> {
        let (config, args) = match &self.environ {
            Some(name) => {
                let env = self
                    .envs
                    .iter()
                    .find(|e| e.name() == name)
                    .ok_or_else(|| {
                        WorkError::invalid_argument(format!("unknown environment '{name}'"))
                    })?;
                (self.config.clone().merge(env.config()), env.args().clone())
            }
            None => (self.config.clone(), ArgMap::new()),
        };

        let mut workflow = Workflow::new(self.units)?.with_config(config);
        if let Some(plugins) = self.plugins {
            workflow = workflow.with_plugins(plugins);
        }
        if let Some(factory) = self.context_factory {
            workflow = workflow.with_context_factory(factory);
        }
        for reg in self.listeners {
            workflow.add_listener_reg(reg);
        }
        Ok((workflow, args))
    }
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
