// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Plugin name registry and priority chain.

use crate::config::Config;
use crate::error::WorkError;
use crate::plugin::Plugin;
use indexmap::IndexMap;
use std::sync::Arc;

/// Name lookup shared by [`PluginRegistry`] and [`PluginChain`]; the
/// context holds its catalog behind this trait.
pub trait PluginCatalog: Send + Sync {
    fn get(&self, name: &str) -> Result<Arc<Plugin>, WorkError>;
}

/// Name → plugin mapping. Registration happens outside of execution; the
/// registry is shared read-only once a workflow starts.
#[derive(Debug, Default)]
pub struct PluginRegistry {
    plugins: IndexMap<String, Arc<Plugin>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        PluginRegistry::default()
    }

    pub fn register(&mut self, plugin: Plugin) -> Result<(), WorkError> {
        self.register_shared(Arc::new(plugin))
    }

    pub fn register_shared(&mut self, plugin: Arc<Plugin>) -> Result<(), WorkError> {
        if self.plugins.contains_key(plugin.name()) {
            return Err(WorkError::AlreadyRegistered(plugin.name().to_string()));
        }
        self.plugins.insert(plugin.name().to_string(), plugin);
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> Result<Arc<Plugin>, WorkError> {
        self.plugins
            .shift_remove(name)
            .ok_or_else(|| WorkError::PluginNotFound(name.to_string()))
    }

    /// Atomic remove-then-register.
    pub fn replace(&mut self, plugin: Plugin) {
        let plugin = Arc::new(plugin);
        self.plugins
            .insert(plugin.name().to_string(), Arc::clone(&plugin));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.plugins.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.plugins.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Prepare every plugin, or the named subset, in registration order.
    pub fn prepare_all(&self, config: &Config, names: Option<&[&str]>) -> Result<(), WorkError> {
        match names {
            Some(names) => {
                for name in names {
                    self.get(name)?.prepare(config)?;
                }
            }
            None => {
                for plugin in self.plugins.values() {
                    plugin.prepare(config)?;
                }
            }
        }
        Ok(())
    }

    /// Clean up every plugin, or the named subset, in registration order.
    pub fn cleanup_all(&self, config: &Config, names: Option<&[&str]>) -> Result<(), WorkError> {
        match names {
            Some(names) => {
                for name in names {
                    self.get(name)?.cleanup(config)?;
                }
            }
            None => {
                for plugin in self.plugins.values() {
                    plugin.cleanup(config)?;
                }
            }
        }
        Ok(())
    }
}

impl PluginCatalog for PluginRegistry {
    fn get(&self, name: &str) -> Result<Arc<Plugin>, WorkError> {
        self.plugins
            .get(name)
            .cloned()
            .ok_or_else(|| WorkError::PluginNotFound(name.to_string()))
    }
}

/// Registries composed by priority: lookups return the first hit,
/// lifecycle operations visit every registry.
#[derive(Debug, Default)]
pub struct PluginChain {
    registries: Vec<Arc<PluginRegistry>>,
}

impl PluginChain {
    pub fn new(registries: Vec<Arc<PluginRegistry>>) -> Self {
        PluginChain { registries }
    }

    pub fn push(&mut self, registry: Arc<PluginRegistry>) {
        self.registries.push(registry);
    }

    pub fn prepare_all(&self, config: &Config, names: Option<&[&str]>) -> Result<(), WorkError> {
        match names {
            Some(names) => {
                for name in names {
                    self.get(name)?.prepare(config)?;
                }
            }
            None => {
                for registry in &self.registries {
                    registry.prepare_all(config, None)?;
                }
            }
        }
        Ok(())
    }

    pub fn cleanup_all(&self, config: &Config, names: Option<&[&str]>) -> Result<(), WorkError> {
        match names {
            Some(names) => {
                for name in names {
                    self.get(name)?.cleanup(config)?;
                }
            }
            None => {
                for registry in &self.registries {
                    registry.cleanup_all(config, None)?;
                }
            }
        }
        Ok(())
    }
}

impl PluginCatalog for PluginChain {
    fn get(&self, name: &str) -> Result<Arc<Plugin>, WorkError> {
        for registry in &self.registries {
            if registry.contains(name) {
                return registry.get(name);
            }
        }
        Err(WorkError::PluginNotFound(name.to_string()))
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
