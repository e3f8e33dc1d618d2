// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-execution mutable state shared between workflow units.
//!
//! A [`Context`] is a cheap handle (`Arc` inside); the sequencer and the
//! units it runs mutate the same underlying data map. Fork workers receive
//! their own child context seeded with a snapshot of the parent's data; the
//! parent handle is kept for explicit cross-context promotion only.

use crate::args::{ArgMap, ArgSpec};
use crate::config::Config;
use crate::error::WorkError;
use crate::plugin::Plugin;
use crate::registry::{PluginCatalog, PluginRegistry};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// The five workflow unit kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitKind {
    Job,
    Decision,
    Fork,
    Join,
    End,
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitKind::Job => write!(f, "job"),
            UnitKind::Decision => write!(f, "decision"),
            UnitKind::Fork => write!(f, "fork"),
            UnitKind::Join => write!(f, "join"),
            UnitKind::End => write!(f, "end"),
        }
    }
}

/// Inputs for building a context. `None` fields inherit from the parent
/// (when present) or fall back to empty defaults.
#[derive(Default)]
pub struct ContextSeed {
    pub parent: Option<Context>,
    pub config: Option<Arc<Config>>,
    pub args: Option<Arc<ArgMap>>,
    pub plugins: Option<Arc<dyn PluginCatalog>>,
    pub thread_id: Option<usize>,
    /// Extra entries merged over the inherited data snapshot.
    pub data: HashMap<String, Value>,
}

/// Builds a context from a seed. Recovery policies substitute a factory
/// that pre-seeds the persisted data map.
pub type ContextFactory = Arc<dyn Fn(ContextSeed) -> Context + Send + Sync>;

struct ContextInner {
    data: Mutex<HashMap<String, Value>>,
    config: Arc<Config>,
    args: Arc<ArgMap>,
    plugins: Arc<dyn PluginCatalog>,
    parent: Option<Context>,
    thread_id: Option<usize>,
    current: Mutex<Option<(String, UnitKind)>>,
}

/// Shared key-value state plus ambient config, per-unit args, and the
/// plugin catalog.
#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

impl Context {
    pub fn new(seed: ContextSeed) -> Self {
        let parent = seed.parent;
        let mut data = match &parent {
            Some(p) => p.data_snapshot(),
            None => HashMap::new(),
        };
        data.extend(seed.data);

        let config = seed
            .config
            .or_else(|| parent.as_ref().map(|p| p.config_arc()))
            .unwrap_or_default();
        let args = seed
            .args
            .or_else(|| parent.as_ref().map(|p| p.args_arc()))
            .unwrap_or_default();
        let plugins = seed
            .plugins
            .or_else(|| parent.as_ref().map(|p| p.catalog()))
            .unwrap_or_else(|| Arc::new(PluginRegistry::new()));

        Context {
            inner: Arc::new(ContextInner {
                data: Mutex::new(data),
                config,
                args,
                plugins,
                parent,
                thread_id: seed.thread_id,
                current: Mutex::new(None),
            }),
        }
    }

    /// The factory used when no recovery policy overrides it.
    pub fn default_factory() -> ContextFactory {
        Arc::new(Context::new)
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.inner.data.lock().get(key).cloned()
    }

    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.inner.data.lock().insert(key.into(), value.into());
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        self.inner.data.lock().remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner.data.lock().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.inner.data.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.data.lock().is_empty()
    }

    /// Owned copy of the whole data map (used by child seeding and the
    /// persist listener).
    pub fn data_snapshot(&self) -> HashMap<String, Value> {
        self.inner.data.lock().clone()
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn config_arc(&self) -> Arc<Config> {
        Arc::clone(&self.inner.config)
    }

    /// Runtime arguments declared for the named unit, if any.
    pub fn unit_args(&self, unit: &str) -> Option<ArgSpec> {
        self.inner.args.get(unit).cloned()
    }

    pub fn args_arc(&self) -> Arc<ArgMap> {
        Arc::clone(&self.inner.args)
    }

    pub fn plugin(&self, name: &str) -> Result<Arc<Plugin>, WorkError> {
        self.inner.plugins.get(name)
    }

    pub fn catalog(&self) -> Arc<dyn PluginCatalog> {
        Arc::clone(&self.inner.plugins)
    }

    pub fn parent(&self) -> Option<&Context> {
        self.inner.parent.as_ref()
    }

    /// `None` on the main sequencer; the worker index inside a fork.
    pub fn thread_id(&self) -> Option<usize> {
        self.inner.thread_id
    }

    pub fn current_unit(&self) -> Option<String> {
        self.inner.current.lock().as_ref().map(|(n, _)| n.clone())
    }

    pub fn current_unit_kind(&self) -> Option<UnitKind> {
        self.inner.current.lock().as_ref().map(|(_, k)| *k)
    }

    /// Record the unit about to run. Called by the sequencer before each
    /// dispatch.
    pub fn set_current_unit(&self, name: &str, kind: UnitKind) {
        *self.inner.current.lock() = Some((name.to_string(), kind));
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("len", &self.len())
            .field("thread_id", &self.inner.thread_id)
            .field("current", &*self.inner.current.lock())
            .finish()
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
