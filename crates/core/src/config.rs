// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Read-only configuration: named sections of item → value.

use crate::error::WorkError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Recursive section → item mapping handed to plugin lifecycle hooks.
///
/// Loaded from TOML or assembled with [`Config::with_item`]; immutable
/// once a workflow starts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    sections: IndexMap<String, IndexMap<String, Value>>,
}

impl Config {
    pub fn new() -> Self {
        Config::default()
    }

    /// Parse a TOML document; every top-level entry must be a table.
    pub fn from_toml_str(text: &str) -> Result<Config, WorkError> {
        let table: toml::Table = text
            .parse()
            .map_err(|e| WorkError::invalid_argument(format!("config parse error: {e}")))?;
        let mut sections = IndexMap::new();
        for (name, value) in table {
            match value {
                toml::Value::Table(items) => {
                    let converted = items
                        .into_iter()
                        .map(|(k, v)| (k, toml_to_json(v)))
                        .collect();
                    sections.insert(name, converted);
                }
                _ => {
                    return Err(WorkError::invalid_argument(format!(
                        "config entry '{name}' must be a section"
                    )))
                }
            }
        }
        Ok(Config { sections })
    }

    /// Builder-style item insertion, mostly for tests and manual assembly.
    pub fn with_item(
        mut self,
        section: impl Into<String>,
        item: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        self.sections
            .entry(section.into())
            .or_default()
            .insert(item.into(), value.into());
        self
    }

    pub fn section(&self, name: &str) -> Option<&IndexMap<String, Value>> {
        self.sections.get(name)
    }

    /// Look up `"section.item"`.
    pub fn get(&self, path: &str) -> Option<&Value> {
        let (section, item) = path.split_once('.')?;
        self.sections.get(section)?.get(item)
    }

    /// Look up `"section.item"` with a fallback for absent items.
    pub fn get_or<'a>(&'a self, path: &str, default: &'a Value) -> &'a Value {
        self.get(path).unwrap_or(default)
    }

    /// Overlay `other` on top of this config; colliding items take the
    /// other side's value.
    pub fn merge(mut self, other: &Config) -> Config {
        for (name, items) in &other.sections {
            let section = self.sections.entry(name.clone()).or_default();
            for (item, value) in items {
                section.insert(item.clone(), value.clone());
            }
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn section_names(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str)
    }
}

fn toml_to_json(value: toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::from(i),
        toml::Value::Float(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(items) => Value::Array(items.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect(),
        ),
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
