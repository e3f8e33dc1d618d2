// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Declarative validation rules for plugin arguments and configuration.

use crate::args::CallArgs;
use crate::config::Config;
use crate::error::WorkError;
use regex::Regex;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// JSON value kinds a rule may constrain an argument to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Bool,
    Number,
    String,
    Array,
    Object,
}

impl ValueKind {
    fn matches(self, value: &Value) -> bool {
        match self {
            ValueKind::Bool => value.is_boolean(),
            ValueKind::Number => value.is_number(),
            ValueKind::String => value.is_string(),
            ValueKind::Array => value.is_array(),
            ValueKind::Object => value.is_object(),
        }
    }

    fn name(self) -> &'static str {
        match self {
            ValueKind::Bool => "bool",
            ValueKind::Number => "number",
            ValueKind::String => "string",
            ValueKind::Array => "array",
            ValueKind::Object => "object",
        }
    }
}

type LogicFn = Arc<dyn Fn(&Value) -> Option<String> + Send + Sync>;

/// One validation rule. For arguments the name addresses a positional slot
/// (by rule order) or a keyword; for configuration it addresses
/// `"section.item"`.
///
/// `min`/`max` bound numbers by value and strings/arrays/objects by length.
#[derive(Clone)]
pub struct Rule {
    name: String,
    required: bool,
    kinds: Vec<ValueKind>,
    min: Option<f64>,
    max: Option<f64>,
    pattern: Option<Regex>,
    logic: Option<LogicFn>,
    default: Option<Value>,
}

impl Rule {
    pub fn new(name: impl Into<String>) -> Self {
        Rule {
            name: name.into(),
            required: false,
            kinds: Vec::new(),
            min: None,
            max: None,
            pattern: None,
            logic: None,
            default: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn kind(mut self, kind: ValueKind) -> Self {
        self.kinds.push(kind);
        self
    }

    pub fn min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    pub fn max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }

    pub fn pattern(mut self, pattern: Regex) -> Self {
        self.pattern = Some(pattern);
        self
    }

    /// Custom predicate; returns an error message when the value is bad.
    pub fn logic(mut self, f: impl Fn(&Value) -> Option<String> + Send + Sync + 'static) -> Self {
        self.logic = Some(Arc::new(f));
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn validate(&self, value: Option<&Value>) -> Result<(), WorkError> {
        let empty = matches!(value, None | Some(Value::Null))
            || matches!(value, Some(Value::String(s)) if s.is_empty());
        if empty {
            if self.required {
                return Err(WorkError::invalid_argument(format!(
                    "'{}' is required",
                    self.name
                )));
            }
            return Ok(());
        }
        // Not empty, so the value is present.
        let Some(value) = value else { return Ok(()) };

        if !self.kinds.is_empty() && !self.kinds.iter().any(|k| k.matches(value)) {
            let allowed: Vec<&str> = self.kinds.iter().map(|k| k.name()).collect();
            return Err(WorkError::invalid_argument(format!(
                "'{}' must be of kind {}",
                self.name,
                allowed.join(" or ")
            )));
        }

        if let Some(measure) = measure(value) {
            if let Some(min) = self.min {
                if measure < min {
                    return Err(WorkError::invalid_argument(format!(
                        "'{}' is below the minimum {}",
                        self.name, min
                    )));
                }
            }
            if let Some(max) = self.max {
                if measure > max {
                    return Err(WorkError::invalid_argument(format!(
                        "'{}' is above the maximum {}",
                        self.name, max
                    )));
                }
            }
        }

        if let Some(pattern) = &self.pattern {
            match value.as_str() {
                Some(s) if pattern.is_match(s) => {}
                Some(_) => {
                    return Err(WorkError::invalid_argument(format!(
                        "'{}' does not match pattern {}",
                        self.name, pattern
                    )))
                }
                None => {
                    return Err(WorkError::invalid_argument(format!(
                        "'{}' must be a string to match a pattern",
                        self.name
                    )))
                }
            }
        }

        if let Some(logic) = &self.logic {
            if let Some(message) = logic(value) {
                return Err(WorkError::InvalidArgument(message));
            }
        }

        Ok(())
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("required", &self.required)
            .field("kinds", &self.kinds)
            .field("min", &self.min)
            .field("max", &self.max)
            .field("pattern", &self.pattern)
            .field("has_logic", &self.logic.is_some())
            .field("default", &self.default)
            .finish()
    }
}

/// Numbers measure by value, containers and strings by length.
fn measure(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => Some(s.len() as f64),
        Value::Array(a) => Some(a.len() as f64),
        Value::Object(o) => Some(o.len() as f64),
        _ => None,
    }
}

type ArgsCheckFn = Arc<dyn Fn(&CallArgs) -> Result<(), WorkError> + Send + Sync>;

/// Argument validator: a rule list (positional by order, keywords by name)
/// or a custom callable.
#[derive(Clone, Default)]
pub enum ArgsValidator {
    #[default]
    Accept,
    Rules(Vec<Rule>),
    Custom(ArgsCheckFn),
}

impl ArgsValidator {
    pub fn custom(f: impl Fn(&CallArgs) -> Result<(), WorkError> + Send + Sync + 'static) -> Self {
        ArgsValidator::Custom(Arc::new(f))
    }

    pub fn validate(&self, args: &CallArgs) -> Result<(), WorkError> {
        match self {
            ArgsValidator::Accept => Ok(()),
            ArgsValidator::Rules(rules) => {
                for (idx, rule) in rules.iter().enumerate() {
                    let value = match args {
                        CallArgs::None => None,
                        CallArgs::Positional(_) => args.get(idx),
                        CallArgs::Keyword(_) => args.kw(rule.name()),
                    };
                    rule.validate(value)?;
                }
                Ok(())
            }
            ArgsValidator::Custom(f) => f(args),
        }
    }
}

impl fmt::Debug for ArgsValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsValidator::Accept => f.write_str("Accept"),
            ArgsValidator::Rules(rules) => f.debug_tuple("Rules").field(rules).finish(),
            ArgsValidator::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

type ConfigCheckFn = Arc<dyn Fn(&Config) -> Result<(), WorkError> + Send + Sync>;

/// Configuration validator: rules addressed by `"section.item"` or a
/// custom callable.
#[derive(Clone, Default)]
pub enum ConfigValidator {
    #[default]
    Accept,
    Rules(Vec<Rule>),
    Custom(ConfigCheckFn),
}

impl ConfigValidator {
    pub fn custom(f: impl Fn(&Config) -> Result<(), WorkError> + Send + Sync + 'static) -> Self {
        ConfigValidator::Custom(Arc::new(f))
    }

    pub fn validate(&self, config: &Config) -> Result<(), WorkError> {
        match self {
            ConfigValidator::Accept => Ok(()),
            ConfigValidator::Rules(rules) => {
                for rule in rules {
                    rule.validate(config.get(rule.name()))?;
                }
                Ok(())
            }
            ConfigValidator::Custom(f) => f(config),
        }
    }
}

impl fmt::Debug for ConfigValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValidator::Accept => f.write_str("Accept"),
            ConfigValidator::Rules(rules) => f.debug_tuple("Rules").field(rules).finish(),
            ConfigValidator::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

#[cfg(test)]
#[path = "rules_tests.rs"]
mod tests;
