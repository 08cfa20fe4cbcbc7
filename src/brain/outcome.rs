// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Vendor-neutral result of a brain call
//!
//! Every provider reply is reduced to a [`CanonicalOutcome`]: plain speech,
//! a built-in system action, or a plugin command. Tool arguments cross this
//! boundary as [`ToolArgs`] whatever shape the vendor used.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::llm::provider::ToolCall;

/// Name of the universal system tool
pub const SYSTEM_TOOL_NAME: &str = "execute_system_command";

/// Arguments to a tool or plugin command
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ToolArgs {
    /// Ordered values, e.g. `["notepad"]`
    Positional(Vec<Value>),
    /// Named values, e.g. `{"path": "foo"}`
    Structured(Map<String, Value>),
}

impl Default for ToolArgs {
    fn default() -> Self {
        ToolArgs::Positional(Vec::new())
    }
}

impl From<Value> for ToolArgs {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => ToolArgs::default(),
            Value::Array(items) => ToolArgs::Positional(items),
            Value::Object(map) => ToolArgs::Structured(map),
            scalar => ToolArgs::Positional(vec![scalar]),
        }
    }
}

impl From<Option<&Value>> for ToolArgs {
    fn from(value: Option<&Value>) -> Self {
        value.cloned().map(ToolArgs::from).unwrap_or_default()
    }
}

impl ToolArgs {
    /// Positional arguments from plain strings
    pub fn strings<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ToolArgs::Positional(items.into_iter().map(|s| Value::String(s.into())).collect())
    }

    /// Whether there is nothing to pass
    pub fn is_empty(&self) -> bool {
        match self {
            ToolArgs::Positional(items) => items.is_empty(),
            ToolArgs::Structured(map) => map.is_empty(),
        }
    }

    /// Value under `key` for structured args
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            ToolArgs::Structured(map) => map.get(key),
            ToolArgs::Positional(_) => None,
        }
    }

    /// Positional value at `index`
    pub fn at(&self, index: usize) -> Option<&Value> {
        match self {
            ToolArgs::Positional(items) => items.get(index),
            ToolArgs::Structured(_) => None,
        }
    }

    /// First non-blank string among the given keys (structured args)
    pub fn first_string(&self, keys: &[&str]) -> Option<String> {
        keys.iter()
            .filter_map(|k| self.get(k))
            .map(display_value)
            .find(|s| !s.trim().is_empty())
    }

    /// Positional values joined with spaces; strings are used verbatim
    pub fn joined(&self) -> Option<String> {
        match self {
            ToolArgs::Positional(items) if !items.is_empty() => {
                let joined = items
                    .iter()
                    .map(display_value)
                    .collect::<Vec<_>>()
                    .join(" ");
                Some(joined).filter(|s| !s.trim().is_empty())
            }
            _ => None,
        }
    }

    /// Positional value at `index` as text
    pub fn string_at(&self, index: usize) -> Option<String> {
        self.at(index)
            .map(display_value)
            .filter(|s| !s.trim().is_empty())
    }

    /// Positional values from `start` on, joined with spaces
    pub fn joined_from(&self, start: usize) -> Option<String> {
        match self {
            ToolArgs::Positional(items) if items.len() > start => {
                let joined = items[start..]
                    .iter()
                    .map(display_value)
                    .collect::<Vec<_>>()
                    .join(" ");
                Some(joined).filter(|s| !s.trim().is_empty())
            }
            _ => None,
        }
    }

    /// `first_string(keys)`, then the joined positional values
    pub fn text(&self, keys: &[&str]) -> Option<String> {
        self.first_string(keys).or_else(|| self.joined())
    }

    /// The arguments as a JSON value
    pub fn to_value(&self) -> Value {
        match self {
            ToolArgs::Positional(items) => Value::Array(items.clone()),
            ToolArgs::Structured(map) => Value::Object(map.clone()),
        }
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// What the brain decided to do with a user request
#[derive(Debug, Clone, PartialEq)]
pub enum CanonicalOutcome {
    /// Reply in prose
    Speech { text: String },
    /// Run a built-in system action
    SystemAction {
        command: String,
        args: ToolArgs,
        assistant_text: String,
    },
    /// Run a plugin command
    PluginAction {
        command: String,
        args: ToolArgs,
        assistant_text: String,
    },
}

impl CanonicalOutcome {
    pub fn speech(text: impl Into<String>) -> Self {
        CanonicalOutcome::Speech { text: text.into() }
    }

    /// Classify a tool call by name. The system tool carries `command` and
    /// `args` fields; any other tool name is a plugin command whose whole
    /// input is its arguments.
    pub fn from_tool_call(call: &ToolCall, assistant_text: impl Into<String>) -> Self {
        let assistant_text = assistant_text.into();

        if call.name == SYSTEM_TOOL_NAME {
            let command = match call.input.get("command") {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Null) | None => String::new(),
                Some(other) => other.to_string(),
            };
            CanonicalOutcome::SystemAction {
                command,
                args: ToolArgs::from(call.input.get("args")),
                assistant_text,
            }
        } else {
            CanonicalOutcome::PluginAction {
                command: call.name.clone(),
                args: ToolArgs::from(call.input.clone()),
                assistant_text,
            }
        }
    }

    /// Short label for logs
    pub fn kind(&self) -> &'static str {
        match self {
            CanonicalOutcome::Speech { .. } => "speech",
            CanonicalOutcome::SystemAction { .. } => "system_action",
            CanonicalOutcome::PluginAction { .. } => "plugin_action",
        }
    }
}
