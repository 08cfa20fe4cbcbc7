// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Plugin system
//!
//! A plugin is a named bundle of commands the brain can invoke as tools.
//! Plugins come from two places:
//!
//! - the built-in catalog compiled into the binary ([`builtin`])
//! - JSON manifests in `~/.echo/plugins/` describing an external program
//!   that speaks a line-oriented JSON-RPC protocol ([`external`])
//!
//! The [`PluginRegistry`] discovers both, loads the enabled ones and routes
//! command invocations to whichever loaded plugin owns the command.
//!
//! # Creating an External Plugin
//!
//! ```json
//! {
//!   "name": "weather-plugin",
//!   "description": "Forecasts from my weather station",
//!   "command": ["python3", "~/.echo/plugins/weather/main.py"],
//!   "commands": {
//!     "get_forecast": {
//!       "description": "Forecast for a city",
//!       "parameters": {
//!         "type": "object",
//!         "properties": { "city": { "type": "string" } },
//!         "required": ["city"]
//!       }
//!     }
//!   }
//! }
//! ```
//!
//! See [`protocol`] for the request and reply lines.

pub mod builtin;
pub mod external;
pub mod manifest;
pub mod protocol;
pub mod registry;

use std::fmt;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::brain::ToolArgs;
use crate::error::Result;
use crate::llm::provider::{ParameterSchema, ToolDeclaration};

pub use external::ExternalPlugin;
pub use manifest::PluginManifest;
pub use registry::{CommandInfo, CommandOutcome, DiscoveredPlugin, PluginRegistry, PluginSummary};

/// Version reported when a plugin declares none
pub const DEFAULT_VERSION: &str = "1.0.0";

/// Description reported when a plugin or command declares none
pub const DEFAULT_DESCRIPTION: &str = "No description";

/// A command a plugin exposes to the brain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandSpec {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub parameters: ParameterSchema,
}

impl CommandSpec {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: ParameterSchema::empty(),
        }
    }

    /// Declare a single string parameter
    pub fn with_string_param(mut self, param: &str, description: &str, required: bool) -> Self {
        let mut properties = match self.parameters.properties {
            serde_json::Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        properties.insert(
            param.to_string(),
            serde_json::json!({"type": "string", "description": description}),
        );
        self.parameters.properties = serde_json::Value::Object(properties);
        if required {
            self.parameters.required.push(param.to_string());
        }
        self
    }

    /// The tool declaration offered to the model
    pub fn to_tool_declaration(&self) -> ToolDeclaration {
        ToolDeclaration {
            name: self.name.clone(),
            description: self.description.clone(),
            parameters: self.parameters.clone(),
        }
    }
}

/// What a plugin command produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginReply {
    pub success: bool,
    pub message: String,
}

impl PluginReply {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Where a plugin was discovered
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PluginSource {
    /// Compiled into the binary
    Builtin,
    /// Described by a manifest file
    Manifest(PathBuf),
}

impl fmt::Display for PluginSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PluginSource::Builtin => write!(f, "built-in"),
            PluginSource::Manifest(path) => write!(f, "{}", path.display()),
        }
    }
}

/// A set of commands the brain can call
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Unique plugin name, used in the enabled list
    fn name(&self) -> &str;

    fn version(&self) -> &str {
        DEFAULT_VERSION
    }

    fn description(&self) -> &str {
        DEFAULT_DESCRIPTION
    }

    /// Commands this plugin answers to
    fn commands(&self) -> Vec<CommandSpec>;

    /// Runs once after the plugin is loaded
    async fn init(&self) -> Result<()> {
        Ok(())
    }

    /// Run one of this plugin's commands
    async fn execute(&self, command: &str, args: &ToolArgs) -> Result<PluginReply>;

    /// Runs when the plugin is disabled or reloaded
    async fn cleanup(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_spec_params() {
        let spec = CommandSpec::new("greet", "Greet someone")
            .with_string_param("name", "Who to greet", true)
            .with_string_param("style", "formal or casual", false);

        let decl = spec.to_tool_declaration();
        assert_eq!(decl.name, "greet");
        assert_eq!(decl.parameters.required, vec!["name".to_string()]);
        assert_eq!(decl.parameters.properties["style"]["type"], "string");
    }

    #[test]
    fn test_plugin_reply_constructors() {
        assert!(PluginReply::ok("done").success);
        let failed = PluginReply::failed("nope");
        assert!(!failed.success);
        assert_eq!(failed.message, "nope");
    }

    #[test]
    fn test_plugin_source_display() {
        assert_eq!(PluginSource::Builtin.to_string(), "built-in");
        assert_eq!(
            PluginSource::Manifest(PathBuf::from("/p/w.json")).to_string(),
            "/p/w.json"
        );
    }
}
