// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! External plugin manifest parsing

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{EchoError, Result};
use crate::llm::provider::ParameterSchema;

use super::{CommandSpec, DEFAULT_DESCRIPTION, DEFAULT_VERSION};

/// Manifest for an external plugin, one JSON file per plugin in
/// `~/.echo/plugins/`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginManifest {
    /// Plugin name (must be unique, used in the enabled list)
    pub name: String,

    #[serde(default)]
    pub version: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    /// Program to run (first element is program, rest are args)
    pub command: Vec<String>,

    /// Commands exposed to the brain, keyed by name
    pub commands: BTreeMap<String, ManifestCommand>,

    /// Timeout per invocation in milliseconds
    #[serde(default = "default_timeout")]
    pub timeout_ms: u64,

    #[serde(default)]
    pub working_directory: Option<String>,

    #[serde(default)]
    pub env: HashMap<String, String>,

    /// Send `init` and `cleanup` requests around the plugin's lifetime
    #[serde(default)]
    pub lifecycle: bool,
}

fn default_timeout() -> u64 {
    30000
}

/// One command entry in a manifest
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ManifestCommand {
    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub parameters: Option<ParameterSchema>,
}

impl PluginManifest {
    /// Load a manifest from a file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            EchoError::Plugin(format!(
                "Failed to read manifest {}: {}",
                path.display(),
                e
            ))
        })?;

        Self::parse(&content)
    }

    /// Parse and validate a manifest from a JSON string.
    pub fn parse(json: &str) -> Result<Self> {
        let manifest: Self = serde_json::from_str(json)
            .map_err(|e| EchoError::Plugin(format!("Failed to parse plugin manifest: {}", e)))?;

        manifest.validate()?;
        Ok(manifest)
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(EchoError::Plugin(
                "Plugin manifest: name cannot be empty".to_string(),
            ));
        }

        if self.command.is_empty() {
            return Err(EchoError::Plugin(format!(
                "Plugin manifest '{}': command cannot be empty",
                self.name
            )));
        }

        if self.commands.is_empty() {
            return Err(EchoError::Plugin(format!(
                "Plugin manifest '{}': commands cannot be empty",
                self.name
            )));
        }

        for name in self.commands.keys() {
            if name.is_empty()
                || !name
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
            {
                return Err(EchoError::Plugin(format!(
                    "Plugin manifest '{}': command '{}' must contain only letters, digits, '_' or '-'",
                    self.name, name
                )));
            }
        }

        Ok(())
    }

    pub fn version(&self) -> &str {
        self.version.as_deref().unwrap_or(DEFAULT_VERSION)
    }

    pub fn description(&self) -> &str {
        self.description
            .as_deref()
            .filter(|d| !d.trim().is_empty())
            .unwrap_or(DEFAULT_DESCRIPTION)
    }

    /// Command specs in name order
    pub fn command_specs(&self) -> Vec<CommandSpec> {
        self.commands
            .iter()
            .map(|(name, cmd)| CommandSpec {
                name: name.clone(),
                description: cmd
                    .description
                    .clone()
                    .filter(|d| !d.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string()),
                parameters: cmd.parameters.clone().unwrap_or_default(),
            })
            .collect()
    }

    /// Program and arguments with `~` expanded
    pub fn program(&self) -> Option<(PathBuf, Vec<String>)> {
        let (program, args) = self.command.split_first()?;
        Some((
            expand_tilde(program),
            args.iter()
                .map(|a| expand_tilde(a).to_string_lossy().into_owned())
                .collect(),
        ))
    }

    pub fn working_dir(&self) -> Option<PathBuf> {
        self.working_directory.as_deref().map(expand_tilde)
    }
}

/// Expand a leading `~` to the home directory
pub fn expand_tilde(path: &str) -> PathBuf {
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    } else if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}
