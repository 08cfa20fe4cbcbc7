// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Plugin discovery, loading and dispatch

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

use crate::actions::SystemActions;
use crate::brain::{ToolArgs, SYSTEM_TOOL_NAME};
use crate::config::{Settings, Workflows};
use crate::error::{EchoError, Result};
use crate::llm::provider::ToolDeclaration;

use super::builtin::{self, BuiltinContext, Notifier};
use super::external::ExternalPlugin;
use super::{CommandSpec, Plugin, PluginReply, PluginSource, DEFAULT_DESCRIPTION};

/// A plugin found during discovery, not yet loaded
#[derive(Clone)]
pub struct DiscoveredPlugin {
    pub plugin: Arc<dyn Plugin>,
    pub source: PluginSource,
}

impl std::fmt::Debug for DiscoveredPlugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscoveredPlugin")
            .field("name", &self.plugin.name())
            .field("source", &self.source)
            .finish()
    }
}

/// One row of `list_all`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PluginSummary {
    pub name: String,
    pub version: String,
    pub description: String,
    pub enabled: bool,
    pub loaded: bool,
    pub source: String,
    pub commands: Vec<String>,
}

/// A command exposed by a loaded plugin
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandInfo {
    pub name: String,
    pub plugin: String,
    pub description: String,
}

/// Result of routing a command to a plugin
#[derive(Debug, Clone, PartialEq)]
pub struct CommandOutcome {
    pub success: bool,
    pub result: Option<PluginReply>,
    pub error: Option<String>,
    pub plugin: Option<String>,
}

impl CommandOutcome {
    fn failed(error: impl Into<String>, plugin: Option<String>) -> Self {
        Self {
            success: false,
            result: None,
            error: Some(error.into()),
            plugin,
        }
    }
}

struct LoadedPlugin {
    plugin: Arc<dyn Plugin>,
    commands: Vec<CommandSpec>,
}

/// Registry of discovered and loaded plugins
pub struct PluginRegistry {
    plugins_dir: PathBuf,
    builtins: BuiltinContext,
    enabled: Vec<String>,
    loaded: Vec<LoadedPlugin>,
}

impl PluginRegistry {
    pub fn new(plugins_dir: impl Into<PathBuf>, enabled: Vec<String>) -> Self {
        Self {
            plugins_dir: plugins_dir.into(),
            builtins: BuiltinContext::new(Settings::notes_dir()),
            enabled,
            loaded: Vec::new(),
        }
    }

    /// Registry over `<echo_home>/plugins` with the configured enabled list
    /// and workflows
    pub fn from_settings(settings: &Settings) -> Self {
        let mut registry = Self::new(Settings::plugins_dir(), settings.plugins.clone());
        registry.set_workflows(settings.workflows.clone());
        registry
    }

    /// Where the productivity plugin keeps its notes
    pub fn with_notes_dir(mut self, notes_dir: impl Into<PathBuf>) -> Self {
        self.builtins.notes_dir = notes_dir.into();
        self
    }

    /// Actions the workflow plugin runs its steps through
    pub fn with_actions(mut self, actions: Arc<dyn SystemActions>) -> Self {
        self.builtins.actions = actions;
        self
    }

    /// Where the reminder plugin announces due reminders
    pub fn with_notifier(mut self, notifier: Notifier) -> Self {
        self.builtins.notifier = notifier;
        self
    }

    /// Workflows handed to the workflow plugin the next time it loads
    pub fn set_workflows(&mut self, workflows: Workflows) {
        self.builtins.workflows = workflows;
    }

    pub fn plugins_dir(&self) -> &Path {
        &self.plugins_dir
    }

    /// Names in the enabled list
    pub fn enabled(&self) -> &[String] {
        &self.enabled
    }

    /// Names of loaded plugins, in load order
    pub fn loaded_names(&self) -> Vec<&str> {
        self.loaded.iter().map(|l| l.plugin.name()).collect()
    }

    /// Scan the built-in catalog, then `*.json` manifests in the plugins
    /// directory sorted by file name. Invalid manifests are skipped.
    pub fn discover(&self) -> Vec<DiscoveredPlugin> {
        let mut found: Vec<DiscoveredPlugin> = builtin::catalog(&self.builtins)
            .into_iter()
            .map(|plugin| DiscoveredPlugin {
                plugin,
                source: PluginSource::Builtin,
            })
            .collect();

        for path in self.manifest_paths() {
            match ExternalPlugin::from_file(&path) {
                Ok(plugin) => {
                    if found.iter().any(|d| d.plugin.name() == plugin.name()) {
                        tracing::warn!(
                            "Skipping plugin manifest {}: name '{}' is already taken",
                            path.display(),
                            plugin.name()
                        );
                        continue;
                    }
                    found.push(DiscoveredPlugin {
                        plugin: Arc::new(plugin),
                        source: PluginSource::Manifest(path),
                    });
                }
                Err(e) => {
                    tracing::warn!("Skipping plugin manifest {}: {}", path.display(), e);
                }
            }
        }

        found
    }

    fn manifest_paths(&self) -> Vec<PathBuf> {
        let entries = match std::fs::read_dir(&self.plugins_dir) {
            Ok(entries) => entries,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(
                        "Could not read plugins directory {}: {}",
                        self.plugins_dir.display(),
                        e
                    );
                }
                return Vec::new();
            }
        };

        let mut paths: Vec<PathBuf> = entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();
        paths
    }

    /// Load every enabled plugin that is not loaded yet and return how many
    /// plugins are loaded afterwards. Failures are logged, never raised.
    pub async fn load_enabled(&mut self) -> usize {
        for discovered in self.discover() {
            let plugin = discovered.plugin;
            let name = plugin.name().to_string();

            if !self.enabled.contains(&name) || self.is_loaded(&name) {
                continue;
            }

            let commands = plugin.commands();
            if let Some(conflict) = self.command_conflict(&commands) {
                tracing::warn!(
                    "Not loading plugin '{}' ({}): command '{}' is already registered",
                    name,
                    discovered.source,
                    conflict
                );
                continue;
            }

            if let Err(e) = plugin.init().await {
                tracing::warn!("Plugin '{}' failed to initialize: {}", name, e);
                continue;
            }

            tracing::info!(
                "Loaded plugin {} v{} with {} commands",
                name,
                plugin.version(),
                commands.len()
            );
            self.loaded.push(LoadedPlugin { plugin, commands });
        }

        self.loaded.len()
    }

    fn is_loaded(&self, name: &str) -> bool {
        self.loaded.iter().any(|l| l.plugin.name() == name)
    }

    /// First command name that is reserved, already loaded, or repeated
    fn command_conflict(&self, commands: &[CommandSpec]) -> Option<String> {
        let mut taken: HashSet<&str> = self
            .loaded
            .iter()
            .flat_map(|l| l.commands.iter().map(|c| c.name.as_str()))
            .collect();
        taken.insert(SYSTEM_TOOL_NAME);

        commands
            .iter()
            .find(|c| !taken.insert(c.name.as_str()))
            .map(|c| c.name.clone())
    }

    /// Every discoverable plugin with its state, scanned fresh
    pub fn list_all(&self) -> Vec<PluginSummary> {
        self.discover()
            .into_iter()
            .map(|d| {
                let name = d.plugin.name().to_string();
                let description = Some(d.plugin.description())
                    .filter(|s| !s.trim().is_empty())
                    .unwrap_or(DEFAULT_DESCRIPTION)
                    .to_string();
                PluginSummary {
                    enabled: self.enabled.contains(&name),
                    loaded: self.is_loaded(&name),
                    version: d.plugin.version().to_string(),
                    description,
                    source: d.source.to_string(),
                    commands: d.plugin.commands().into_iter().map(|c| c.name).collect(),
                    name,
                }
            })
            .collect()
    }

    /// Add `name` to the enabled list. Does not load it.
    pub fn enable(&mut self, name: &str) -> Result<()> {
        if !self.discover().iter().any(|d| d.plugin.name() == name) {
            return Err(EchoError::Plugin(format!("Plugin '{}' not found", name)));
        }
        if !self.enabled.iter().any(|n| n == name) {
            self.enabled.push(name.to_string());
        }
        Ok(())
    }

    /// Remove `name` from the enabled list and unload it
    pub async fn disable(&mut self, name: &str) {
        self.enabled.retain(|n| n != name);

        if let Some(pos) = self.loaded.iter().position(|l| l.plugin.name() == name) {
            let evicted = self.loaded.remove(pos);
            if let Err(e) = evicted.plugin.cleanup().await {
                tracing::warn!("Plugin '{}' cleanup failed: {}", name, e);
            }
            tracing::info!("Unloaded plugin {}", name);
        }
    }

    /// Clean up every loaded plugin and load the enabled set again
    pub async fn reload(&mut self) -> usize {
        for loaded in self.loaded.drain(..) {
            if let Err(e) = loaded.plugin.cleanup().await {
                tracing::warn!("Plugin '{}' cleanup failed: {}", loaded.plugin.name(), e);
            }
        }
        self.load_enabled().await
    }

    /// Run `command` on the loaded plugin that exposes it
    pub async fn execute_command(&self, command: &str, args: &ToolArgs) -> CommandOutcome {
        let Some(owner) = self
            .loaded
            .iter()
            .find(|l| l.commands.iter().any(|c| c.name == command))
        else {
            return CommandOutcome::failed("Command not found in any plugin", None);
        };

        let plugin_name = owner.plugin.name().to_string();
        tracing::debug!("Routing '{}' to plugin {}", command, plugin_name);

        match owner.plugin.execute(command, args).await {
            Ok(reply) if reply.success => CommandOutcome {
                success: true,
                result: Some(reply),
                error: None,
                plugin: Some(plugin_name),
            },
            Ok(reply) => CommandOutcome {
                success: false,
                error: Some(reply.message.clone()),
                result: Some(reply),
                plugin: Some(plugin_name),
            },
            Err(e) => {
                tracing::warn!("Plugin '{}' failed on '{}': {}", plugin_name, command, e);
                CommandOutcome::failed(failure_message(e), Some(plugin_name))
            }
        }
    }

    /// Commands of every loaded plugin
    pub fn available_commands(&self) -> Vec<CommandInfo> {
        self.loaded
            .iter()
            .flat_map(|l| {
                l.commands.iter().map(|c| CommandInfo {
                    name: c.name.clone(),
                    plugin: l.plugin.name().to_string(),
                    description: if c.description.trim().is_empty() {
                        DEFAULT_DESCRIPTION.to_string()
                    } else {
                        c.description.clone()
                    },
                })
            })
            .collect()
    }

    /// Tool declarations for every loaded command
    pub fn tool_declarations(&self) -> Vec<ToolDeclaration> {
        self.loaded
            .iter()
            .flat_map(|l| l.commands.iter().map(CommandSpec::to_tool_declaration))
            .collect()
    }
}

fn failure_message(error: EchoError) -> String {
    match error {
        EchoError::Plugin(message) => message,
        other => other.to_string(),
    }
}
