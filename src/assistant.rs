// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! UI-facing entry point.
//!
//! [`Assistant`] owns one instance of each collaborator (config, memory,
//! plugin registry, router, brain) and runs the full pipeline for a line of
//! user input: brain decision, then routing, then the result text.

use std::sync::Arc;

use crate::actions::SystemActions;
use crate::brain::{Brain, ProgressFn};
use crate::config::{ConfigStore, Settings};
use crate::error::{EchoError, Result};
use crate::memory::MemoryStore;
use crate::plugins::PluginRegistry;
use crate::router::{RouteResult, Router};

/// Text returned when the selected provider has no API key
pub fn missing_key_message(provider: &str) -> String {
    format!(
        "API Key missing. Please set it in .env or run 'echo-agent config set apiKeys.{} <key>'.",
        provider
    )
}

/// Text returned when the configured provider name is not recognised
pub fn unknown_provider_message(provider: &str) -> String {
    format!("Unknown AI provider '{}'.", provider)
}

/// The assembled assistant
pub struct Assistant {
    config: Arc<ConfigStore>,
    memory: Arc<dyn MemoryStore>,
    registry: PluginRegistry,
    router: Router,
    brain: Option<Brain>,
    /// Why `brain` is `None`
    unavailable: String,
}

impl Assistant {
    /// Assemble from settings, loading plugins from the default plugin
    /// directory.
    pub async fn new(
        config: Arc<ConfigStore>,
        memory: Arc<dyn MemoryStore>,
        actions: Arc<dyn SystemActions>,
    ) -> Self {
        let registry = PluginRegistry::from_settings(&config.snapshot());
        Self::with_registry(config, memory, actions, registry).await
    }

    /// Assemble around a prepared registry. Enabled plugins are loaded here.
    pub async fn with_registry(
        config: Arc<ConfigStore>,
        memory: Arc<dyn MemoryStore>,
        actions: Arc<dyn SystemActions>,
        registry: PluginRegistry,
    ) -> Self {
        let mut registry = registry.with_actions(Arc::clone(&actions));
        let loaded = registry.load_enabled().await;
        tracing::info!("{} plugins loaded", loaded);

        let mut assistant = Self {
            config,
            memory,
            registry,
            router: Router::new(actions),
            brain: None,
            unavailable: String::new(),
        };
        assistant.rebuild_brain();
        assistant
    }

    /// Use `brain` instead of the one built from settings
    pub fn with_brain(mut self, mut brain: Brain) -> Self {
        brain.rebuild_tools(&self.registry);
        self.brain = Some(brain);
        self
    }

    /// Rebuild the brain from the current settings, e.g. after the provider
    /// or API key changed
    pub fn rebuild_brain(&mut self) {
        let settings = self.config.snapshot();
        match Brain::from_settings(&settings, &self.registry, self.memory.clone()) {
            Ok(Some(brain)) => {
                self.brain = Some(brain);
                self.unavailable.clear();
            }
            Ok(None) => {
                self.brain = None;
                self.unavailable = missing_key_message(&settings.ai_provider);
            }
            Err(e) => {
                tracing::error!("Cannot build brain: {}", e);
                self.brain = None;
                self.unavailable = unknown_provider_message(&settings.ai_provider);
            }
        }
    }

    pub fn is_ready(&self) -> bool {
        self.brain.is_some()
    }

    pub fn brain(&self) -> Option<&Brain> {
        self.brain.as_ref()
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    pub fn memory(&self) -> &Arc<dyn MemoryStore> {
        &self.memory
    }

    pub fn config(&self) -> &ConfigStore {
        &self.config
    }

    pub fn settings(&self) -> Settings {
        self.config.snapshot()
    }

    /// Run one line of user input through brain and router.
    ///
    /// `on_progress` receives streamed text when streaming is enabled.
    pub async fn process_input(
        &self,
        text: &str,
        on_progress: Option<ProgressFn<'_>>,
    ) -> RouteResult {
        let Some(brain) = &self.brain else {
            return RouteResult::failure(self.unavailable.clone());
        };

        let outcome = brain.process_command(text, on_progress).await;
        self.router.route(&outcome, text, &self.registry).await
    }

    /// Enable a plugin, persist the choice and load it
    pub async fn enable_plugin(&mut self, name: &str) -> Result<()> {
        self.registry.enable(name)?;
        self.config.set_plugin_enabled(name, true)?;
        self.registry.load_enabled().await;
        if !self.registry.loaded_names().contains(&name) {
            return Err(EchoError::Plugin(format!(
                "Plugin '{}' is enabled but failed to load",
                name
            )));
        }
        self.refresh_tools();
        Ok(())
    }

    /// Disable a plugin, persist the choice and unload it
    pub async fn disable_plugin(&mut self, name: &str) -> Result<()> {
        self.config.set_plugin_enabled(name, false)?;
        self.registry.disable(name).await;
        self.refresh_tools();
        Ok(())
    }

    /// Re-scan the plugin directory and reload the enabled set, picking up
    /// edited workflows
    pub async fn reload_plugins(&mut self) -> usize {
        self.registry.set_workflows(self.config.snapshot().workflows);
        let count = self.registry.reload().await;
        self.refresh_tools();
        count
    }

    fn refresh_tools(&mut self) {
        if let Some(brain) = self.brain.as_mut() {
            brain.rebuild_tools(&self.registry);
        }
    }
}
