// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! The brain: turns a user request into a [`CanonicalOutcome`]
//!
//! [`Brain`] binds one vendor provider to the merged tool list (the system
//! tool plus every loaded plugin command) and delegates each request to a
//! [`ProviderSession`].

pub mod outcome;
pub mod prompt;
pub mod session;
pub mod tools;

use std::sync::Arc;

use crate::config::Settings;
use crate::error::Result;
use crate::llm::factory::{ProviderFactory, ProviderKind};
use crate::llm::provider::{LlmProvider, ToolDeclaration};
use crate::memory::MemoryStore;
use crate::plugins::PluginRegistry;

pub use outcome::{CanonicalOutcome, ToolArgs, SYSTEM_TOOL_NAME};
pub use session::{apology, ProgressFn, ProviderSession, SessionOptions};

/// Provider-backed decision maker
pub struct Brain {
    session: ProviderSession,
    tools: Vec<ToolDeclaration>,
}

impl Brain {
    /// Build a brain around an already constructed provider.
    /// `tools` is the full merged declaration list.
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        tools: Vec<ToolDeclaration>,
        model: impl Into<String>,
        memory: Arc<dyn MemoryStore>,
        options: SessionOptions,
    ) -> Self {
        Self {
            session: ProviderSession::new(provider, model, memory, options),
            tools,
        }
    }

    /// Build the brain selected by `settings.ai_provider`.
    ///
    /// Returns `Ok(None)` when that provider has no API key, and an error
    /// when the provider name is unknown.
    pub fn from_settings(
        settings: &Settings,
        registry: &PluginRegistry,
        memory: Arc<dyn MemoryStore>,
    ) -> Result<Option<Self>> {
        let kind: ProviderKind = settings.ai_provider.parse()?;
        let Some(provider) = ProviderFactory::create(kind, settings)? else {
            return Ok(None);
        };
        let model = ProviderFactory::resolve_model(kind, &settings.model);

        tracing::info!("Brain using {} ({})", kind.display_name(), model);
        Ok(Some(Self::new(
            provider,
            tools::merged_tools(registry),
            model,
            memory,
            SessionOptions::from_settings(settings),
        )))
    }

    /// Recompute the tool list after the loaded plugin set changed
    pub fn rebuild_tools(&mut self, registry: &PluginRegistry) {
        self.tools = tools::merged_tools(registry);
        tracing::debug!("Brain now offers {} tools", self.tools.len());
    }

    pub fn tools(&self) -> &[ToolDeclaration] {
        &self.tools
    }

    pub fn provider_name(&self) -> &str {
        self.session.provider().name()
    }

    /// Vendor name for user-facing messages
    pub fn display_name(&self) -> &str {
        self.session.provider().display_name()
    }

    pub fn model(&self) -> &str {
        self.session.model()
    }

    /// Decide what to do with `text`
    pub async fn process_command(
        &self,
        text: &str,
        on_progress: Option<ProgressFn<'_>>,
    ) -> CanonicalOutcome {
        let outcome = self
            .session
            .process_command(text, &self.tools, on_progress)
            .await;
        tracing::debug!("Brain outcome: {}", outcome.kind());
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::mock_provider::MockProvider;
    use crate::memory::InMemoryStore;
    use serde_json::json;
    use tempfile::TempDir;

    fn registry(temp: &TempDir, enabled: &[&str]) -> PluginRegistry {
        PluginRegistry::new(
            temp.path().join("plugins"),
            enabled.iter().map(|s| s.to_string()).collect(),
        )
        .with_notes_dir(temp.path().join("notes"))
    }

    fn settings_with(provider: &str, key: Option<&str>) -> Settings {
        let mut settings = Settings::default();
        settings.ai_provider = provider.to_string();
        // Point env lookups at variables that are never set
        settings.providers.google.api_key_env = "ECHO_TEST_UNSET_GOOGLE".to_string();
        settings.providers.openai.api_key_env = "ECHO_TEST_UNSET_OPENAI".to_string();
        settings.providers.anthropic.api_key_env = "ECHO_TEST_UNSET_ANTHROPIC".to_string();
        settings.providers.deepseek.api_key_env = "ECHO_TEST_UNSET_DEEPSEEK".to_string();
        if let Some(key) = key {
            settings.api_keys.insert(provider.to_string(), key.to_string());
        }
        settings
    }

    #[test]
    fn test_from_settings_without_key() {
        let temp = TempDir::new().unwrap();
        let brain = Brain::from_settings(
            &settings_with("openai", None),
            &registry(&temp, &[]),
            Arc::new(InMemoryStore::default()),
        )
        .unwrap();
        assert!(brain.is_none());
    }

    #[test]
    fn test_from_settings_unknown_provider() {
        let temp = TempDir::new().unwrap();
        let result = Brain::from_settings(
            &settings_with("skynet", Some("k")),
            &registry(&temp, &[]),
            Arc::new(InMemoryStore::default()),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_from_settings_resolves_model() {
        let temp = TempDir::new().unwrap();
        let mut settings = settings_with("anthropic", Some("sk-ant-test"));
        settings.model = "gpt-4o".to_string();

        let brain = Brain::from_settings(
            &settings,
            &registry(&temp, &[]),
            Arc::new(InMemoryStore::default()),
        )
        .unwrap()
        .unwrap();
        assert_eq!(brain.provider_name(), "anthropic");
        assert_eq!(brain.model(), ProviderKind::Anthropic.default_model());
        assert_eq!(brain.tools().len(), 1);
    }

    #[tokio::test]
    async fn test_rebuild_tools_tracks_registry() {
        let temp = TempDir::new().unwrap();
        let mut registry = registry(&temp, &["productivity-plugin"]);
        let provider = Arc::new(MockProvider::new().with_response("ok"));
        let mut brain = Brain::new(
            provider.clone(),
            tools::merged_tools(&registry),
            "mock-model",
            Arc::new(InMemoryStore::default()),
            SessionOptions::default(),
        );
        assert_eq!(brain.tools().len(), 1);

        registry.load_enabled().await;
        brain.rebuild_tools(&registry);
        assert_eq!(brain.tools().len(), 5);

        brain.process_command("hi", None).await;
        assert_eq!(provider.last_request().unwrap().tools.len(), 5);
    }

    #[tokio::test]
    async fn test_process_command_classifies_plugin_call() {
        let provider = Arc::new(MockProvider::new().with_tool_call(
            "",
            "get_forecast",
            json!({"city": "Paris"}),
        ));
        let brain = Brain::new(
            provider,
            vec![tools::system_tool()],
            "mock-model",
            Arc::new(InMemoryStore::default()),
            SessionOptions::default(),
        );
        let outcome = brain.process_command("weather in Paris?", None).await;
        assert_eq!(outcome.kind(), "plugin_action");
    }
}
