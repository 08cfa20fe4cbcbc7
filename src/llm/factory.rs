// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Provider factory for creating brain providers
//!
//! Maps the `aiProvider` setting onto a concrete [`LlmProvider`] and picks
//! the model to use with it.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Settings;
use crate::error::{EchoError, Result};
use crate::llm::provider::LlmProvider;
use crate::llm::providers::{AnthropicProvider, DeepSeekProvider, GeminiProvider, OpenAiProvider};

/// The supported brain vendors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    Google,
    OpenAi,
    Anthropic,
    DeepSeek,
}

impl ProviderKind {
    /// Every supported provider, in display order
    pub const ALL: [ProviderKind; 4] = [
        ProviderKind::Google,
        ProviderKind::OpenAi,
        ProviderKind::Anthropic,
        ProviderKind::DeepSeek,
    ];

    /// Name as used in settings and `apiKeys`
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Google => "google",
            ProviderKind::OpenAi => "openai",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::DeepSeek => "deepseek",
        }
    }

    /// Vendor name used in user-facing messages
    pub fn display_name(&self) -> &'static str {
        match self {
            ProviderKind::Google => "Google Gemini",
            ProviderKind::OpenAi => "OpenAI",
            ProviderKind::Anthropic => "Anthropic",
            ProviderKind::DeepSeek => "DeepSeek",
        }
    }

    /// Model used when the settings name none (or one from another vendor)
    pub fn default_model(&self) -> &'static str {
        self.models()[0]
    }

    /// Known model identifiers, default first
    pub fn models(&self) -> &'static [&'static str] {
        match self {
            ProviderKind::Google => &[
                "gemini-2.0-flash-lite",
                "gemini-1.5-flash",
                "gemini-1.5-pro",
            ],
            ProviderKind::OpenAi => &["gpt-4o-mini", "gpt-4o", "o1-mini"],
            ProviderKind::Anthropic => &[
                "claude-3-5-haiku-latest",
                "claude-3-5-sonnet-latest",
                "claude-sonnet-4-20250514",
            ],
            ProviderKind::DeepSeek => &["deepseek-chat", "deepseek-reasoner"],
        }
    }

    /// Which provider a model name belongs to, judged by its family prefix
    pub fn owning(model: &str) -> Option<ProviderKind> {
        let model = model.to_ascii_lowercase();
        if model.starts_with("gemini") {
            Some(ProviderKind::Google)
        } else if model.starts_with("gpt")
            || model.starts_with("o1")
            || model.starts_with("o3")
            || model.starts_with("o4")
        {
            Some(ProviderKind::OpenAi)
        } else if model.starts_with("claude") {
            Some(ProviderKind::Anthropic)
        } else if model.starts_with("deepseek") {
            Some(ProviderKind::DeepSeek)
        } else {
            None
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = EchoError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "google" | "gemini" => Ok(ProviderKind::Google),
            "openai" => Ok(ProviderKind::OpenAi),
            "anthropic" | "claude" => Ok(ProviderKind::Anthropic),
            "deepseek" => Ok(ProviderKind::DeepSeek),
            _ => Err(EchoError::Config(format!(
                "Unknown AI provider '{}'. Supported: {}",
                s,
                ProviderFactory::supported_providers().join(", ")
            ))),
        }
    }
}

/// Factory for creating brain providers
pub struct ProviderFactory;

impl ProviderFactory {
    /// Create the provider for `kind`.
    ///
    /// Returns `Ok(None)` when no API key is configured for it; the caller
    /// decides how to surface that.
    pub fn create(kind: ProviderKind, settings: &Settings) -> Result<Option<Arc<dyn LlmProvider>>> {
        let Some(api_key) = settings.api_key_for(kind.as_str()) else {
            tracing::warn!("No API key configured for {}", kind.display_name());
            return Ok(None);
        };

        let base_url = settings.base_url_for(kind.as_str());
        let timeout = Duration::from_secs(settings.brain.request_timeout_secs.max(1));

        let provider: Arc<dyn LlmProvider> = match kind {
            ProviderKind::Google => Arc::new(
                match base_url {
                    Some(url) => GeminiProvider::with_base_url(api_key, url),
                    None => GeminiProvider::new(api_key),
                }
                .with_timeout(timeout),
            ),
            ProviderKind::OpenAi => Arc::new(
                match base_url {
                    Some(url) => OpenAiProvider::with_base_url(api_key, url),
                    None => OpenAiProvider::new(api_key),
                }
                .with_timeout(timeout),
            ),
            ProviderKind::Anthropic => Arc::new(
                match base_url {
                    Some(url) => AnthropicProvider::with_base_url(api_key, url),
                    None => AnthropicProvider::new(api_key),
                }
                .with_timeout(timeout),
            ),
            ProviderKind::DeepSeek => Arc::new(
                match base_url {
                    Some(url) => DeepSeekProvider::with_base_url(api_key, url),
                    None => DeepSeekProvider::new(api_key),
                }
                .with_timeout(timeout),
            ),
        };

        tracing::debug!("Created {} provider", kind.display_name());
        Ok(Some(provider))
    }

    /// Create the provider named by `settings.ai_provider`
    pub fn from_settings(settings: &Settings) -> Result<Option<Arc<dyn LlmProvider>>> {
        let kind = settings.ai_provider.parse::<ProviderKind>()?;
        Self::create(kind, settings)
    }

    /// The model to request: the configured one unless it is blank or
    /// belongs to a different vendor, in which case the provider default.
    pub fn resolve_model(kind: ProviderKind, configured: &str) -> String {
        let configured = configured.trim();
        if configured.is_empty() {
            return kind.default_model().to_string();
        }
        match ProviderKind::owning(configured) {
            Some(owner) if owner != kind => {
                tracing::warn!(
                    "Model '{}' belongs to {}, using {} default '{}'",
                    configured,
                    owner.display_name(),
                    kind.display_name(),
                    kind.default_model()
                );
                kind.default_model().to_string()
            }
            _ => configured.to_string(),
        }
    }

    /// Check if a provider has the credentials it needs
    pub fn is_configured(kind: ProviderKind, settings: &Settings) -> bool {
        settings.is_provider_configured(kind.as_str())
    }

    /// List all supported provider names
    pub fn supported_providers() -> Vec<&'static str> {
        ProviderKind::ALL.iter().map(|k| k.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings_with_key(provider: &str) -> Settings {
        let mut settings = Settings::default();
        settings.ai_provider = provider.to_string();
        settings
            .api_keys
            .insert(provider.to_string(), "test-key".to_string());
        settings
    }

    #[test]
    fn test_provider_kind_from_str() {
        assert_eq!("google".parse::<ProviderKind>().unwrap(), ProviderKind::Google);
        assert_eq!("OpenAI".parse::<ProviderKind>().unwrap(), ProviderKind::OpenAi);
        assert_eq!(
            " anthropic ".parse::<ProviderKind>().unwrap(),
            ProviderKind::Anthropic
        );
        assert_eq!(
            "deepseek".parse::<ProviderKind>().unwrap(),
            ProviderKind::DeepSeek
        );
    }

    #[test]
    fn test_provider_kind_unknown() {
        let err = "mistral".parse::<ProviderKind>().unwrap_err();
        assert!(matches!(err, EchoError::Config(_)));
        assert!(err.to_string().contains("mistral"));
    }

    #[test]
    fn test_default_models() {
        assert_eq!(ProviderKind::Google.default_model(), "gemini-2.0-flash-lite");
        assert_eq!(ProviderKind::OpenAi.default_model(), "gpt-4o-mini");
        assert_eq!(
            ProviderKind::Anthropic.default_model(),
            "claude-3-5-haiku-latest"
        );
        assert_eq!(ProviderKind::DeepSeek.default_model(), "deepseek-chat");
    }

    #[test]
    fn test_resolve_model_blank_uses_default() {
        assert_eq!(
            ProviderFactory::resolve_model(ProviderKind::OpenAi, "  "),
            "gpt-4o-mini"
        );
    }

    #[test]
    fn test_resolve_model_foreign_model_uses_default() {
        assert_eq!(
            ProviderFactory::resolve_model(ProviderKind::Anthropic, "gemini-2.0-flash-lite"),
            "claude-3-5-haiku-latest"
        );
    }

    #[test]
    fn test_resolve_model_keeps_own_and_unknown_models() {
        assert_eq!(
            ProviderFactory::resolve_model(ProviderKind::Google, "gemini-1.5-pro"),
            "gemini-1.5-pro"
        );
        assert_eq!(
            ProviderFactory::resolve_model(ProviderKind::OpenAi, "my-finetune"),
            "my-finetune"
        );
    }

    #[test]
    fn test_create_without_key_returns_none() {
        let mut settings = Settings::default();
        settings.providers.deepseek.api_key_env = "ECHO_TEST_NO_SUCH_KEY_42".to_string();
        let provider = ProviderFactory::create(ProviderKind::DeepSeek, &settings).unwrap();
        assert!(provider.is_none());
        assert!(!ProviderFactory::is_configured(ProviderKind::DeepSeek, &settings));
    }

    #[test]
    fn test_create_each_provider() {
        for kind in ProviderKind::ALL {
            let settings = settings_with_key(kind.as_str());
            let provider = ProviderFactory::create(kind, &settings).unwrap().unwrap();
            assert_eq!(provider.name(), kind.as_str());
            assert_eq!(provider.display_name(), kind.display_name());
            assert!(provider.supports_model(kind.default_model()));
        }
    }

    #[test]
    fn test_from_settings_unknown_provider() {
        let mut settings = Settings::default();
        settings.ai_provider = "bard".to_string();
        assert!(ProviderFactory::from_settings(&settings).is_err());
    }

    #[test]
    fn test_supported_providers() {
        assert_eq!(
            ProviderFactory::supported_providers(),
            vec!["google", "openai", "anthropic", "deepseek"]
        );
    }
}
