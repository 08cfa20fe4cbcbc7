// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

use crate::error::{EchoError, Result};
use crate::llm::factory::ProviderKind;

use super::Settings;

const THEMES: &[&str] = &["cyan", "purple", "green", "gold", "red", "blue"];
const POSITIONS: &[&str] = &["top-left", "top-right", "bottom-left", "bottom-right", "center"];
const SIZES: &[&str] = &["small", "medium", "large"];

impl Settings {
    /// Resolve the API key for a provider.
    ///
    /// Priority: `apiKeys[provider]` in the settings file, then the
    /// provider's environment variable. Blank values count as missing.
    pub fn api_key_for(&self, provider: &str) -> Option<String> {
        self.api_keys
            .get(provider)
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .or_else(|| {
                let env_name = &self.providers.get(provider)?.api_key_env;
                std::env::var(env_name)
                    .ok()
                    .map(|k| k.trim().to_string())
                    .filter(|k| !k.is_empty())
            })
    }

    /// Check if the given provider has a usable API key.
    pub fn is_provider_configured(&self, provider: &str) -> bool {
        self.api_key_for(provider).is_some()
    }

    /// Base URL override for a provider, if any.
    pub fn base_url_for(&self, provider: &str) -> Option<String> {
        self.providers
            .get(provider)
            .and_then(|p| p.base_url.clone())
    }

    /// The user name to address, falling back to a neutral greeting.
    pub fn display_user_name(&self) -> &str {
        let name = self.user_name.trim();
        if name.is_empty() {
            "Friend"
        } else {
            name
        }
    }

    /// Reject values the rest of the application cannot act on.
    pub fn validate(&self) -> Result<()> {
        self.ai_provider.parse::<ProviderKind>()?;

        if !THEMES.contains(&self.theme.as_str()) {
            return Err(EchoError::Config(format!(
                "Unknown theme '{}'. Expected one of: {}",
                self.theme,
                THEMES.join(", ")
            )));
        }
        if !POSITIONS.contains(&self.position.as_str()) {
            return Err(EchoError::Config(format!(
                "Unknown position '{}'. Expected one of: {}",
                self.position,
                POSITIONS.join(", ")
            )));
        }
        if !SIZES.contains(&self.size.as_str()) {
            return Err(EchoError::Config(format!(
                "Unknown size '{}'. Expected one of: {}",
                self.size,
                SIZES.join(", ")
            )));
        }
        if self.memory.max_messages == 0 {
            return Err(EchoError::Config(
                "memory.maxMessages must be at least 1".to_string(),
            ));
        }
        if self.brain.request_timeout_secs == 0 {
            return Err(EchoError::Config(
                "brain.requestTimeoutSecs must be at least 1".to_string(),
            ));
        }
        if self.workflows.keys().any(|name| name.trim().is_empty()) {
            return Err(EchoError::Config(
                "Workflow names must not be blank".to_string(),
            ));
        }
        Ok(())
    }
}
