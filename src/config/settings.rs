// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Settings management for Echo
//!
//! Handles loading and saving settings from ~/.echo/settings.json. Keys are
//! camelCase on disk (`aiProvider`, `apiKeys`, `memoryEnabled`, ...).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

mod appearance;
mod io;
mod merge;
mod validation;
mod workflow;

pub use appearance::{ThemeColors, WindowGeometry};
pub use workflow::{find_workflow, StepKind, WorkflowStep, Workflows};

/// Plugins enabled on a fresh install
pub const DEFAULT_PLUGINS: &[&str] = &[
    "example-plugin",
    "productivity-plugin",
    "system-control-plugin",
    "workflow-plugin",
    "reminder-plugin",
];

/// Main settings structure, stored in ~/.echo/settings.json
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Orb color theme (cyan, purple, green, gold, red, blue)
    #[serde(default = "default_theme")]
    pub theme: String,

    /// Window anchor (top-left, top-right, bottom-left, bottom-right, center)
    #[serde(default = "default_position")]
    pub position: String,

    /// Window size preset (small, medium, large)
    #[serde(default = "default_size")]
    pub size: String,

    /// Name the assistant uses for the person it is helping
    #[serde(default = "default_user_name")]
    pub user_name: String,

    /// Active brain provider: google, openai, anthropic or deepseek
    #[serde(default = "default_provider")]
    pub ai_provider: String,

    /// Model identifier for the active provider
    #[serde(default = "default_model")]
    pub model: String,

    /// API keys keyed by provider name
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub api_keys: BTreeMap<String, String>,

    /// Whether conversations are remembered between requests
    #[serde(default = "default_true")]
    pub memory_enabled: bool,

    /// Names of enabled plugins
    #[serde(default = "default_plugins")]
    pub plugins: Vec<String>,

    /// Per-provider connection settings
    #[serde(default)]
    pub providers: ProvidersConfig,

    /// Brain request tuning
    #[serde(default)]
    pub brain: BrainConfig,

    /// Conversation memory limits
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Named action sequences run by the workflow plugin
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub workflows: Workflows,
}

/// Connection settings for every supported provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default = "ProviderConfig::google")]
    pub google: ProviderConfig,

    #[serde(default = "ProviderConfig::openai")]
    pub openai: ProviderConfig,

    #[serde(default = "ProviderConfig::anthropic")]
    pub anthropic: ProviderConfig,

    #[serde(default = "ProviderConfig::deepseek")]
    pub deepseek: ProviderConfig,
}

/// Connection settings for one provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    /// Environment variable consulted when `apiKeys` has no entry
    pub api_key_env: String,

    /// Base URL override (proxies, self-hosted gateways, tests)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

/// Brain request settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrainConfig {
    /// Stream partial replies when the caller asks for progress
    #[serde(default = "default_true")]
    pub stream: bool,

    /// Upper bound on a single vendor call, in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Maximum tokens in a reply
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

/// Memory store limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryConfig {
    /// Messages sent to the brain as history on each request
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    /// Messages retained on disk; older entries are dropped on save
    #[serde(default = "default_max_messages")]
    pub max_messages: usize,
}

impl ProviderConfig {
    fn with_env(api_key_env: &str) -> Self {
        Self {
            api_key_env: api_key_env.to_string(),
            base_url: None,
        }
    }

    fn google() -> Self {
        Self::with_env("GOOGLE_AI_API_KEY")
    }

    fn openai() -> Self {
        Self::with_env("OPENAI_API_KEY")
    }

    fn anthropic() -> Self {
        Self::with_env("ANTHROPIC_API_KEY")
    }

    fn deepseek() -> Self {
        Self::with_env("DEEPSEEK_API_KEY")
    }
}

impl ProvidersConfig {
    /// Look up a provider's connection settings by name.
    pub fn get(&self, provider: &str) -> Option<&ProviderConfig> {
        match provider {
            "google" => Some(&self.google),
            "openai" => Some(&self.openai),
            "anthropic" => Some(&self.anthropic),
            "deepseek" => Some(&self.deepseek),
            _ => None,
        }
    }
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            google: ProviderConfig::google(),
            openai: ProviderConfig::openai(),
            anthropic: ProviderConfig::anthropic(),
            deepseek: ProviderConfig::deepseek(),
        }
    }
}

impl Default for BrainConfig {
    fn default() -> Self {
        Self {
            stream: true,
            request_timeout_secs: default_request_timeout_secs(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            history_limit: default_history_limit(),
            max_messages: default_max_messages(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            theme: default_theme(),
            position: default_position(),
            size: default_size(),
            user_name: default_user_name(),
            ai_provider: default_provider(),
            model: default_model(),
            api_keys: BTreeMap::new(),
            memory_enabled: true,
            plugins: default_plugins(),
            providers: ProvidersConfig::default(),
            brain: BrainConfig::default(),
            memory: MemoryConfig::default(),
            workflows: Workflows::new(),
        }
    }
}

impl Settings {
    /// Whether a plugin is in the enabled list.
    pub fn is_plugin_enabled(&self, name: &str) -> bool {
        self.plugins.iter().any(|p| p == name)
    }
}

fn default_theme() -> String {
    "cyan".to_string()
}

fn default_position() -> String {
    "bottom-right".to_string()
}

fn default_size() -> String {
    "medium".to_string()
}

fn default_user_name() -> String {
    "User".to_string()
}

fn default_provider() -> String {
    "google".to_string()
}

fn default_model() -> String {
    "gemini-2.0-flash-lite".to_string()
}

fn default_plugins() -> Vec<String> {
    DEFAULT_PLUGINS.iter().map(|p| p.to_string()).collect()
}

fn default_true() -> bool {
    true
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_temperature() -> f32 {
    0.7
}

fn default_history_limit() -> usize {
    10
}

fn default_max_messages() -> usize {
    50
}
