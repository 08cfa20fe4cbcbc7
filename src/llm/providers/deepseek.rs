// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! DeepSeek provider implementation
//!
//! DeepSeek exposes an OpenAI-compatible chat completions endpoint, so this
//! provider reuses the OpenAI wire client and only differs in endpoint and
//! model catalogue. The reasoner model rejects function calling, so tools are
//! stripped from its requests.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;
use crate::llm::provider::{
    CompletionRequest, CompletionResponse, EventStream, LlmProvider, ModelInfo,
};

use super::openai::ChatCompletionsClient;

const DEEPSEEK_API_URL: &str = "https://api.deepseek.com/chat/completions";
const REASONER_MODEL: &str = "deepseek-reasoner";

/// DeepSeek provider
pub struct DeepSeekProvider {
    inner: ChatCompletionsClient,
}

impl DeepSeekProvider {
    /// Create a new DeepSeek provider
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, DEEPSEEK_API_URL)
    }

    /// Create with a custom base URL
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            inner: ChatCompletionsClient::new(api_key, base_url),
        }
    }

    /// Replace the HTTP client timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.inner.set_timeout(timeout);
        self
    }

    fn prepare(&self, mut request: CompletionRequest) -> CompletionRequest {
        if request.model == REASONER_MODEL && !request.tools.is_empty() {
            tracing::debug!("Dropping {} tools for {}", request.tools.len(), REASONER_MODEL);
            request.tools.clear();
        }
        request
    }
}

#[async_trait]
impl LlmProvider for DeepSeekProvider {
    fn name(&self) -> &str {
        "deepseek"
    }

    fn display_name(&self) -> &str {
        "DeepSeek"
    }

    fn available_models(&self) -> Vec<ModelInfo> {
        vec![
            ModelInfo {
                id: "deepseek-chat".to_string(),
                display_name: "DeepSeek Chat".to_string(),
                context_window: 64_000,
                supports_tools: true,
            },
            ModelInfo {
                id: REASONER_MODEL.to_string(),
                display_name: "DeepSeek Reasoner".to_string(),
                context_window: 64_000,
                supports_tools: false,
            },
        ]
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let request = self.prepare(request);
        self.inner.complete(&request).await
    }

    async fn complete_stream(&self, request: CompletionRequest) -> Result<EventStream> {
        let request = self.prepare(request);
        self.inner.complete_stream(&request).await
    }
}
