// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Mock LLM provider for testing
//!
//! Provides a configurable mock implementation of the LlmProvider trait
//! that can be used in unit tests without making real API calls.

use async_trait::async_trait;
use futures::stream;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::error::{ApiError, EchoError, Result};
use crate::llm::provider::{
    CompletionRequest, CompletionResponse, ContentBlockDelta, ContentBlockResponse, EventStream,
    LlmProvider, ModelInfo, StopReason, StreamEvent, Usage,
};

/// A mock LLM provider for testing
#[derive(Clone)]
pub struct MockProvider {
    /// Provider name
    name: String,
    /// Vendor name for messages
    display_name: String,
    /// Configured responses
    responses: Arc<Mutex<Vec<MockResponse>>>,
    /// Call counter
    call_count: Arc<AtomicUsize>,
    /// Recorded requests
    recorded_requests: Arc<Mutex<Vec<CompletionRequest>>>,
    /// Artificial latency before answering
    delay: Option<Duration>,
    /// Available models
    models: Vec<ModelInfo>,
}

/// A pre-configured response for the mock provider
#[derive(Clone, Debug)]
pub struct MockResponse {
    /// Text content to return
    pub text: String,
    /// Tool calls to return (optional)
    pub tool_calls: Vec<MockToolCall>,
    /// Stop reason
    pub stop_reason: StopReason,
    /// Token usage
    pub usage: Usage,
    /// When set, the call fails with a server error carrying this message
    pub failure: Option<String>,
}

/// A mock tool call
#[derive(Clone, Debug)]
pub struct MockToolCall {
    /// Tool call ID
    pub id: String,
    /// Tool name
    pub name: String,
    /// Tool input (JSON)
    pub input: serde_json::Value,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProvider {
    /// Create a new mock provider
    pub fn new() -> Self {
        Self {
            name: "mock".to_string(),
            display_name: "Mock".to_string(),
            responses: Arc::new(Mutex::new(vec![MockResponse::default()])),
            call_count: Arc::new(AtomicUsize::new(0)),
            recorded_requests: Arc::new(Mutex::new(vec![])),
            delay: None,
            models: vec![Self::default_model()],
        }
    }

    /// Create a mock provider with a custom name and vendor display name
    pub fn with_name(name: impl Into<String>, display_name: impl Into<String>) -> Self {
        let mut provider = Self::new();
        provider.name = name.into();
        provider.display_name = display_name.into();
        provider
    }

    fn default_model() -> ModelInfo {
        ModelInfo {
            id: "mock-model".to_string(),
            display_name: "Mock Model".to_string(),
            context_window: 128_000,
            supports_tools: true,
        }
    }

    fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
        match mutex.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::warn!("Mock provider lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn replace_responses(self, queued: Vec<MockResponse>) -> Self {
        *Self::lock(&self.responses) = queued;
        self
    }

    /// Set the text response
    pub fn with_response(self, text: impl Into<String>) -> Self {
        self.replace_responses(vec![MockResponse::text(text)])
    }

    /// Queue multiple responses (returned in order, the last one repeats)
    pub fn with_responses(self, responses: Vec<MockResponse>) -> Self {
        self.replace_responses(responses)
    }

    /// Set a tool call response with optional accompanying text
    pub fn with_tool_call(
        self,
        text: impl Into<String>,
        name: impl Into<String>,
        input: serde_json::Value,
    ) -> Self {
        self.replace_responses(vec![MockResponse::tool_call(text, name, input)])
    }

    /// Make every call fail
    pub fn with_failure(self, message: impl Into<String>) -> Self {
        self.replace_responses(vec![MockResponse {
            failure: Some(message.into()),
            ..Default::default()
        }])
    }

    /// Sleep before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Add custom models
    pub fn with_models(mut self, models: Vec<ModelInfo>) -> Self {
        self.models = models;
        self
    }

    /// Get the number of times the provider was called
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Get all recorded requests
    pub fn recorded_requests(&self) -> Vec<CompletionRequest> {
        Self::lock(&self.recorded_requests).clone()
    }

    /// Get the last request made
    pub fn last_request(&self) -> Option<CompletionRequest> {
        Self::lock(&self.recorded_requests).last().cloned()
    }

    async fn begin(&self, request: &CompletionRequest) -> Result<MockResponse> {
        Self::lock(&self.recorded_requests).push(request.clone());

        let count = self.call_count.fetch_add(1, Ordering::SeqCst);
        let response = {
            let responses = Self::lock(&self.responses);
            if responses.is_empty() {
                MockResponse::default()
            } else {
                responses[count.min(responses.len() - 1)].clone()
            }
        };

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match &response.failure {
            Some(message) => Err(EchoError::Api(ApiError::ServerError {
                status: 500,
                message: message.clone(),
            })),
            None => Ok(response),
        }
    }
}

impl MockResponse {
    /// A plain text reply
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    /// A reply invoking one tool
    pub fn tool_call(
        text: impl Into<String>,
        name: impl Into<String>,
        input: serde_json::Value,
    ) -> Self {
        Self {
            text: text.into(),
            tool_calls: vec![MockToolCall {
                id: format!("toolu_{}", uuid::Uuid::new_v4().simple()),
                name: name.into(),
                input,
            }],
            stop_reason: StopReason::ToolUse,
            ..Default::default()
        }
    }
}

impl Default for MockResponse {
    fn default() -> Self {
        Self {
            text: "Mock response".to_string(),
            tool_calls: vec![],
            stop_reason: StopReason::EndTurn,
            usage: Usage {
                input_tokens: 10,
                output_tokens: 20,
            },
            failure: None,
        }
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn display_name(&self) -> &str {
        &self.display_name
    }

    fn available_models(&self) -> Vec<ModelInfo> {
        self.models.clone()
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let response = self.begin(&request).await?;

        let mut content = vec![];

        if !response.text.is_empty() {
            content.push(ContentBlockResponse::Text {
                text: response.text,
            });
        }

        for tool_call in response.tool_calls {
            content.push(ContentBlockResponse::ToolUse {
                id: tool_call.id,
                name: tool_call.name,
                input: tool_call.input,
            });
        }

        Ok(CompletionResponse {
            id: format!("msg_{}", uuid::Uuid::new_v4().simple()),
            model: request.model,
            content,
            stop_reason: Some(response.stop_reason),
            usage: response.usage,
        })
    }

    async fn complete_stream(&self, request: CompletionRequest) -> Result<EventStream> {
        let response = self.begin(&request).await?;

        let mut events = vec![Ok(StreamEvent::MessageStart {
            id: format!("msg_{}", uuid::Uuid::new_v4().simple()),
            model: request.model.clone(),
        })];

        if !response.text.is_empty() {
            events.push(Ok(StreamEvent::ContentBlockStart {
                index: 0,
                content_block: ContentBlockResponse::Text {
                    text: String::new(),
                },
            }));

            // Stream the text in chunks
            for chunk in response.text.chars().collect::<Vec<_>>().chunks(10) {
                let text: String = chunk.iter().collect();
                events.push(Ok(StreamEvent::ContentBlockDelta {
                    index: 0,
                    delta: ContentBlockDelta::TextDelta { text },
                }));
            }

            events.push(Ok(StreamEvent::ContentBlockStop { index: 0 }));
        }

        for (i, tool_call) in response.tool_calls.into_iter().enumerate() {
            let index = i + 1;
            events.push(Ok(StreamEvent::ContentBlockStart {
                index,
                content_block: ContentBlockResponse::ToolUse {
                    id: tool_call.id,
                    name: tool_call.name,
                    input: serde_json::json!({}),
                },
            }));
            events.push(Ok(StreamEvent::ContentBlockDelta {
                index,
                delta: ContentBlockDelta::InputJsonDelta {
                    partial_json: tool_call.input.to_string(),
                },
            }));
            events.push(Ok(StreamEvent::ContentBlockStop { index }));
        }

        events.push(Ok(StreamEvent::MessageDelta {
            stop_reason: Some(response.stop_reason),
            usage: Some(response.usage),
        }));
        events.push(Ok(StreamEvent::MessageStop));

        Ok(Box::pin(stream::iter(events)))
    }
}
