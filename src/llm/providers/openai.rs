// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! OpenAI Chat Completions provider implementation
//!
//! The wire client here is shared with DeepSeek, which speaks the same
//! protocol at a different endpoint.

use std::collections::BTreeSet;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, EchoError, Result};
use crate::llm::message::{Message, Role};
use crate::llm::provider::{
    stop_reason_from, CompletionRequest, CompletionResponse, ContentBlockDelta,
    ContentBlockResponse, EventStream, LlmProvider, ModelInfo, StreamEvent, ToolCall, ToolChoice,
    ToolDeclaration, Usage,
};

use super::common::{self, SseDecoder};

const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// HTTP client for any OpenAI-compatible chat completions endpoint
pub(crate) struct ChatCompletionsClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl ChatCompletionsClient {
    pub(crate) fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: common::http_client(common::DEFAULT_REQUEST_TIMEOUT),
            api_key: api_key.into(),
            base_url: base_url.into(),
        }
    }

    pub(crate) fn set_timeout(&mut self, timeout: Duration) {
        self.client = common::http_client(timeout);
    }

    pub(crate) fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Convert internal messages, placing the system instruction first
    fn convert_messages(&self, messages: &[Message], system: Option<&str>) -> Vec<ChatMessage> {
        let mut result = Vec::with_capacity(messages.len() + 1);

        if let Some(sys) = system.filter(|s| !s.trim().is_empty()) {
            result.push(ChatMessage {
                role: "system".to_string(),
                content: sys.to_string(),
            });
        }

        for msg in messages.iter().filter(|m| m.has_content()) {
            result.push(ChatMessage {
                role: match msg.role {
                    Role::User => "user",
                    Role::Assistant => "assistant",
                }
                .to_string(),
                content: msg.content.clone(),
            });
        }

        result
    }

    fn build_request(&self, request: &CompletionRequest, stream: bool) -> ChatRequest {
        let tools = to_vendor_tools(&request.tools);
        let tool_choice = if tools.is_empty() {
            None
        } else {
            Some(match request.tool_choice {
                ToolChoice::Auto => "auto",
                ToolChoice::None => "none",
            })
        };

        ChatRequest {
            model: request.model.clone(),
            messages: self.convert_messages(&request.messages, request.system.as_deref()),
            max_tokens: Some(request.max_tokens),
            temperature: Some(request.temperature),
            tools: if tools.is_empty() { None } else { Some(tools) },
            tool_choice: tool_choice.map(str::to_string),
            stream: Some(stream),
        }
    }

    fn parse_error(&self, status: u16, body: &str, retry_after: Option<u64>) -> EchoError {
        if let Ok(error_response) = serde_json::from_str::<ChatError>(body) {
            let message = error_response.error.message;
            let code = error_response
                .error
                .code
                .or(error_response.error.error_type)
                .unwrap_or_default();

            match code.as_str() {
                "invalid_api_key" | "authentication_error" => {
                    EchoError::Api(ApiError::AuthenticationFailed)
                }
                "rate_limit_exceeded" | "insufficient_quota" => {
                    EchoError::Api(ApiError::RateLimited(retry_after.unwrap_or(60) as u32))
                }
                "model_not_found" => EchoError::Api(ApiError::ModelNotFound(message)),
                _ if status == 401 || status == 403 => {
                    EchoError::Api(ApiError::AuthenticationFailed)
                }
                _ => common::server_error(status, message),
            }
        } else {
            common::status_error(status, body, retry_after)
        }
    }

    async fn send(&self, body: &ChatRequest) -> Result<reqwest::Response> {
        let response = self
            .client
            .post(&self.base_url)
            .header("Authorization", format!("Bearer {}", &self.api_key))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let retry_after = common::parse_retry_after_seconds(response.headers());
            let body = response.text().await.unwrap_or_default();
            return Err(self.parse_error(status, &body, retry_after));
        }

        Ok(response)
    }

    pub(crate) async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse> {
        let body = self.build_request(request, false);
        let response = self.send(&body).await?;

        let api_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| EchoError::Api(ApiError::InvalidResponse(e.to_string())))?;

        let choice = api_response.choices.into_iter().next().ok_or_else(|| {
            EchoError::Api(ApiError::InvalidResponse(
                "No choices in response".to_string(),
            ))
        })?;

        let mut content = Vec::new();

        if let Some(text) = choice.message.content.filter(|t| !t.is_empty()) {
            content.push(ContentBlockResponse::Text { text });
        }

        for tc in choice.message.tool_calls.unwrap_or_default() {
            let call = from_vendor_tool_call(&tc);
            content.push(ContentBlockResponse::ToolUse {
                id: call.id,
                name: call.name,
                input: call.input,
            });
        }

        let usage = api_response.usage.unwrap_or_default();

        Ok(CompletionResponse {
            id: api_response.id,
            model: api_response.model,
            content,
            stop_reason: choice.finish_reason.as_deref().map(stop_reason_from),
            usage: Usage {
                input_tokens: usage.prompt_tokens,
                output_tokens: usage.completion_tokens,
            },
        })
    }

    pub(crate) async fn complete_stream(&self, request: &CompletionRequest) -> Result<EventStream> {
        let body = self.build_request(request, true);
        let response = self.send(&body).await?;

        let event_stream = response
            .bytes_stream()
            .map(|result| result.map_err(|e| EchoError::Api(ApiError::StreamError(e.to_string()))))
            .scan(
                (SseDecoder::default(), ChunkTranslator::default()),
                |(decoder, translator), result| {
                    let bytes = match result {
                        Ok(bytes) => bytes,
                        Err(e) => return futures::future::ready(Some(vec![Err(e)])),
                    };

                    let mut events = Vec::new();
                    for data in decoder.data(&bytes) {
                        if data == "[DONE]" {
                            events.extend(translator.finish().into_iter().map(Ok));
                            continue;
                        }
                        match serde_json::from_str::<ChatStreamChunk>(&data) {
                            Ok(chunk) => events.extend(translator.push(chunk).into_iter().map(Ok)),
                            Err(e) => tracing::debug!("Skipping unparseable stream chunk: {}", e),
                        }
                    }

                    futures::future::ready(Some(events))
                },
            )
            .flat_map(futures::stream::iter);

        Ok(Box::pin(event_stream))
    }
}

/// Translates Chat Completions chunks into the normalized event sequence.
///
/// Text always lives at block index 0; tool call `n` lives at index `n + 1`.
#[derive(Default)]
struct ChunkTranslator {
    started: bool,
    text_open: bool,
    open_tools: BTreeSet<usize>,
    finished: bool,
}

impl ChunkTranslator {
    fn push(&mut self, chunk: ChatStreamChunk) -> Vec<StreamEvent> {
        let mut events = Vec::new();

        if !self.started {
            self.started = true;
            events.push(StreamEvent::MessageStart {
                id: chunk.id.clone(),
                model: chunk.model.clone().unwrap_or_default(),
            });
        }

        let Some(choice) = chunk.choices.into_iter().next() else {
            return events;
        };

        if let Some(text) = choice.delta.content.filter(|t| !t.is_empty()) {
            if !self.text_open {
                self.text_open = true;
                events.push(StreamEvent::ContentBlockStart {
                    index: 0,
                    content_block: ContentBlockResponse::Text {
                        text: String::new(),
                    },
                });
            }
            events.push(StreamEvent::ContentBlockDelta {
                index: 0,
                delta: ContentBlockDelta::TextDelta { text },
            });
        }

        for tc in choice.delta.tool_calls.unwrap_or_default() {
            let tc_index = tc.index.unwrap_or(0);
            let block_index = tc_index + 1;

            if self.open_tools.insert(tc_index) {
                events.push(StreamEvent::ContentBlockStart {
                    index: block_index,
                    content_block: ContentBlockResponse::ToolUse {
                        id: tc.id.clone().unwrap_or_else(|| format!("call_{}", tc_index)),
                        name: tc
                            .function
                            .as_ref()
                            .and_then(|f| f.name.clone())
                            .unwrap_or_default(),
                        input: serde_json::Value::Object(serde_json::Map::new()),
                    },
                });
            }

            if let Some(args) = tc.function.and_then(|f| f.arguments) {
                if !args.is_empty() {
                    events.push(StreamEvent::ContentBlockDelta {
                        index: block_index,
                        delta: ContentBlockDelta::InputJsonDelta { partial_json: args },
                    });
                }
            }
        }

        if let Some(finish_reason) = choice.finish_reason {
            events.extend(self.close_blocks());
            events.push(StreamEvent::MessageDelta {
                stop_reason: Some(stop_reason_from(&finish_reason)),
                usage: chunk.usage.map(|u| Usage {
                    input_tokens: u.prompt_tokens,
                    output_tokens: u.completion_tokens,
                }),
            });
        }

        events
    }

    fn close_blocks(&mut self) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        if self.text_open {
            self.text_open = false;
            events.push(StreamEvent::ContentBlockStop { index: 0 });
        }
        for tc_index in std::mem::take(&mut self.open_tools) {
            events.push(StreamEvent::ContentBlockStop {
                index: tc_index + 1,
            });
        }
        events
    }

    fn finish(&mut self) -> Vec<StreamEvent> {
        if self.finished {
            return Vec::new();
        }
        self.finished = true;
        let mut events = self.close_blocks();
        events.push(StreamEvent::MessageStop);
        events
    }
}

/// Translate tool declarations into `{type: "function", function: {...}}` entries.
pub fn to_vendor_tools(tools: &[ToolDeclaration]) -> Vec<OpenAiTool> {
    tools
        .iter()
        .map(|t| OpenAiTool {
            tool_type: "function".to_string(),
            function: OpenAiFunction {
                name: t.name.clone(),
                description: t.description.clone(),
                parameters: t.parameters.to_value(),
            },
        })
        .collect()
}

/// Normalize a `tool_calls` entry. Arguments arrive as a JSON-encoded
/// string; a malformed string yields an empty object.
pub fn from_vendor_tool_call(call: &OpenAiToolCall) -> ToolCall {
    let input = match serde_json::from_str::<serde_json::Value>(&call.function.arguments) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(
                "Malformed arguments for tool call '{}': {}",
                call.function.name,
                e
            );
            serde_json::json!({})
        }
    };

    ToolCall {
        id: call.id.clone(),
        name: call.function.name.clone(),
        input,
    }
}

/// OpenAI provider
pub struct OpenAiProvider {
    inner: ChatCompletionsClient,
}

impl OpenAiProvider {
    /// Create a new OpenAI provider
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, OPENAI_API_URL)
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
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn display_name(&self) -> &str {
        "OpenAI"
    }

    fn available_models(&self) -> Vec<ModelInfo> {
        vec![
            ModelInfo {
                id: "gpt-4o-mini".to_string(),
                display_name: "GPT-4o mini".to_string(),
                context_window: 128_000,
                supports_tools: true,
            },
            ModelInfo {
                id: "gpt-4o".to_string(),
                display_name: "GPT-4o".to_string(),
                context_window: 128_000,
                supports_tools: true,
            },
            ModelInfo {
                id: "o1-mini".to_string(),
                display_name: "o1-mini".to_string(),
                context_window: 128_000,
                supports_tools: false,
            },
        ]
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        self.inner.complete(&request).await
    }

    async fn complete_stream(&self, request: CompletionRequest) -> Result<EventStream> {
        self.inner.complete_stream(&request).await
    }
}

// Chat Completions API types

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<OpenAiTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

/// A `tool_calls` entry in a chat completion reply
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiToolCall {
    pub id: String,
    #[serde(rename = "type", default = "function_type")]
    pub call_type: String,
    pub function: OpenAiFunctionCall,
}

fn function_type() -> String {
    "function".to_string()
}

/// Function name and JSON-encoded arguments
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiFunctionCall {
    pub name: String,
    #[serde(default)]
    pub arguments: String,
}

/// A function tool entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpenAiTool {
    #[serde(rename = "type")]
    pub tool_type: String,
    pub function: OpenAiFunction,
}

/// Function declaration inside a tool entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpenAiFunction {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    id: String,
    #[serde(default)]
    model: String,
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
    tool_calls: Option<Vec<OpenAiToolCall>>,
}

#[derive(Debug, Default, Deserialize)]
struct ChatUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatError {
    error: ChatErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ChatErrorDetail {
    message: String,
    code: Option<String>,
    #[serde(rename = "type")]
    error_type: Option<String>,
}

// Streaming types
#[derive(Debug, Deserialize)]
struct ChatStreamChunk {
    #[serde(default)]
    id: String,
    model: Option<String>,
    #[serde(default)]
    choices: Vec<ChatStreamChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatStreamChoice {
    delta: ChatStreamDelta,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatStreamDelta {
    content: Option<String>,
    tool_calls: Option<Vec<ChatStreamToolCall>>,
}

#[derive(Debug, Deserialize)]
struct ChatStreamToolCall {
    index: Option<usize>,
    id: Option<String>,
    function: Option<ChatStreamFunction>,
}

#[derive(Debug, Deserialize)]
struct ChatStreamFunction {
    name: Option<String>,
    arguments: Option<String>,
}
