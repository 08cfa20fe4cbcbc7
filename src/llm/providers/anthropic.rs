// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Anthropic Claude API provider implementation
//!
//! Implements the LlmProvider trait for Claude models via the Messages API.

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

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic Claude provider
pub struct AnthropicProvider {
    client: Client,
    api_key: String,
    base_url: String,
}

impl AnthropicProvider {
    /// Create a new Anthropic provider
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, ANTHROPIC_API_URL)
    }

    /// Create with a custom base URL
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: common::http_client(common::DEFAULT_REQUEST_TIMEOUT),
            api_key: api_key.into(),
            base_url: base_url.into(),
        }
    }

    /// Replace the HTTP client timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = common::http_client(timeout);
        self
    }

    /// Convert internal messages to Anthropic format
    fn convert_messages(&self, messages: &[Message]) -> Vec<AnthropicMessage> {
        common::coalesce_turns(messages)
            .into_iter()
            .map(|(role, text)| AnthropicMessage {
                role: match role {
                    Role::User => "user",
                    Role::Assistant => "assistant",
                }
                .to_string(),
                content: AnthropicContent::Text(text),
            })
            .collect()
    }

    /// Build the request body
    fn build_request(&self, request: &CompletionRequest, stream: bool) -> AnthropicRequest {
        let tools = to_vendor_tools(&request.tools);
        let tool_choice = match request.tool_choice {
            ToolChoice::Auto if !tools.is_empty() => Some(AnthropicToolChoice::Auto),
            ToolChoice::None if !tools.is_empty() => Some(AnthropicToolChoice::None),
            _ => None,
        };

        AnthropicRequest {
            model: request.model.clone(),
            messages: self.convert_messages(&request.messages),
            system: request.system.clone(),
            max_tokens: request.max_tokens,
            temperature: Some(request.temperature),
            tools: if tools.is_empty() { None } else { Some(tools) },
            tool_choice,
            stream: Some(stream),
        }
    }

    /// Parse an error response
    fn parse_error(&self, status: u16, body: &str, retry_after: Option<u64>) -> EchoError {
        if let Ok(error_response) = serde_json::from_str::<AnthropicError>(body) {
            match error_response.error.error_type.as_str() {
                "authentication_error" | "permission_error" => {
                    EchoError::Api(ApiError::AuthenticationFailed)
                }
                "rate_limit_error" => {
                    EchoError::Api(ApiError::RateLimited(retry_after.unwrap_or(10) as u32))
                }
                "not_found_error" => {
                    EchoError::Api(ApiError::ModelNotFound(error_response.error.message))
                }
                "invalid_request_error" => {
                    EchoError::Api(ApiError::InvalidResponse(error_response.error.message))
                }
                _ => common::server_error(status, error_response.error.message),
            }
        } else {
            common::status_error(status, body, retry_after)
        }
    }

    async fn send(&self, body: &AnthropicRequest) -> Result<reqwest::Response> {
        let response = self
            .client
            .post(&self.base_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
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
}

/// Translate tool declarations into Anthropic's `tools` entries.
pub fn to_vendor_tools(tools: &[ToolDeclaration]) -> Vec<AnthropicTool> {
    tools
        .iter()
        .map(|t| AnthropicTool {
            name: t.name.clone(),
            description: t.description.clone(),
            input_schema: t.parameters.to_value(),
        })
        .collect()
}

/// Normalize a `tool_use` content block. Anthropic already sends the input
/// as a JSON object, so it passes through unchanged.
pub fn from_vendor_tool_call(block: &AnthropicContentBlock) -> Option<ToolCall> {
    match block {
        AnthropicContentBlock::ToolUse { id, name, input } => Some(ToolCall {
            id: id.clone(),
            name: name.clone(),
            input: input.clone(),
        }),
        AnthropicContentBlock::Text { .. } => None,
    }
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn display_name(&self) -> &str {
        "Anthropic"
    }

    fn available_models(&self) -> Vec<ModelInfo> {
        vec![
            ModelInfo {
                id: "claude-3-5-haiku-latest".to_string(),
                display_name: "Claude 3.5 Haiku".to_string(),
                context_window: 200_000,
                supports_tools: true,
            },
            ModelInfo {
                id: "claude-3-5-sonnet-latest".to_string(),
                display_name: "Claude 3.5 Sonnet".to_string(),
                context_window: 200_000,
                supports_tools: true,
            },
            ModelInfo {
                id: "claude-sonnet-4-20250514".to_string(),
                display_name: "Claude Sonnet 4".to_string(),
                context_window: 200_000,
                supports_tools: true,
            },
        ]
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let body = self.build_request(&request, false);
        let response = self.send(&body).await?;

        let api_response: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| EchoError::Api(ApiError::InvalidResponse(e.to_string())))?;

        let content = api_response
            .content
            .iter()
            .map(|block| match from_vendor_tool_call(block) {
                Some(call) => ContentBlockResponse::ToolUse {
                    id: call.id,
                    name: call.name,
                    input: call.input,
                },
                None => ContentBlockResponse::Text {
                    text: match block {
                        AnthropicContentBlock::Text { text } => text.clone(),
                        AnthropicContentBlock::ToolUse { .. } => String::new(),
                    },
                },
            })
            .collect();

        Ok(CompletionResponse {
            id: api_response.id,
            model: api_response.model,
            content,
            stop_reason: api_response.stop_reason.as_deref().map(stop_reason_from),
            usage: Usage {
                input_tokens: api_response.usage.input_tokens,
                output_tokens: api_response.usage.output_tokens,
            },
        })
    }

    async fn complete_stream(&self, request: CompletionRequest) -> Result<EventStream> {
        let body = self.build_request(&request, true);
        let response = self.send(&body).await?;

        let event_stream = response
            .bytes_stream()
            .map(|result| result.map_err(|e| EchoError::Api(ApiError::StreamError(e.to_string()))))
            .scan(SseDecoder::default(), |decoder, result| {
                let bytes = match result {
                    Ok(bytes) => bytes,
                    Err(e) => return futures::future::ready(Some(vec![Err(e)])),
                };

                let events: Vec<Result<StreamEvent>> = decoder
                    .events(&bytes)
                    .iter()
                    .filter_map(|event_str| parse_sse_event(event_str))
                    .map(Ok)
                    .collect();

                futures::future::ready(Some(events))
            })
            .flat_map(futures::stream::iter);

        Ok(Box::pin(event_stream))
    }
}

/// Parse a Server-Sent Event
fn parse_sse_event(event_str: &str) -> Option<StreamEvent> {
    let mut event_type = None;
    let mut data = None;

    for line in event_str.lines() {
        if let Some(rest) = line.strip_prefix("event:") {
            event_type = Some(rest.trim().to_string());
        } else if let Some(rest) = line.strip_prefix("data:") {
            data = Some(rest.trim().to_string());
        }
    }

    let event_type = event_type?;
    let parsed: serde_json::Value = match data {
        Some(data) => serde_json::from_str(&data).ok()?,
        None => serde_json::Value::Null,
    };

    match event_type.as_str() {
        "message_start" => Some(StreamEvent::MessageStart {
            id: parsed["message"]["id"].as_str()?.to_string(),
            model: parsed["message"]["model"].as_str()?.to_string(),
        }),
        "content_block_start" => {
            let index = parsed["index"].as_u64()? as usize;
            let block = &parsed["content_block"];

            let content_block = match block["type"].as_str()? {
                "text" => ContentBlockResponse::Text {
                    text: block["text"].as_str().unwrap_or("").to_string(),
                },
                "tool_use" => ContentBlockResponse::ToolUse {
                    id: block["id"].as_str()?.to_string(),
                    name: block["name"].as_str()?.to_string(),
                    input: serde_json::Value::Object(serde_json::Map::new()),
                },
                _ => return None,
            };

            Some(StreamEvent::ContentBlockStart {
                index,
                content_block,
            })
        }
        "content_block_delta" => {
            let index = parsed["index"].as_u64()? as usize;
            let delta = &parsed["delta"];

            let delta = match delta["type"].as_str()? {
                "text_delta" => ContentBlockDelta::TextDelta {
                    text: delta["text"].as_str()?.to_string(),
                },
                "input_json_delta" => ContentBlockDelta::InputJsonDelta {
                    partial_json: delta["partial_json"].as_str()?.to_string(),
                },
                _ => return None,
            };

            Some(StreamEvent::ContentBlockDelta { index, delta })
        }
        "content_block_stop" => Some(StreamEvent::ContentBlockStop {
            index: parsed["index"].as_u64()? as usize,
        }),
        "message_delta" => {
            let stop_reason = parsed["delta"]["stop_reason"]
                .as_str()
                .map(stop_reason_from);

            let usage = parsed.get("usage").map(|u| Usage {
                input_tokens: u["input_tokens"].as_u64().unwrap_or(0) as u32,
                output_tokens: u["output_tokens"].as_u64().unwrap_or(0) as u32,
            });

            Some(StreamEvent::MessageDelta { stop_reason, usage })
        }
        "message_stop" => Some(StreamEvent::MessageStop),
        "ping" => Some(StreamEvent::Ping),
        "error" => Some(StreamEvent::Error {
            error_type: parsed["error"]["type"].as_str()?.to_string(),
            message: parsed["error"]["message"].as_str()?.to_string(),
        }),
        _ => None,
    }
}

// Anthropic API types

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    messages: Vec<AnthropicMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<AnthropicTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<AnthropicToolChoice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: String,
    content: AnthropicContent,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum AnthropicContent {
    Text(String),
}

/// A content block in an Anthropic reply
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnthropicContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
}

/// Anthropic tool entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnthropicTool {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicToolChoice {
    Auto,
    None,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    id: String,
    model: String,
    content: Vec<AnthropicContentBlock>,
    stop_reason: Option<String>,
    usage: AnthropicUsage,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct AnthropicError {
    error: AnthropicErrorDetail,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorDetail {
    #[serde(rename = "type")]
    error_type: String,
    message: String,
}
