// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! LLM Provider trait and related types
//!
//! Defines the vendor-neutral request/response shapes every brain provider
//! translates to and from its own wire format.

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

use crate::error::Result;
use crate::llm::message::Message;

/// Boxed stream of normalized provider events
pub type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent>> + Send>>;

/// Trait for LLM providers
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Get the provider name as used in settings (e.g. "google")
    fn name(&self) -> &str;

    /// Vendor name used in user-facing messages (e.g. "Google Gemini")
    fn display_name(&self) -> &str;

    /// Get available models
    fn available_models(&self) -> Vec<ModelInfo>;

    /// Check if a model is supported
    fn supports_model(&self, model: &str) -> bool {
        self.available_models().iter().any(|m| m.id == model)
    }

    /// Send a completion request and get a response
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;

    /// Send a completion request and get a stream of events
    async fn complete_stream(&self, request: CompletionRequest) -> Result<EventStream>;
}

/// A request for completion
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Model to use
    pub model: String,

    /// Conversation history ending with the new user message
    pub messages: Vec<Message>,

    /// System instruction
    pub system: Option<String>,

    /// Maximum tokens to generate
    pub max_tokens: u32,

    /// Temperature for sampling
    pub temperature: f32,

    /// Tools the model may call
    pub tools: Vec<ToolDeclaration>,

    /// Tool choice strategy
    pub tool_choice: ToolChoice,
}

/// Response from a completion request
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub id: String,
    pub model: String,
    pub content: Vec<ContentBlockResponse>,
    pub stop_reason: Option<StopReason>,
    pub usage: Usage,
}

/// A content block in a response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlockResponse {
    /// Text content
    Text { text: String },

    /// Tool use request
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
}

/// A tool invocation extracted from a vendor reply
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub input: serde_json::Value,
}

/// Reason the model stopped generating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EndTurn,
    MaxTokens,
    ToolUse,
    StopSequence,
}

/// Token usage information
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// Events from a streaming response, modelled on the Anthropic event set.
/// Other vendors' chunk formats are translated into this sequence.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    MessageStart {
        id: String,
        model: String,
    },

    ContentBlockStart {
        index: usize,
        content_block: ContentBlockResponse,
    },

    ContentBlockDelta {
        index: usize,
        delta: ContentBlockDelta,
    },

    ContentBlockStop {
        index: usize,
    },

    MessageDelta {
        stop_reason: Option<StopReason>,
        usage: Option<Usage>,
    },

    MessageStop,

    /// Keep-alive
    Ping,

    Error {
        error_type: String,
        message: String,
    },
}

/// Delta content in a streaming response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlockDelta {
    TextDelta { text: String },
    InputJsonDelta { partial_json: String },
}

/// A named, schema-described capability the model may invoke
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDeclaration {
    /// Tool name, unique across built-in and plugin tools
    pub name: String,

    /// Description shown to the model
    pub description: String,

    /// Parameter schema
    pub parameters: ParameterSchema,
}

/// JSON-schema-like object description for tool parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSchema {
    /// Schema type (always "object" for tool parameters)
    #[serde(rename = "type")]
    pub schema_type: String,

    /// Property definitions
    #[serde(default)]
    pub properties: serde_json::Value,

    /// Required properties
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
}

/// Tool choice strategy
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ToolChoice {
    /// Let the model decide
    #[default]
    Auto,
    /// Never call tools
    None,
}

/// Information about a model
#[derive(Debug, Clone)]
pub struct ModelInfo {
    pub id: String,
    pub display_name: String,
    pub context_window: u32,
    pub supports_tools: bool,
}

impl CompletionRequest {
    /// Create a new completion request
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            system: None,
            max_tokens: 1024,
            temperature: 0.7,
            tools: vec![],
            tool_choice: ToolChoice::Auto,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_tools(mut self, tools: Vec<ToolDeclaration>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_tool_choice(mut self, tool_choice: ToolChoice) -> Self {
        self.tool_choice = tool_choice;
        self
    }
}

impl CompletionResponse {
    /// All text blocks joined in order
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|block| match block {
                ContentBlockResponse::Text { text } => Some(text.as_str()),
                ContentBlockResponse::ToolUse { .. } => None,
            })
            .collect::<Vec<_>>()
            .join("")
    }

    /// The first tool invocation in the reply, if any
    pub fn first_tool_call(&self) -> Option<ToolCall> {
        self.content.iter().find_map(|block| match block {
            ContentBlockResponse::ToolUse { id, name, input } => Some(ToolCall {
                id: id.clone(),
                name: name.clone(),
                input: input.clone(),
            }),
            ContentBlockResponse::Text { .. } => None,
        })
    }
}

impl ParameterSchema {
    /// An object schema with the given properties and required keys
    pub fn object(properties: serde_json::Value, required: Vec<String>) -> Self {
        Self {
            schema_type: "object".to_string(),
            properties,
            required,
        }
    }

    /// An object schema with no properties
    pub fn empty() -> Self {
        Self::object(serde_json::json!({}), vec![])
    }

    /// The schema as a plain JSON value
    pub fn to_value(&self) -> serde_json::Value {
        let mut value = serde_json::json!({
            "type": self.schema_type,
            "properties": self.properties,
        });
        if !self.required.is_empty() {
            value["required"] = serde_json::json!(self.required);
        }
        value
    }
}

impl Default for ParameterSchema {
    fn default() -> Self {
        Self::empty()
    }
}

impl Usage {
    pub fn total_tokens(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }
}

/// Map a vendor finish/stop string to a [`StopReason`]
pub(crate) fn stop_reason_from(raw: &str) -> StopReason {
    match raw {
        "max_tokens" | "length" | "MAX_TOKENS" => StopReason::MaxTokens,
        "tool_use" | "tool_calls" | "function_call" => StopReason::ToolUse,
        "stop_sequence" => StopReason::StopSequence,
        _ => StopReason::EndTurn,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_completion_request_new() {
        let request = CompletionRequest::new("gpt-4o-mini", vec![Message::user("Hello")]);

        assert_eq!(request.model, "gpt-4o-mini");
        assert_eq!(request.messages.len(), 1);
        assert_eq!(request.max_tokens, 1024);
        assert!(request.system.is_none());
        assert!(request.tools.is_empty());
        assert_eq!(request.tool_choice, ToolChoice::Auto);
    }

    #[test]
    fn test_completion_request_chained() {
        let request = CompletionRequest::new("claude", vec![Message::user("Hello")])
            .with_system("System prompt")
            .with_max_tokens(2048)
            .with_temperature(0.2)
            .with_tool_choice(ToolChoice::None);

        assert_eq!(request.system.as_deref(), Some("System prompt"));
        assert_eq!(request.max_tokens, 2048);
        assert!((request.temperature - 0.2).abs() < 0.001);
        assert_eq!(request.tool_choice, ToolChoice::None);
    }

    #[test]
    fn test_response_text_joins_blocks() {
        let response = CompletionResponse {
            id: "1".to_string(),
            model: "m".to_string(),
            content: vec![
                ContentBlockResponse::Text {
                    text: "Hello, ".to_string(),
                },
                ContentBlockResponse::ToolUse {
                    id: "t".to_string(),
                    name: "x".to_string(),
                    input: json!({}),
                },
                ContentBlockResponse::Text {
                    text: "world".to_string(),
                },
            ],
            stop_reason: Some(StopReason::EndTurn),
            usage: Usage::default(),
        };
        assert_eq!(response.text(), "Hello, world");
    }

    #[test]
    fn test_response_first_tool_call() {
        let response = CompletionResponse {
            id: "1".to_string(),
            model: "m".to_string(),
            content: vec![
                ContentBlockResponse::Text {
                    text: "On it.".to_string(),
                },
                ContentBlockResponse::ToolUse {
                    id: "call_1".to_string(),
                    name: "get_forecast".to_string(),
                    input: json!({"city": "Paris"}),
                },
            ],
            stop_reason: Some(StopReason::ToolUse),
            usage: Usage::default(),
        };
        let call = response.first_tool_call().unwrap();
        assert_eq!(call.name, "get_forecast");
        assert_eq!(call.input["city"], "Paris");
    }

    #[test]
    fn test_parameter_schema_to_value() {
        let schema = ParameterSchema::object(
            json!({"command": {"type": "string"}}),
            vec!["command".to_string()],
        );
        let value = schema.to_value();
        assert_eq!(value["type"], "object");
        assert_eq!(value["required"], json!(["command"]));

        let empty = ParameterSchema::empty().to_value();
        assert!(empty.get("required").is_none());
    }

    #[test]
    fn test_stop_reason_from_vendor_strings() {
        assert_eq!(stop_reason_from("end_turn"), StopReason::EndTurn);
        assert_eq!(stop_reason_from("stop"), StopReason::EndTurn);
        assert_eq!(stop_reason_from("STOP"), StopReason::EndTurn);
        assert_eq!(stop_reason_from("length"), StopReason::MaxTokens);
        assert_eq!(stop_reason_from("MAX_TOKENS"), StopReason::MaxTokens);
        assert_eq!(stop_reason_from("tool_calls"), StopReason::ToolUse);
        assert_eq!(stop_reason_from("tool_use"), StopReason::ToolUse);
    }

    #[test]
    fn test_usage_total_tokens() {
        let usage = Usage {
            input_tokens: 100,
            output_tokens: 50,
        };
        assert_eq!(usage.total_tokens(), 150);
    }

    #[test]
    fn test_tool_declaration_serialization() {
        let tool = ToolDeclaration {
            name: "greet".to_string(),
            description: "Greet someone".to_string(),
            parameters: ParameterSchema::empty(),
        };
        let value = serde_json::to_value(&tool).unwrap();
        assert_eq!(value["parameters"]["type"], "object");
    }
}
