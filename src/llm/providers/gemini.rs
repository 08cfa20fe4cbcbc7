// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Google Gemini provider implementation
//!
//! Talks to the Generative Language `v1beta` REST API. Gemini calls the
//! assistant role "model", takes the persona as `systemInstruction`, and
//! expects OpenAPI-style upper-case schema types in function declarations.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ApiError, EchoError, Result};
use crate::llm::message::{Message, Role};
use crate::llm::provider::{
    stop_reason_from, CompletionRequest, CompletionResponse, ContentBlockDelta,
    ContentBlockResponse, EventStream, LlmProvider, ModelInfo, StreamEvent, ToolCall, ToolChoice,
    ToolDeclaration, Usage,
};

use super::common::{self, SseDecoder};

const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Google Gemini provider
pub struct GeminiProvider {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GeminiProvider {
    /// Create a new Gemini provider
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, GEMINI_API_URL)
    }

    /// Create with a custom API root (the part before `/models/...`)
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: common::http_client(common::DEFAULT_REQUEST_TIMEOUT),
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Replace the HTTP client timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = common::http_client(timeout);
        self
    }

    fn endpoint(&self, model: &str, stream: bool) -> String {
        if stream {
            format!(
                "{}/models/{}:streamGenerateContent?alt=sse",
                self.base_url, model
            )
        } else {
            format!("{}/models/{}:generateContent", self.base_url, model)
        }
    }

    fn convert_messages(&self, messages: &[Message]) -> Vec<GeminiContent> {
        common::coalesce_turns(messages)
            .into_iter()
            .map(|(role, text)| GeminiContent {
                role: Some(
                    match role {
                        Role::User => "user",
                        Role::Assistant => "model",
                    }
                    .to_string(),
                ),
                parts: vec![GeminiPart::text(text)],
            })
            .collect()
    }

    fn build_request(&self, request: &CompletionRequest) -> GeminiRequest {
        let declarations = to_vendor_tools(&request.tools);
        let has_tools = !declarations.is_empty();

        GeminiRequest {
            contents: self.convert_messages(&request.messages),
            system_instruction: request
                .system
                .as_ref()
                .filter(|s| !s.trim().is_empty())
                .map(|s| GeminiContent {
                    role: None,
                    parts: vec![GeminiPart::text(s.clone())],
                }),
            tools: has_tools.then(|| {
                vec![GeminiTools {
                    function_declarations: declarations,
                }]
            }),
            tool_config: has_tools.then(|| GeminiToolConfig {
                function_calling_config: GeminiFunctionCallingConfig {
                    mode: match request.tool_choice {
                        ToolChoice::Auto => "AUTO",
                        ToolChoice::None => "NONE",
                    }
                    .to_string(),
                },
            }),
            generation_config: GeminiGenerationConfig {
                max_output_tokens: request.max_tokens,
                temperature: request.temperature,
            },
        }
    }

    fn parse_error(&self, status: u16, body: &str, retry_after: Option<u64>) -> EchoError {
        let Ok(error_response) = serde_json::from_str::<GeminiError>(body) else {
            return common::status_error(status, body, retry_after);
        };
        let detail = error_response.error;

        match detail.status.as_deref().unwrap_or("") {
            "UNAUTHENTICATED" | "PERMISSION_DENIED" => {
                EchoError::Api(ApiError::AuthenticationFailed)
            }
            "RESOURCE_EXHAUSTED" => {
                EchoError::Api(ApiError::RateLimited(retry_after.unwrap_or(30) as u32))
            }
            "NOT_FOUND" => EchoError::Api(ApiError::ModelNotFound(detail.message)),
            // An invalid key is reported as a plain 400
            "INVALID_ARGUMENT" if detail.message.contains("API key") => {
                EchoError::Api(ApiError::AuthenticationFailed)
            }
            _ => common::server_error(status, detail.message),
        }
    }

    async fn send(&self, model: &str, stream: bool, body: &GeminiRequest) -> Result<reqwest::Response> {
        let response = self
            .client
            .post(self.endpoint(model, stream))
            .header("x-goog-api-key", &self.api_key)
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
}

/// Translate tool declarations into Gemini `functionDeclarations`.
pub fn to_vendor_tools(tools: &[ToolDeclaration]) -> Vec<GeminiFunctionDeclaration> {
    tools
        .iter()
        .map(|t| GeminiFunctionDeclaration {
            name: t.name.clone(),
            description: t.description.clone(),
            parameters: upper_case_types(t.parameters.to_value()),
        })
        .collect()
}

/// Normalize a `functionCall` part. Gemini sends no call id, so one is
/// derived from the part's position in the reply.
pub fn from_vendor_tool_call(call: &GeminiFunctionCall, position: usize) -> ToolCall {
    ToolCall {
        id: format!("call_{}", position),
        name: call.name.clone(),
        input: match &call.args {
            Value::Null => Value::Object(serde_json::Map::new()),
            other => other.clone(),
        },
    }
}

/// Recursively upper-case every `"type"` value in a JSON schema.
fn upper_case_types(mut schema: Value) -> Value {
    match &mut schema {
        Value::Object(map) => {
            for (key, value) in map.iter_mut() {
                if key == "type" {
                    if let Value::String(s) = value {
                        *s = s.to_ascii_uppercase();
                        continue;
                    }
                }
                *value = upper_case_types(std::mem::take(value));
            }
        }
        Value::Array(items) => {
            for item in items.iter_mut() {
                *item = upper_case_types(std::mem::take(item));
            }
        }
        _ => {}
    }
    schema
}

/// Split a candidate's parts into normalized content blocks
fn blocks_from_parts(parts: &[GeminiResponsePart], first_position: usize) -> Vec<ContentBlockResponse> {
    let mut blocks = Vec::new();
    let mut position = first_position;

    for part in parts {
        if let Some(call) = &part.function_call {
            let call = from_vendor_tool_call(call, position);
            position += 1;
            blocks.push(ContentBlockResponse::ToolUse {
                id: call.id,
                name: call.name,
                input: call.input,
            });
        } else if let Some(text) = part.text.as_ref().filter(|t| !t.is_empty()) {
            blocks.push(ContentBlockResponse::Text { text: text.clone() });
        }
    }

    blocks
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn name(&self) -> &str {
        "google"
    }

    fn display_name(&self) -> &str {
        "Google Gemini"
    }

    fn available_models(&self) -> Vec<ModelInfo> {
        vec![
            ModelInfo {
                id: "gemini-2.0-flash-lite".to_string(),
                display_name: "Gemini 2.0 Flash-Lite".to_string(),
                context_window: 1_048_576,
                supports_tools: true,
            },
            ModelInfo {
                id: "gemini-1.5-flash".to_string(),
                display_name: "Gemini 1.5 Flash".to_string(),
                context_window: 1_048_576,
                supports_tools: true,
            },
            ModelInfo {
                id: "gemini-1.5-pro".to_string(),
                display_name: "Gemini 1.5 Pro".to_string(),
                context_window: 2_097_152,
                supports_tools: true,
            },
        ]
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let body = self.build_request(&request);
        let response = self.send(&request.model, false, &body).await?;

        let api_response: GeminiResponse = response
            .json()
            .await
            .map_err(|e| EchoError::Api(ApiError::InvalidResponse(e.to_string())))?;

        let candidate = api_response.candidates.into_iter().next().ok_or_else(|| {
            EchoError::Api(ApiError::InvalidResponse(
                "No candidates in response".to_string(),
            ))
        })?;

        let content = candidate
            .content
            .map(|c| blocks_from_parts(&c.parts, 0))
            .unwrap_or_default();
        let has_tool = content
            .iter()
            .any(|b| matches!(b, ContentBlockResponse::ToolUse { .. }));
        let usage = api_response.usage_metadata.unwrap_or_default();

        Ok(CompletionResponse {
            id: api_response.response_id.unwrap_or_default(),
            model: api_response.model_version.unwrap_or(request.model),
            content,
            stop_reason: if has_tool {
                Some(stop_reason_from("tool_use"))
            } else {
                candidate.finish_reason.as_deref().map(stop_reason_from)
            },
            usage: Usage {
                input_tokens: usage.prompt_token_count,
                output_tokens: usage.candidates_token_count,
            },
        })
    }

    async fn complete_stream(&self, request: CompletionRequest) -> Result<EventStream> {
        let body = self.build_request(&request);
        let response = self.send(&request.model, true, &body).await?;
        let model = request.model.clone();

        let event_stream = response
            .bytes_stream()
            .map(|result| result.map_err(|e| EchoError::Api(ApiError::StreamError(e.to_string()))))
            .scan(
                (SseDecoder::default(), ChunkTranslator::new(model)),
                |(decoder, translator), result| {
                    let bytes = match result {
                        Ok(bytes) => bytes,
                        Err(e) => return futures::future::ready(Some(vec![Err(e)])),
                    };

                    let mut events = Vec::new();
                    for data in decoder.data(&bytes) {
                        match serde_json::from_str::<GeminiResponse>(&data) {
                            Ok(chunk) => events.extend(translator.push(chunk).into_iter().map(Ok)),
                            Err(e) => tracing::debug!("Skipping unparseable Gemini chunk: {}", e),
                        }
                    }

                    futures::future::ready(Some(events))
                },
            )
            .flat_map(futures::stream::iter);

        Ok(Box::pin(event_stream))
    }
}

/// Translates streamed `GenerateContentResponse` chunks into normalized
/// events. Function calls arrive whole, so each is emitted as a complete
/// tool-use block.
struct ChunkTranslator {
    model: String,
    started: bool,
    text_open: bool,
    next_index: usize,
    calls_seen: usize,
}

impl ChunkTranslator {
    fn new(model: String) -> Self {
        Self {
            model,
            started: false,
            text_open: false,
            next_index: 0,
            calls_seen: 0,
        }
    }

    fn push(&mut self, chunk: GeminiResponse) -> Vec<StreamEvent> {
        let mut events = Vec::new();

        if !self.started {
            self.started = true;
            self.next_index = 1;
            events.push(StreamEvent::MessageStart {
                id: chunk.response_id.clone().unwrap_or_default(),
                model: chunk.model_version.clone().unwrap_or_else(|| self.model.clone()),
            });
        }

        let Some(candidate) = chunk.candidates.into_iter().next() else {
            return events;
        };

        let blocks = candidate
            .content
            .map(|c| blocks_from_parts(&c.parts, self.calls_seen))
            .unwrap_or_default();

        for block in blocks {
            match block {
                ContentBlockResponse::Text { text } => {
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
                tool @ ContentBlockResponse::ToolUse { .. } => {
                    self.calls_seen += 1;
                    let index = self.next_index;
                    self.next_index += 1;
                    events.push(StreamEvent::ContentBlockStart {
                        index,
                        content_block: tool,
                    });
                    events.push(StreamEvent::ContentBlockStop { index });
                }
            }
        }

        if let Some(finish_reason) = candidate.finish_reason {
            if self.text_open {
                self.text_open = false;
                events.push(StreamEvent::ContentBlockStop { index: 0 });
            }
            let stop_reason = if self.calls_seen > 0 {
                stop_reason_from("tool_use")
            } else {
                stop_reason_from(&finish_reason)
            };
            events.push(StreamEvent::MessageDelta {
                stop_reason: Some(stop_reason),
                usage: chunk.usage_metadata.map(|u| Usage {
                    input_tokens: u.prompt_token_count,
                    output_tokens: u.candidates_token_count,
                }),
            });
            events.push(StreamEvent::MessageStop);
        }

        events
    }
}

// Gemini API types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<GeminiTools>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_config: Option<GeminiToolConfig>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
struct GeminiPart {
    text: String,
}

impl GeminiPart {
    fn text(text: String) -> Self {
        Self { text }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiTools {
    function_declarations: Vec<GeminiFunctionDeclaration>,
}

/// A Gemini function declaration
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeminiFunctionDeclaration {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiToolConfig {
    function_calling_config: GeminiFunctionCallingConfig,
}

#[derive(Debug, Serialize)]
struct GeminiFunctionCallingConfig {
    mode: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    max_output_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    usage_metadata: Option<GeminiUsage>,
    model_version: Option<String>,
    response_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiResponseContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponsePart {
    text: Option<String>,
    function_call: Option<GeminiFunctionCall>,
}

/// A `functionCall` part in a Gemini reply
#[derive(Debug, Clone, Deserialize)]
pub struct GeminiFunctionCall {
    pub name: String,
    #[serde(default)]
    pub args: Value,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsage {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    error: GeminiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorDetail {
    message: String,
    status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::providers::common::chunked_server;
    use crate::llm::provider::{ParameterSchema, StopReason};
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn system_tool() -> ToolDeclaration {
        ToolDeclaration {
            name: "execute_system_command".to_string(),
            description: "Execute a system action".to_string(),
            parameters: ParameterSchema::object(
                json!({
                    "command": {"type": "string"},
                    "args": {"type": "array", "items": {"type": "string"}}
                }),
                vec!["command".to_string()],
            ),
        }
    }

    #[test]
    fn test_provider_name() {
        let provider = GeminiProvider::new("g-key");
        assert_eq!(provider.name(), "google");
        assert_eq!(provider.display_name(), "Google Gemini");
        assert!(provider.supports_model("gemini-2.0-flash-lite"));
    }

    #[test]
    fn test_endpoint() {
        let provider = GeminiProvider::with_base_url("g", "http://localhost/v1beta/");
        assert_eq!(
            provider.endpoint("gemini-1.5-pro", false),
            "http://localhost/v1beta/models/gemini-1.5-pro:generateContent"
        );
        assert!(provider
            .endpoint("gemini-1.5-pro", true)
            .ends_with(":streamGenerateContent?alt=sse"));
    }

    #[test]
    fn test_to_vendor_tools_upper_cases_types() {
        let declarations = to_vendor_tools(&[system_tool()]);
        let params = &declarations[0].parameters;
        assert_eq!(params["type"], "OBJECT");
        assert_eq!(params["properties"]["command"]["type"], "STRING");
        assert_eq!(params["properties"]["args"]["type"], "ARRAY");
        assert_eq!(params["properties"]["args"]["items"]["type"], "STRING");
    }

    #[test]
    fn test_upper_case_keeps_property_named_type() {
        let schema = json!({"type": "object", "properties": {"type": {"type": "string"}}});
        let out = upper_case_types(schema);
        assert_eq!(out["properties"]["type"]["type"], "STRING");
    }

    #[test]
    fn test_from_vendor_tool_call_null_args() {
        let call = GeminiFunctionCall {
            name: "joke".to_string(),
            args: Value::Null,
        };
        let normalized = from_vendor_tool_call(&call, 2);
        assert_eq!(normalized.id, "call_2");
        assert_eq!(normalized.input, json!({}));
    }

    #[test]
    fn test_build_request_uses_model_role() {
        let provider = GeminiProvider::new("g");
        let request = CompletionRequest::new(
            "gemini-2.0-flash-lite",
            vec![Message::user("hello"), Message::assistant("hi")],
        )
        .with_system("persona")
        .with_tools(vec![system_tool()]);
        let body = serde_json::to_value(provider.build_request(&request)).unwrap();

        assert_eq!(body["contents"][1]["role"], "model");
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "persona");
        assert!(body["systemInstruction"].get("role").is_none());
        assert_eq!(
            body["tools"][0]["functionDeclarations"][0]["name"],
            "execute_system_command"
        );
        assert_eq!(body["toolConfig"]["functionCallingConfig"]["mode"], "AUTO");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 1024);
    }

    #[test]
    fn test_parse_error_invalid_key() {
        let provider = GeminiProvider::new("g");
        let body = r#"{"error":{"code":400,"message":"API key not valid. Please pass a valid API key.","status":"INVALID_ARGUMENT"}}"#;
        assert!(matches!(
            provider.parse_error(400, body, None),
            EchoError::Api(ApiError::AuthenticationFailed)
        ));

        let quota = r#"{"error":{"code":429,"message":"quota","status":"RESOURCE_EXHAUSTED"}}"#;
        assert!(matches!(
            provider.parse_error(429, quota, None),
            EchoError::Api(ApiError::RateLimited(30))
        ));
    }

    #[tokio::test]
    async fn test_complete_text_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/gemini-2.0-flash-lite:generateContent"))
            .and(header("x-goog-api-key", "g-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{"content": {"role": "model", "parts": [{"text": "Hello, Sam."}]},
                                "finishReason": "STOP"}],
                "usageMetadata": {"promptTokenCount": 5, "candidatesTokenCount": 3},
                "modelVersion": "gemini-2.0-flash-lite"
            })))
            .mount(&server)
            .await;

        let provider = GeminiProvider::with_base_url("g-key", server.uri());
        let response = provider
            .complete(CompletionRequest::new(
                "gemini-2.0-flash-lite",
                vec![Message::user("Hi")],
            ))
            .await
            .unwrap();
        assert_eq!(response.text(), "Hello, Sam.");
        assert_eq!(response.stop_reason, Some(StopReason::EndTurn));
        assert_eq!(response.usage.total_tokens(), 8);
    }

    #[tokio::test]
    async fn test_complete_function_call() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({"contents": [{"role": "user"}]})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{"content": {"role": "model", "parts": [
                    {"functionCall": {"name": "execute_system_command",
                                      "args": {"command": "open_app", "args": ["notepad"]}}}
                ]}, "finishReason": "STOP"}]
            })))
            .mount(&server)
            .await;

        let provider = GeminiProvider::with_base_url("g-key", server.uri());
        let response = provider
            .complete(CompletionRequest::new(
                "gemini-2.0-flash-lite",
                vec![Message::user("open notepad")],
            ))
            .await
            .unwrap();
        let call = response.first_tool_call().unwrap();
        assert_eq!(call.input["command"], "open_app");
        assert_eq!(response.stop_reason, Some(StopReason::ToolUse));
    }

    #[tokio::test]
    async fn test_complete_stream() {
        let sse = concat!(
            "data: {\"candidates\":[{\"content\":{\"role\":\"model\",\"parts\":[{\"text\":\"One \"}]}}]}\r\n\r\n",
            "data: {\"candidates\":[{\"content\":{\"role\":\"model\",\"parts\":[{\"text\":\"moment.\"}]},\"finishReason\":\"STOP\"}]}\r\n\r\n",
        );
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/gemini-1.5-flash:streamGenerateContent"))
            .and(query_param("alt", "sse"))
            .respond_with(ResponseTemplate::new(200).set_body_string(sse))
            .mount(&server)
            .await;

        let provider = GeminiProvider::with_base_url("g-key", server.uri());
        let stream = provider
            .complete_stream(CompletionRequest::new(
                "gemini-1.5-flash",
                vec![Message::user("Hi")],
            ))
            .await
            .unwrap();
        let events: Vec<StreamEvent> = stream.map(|e| e.unwrap()).collect().await;

        let text: String = events
            .iter()
            .filter_map(|e| match e {
                StreamEvent::ContentBlockDelta {
                    delta: ContentBlockDelta::TextDelta { text },
                    ..
                } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(text, "One moment.");
        assert!(matches!(events.last(), Some(StreamEvent::MessageStop)));
    }

    fn streamed_text(events: &[StreamEvent]) -> String {
        events
            .iter()
            .filter_map(|e| match e {
                StreamEvent::ContentBlockDelta {
                    delta: ContentBlockDelta::TextDelta { text },
                    ..
                } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_complete_stream_character_split_across_chunks() {
        let sse = concat!(
            "data: {\"candidates\":[{\"content\":{\"role\":\"model\",\"parts\":[{\"text\":\"caf\u{e9}\"}]}}]}\r\n\r\n",
            "data: {\"candidates\":[{\"content\":{\"role\":\"model\",\"parts\":[{\"text\":\" au lait\"}]},\"finishReason\":\"STOP\"}]}\r\n\r\n",
        );
        let url = chunked_server::serve(chunked_server::split_inside(sse, '\u{e9}')).await;

        let provider = GeminiProvider::with_base_url("g-key", url);
        let stream = provider
            .complete_stream(CompletionRequest::new(
                "gemini-1.5-flash",
                vec![Message::user("Hi")],
            ))
            .await
            .unwrap();
        let events: Vec<StreamEvent> = stream.map(|e| e.unwrap()).collect().await;

        assert_eq!(streamed_text(&events), "caf\u{e9} au lait");
        assert!(matches!(events.last(), Some(StreamEvent::MessageStop)));
    }
}
