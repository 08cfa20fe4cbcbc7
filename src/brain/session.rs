// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! One request/response exchange with a vendor
//!
//! The session owns everything vendor-independent about a brain call:
//! loading history, building the persona prompt, persisting both sides of
//! the exchange, bounding the call with a timeout and reducing the reply to
//! a [`CanonicalOutcome`]. Vendor failures never escape; they become a
//! spoken apology.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;

use crate::config::Settings;
use crate::error::{ApiError, EchoError, Result};
use crate::llm::message::{Message, Role};
use crate::llm::provider::{CompletionRequest, CompletionResponse, LlmProvider, ToolDeclaration};
use crate::llm::stream::{StreamAccumulator, StreamEventResult};
use crate::memory::MemoryStore;

use super::outcome::CanonicalOutcome;
use super::prompt::persona_prompt;

/// Reply used when the vendor answered with nothing
pub const EMPTY_REPLY: &str = "I didn't get a response.";

/// Stored in memory when the reply was a bare tool call
pub const TOOL_CALL_RATIONALE: &str = "Processing request, sir.";

/// Receives text fragments while a streamed reply arrives
pub type ProgressFn<'a> = &'a mut (dyn FnMut(&str) + Send);

/// Spoken apology for a failed vendor call
pub fn apology(display_name: &str) -> String {
    format!(
        "I apologize, sir. Connection to {} services failed.",
        display_name
    )
}

/// Knobs for a provider session
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub memory_enabled: bool,
    pub history_limit: usize,
    pub stream: bool,
    pub request_timeout: Duration,
    pub max_tokens: u32,
    pub temperature: f32,
    pub user_name: String,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            memory_enabled: true,
            history_limit: 10,
            stream: false,
            request_timeout: Duration::from_secs(30),
            max_tokens: 1024,
            temperature: 0.7,
            user_name: "Friend".to_string(),
        }
    }
}

impl SessionOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            memory_enabled: settings.memory_enabled,
            history_limit: settings.memory.history_limit,
            stream: settings.brain.stream,
            request_timeout: Duration::from_secs(settings.brain.request_timeout_secs.max(1)),
            max_tokens: settings.brain.max_tokens,
            temperature: settings.brain.temperature,
            user_name: settings.display_user_name().to_string(),
        }
    }
}

/// Vendor-agnostic driver around one [`LlmProvider`]
pub struct ProviderSession {
    provider: Arc<dyn LlmProvider>,
    model: String,
    memory: Arc<dyn MemoryStore>,
    options: SessionOptions,
}

impl ProviderSession {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        model: impl Into<String>,
        memory: Arc<dyn MemoryStore>,
        options: SessionOptions,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            memory,
            options,
        }
    }

    pub fn provider(&self) -> &Arc<dyn LlmProvider> {
        &self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// Send `user_input` with `tools` and reduce the reply to an outcome
    pub async fn process_command(
        &self,
        user_input: &str,
        tools: &[ToolDeclaration],
        on_progress: Option<ProgressFn<'_>>,
    ) -> CanonicalOutcome {
        let mut messages = self.load_history().await;
        messages.push(Message::user(user_input));

        let request = CompletionRequest::new(self.model.clone(), messages)
            .with_system(persona_prompt(&self.options.user_name))
            .with_max_tokens(self.options.max_tokens)
            .with_temperature(self.options.temperature)
            .with_tools(tools.to_vec());

        self.remember(Role::User, user_input).await;

        let started = std::time::Instant::now();
        let result = match on_progress {
            Some(on_progress) if self.options.stream => {
                tokio::time::timeout(
                    self.options.request_timeout,
                    self.stream_reply(request, on_progress),
                )
                .await
            }
            _ => tokio::time::timeout(self.options.request_timeout, self.provider.complete(request))
                .await,
        };

        let response = match result.map_err(EchoError::from).and_then(|r| r) {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(
                    provider = self.provider.name(),
                    model = %self.model,
                    "Brain request failed: {}",
                    e
                );
                return CanonicalOutcome::speech(apology(self.provider.display_name()));
            }
        };

        tracing::debug!(
            provider = self.provider.name(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            "Brain request completed"
        );

        let text = response.text().trim().to_string();
        match response.first_tool_call() {
            Some(call) => {
                let rationale = if text.is_empty() {
                    TOOL_CALL_RATIONALE
                } else {
                    text.as_str()
                };
                self.remember(Role::Assistant, rationale).await;
                CanonicalOutcome::from_tool_call(&call, text.clone())
            }
            None => {
                let text = if text.is_empty() {
                    EMPTY_REPLY.to_string()
                } else {
                    text
                };
                self.remember(Role::Assistant, &text).await;
                CanonicalOutcome::speech(text)
            }
        }
    }

    async fn load_history(&self) -> Vec<Message> {
        if !self.options.memory_enabled {
            return Vec::new();
        }
        match self
            .memory
            .get_history(Some(self.options.history_limit))
            .await
        {
            Ok(history) => history.into_iter().filter(Message::has_content).collect(),
            Err(e) => {
                tracing::warn!("Could not load conversation history: {}", e);
                Vec::new()
            }
        }
    }

    async fn remember(&self, role: Role, text: &str) {
        if !self.options.memory_enabled {
            return;
        }
        if let Err(e) = self.memory.save_message(role, text).await {
            tracing::warn!("Could not save {} message: {}", role, e);
        }
    }

    /// Stream the reply, forwarding text until a tool call starts
    async fn stream_reply(
        &self,
        request: CompletionRequest,
        on_progress: ProgressFn<'_>,
    ) -> Result<CompletionResponse> {
        let mut stream = self.provider.complete_stream(request).await?;
        let mut accumulator = StreamAccumulator::new();

        while let Some(event) = stream.next().await {
            let forward = !accumulator.tool_started();
            match accumulator.process_event(event?) {
                StreamEventResult::TextDelta(text) if forward => on_progress(&text),
                StreamEventResult::ToolStarted { name } => {
                    tracing::debug!("Tool call '{}' started, muting stream", name);
                }
                StreamEventResult::Error {
                    error_type,
                    message,
                } => {
                    return Err(EchoError::Api(ApiError::StreamError(format!(
                        "{}: {}",
                        error_type, message
                    ))));
                }
                _ => {}
            }
        }

        Ok(accumulator.finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brain::outcome::{ToolArgs, SYSTEM_TOOL_NAME};
    use crate::llm::mock_provider::{MockProvider, MockResponse};
    use crate::llm::provider::{
        ContentBlockDelta, ContentBlockResponse, EventStream, ModelInfo, StreamEvent,
    };
    use crate::memory::InMemoryStore;
    use async_trait::async_trait;
    use serde_json::json;

    fn session(provider: MockProvider, options: SessionOptions) -> (ProviderSession, Arc<InMemoryStore>) {
        let memory = Arc::new(InMemoryStore::default());
        let session = ProviderSession::new(
            Arc::new(provider),
            "mock-model",
            memory.clone() as Arc<dyn MemoryStore>,
            options,
        );
        (session, memory)
    }

    async fn contents(memory: &InMemoryStore) -> Vec<(Role, String)> {
        memory
            .get_history(None)
            .await
            .unwrap()
            .into_iter()
            .map(|m| (m.role, m.content))
            .collect()
    }

    #[tokio::test]
    async fn test_speech_persists_both_sides() {
        let (session, memory) = session(
            MockProvider::new().with_response("Good evening, sir."),
            SessionOptions::default(),
        );
        let outcome = session.process_command("hello", &[], None).await;
        assert_eq!(outcome, CanonicalOutcome::speech("Good evening, sir."));
        assert_eq!(
            contents(&memory).await,
            vec![
                (Role::User, "hello".to_string()),
                (Role::Assistant, "Good evening, sir.".to_string())
            ]
        );
    }

    #[tokio::test]
    async fn test_request_carries_persona_history_and_tools() {
        let provider = Arc::new(MockProvider::new().with_response("ok"));
        let memory = Arc::new(InMemoryStore::default());
        memory.save_message(Role::User, "earlier").await.unwrap();
        memory.save_message(Role::Assistant, "noted").await.unwrap();

        let options = SessionOptions {
            user_name: "Ada".to_string(),
            ..Default::default()
        };
        let session = ProviderSession::new(provider.clone(), "mock-model", memory, options);
        session
            .process_command("now", &[crate::brain::tools::system_tool()], None)
            .await;

        let request = provider.last_request().unwrap();
        assert!(request.system.unwrap().contains("named Ada"));
        let texts: Vec<_> = request.messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(texts, vec!["earlier", "noted", "now"]);
        assert_eq!(request.tools.len(), 1);
        assert_eq!(request.tools[0].name, SYSTEM_TOOL_NAME);
    }

    #[tokio::test]
    async fn test_history_limit_applied() {
        let provider = Arc::new(MockProvider::new().with_response("ok"));
        let memory = Arc::new(InMemoryStore::default());
        for i in 0..8 {
            memory.save_message(Role::User, &format!("m{}", i)).await.unwrap();
        }
        let options = SessionOptions {
            history_limit: 3,
            ..Default::default()
        };
        let session = ProviderSession::new(provider.clone(), "mock-model", memory, options);
        session.process_command("latest", &[], None).await;

        let request = provider.last_request().unwrap();
        let texts: Vec<_> = request.messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(texts, vec!["m5", "m6", "m7", "latest"]);
    }

    #[tokio::test]
    async fn test_memory_disabled_sends_no_history() {
        let provider = Arc::new(MockProvider::new().with_response("ok"));
        let memory = Arc::new(InMemoryStore::default());
        memory.save_message(Role::User, "secret").await.unwrap();

        let options = SessionOptions {
            memory_enabled: false,
            ..Default::default()
        };
        let session =
            ProviderSession::new(provider.clone(), "mock-model", memory.clone(), options);
        session.process_command("hi", &[], None).await;

        assert_eq!(provider.last_request().unwrap().messages.len(), 1);
        assert_eq!(memory.get_history(None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_tool_call_rationale_persisted() {
        let (session, memory) = session(
            MockProvider::new().with_tool_call(
                "",
                SYSTEM_TOOL_NAME,
                json!({"command": "open", "args": ["notepad"]}),
            ),
            SessionOptions::default(),
        );
        let outcome = session.process_command("open notepad", &[], None).await;
        assert_eq!(
            outcome,
            CanonicalOutcome::SystemAction {
                command: "open".to_string(),
                args: ToolArgs::strings(["notepad"]),
                assistant_text: String::new(),
            }
        );
        let stored = contents(&memory).await;
        assert_eq!(stored[1], (Role::Assistant, TOOL_CALL_RATIONALE.to_string()));
    }

    #[tokio::test]
    async fn test_tool_call_with_text_keeps_text() {
        let (session, memory) = session(
            MockProvider::new().with_tool_call(
                "Fetching the forecast.",
                "get_forecast",
                json!({"city": "Paris"}),
            ),
            SessionOptions::default(),
        );
        let outcome = session.process_command("weather in Paris", &[], None).await;
        match outcome {
            CanonicalOutcome::PluginAction {
                command,
                args,
                assistant_text,
            } => {
                assert_eq!(command, "get_forecast");
                assert_eq!(args.first_string(&["city"]), Some("Paris".to_string()));
                assert_eq!(assistant_text, "Fetching the forecast.");
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(contents(&memory).await[1].1, "Fetching the forecast.");
    }

    #[tokio::test]
    async fn test_empty_reply() {
        let (session, _) = session(
            MockProvider::new().with_responses(vec![MockResponse::text("")]),
            SessionOptions::default(),
        );
        assert_eq!(
            session.process_command("?", &[], None).await,
            CanonicalOutcome::speech(EMPTY_REPLY)
        );
    }

    #[tokio::test]
    async fn test_failure_becomes_vendor_apology() {
        let (session, memory) = session(
            MockProvider::with_name("openai", "OpenAI").with_failure("boom"),
            SessionOptions::default(),
        );
        let outcome = session.process_command("hello", &[], None).await;
        assert_eq!(
            outcome,
            CanonicalOutcome::speech("I apologize, sir. Connection to OpenAI services failed.")
        );
        // User turn is stored before the call, nothing after
        assert_eq!(contents(&memory).await, vec![(Role::User, "hello".to_string())]);
    }

    #[tokio::test]
    async fn test_timeout_becomes_apology() {
        let options = SessionOptions {
            request_timeout: Duration::from_millis(50),
            ..Default::default()
        };
        let (session, _) = session(
            MockProvider::with_name("anthropic", "Anthropic")
                .with_response("too late")
                .with_delay(Duration::from_secs(5)),
            options,
        );
        assert_eq!(
            session.process_command("hello", &[], None).await,
            CanonicalOutcome::speech(apology("Anthropic"))
        );
    }

    #[tokio::test]
    async fn test_streaming_forwards_text() {
        let options = SessionOptions {
            stream: true,
            ..Default::default()
        };
        let (session, _) = session(
            MockProvider::new().with_response("A fairly long streamed answer, sir."),
            options,
        );
        let mut seen = String::new();
        let mut on_progress = |t: &str| seen.push_str(t);
        let outcome = session
            .process_command("talk", &[], Some(&mut on_progress))
            .await;
        assert_eq!(
            outcome,
            CanonicalOutcome::speech("A fairly long streamed answer, sir.")
        );
        assert_eq!(seen, "A fairly long streamed answer, sir.");
    }

    #[tokio::test]
    async fn test_progress_ignored_when_streaming_off() {
        let provider = Arc::new(MockProvider::new().with_response("whole"));
        let session = ProviderSession::new(
            provider,
            "mock-model",
            Arc::new(InMemoryStore::default()),
            SessionOptions::default(),
        );
        let mut calls = 0;
        let mut on_progress = |_: &str| calls += 1;
        session
            .process_command("hi", &[], Some(&mut on_progress))
            .await;
        assert_eq!(calls, 0);
    }

    /// Emits text, then a tool call, then more text
    struct InterleavedProvider;

    #[async_trait]
    impl LlmProvider for InterleavedProvider {
        fn name(&self) -> &str {
            "interleaved"
        }

        fn display_name(&self) -> &str {
            "Interleaved"
        }

        fn available_models(&self) -> Vec<ModelInfo> {
            vec![]
        }

        async fn complete(&self, _request: CompletionRequest) -> Result<CompletionResponse> {
            Err(EchoError::Api(ApiError::Network("unused".to_string())))
        }

        async fn complete_stream(&self, _request: CompletionRequest) -> Result<EventStream> {
            let events = vec![
                StreamEvent::ContentBlockDelta {
                    index: 0,
                    delta: ContentBlockDelta::TextDelta {
                        text: "On it. ".to_string(),
                    },
                },
                StreamEvent::ContentBlockStart {
                    index: 1,
                    content_block: ContentBlockResponse::ToolUse {
                        id: "call_0".to_string(),
                        name: "joke".to_string(),
                        input: json!({}),
                    },
                },
                StreamEvent::ContentBlockStop { index: 1 },
                StreamEvent::ContentBlockDelta {
                    index: 2,
                    delta: ContentBlockDelta::TextDelta {
                        text: "hidden".to_string(),
                    },
                },
                StreamEvent::MessageStop,
            ];
            Ok(Box::pin(futures::stream::iter(events.into_iter().map(Ok))))
        }
    }

    #[tokio::test]
    async fn test_streaming_stops_forwarding_after_tool_start() {
        let session = ProviderSession::new(
            Arc::new(InterleavedProvider),
            "any",
            Arc::new(InMemoryStore::default()),
            SessionOptions {
                stream: true,
                ..Default::default()
            },
        );
        let mut seen = Vec::new();
        let mut on_progress = |t: &str| seen.push(t.to_string());
        let outcome = session
            .process_command("joke please", &[], Some(&mut on_progress))
            .await;

        assert_eq!(seen, vec!["On it. ".to_string()]);
        assert!(matches!(
            outcome,
            CanonicalOutcome::PluginAction { ref command, .. } if command == "joke"
        ));
    }
}
