// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Streaming response handling
//!
//! Folds a provider event stream back into the content blocks a
//! non-streaming call would have returned, while reporting text as it
//! arrives.

use std::collections::BTreeMap;

use crate::llm::provider::{
    CompletionResponse, ContentBlockDelta, ContentBlockResponse, StopReason, StreamEvent, Usage,
};

/// Accumulator for streaming response content
#[derive(Debug, Default)]
pub struct StreamAccumulator {
    id: String,
    model: String,
    /// Blocks keyed by their stream index
    blocks: BTreeMap<usize, ContentBlockResponse>,
    /// Partial tool input JSON keyed by block index
    tool_input: BTreeMap<usize, String>,
    stop_reason: Option<StopReason>,
    usage: Usage,
    tool_started: bool,
}

/// What a single event contributed
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEventResult {
    /// Text to show to the user
    TextDelta(String),
    /// A tool invocation block opened; no further text should be shown
    ToolStarted { name: String },
    /// The vendor reported an error mid-stream
    Error { error_type: String, message: String },
    /// Bookkeeping only
    Nothing,
}

impl StreamAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a tool-use block has been seen
    pub fn tool_started(&self) -> bool {
        self.tool_started
    }

    /// Text accumulated so far across all text blocks
    pub fn text(&self) -> String {
        self.blocks
            .values()
            .filter_map(|b| match b {
                ContentBlockResponse::Text { text } => Some(text.as_str()),
                ContentBlockResponse::ToolUse { .. } => None,
            })
            .collect()
    }

    /// Process a stream event
    pub fn process_event(&mut self, event: StreamEvent) -> StreamEventResult {
        match event {
            StreamEvent::MessageStart { id, model } => {
                self.id = id;
                self.model = model;
                StreamEventResult::Nothing
            }
            StreamEvent::ContentBlockStart {
                index,
                content_block,
            } => {
                let result = match &content_block {
                    ContentBlockResponse::ToolUse { name, .. } => {
                        self.tool_started = true;
                        self.tool_input.insert(index, String::new());
                        StreamEventResult::ToolStarted { name: name.clone() }
                    }
                    ContentBlockResponse::Text { .. } => StreamEventResult::Nothing,
                };
                self.blocks.insert(index, content_block);
                result
            }
            StreamEvent::ContentBlockDelta { index, delta } => match delta {
                ContentBlockDelta::TextDelta { text } => {
                    match self.blocks.entry(index).or_insert_with(|| {
                        ContentBlockResponse::Text {
                            text: String::new(),
                        }
                    }) {
                        ContentBlockResponse::Text { text: block_text } => {
                            block_text.push_str(&text);
                        }
                        ContentBlockResponse::ToolUse { .. } => {
                            tracing::debug!("Text delta for tool block {}", index);
                        }
                    }
                    StreamEventResult::TextDelta(text)
                }
                ContentBlockDelta::InputJsonDelta { partial_json } => {
                    self.tool_input
                        .entry(index)
                        .or_default()
                        .push_str(&partial_json);
                    StreamEventResult::Nothing
                }
            },
            StreamEvent::ContentBlockStop { index } => {
                self.finalize_tool_input(index);
                StreamEventResult::Nothing
            }
            StreamEvent::MessageDelta { stop_reason, usage } => {
                if stop_reason.is_some() {
                    self.stop_reason = stop_reason;
                }
                if let Some(usage) = usage {
                    self.usage.output_tokens = usage.output_tokens;
                    if usage.input_tokens > 0 {
                        self.usage.input_tokens = usage.input_tokens;
                    }
                }
                StreamEventResult::Nothing
            }
            StreamEvent::Error {
                error_type,
                message,
            } => StreamEventResult::Error {
                error_type,
                message,
            },
            StreamEvent::MessageStop | StreamEvent::Ping => StreamEventResult::Nothing,
        }
    }

    /// Parse buffered tool input JSON into the block; a blank buffer keeps
    /// whatever input arrived with the block start.
    fn finalize_tool_input(&mut self, index: usize) {
        let Some(raw) = self.tool_input.remove(&index) else {
            return;
        };
        if raw.trim().is_empty() {
            return;
        }
        if let Some(ContentBlockResponse::ToolUse { input, name, .. }) = self.blocks.get_mut(&index)
        {
            match serde_json::from_str(&raw) {
                Ok(parsed) => *input = parsed,
                Err(e) => {
                    tracing::warn!("Malformed streamed input for tool '{}': {}", name, e);
                    *input = serde_json::json!({});
                }
            }
        }
    }

    /// Consume the accumulator and return the equivalent complete response
    pub fn finish(mut self) -> CompletionResponse {
        let pending: Vec<usize> = self.tool_input.keys().copied().collect();
        for index in pending {
            self.finalize_tool_input(index);
        }

        CompletionResponse {
            id: self.id,
            model: self.model,
            content: self.blocks.into_values().collect(),
            stop_reason: self.stop_reason,
            usage: self.usage,
        }
    }
}

impl StreamEventResult {
    /// Displayable text, if any
    pub fn text(&self) -> Option<&str> {
        match self {
            StreamEventResult::TextDelta(text) => Some(text),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn text_delta(index: usize, text: &str) -> StreamEvent {
        StreamEvent::ContentBlockDelta {
            index,
            delta: ContentBlockDelta::TextDelta {
                text: text.to_string(),
            },
        }
    }

    fn tool_start(index: usize, name: &str, input: serde_json::Value) -> StreamEvent {
        StreamEvent::ContentBlockStart {
            index,
            content_block: ContentBlockResponse::ToolUse {
                id: format!("call_{}", index),
                name: name.to_string(),
                input,
            },
        }
    }

    #[test]
    fn test_text_only_stream() {
        let mut acc = StreamAccumulator::new();
        acc.process_event(StreamEvent::MessageStart {
            id: "m1".to_string(),
            model: "mock".to_string(),
        });
        acc.process_event(StreamEvent::ContentBlockStart {
            index: 0,
            content_block: ContentBlockResponse::Text {
                text: String::new(),
            },
        });
        assert_eq!(
            acc.process_event(text_delta(0, "Hello, ")).text(),
            Some("Hello, ")
        );
        acc.process_event(text_delta(0, "Sam"));
        acc.process_event(StreamEvent::ContentBlockStop { index: 0 });
        acc.process_event(StreamEvent::MessageDelta {
            stop_reason: Some(StopReason::EndTurn),
            usage: None,
        });

        assert_eq!(acc.text(), "Hello, Sam");
        let response = acc.finish();
        assert_eq!(response.id, "m1");
        assert_eq!(response.text(), "Hello, Sam");
        assert!(response.first_tool_call().is_none());
    }

    #[test]
    fn test_tool_input_from_json_deltas() {
        let mut acc = StreamAccumulator::new();
        let started = acc.process_event(tool_start(1, "greet", json!({})));
        assert_eq!(
            started,
            StreamEventResult::ToolStarted {
                name: "greet".to_string()
            }
        );
        assert!(acc.tool_started());

        acc.process_event(StreamEvent::ContentBlockDelta {
            index: 1,
            delta: ContentBlockDelta::InputJsonDelta {
                partial_json: "{\"name\":".to_string(),
            },
        });
        acc.process_event(StreamEvent::ContentBlockDelta {
            index: 1,
            delta: ContentBlockDelta::InputJsonDelta {
                partial_json: "\"Ada\"}".to_string(),
            },
        });
        acc.process_event(StreamEvent::ContentBlockStop { index: 1 });

        let call = acc.finish().first_tool_call().unwrap();
        assert_eq!(call.input, json!({"name": "Ada"}));
    }

    #[test]
    fn test_tool_input_delivered_whole() {
        let mut acc = StreamAccumulator::new();
        acc.process_event(tool_start(1, "joke", json!({"topic": "cats"})));
        acc.process_event(StreamEvent::ContentBlockStop { index: 1 });
        let call = acc.finish().first_tool_call().unwrap();
        assert_eq!(call.input["topic"], "cats");
    }

    #[test]
    fn test_unterminated_tool_block_is_finalized() {
        let mut acc = StreamAccumulator::new();
        acc.process_event(tool_start(2, "greet", json!({})));
        acc.process_event(StreamEvent::ContentBlockDelta {
            index: 2,
            delta: ContentBlockDelta::InputJsonDelta {
                partial_json: "{\"name\":\"Bo\"}".to_string(),
            },
        });
        let call = acc.finish().first_tool_call().unwrap();
        assert_eq!(call.input["name"], "Bo");
    }

    #[test]
    fn test_malformed_tool_input_becomes_empty_object() {
        let mut acc = StreamAccumulator::new();
        acc.process_event(tool_start(1, "greet", json!({})));
        acc.process_event(StreamEvent::ContentBlockDelta {
            index: 1,
            delta: ContentBlockDelta::InputJsonDelta {
                partial_json: "{broken".to_string(),
            },
        });
        acc.process_event(StreamEvent::ContentBlockStop { index: 1 });
        assert_eq!(acc.finish().first_tool_call().unwrap().input, json!({}));
    }

    #[test]
    fn test_error_event_is_surfaced() {
        let mut acc = StreamAccumulator::new();
        let result = acc.process_event(StreamEvent::Error {
            error_type: "overloaded_error".to_string(),
            message: "busy".to_string(),
        });
        assert!(matches!(result, StreamEventResult::Error { .. }));
    }
}
