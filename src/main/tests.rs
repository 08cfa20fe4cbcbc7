// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

use super::*;
use chrono::TimeZone;
use echo_agent::brain::ToolArgs;
use echo_agent::llm::message::{Message, Role};
use serde_json::json;

use chat_ui::format_history_line;
use cli_commands::{masked_settings, parse_plugin_args};

// ==================== Logging ====================

#[test]
fn test_verbosity_levels() {
    assert_eq!(verbosity_level(0), None);
    assert_eq!(verbosity_level(1), Some("info"));
    assert_eq!(verbosity_level(2), Some("debug"));
    assert_eq!(verbosity_level(3), Some("trace"));
    assert_eq!(verbosity_level(9), Some("trace"));
}

// ==================== Plugin arguments ====================

#[test]
fn test_parse_plugin_args_json_object() {
    let args = parse_plugin_args(&[r#"{"city": "Paris"}"#.to_string()]);
    assert_eq!(args, ToolArgs::from(json!({"city": "Paris"})));
}

#[test]
fn test_parse_plugin_args_json_array() {
    let args = parse_plugin_args(&[r#"["a", 2]"#.to_string()]);
    assert_eq!(args, ToolArgs::from(json!(["a", 2])));
}

#[test]
fn test_parse_plugin_args_words() {
    let args = parse_plugin_args(&["2".to_string(), "+".to_string(), "2".to_string()]);
    assert_eq!(args.joined().as_deref(), Some("2 + 2"));

    // A lone scalar stays a string
    let single = parse_plugin_args(&["42".to_string()]);
    assert_eq!(single, ToolArgs::strings(["42"]));

    assert!(parse_plugin_args(&[]).is_empty());
}

// ==================== Settings display ====================

#[test]
fn test_masked_settings_hides_keys() {
    let mut settings = Settings::default();
    settings
        .api_keys
        .insert("openai".to_string(), "sk-secret".to_string());
    settings.api_keys.insert("google".to_string(), String::new());

    let value = masked_settings(&settings).unwrap();
    assert_eq!(value["apiKeys"]["openai"], "********");
    assert_eq!(value["apiKeys"]["google"], "");
    assert!(!value.to_string().contains("sk-secret"));
}

// ==================== History display ====================

#[test]
fn test_format_history_line() {
    let mut message = Message::new(Role::Assistant, "Hello, sir.");
    message.timestamp = chrono::Utc.with_ymd_and_hms(2025, 3, 4, 9, 30, 0).unwrap();
    assert_eq!(
        format_history_line(&message),
        "[2025-03-04 09:30] echo: Hello, sir."
    );
}
