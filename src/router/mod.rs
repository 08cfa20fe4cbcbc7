// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Command router
//!
//! Performs the side effect a [`CanonicalOutcome`] asks for and reduces it to
//! a [`RouteResult`] for the user. Speech passes through; system actions go
//! to a [`SystemActions`] implementation; plugin commands go to the
//! [`PluginRegistry`].

pub mod classify;

use std::sync::Arc;

use serde::Serialize;

use crate::actions::{ActionResult, SystemActions};
use crate::brain::{CanonicalOutcome, ToolArgs};
use crate::plugins::PluginRegistry;

pub use classify::{classify, looks_like_url, ActionKind};

/// Spoken when an action has nothing better to say
pub const ACTION_COMPLETED: &str = "Action completed, sir.";

/// What the user sees after one request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteResult {
    pub success: bool,
    pub text: String,
    /// Command that was dispatched, if any
    pub action: Option<String>,
}

impl RouteResult {
    pub fn speech(text: impl Into<String>) -> Self {
        Self {
            success: true,
            text: text.into(),
            action: None,
        }
    }

    pub fn failure(text: impl Into<String>) -> Self {
        Self {
            success: false,
            text: text.into(),
            action: None,
        }
    }
}

/// Dispatches outcomes to their side effects
#[derive(Clone)]
pub struct Router {
    actions: Arc<dyn SystemActions>,
}

impl Router {
    pub fn new(actions: Arc<dyn SystemActions>) -> Self {
        Self { actions }
    }

    /// Carry out `outcome`. `original_text` is the user's request, used as
    /// a fallback payload.
    pub async fn route(
        &self,
        outcome: &CanonicalOutcome,
        original_text: &str,
        registry: &PluginRegistry,
    ) -> RouteResult {
        match outcome {
            CanonicalOutcome::Speech { text } => RouteResult::speech(text.clone()),
            CanonicalOutcome::SystemAction {
                command,
                args,
                assistant_text,
            } => {
                self.route_system(command, args, assistant_text, original_text)
                    .await
            }
            CanonicalOutcome::PluginAction { command, args, .. } => {
                let outcome = registry.execute_command(command, args).await;
                match outcome.result {
                    Some(reply) if outcome.success => RouteResult {
                        success: true,
                        text: reply.message,
                        action: Some(command.clone()),
                    },
                    _ => {
                        let error = outcome
                            .error
                            .unwrap_or_else(|| "Unknown plugin failure".to_string());
                        tracing::warn!("Plugin command {} failed: {}", command, error);
                        RouteResult {
                            success: false,
                            text: format!("Plugin error: {}", error),
                            action: Some(command.clone()),
                        }
                    }
                }
            }
        }
    }

    async fn route_system(
        &self,
        command: &str,
        args: &ToolArgs,
        assistant_text: &str,
        original_text: &str,
    ) -> RouteResult {
        let url = url_payload(command, args);
        let kind = classify(command, url.as_deref());
        tracing::info!("System command '{}' -> {}", command, kind);

        let result = self
            .dispatch(kind, command, args, url, original_text)
            .await;

        let text = if !result.success {
            let error = result.error.as_deref().unwrap_or("unknown error");
            tracing::warn!("Action {} failed: {}", kind, error);
            format!("I couldn't complete that, sir: {}", error)
        } else if kind.is_informational() {
            result
                .output
                .filter(|o| !o.trim().is_empty())
                .unwrap_or_else(|| fallback_text(assistant_text))
        } else {
            fallback_text(assistant_text)
        };

        RouteResult {
            success: true,
            text,
            action: Some(command.to_string()),
        }
    }

    async fn dispatch(
        &self,
        kind: ActionKind,
        command: &str,
        args: &ToolArgs,
        url: Option<String>,
        original_text: &str,
    ) -> ActionResult {
        let actions = &self.actions;
        match kind {
            ActionKind::CreateFolder => {
                let path = args
                    .text(&["path", "name"])
                    .unwrap_or_else(|| "New Folder".to_string());
                actions.create_folder(&path).await
            }
            ActionKind::WriteFile => {
                let path = args
                    .first_string(&["path", "file"])
                    .or_else(|| args.string_at(0))
                    .unwrap_or_default();
                let content = args
                    .first_string(&["content", "text"])
                    .or_else(|| args.joined_from(1))
                    .unwrap_or_default();
                actions.write_file(&path, &content).await
            }
            ActionKind::ReadFile => {
                let path = args.text(&["path", "file"]).unwrap_or_default();
                actions.read_file(&path).await
            }
            ActionKind::RunTerminalCommand => {
                let line = args.text(&["command", "cmd"]).unwrap_or_default();
                actions.run_terminal_command(&line).await
            }
            ActionKind::TypeText => {
                let text = args.text(&["text"]).unwrap_or_default();
                actions.type_text(&text).await
            }
            ActionKind::PressKey => {
                let key = args.text(&["key"]).unwrap_or_default();
                actions.press_key(&key).await
            }
            ActionKind::WebSearch => {
                let query = args
                    .text(&["query"])
                    .unwrap_or_else(|| original_text.to_string());
                actions.web_search(&query).await
            }
            ActionKind::OpenUrl => actions.open_url(&url.unwrap_or_default()).await,
            ActionKind::TakeScreenshot => actions.take_screenshot().await,
            ActionKind::GetSystemInfo => actions.get_system_info().await,
            ActionKind::GetDatetime => actions.get_datetime().await,
            ActionKind::ListFiles => {
                let dir = args
                    .text(&["path", "dir", "directory"])
                    .unwrap_or_else(|| ".".to_string());
                actions.list_files(&dir).await
            }
            ActionKind::CopyFile => {
                let from = args
                    .first_string(&["source", "from", "src"])
                    .or_else(|| args.string_at(0))
                    .unwrap_or_default();
                let to = args
                    .first_string(&["destination", "to", "dest"])
                    .or_else(|| args.string_at(1))
                    .unwrap_or_default();
                actions.copy_file(&from, &to).await
            }
            ActionKind::DeleteFile => {
                let path = args.text(&["path", "file"]).unwrap_or_default();
                actions.delete_file(&path).await
            }
            ActionKind::OpenApp => {
                let name = args
                    .text(&["app", "name"])
                    .unwrap_or_else(|| command.trim().to_string());
                actions.open_app(&name).await
            }
        }
    }
}

/// Candidate URL: a `url` argument, the joined args, or the command's tail
/// as in `open github.com`
fn url_payload(command: &str, args: &ToolArgs) -> Option<String> {
    args.text(&["url"]).or_else(|| {
        command
            .trim()
            .split_once(char::is_whitespace)
            .map(|(_, rest)| rest.trim().to_string())
            .filter(|rest| !rest.is_empty())
    })
}

fn fallback_text(assistant_text: &str) -> String {
    if assistant_text.trim().is_empty() {
        ACTION_COMPLETED.to_string()
    } else {
        assistant_text.to_string()
    }
}
