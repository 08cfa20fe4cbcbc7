// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! System actions the router can perform on the host
//!
//! Every action reports through [`ActionResult`]; none of them raise.

pub mod desktop;
pub mod platform;
pub mod shell;

use async_trait::async_trait;
use serde::Serialize;

pub use desktop::DesktopActions;

/// What an action did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionResult {
    pub success: bool,
    pub output: Option<String>,
    pub error: Option<String>,
}

impl ActionResult {
    /// Success with nothing to report
    pub fn done() -> Self {
        Self {
            success: true,
            output: None,
            error: None,
        }
    }

    /// Success with output worth reading back
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: Some(output.into()),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            output: None,
            error: Some(error.into()),
        }
    }
}

impl<E: std::fmt::Display> From<std::result::Result<ActionResult, E>> for ActionResult {
    fn from(result: std::result::Result<ActionResult, E>) -> Self {
        result.unwrap_or_else(|e| ActionResult::failed(e.to_string()))
    }
}

/// Host operations, one per action kind
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SystemActions: Send + Sync {
    async fn create_folder(&self, path: &str) -> ActionResult;

    /// Write `content`, creating parent directories
    async fn write_file(&self, path: &str, content: &str) -> ActionResult;

    async fn read_file(&self, path: &str) -> ActionResult;

    async fn run_terminal_command(&self, command: &str) -> ActionResult;

    /// Type text into the focused window
    async fn type_text(&self, text: &str) -> ActionResult;

    async fn press_key(&self, key: &str) -> ActionResult;

    async fn web_search(&self, query: &str) -> ActionResult;

    async fn open_url(&self, url: &str) -> ActionResult;

    /// Capture the screen; output is the saved file path
    async fn take_screenshot(&self) -> ActionResult;

    async fn get_system_info(&self) -> ActionResult;

    async fn get_datetime(&self) -> ActionResult;

    async fn list_files(&self, dir: &str) -> ActionResult;

    async fn copy_file(&self, from: &str, to: &str) -> ActionResult;

    /// Delete a file or an empty directory
    async fn delete_file(&self, path: &str) -> ActionResult;

    async fn open_app(&self, name: &str) -> ActionResult;
}

/// Cut `text` to at most `max` characters, marking the cut
pub(crate) fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((byte_index, _)) => format!("{}\n... (truncated)", &text[..byte_index]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_constructors() {
        assert_eq!(
            ActionResult::ok("x"),
            ActionResult {
                success: true,
                output: Some("x".to_string()),
                error: None
            }
        );
        assert!(ActionResult::done().output.is_none());
        assert_eq!(ActionResult::failed("no").error.as_deref(), Some("no"));
    }

    #[test]
    fn test_from_result() {
        let err: std::result::Result<ActionResult, std::io::Error> =
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "missing"));
        let result = ActionResult::from(err);
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("missing"));
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("short", 10), "short");
        assert_eq!(truncate_chars("héllo wörld", 5), "héllo\n... (truncated)");
    }
}
