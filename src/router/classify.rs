// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Mapping a system command name to an action kind
//!
//! Pure functions only. Matching is case-insensitive and the first rule
//! that fits wins, so exact structured names beat keyword hits.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

/// Built-in action a system command resolves to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    CreateFolder,
    WriteFile,
    ReadFile,
    RunTerminalCommand,
    TypeText,
    PressKey,
    WebSearch,
    OpenUrl,
    TakeScreenshot,
    GetSystemInfo,
    GetDatetime,
    ListFiles,
    CopyFile,
    DeleteFile,
    OpenApp,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::CreateFolder => "create-folder",
            ActionKind::WriteFile => "write-file",
            ActionKind::ReadFile => "read-file",
            ActionKind::RunTerminalCommand => "run-terminal-command",
            ActionKind::TypeText => "type-text",
            ActionKind::PressKey => "press-key",
            ActionKind::WebSearch => "web-search",
            ActionKind::OpenUrl => "open-url",
            ActionKind::TakeScreenshot => "take-screenshot",
            ActionKind::GetSystemInfo => "get-system-info",
            ActionKind::GetDatetime => "get-datetime",
            ActionKind::ListFiles => "list-files",
            ActionKind::CopyFile => "copy-file",
            ActionKind::DeleteFile => "delete-file",
            ActionKind::OpenApp => "open-app",
        }
    }

    /// Kinds whose output is the answer the user asked for
    pub fn is_informational(&self) -> bool {
        matches!(
            self,
            ActionKind::ReadFile
                | ActionKind::RunTerminalCommand
                | ActionKind::GetSystemInfo
                | ActionKind::GetDatetime
                | ActionKind::ListFiles
        )
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured command names matched before any keyword
fn exact_kind(command: &str) -> Option<ActionKind> {
    match command {
        "create_folder" => Some(ActionKind::CreateFolder),
        "write_file" => Some(ActionKind::WriteFile),
        "read_file" => Some(ActionKind::ReadFile),
        "run_terminal_command" => Some(ActionKind::RunTerminalCommand),
        "type_text" => Some(ActionKind::TypeText),
        "press_key" => Some(ActionKind::PressKey),
        _ => None,
    }
}

/// Classify `command`. `url_candidate` is the payload the open-url rule
/// inspects.
pub fn classify(command: &str, url_candidate: Option<&str>) -> ActionKind {
    let cmd = command.trim().to_lowercase();

    if let Some(kind) = exact_kind(&cmd) {
        return kind;
    }

    let has = |words: &[&str]| words.iter().any(|w| cmd.contains(w));

    if has(&["screenshot"]) {
        ActionKind::TakeScreenshot
    } else if has(&["system", "info"]) {
        ActionKind::GetSystemInfo
    } else if has(&["time", "date"]) {
        ActionKind::GetDatetime
    } else if has(&["list", "files"]) {
        ActionKind::ListFiles
    } else if has(&["copy"]) {
        ActionKind::CopyFile
    } else if has(&["delete"]) {
        ActionKind::DeleteFile
    } else if has(&["chrome", "search", "web"]) {
        ActionKind::WebSearch
    } else if has(&["mkdir", "folder"]) {
        ActionKind::CreateFolder
    } else if has(&["url", "open"]) && url_candidate.is_some_and(looks_like_url) {
        ActionKind::OpenUrl
    } else {
        ActionKind::OpenApp
    }
}

/// `http(s)://...`, `www....`, or a bare dotted host such as `github.com/x`
pub fn looks_like_url(text: &str) -> bool {
    static URL_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = URL_REGEX.get_or_init(|| {
        Regex::new(
            r"(?i)^(?:https?://\S+|www\.\S+|[a-z0-9](?:[a-z0-9-]*[a-z0-9])?(?:\.[a-z0-9](?:[a-z0-9-]*[a-z0-9])?)*\.[a-z]{2,}(?::\d+)?(?:/\S*)?)$",
        )
        .unwrap()
    });
    regex.is_match(text.trim())
}
