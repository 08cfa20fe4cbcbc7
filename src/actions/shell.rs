// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Terminal command execution with timeout and safety checks

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tokio::time::timeout;

use super::{truncate_chars, ActionResult};

const MAX_OUTPUT_CHARS: usize = 4000;

/// Substrings that are never run
const BLOCKED_PATTERNS: &[&str] = &[
    "rm -rf /",
    "rm -rf /*",
    "mkfs",
    ":(){:|:&};:",
    "> /dev/sda",
    "dd if=/dev/zero of=/dev",
    "sudo ",
    "shutdown",
    "reboot",
    "poweroff",
    "halt",
    "init 0",
    "init 6",
    "format c:",
    "del /s /q c:\\",
];

/// Check if a command is blocked
pub fn is_blocked(command: &str) -> bool {
    let lower = command.to_lowercase();
    BLOCKED_PATTERNS.iter().any(|p| lower.contains(p)) || is_dangerous_rm_root(&lower)
}

/// `rm` with a recursive flag aimed at `/` in any spelling
fn is_dangerous_rm_root(command: &str) -> bool {
    let tokens: Vec<&str> = command.split_whitespace().collect();
    let mut i = 0;

    while i < tokens.len() {
        if tokens[i] != "rm" {
            i += 1;
            continue;
        }

        let mut recursive = false;
        let mut root_target = false;
        let mut j = i + 1;

        while j < tokens.len() {
            let token = tokens[j].trim_matches(|ch: char| {
                ch == '"' || ch == '\'' || ch == '`' || ch == ';' || ch == '|' || ch == '&'
            });
            j += 1;

            if token.is_empty() {
                continue;
            }
            if let Some(stripped) = token.strip_prefix('-') {
                let is_short_option = !token.starts_with("--");
                if token == "--recursive"
                    || (is_short_option && stripped.contains(|c| c == 'r' || c == 'R'))
                {
                    recursive = true;
                }
                continue;
            }
            if token == "/" || token == "/*" {
                root_target = true;
            }
        }

        if recursive && root_target {
            return true;
        }
        i = j;
    }

    false
}

/// Run `command` under the platform shell in `working_dir`
pub async fn run(command: &str, working_dir: &Path, limit: Duration) -> ActionResult {
    if command.trim().is_empty() {
        return ActionResult::failed("No command given");
    }
    if is_blocked(command) {
        tracing::warn!("Blocked terminal command: {}", command);
        return ActionResult::failed("This command has been blocked for safety reasons.");
    }

    let mut cmd = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(command);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(command);
        c
    };
    cmd.current_dir(working_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => return ActionResult::failed(format!("Failed to spawn command: {}", e)),
    };

    tracing::debug!("Running terminal command: {}", command);
    match timeout(limit, child.wait_with_output()).await {
        Ok(Ok(output)) => {
            let stdout = String::from_utf8_lossy(&output.stdout);
            let stderr = String::from_utf8_lossy(&output.stderr);
            if output.status.success() {
                let mut text = stdout.trim_end().to_string();
                if !stderr.trim().is_empty() {
                    if !text.is_empty() {
                        text.push('\n');
                    }
                    text.push_str(stderr.trim_end());
                }
                if text.is_empty() {
                    text = "Command completed with no output.".to_string();
                }
                ActionResult::ok(truncate_chars(&text, MAX_OUTPUT_CHARS))
            } else {
                let detail = if stderr.trim().is_empty() {
                    stdout.trim().to_string()
                } else {
                    stderr.trim().to_string()
                };
                ActionResult::failed(truncate_chars(
                    &format!(
                        "Command exited with code {}: {}",
                        output.status.code().unwrap_or(-1),
                        detail
                    ),
                    MAX_OUTPUT_CHARS,
                ))
            }
        }
        Ok(Err(e)) => ActionResult::failed(format!("Failed to execute command: {}", e)),
        Err(_) => ActionResult::failed(format!(
            "Command timed out after {} seconds",
            limit.as_secs()
        )),
    }
}
