// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! `productivity-plugin`: quick notes and password generation

use std::path::PathBuf;

use async_trait::async_trait;
use rand::Rng;
use tokio::io::AsyncWriteExt;

use crate::brain::ToolArgs;
use crate::error::{EchoError, Result};
use crate::plugins::{CommandSpec, Plugin, PluginReply};

const NOTES_FILE: &str = "notes.txt";
const RECENT_NOTES: usize = 5;
const DEFAULT_PASSWORD_LEN: usize = 12;
const MAX_PASSWORD_LEN: usize = 128;
const PASSWORD_CHARSET: &[u8] =
    b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789!@#$%^&*()_+";

pub struct ProductivityPlugin {
    notes_dir: PathBuf,
}

impl ProductivityPlugin {
    pub fn new(notes_dir: impl Into<PathBuf>) -> Self {
        Self {
            notes_dir: notes_dir.into(),
        }
    }

    fn notes_file(&self) -> PathBuf {
        self.notes_dir.join(NOTES_FILE)
    }

    async fn note(&self, args: &ToolArgs) -> Result<PluginReply> {
        let Some(text) = args.text(&["text", "note", "content"]) else {
            return Ok(PluginReply::failed("Please provide a note content."));
        };

        tokio::fs::create_dir_all(&self.notes_dir).await?;
        let line = format!(
            "[{}] {}\n",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
            text
        );
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.notes_file())
            .await?;
        file.write_all(line.as_bytes()).await?;

        Ok(PluginReply::ok(format!("Note saved: \"{}\"", text)))
    }

    async fn read_notes(&self) -> Result<PluginReply> {
        let data = match tokio::fs::read_to_string(self.notes_file()).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e.into()),
        };

        let lines: Vec<&str> = data.lines().filter(|l| !l.trim().is_empty()).collect();
        if lines.is_empty() {
            return Ok(PluginReply::ok("You have no notes yet."));
        }
        let recent = &lines[lines.len().saturating_sub(RECENT_NOTES)..];
        Ok(PluginReply::ok(format!(
            "Here are your last {} notes:\n{}",
            RECENT_NOTES,
            recent.join("\n")
        )))
    }

    async fn clear_notes(&self) -> Result<PluginReply> {
        match tokio::fs::remove_file(self.notes_file()).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        Ok(PluginReply::ok("Notes cleared, sir."))
    }
}

/// Random password over [`PASSWORD_CHARSET`]
pub(crate) fn generate_password(length: usize) -> String {
    let mut rng = rand::rng();
    (0..length)
        .map(|_| PASSWORD_CHARSET[rng.random_range(0..PASSWORD_CHARSET.len())] as char)
        .collect()
}

fn password_length(args: &ToolArgs) -> usize {
    args.text(&["length"])
        .and_then(|s| s.trim().parse::<usize>().ok())
        .filter(|n| *n > 0)
        .map(|n| n.min(MAX_PASSWORD_LEN))
        .unwrap_or(DEFAULT_PASSWORD_LEN)
}

#[async_trait]
impl Plugin for ProductivityPlugin {
    fn name(&self) -> &str {
        "productivity-plugin"
    }

    fn description(&self) -> &str {
        "Quick notes and productivity tools."
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new("note", "Save a quick text note").with_string_param(
                "text",
                "The note to save",
                true,
            ),
            CommandSpec::new("readnotes", "Display your recent notes"),
            CommandSpec::new("clearnotes", "Delete all your notes"),
            CommandSpec::new("password", "Generate a secure random password").with_string_param(
                "length",
                "Number of characters (default 12)",
                false,
            ),
        ]
    }

    async fn init(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.notes_dir).await?;
        Ok(())
    }

    async fn execute(&self, command: &str, args: &ToolArgs) -> Result<PluginReply> {
        match command {
            "note" => self.note(args).await,
            "readnotes" => self.read_notes().await,
            "clearnotes" => self.clear_notes().await,
            "password" => Ok(PluginReply::ok(format!(
                "Generated password: {}",
                generate_password(password_length(args))
            ))),
            other => Err(EchoError::Plugin(format!(
                "Unknown command '{}' for productivity-plugin",
                other
            ))),
        }
    }
}
