// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::error::{EchoError, Result};

use super::merge;
use super::Settings;

/// Subdirectories of the Echo home created at startup
const HOME_SUBDIRS: [&str; 3] = ["plugins", "memory", "notes"];

impl Settings {
    /// The Echo home directory: `$ECHO_HOME`, else `~/.echo`.
    pub fn echo_home() -> PathBuf {
        match std::env::var_os("ECHO_HOME") {
            Some(home) if !home.is_empty() => PathBuf::from(home),
            _ => dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".echo"),
        }
    }

    pub fn default_path() -> PathBuf {
        Self::echo_home().join("settings.json")
    }

    /// Directory scanned for external plugin manifests.
    pub fn plugins_dir() -> PathBuf {
        Self::echo_home().join(HOME_SUBDIRS[0])
    }

    pub fn memory_dir() -> PathBuf {
        Self::echo_home().join(HOME_SUBDIRS[1])
    }

    /// Where the productivity plugin keeps notes.
    pub fn notes_dir() -> PathBuf {
        Self::echo_home().join(HOME_SUBDIRS[2])
    }

    pub fn ensure_directories() -> Result<()> {
        let home = Self::echo_home();
        for sub in HOME_SUBDIRS {
            std::fs::create_dir_all(home.join(sub))?;
        }
        Ok(())
    }

    /// Read settings from `path`. A missing file yields defaults; a file
    /// that is not valid settings JSON is a config error naming the file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let Some(raw) = read_json(path)? else {
            return Ok(Self::default());
        };
        serde_json::from_value(raw).map_err(|e| {
            EchoError::Config(format!("Invalid settings in {}: {}", path.display(), e))
        })
    }

    /// Write settings to `path`, keeping keys already in the file that
    /// these settings do not model (e.g. the desktop hotkey).
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let ours = serde_json::to_value(self)?;
        let merged = match read_json(path) {
            Ok(Some(existing)) => merge::deep_merge(existing, ours),
            Ok(None) => ours,
            Err(e) => {
                tracing::warn!("Overwriting unreadable settings file: {}", e);
                ours
            }
        };
        write_json(path, &merged)
    }

    /// Write settings to `path`, discarding whatever the file held.
    pub fn save_to_clean(&self, path: &Path) -> Result<()> {
        write_json(path, &serde_json::to_value(self)?)
    }
}

fn read_json(path: &Path) -> Result<Option<Value>> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    serde_json::from_str(&content).map(Some).map_err(|e| {
        EchoError::Config(format!("{} is not valid JSON: {}", path.display(), e))
    })
}

/// Replace `path` via a sibling temp file so a crash never leaves half a file.
fn write_json(path: &Path, value: &Value) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, serde_json::to_string_pretty(value)?)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}
