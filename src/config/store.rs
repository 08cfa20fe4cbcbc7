// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Durable key/value access to [`Settings`]
//!
//! Keys are dotted camelCase paths as they appear in settings.json
//! (`aiProvider`, `apiKeys.openai`, `memory.historyLimit`). Every mutation
//! is validated and written through to disk before it becomes visible.

use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde_json::Value;

use crate::error::{EchoError, Result};

use super::Settings;

/// Shared, persisted settings
#[derive(Debug)]
pub struct ConfigStore {
    path: PathBuf,
    settings: RwLock<Settings>,
}

impl ConfigStore {
    /// Open the store at the default settings path.
    pub fn open_default() -> Result<Self> {
        Self::open(Settings::default_path())
    }

    /// Open the store at `path`, loading defaults if the file does not exist.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let settings = Settings::load_from(&path)?;
        Ok(Self {
            path,
            settings: RwLock::new(settings),
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A copy of the current settings.
    pub fn snapshot(&self) -> Settings {
        self.read().clone()
    }

    /// Apply a mutation, validate it and persist. On failure nothing changes.
    pub fn update<F>(&self, mutate: F) -> Result<Settings>
    where
        F: FnOnce(&mut Settings),
    {
        let mut guard = self.write();
        let mut next = guard.clone();
        mutate(&mut next);
        next.validate()?;
        next.save_to(&self.path)?;
        *guard = next.clone();
        Ok(next)
    }

    /// Read a value by dotted key. Returns `None` for unknown keys.
    pub fn get_value(&self, key: &str) -> Result<Option<Value>> {
        let root = serde_json::to_value(&*self.read())?;
        Ok(lookup(&root, key).cloned())
    }

    /// Set a value by dotted key. `raw` is parsed as JSON when possible,
    /// otherwise stored as a string, so `true`, `42` and `["a"]` keep their types.
    pub fn set_value(&self, key: &str, raw: &str) -> Result<Settings> {
        let value = serde_json::from_str::<Value>(raw).unwrap_or_else(|_| Value::String(raw.to_string()));

        let mut guard = self.write();
        let mut root = serde_json::to_value(&*guard)?;
        assign(&mut root, key, value)?;

        let next: Settings = serde_json::from_value(root)
            .map_err(|e| EchoError::Config(format!("Invalid value for '{}': {}", key, e)))?;
        next.validate()?;
        next.save_to(&self.path)?;
        *guard = next.clone();
        Ok(next)
    }

    /// Restore defaults, discarding every stored key.
    pub fn reset(&self) -> Result<Settings> {
        let mut guard = self.write();
        let defaults = Settings::default();
        defaults.save_to_clean(&self.path)?;
        *guard = defaults.clone();
        Ok(defaults)
    }

    /// Add or remove a plugin from the enabled list and persist.
    pub fn set_plugin_enabled(&self, name: &str, enabled: bool) -> Result<Settings> {
        self.update(|settings| {
            settings.plugins.retain(|p| p != name);
            if enabled {
                settings.plugins.push(name.to_string());
            }
        })
    }

    fn read(&self) -> RwLockReadGuard<'_, Settings> {
        match self.settings.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::warn!("Settings lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, Settings> {
        match self.settings.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::warn!("Settings lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }
}

fn lookup<'a>(root: &'a Value, key: &str) -> Option<&'a Value> {
    key.split('.')
        .filter(|segment| !segment.is_empty())
        .try_fold(root, |node, segment| node.get(segment))
}

fn assign(root: &mut Value, key: &str, value: Value) -> Result<()> {
    let segments: Vec<&str> = key.split('.').filter(|s| !s.is_empty()).collect();
    let Some((last, parents)) = segments.split_last() else {
        return Err(EchoError::InvalidInput("Empty settings key".to_string()));
    };

    let mut node = root;
    for segment in parents {
        let map = node
            .as_object_mut()
            .ok_or_else(|| EchoError::Config(format!("'{}' is not a section", segment)))?;
        node = map
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(serde_json::Map::new()));
    }

    let map = node
        .as_object_mut()
        .ok_or_else(|| EchoError::Config(format!("Cannot set '{}'", key)))?;
    map.insert(last.to_string(), value);
    Ok(())
}
