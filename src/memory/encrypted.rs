// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Encrypted file-backed memory store
//!
//! Layout under the memory directory:
//!
//! ```text
//! .key               32 random bytes, created on first use
//! chat-history.enc   encrypted JSON array of messages
//! facts.enc          encrypted JSON array of facts
//! ```
//!
//! A file that no longer decrypts (lost or replaced key, tampering) is
//! renamed to `<name>.corrupt` and the store carries on empty.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Mutex;

use crate::config::Settings;
use crate::error::{EchoError, Result};
use crate::llm::message::{Message, Role};

use super::cipher::MemoryCipher;
use super::{keep_newest, upsert_fact, Fact, MemoryStore, DEFAULT_MAX_MESSAGES};

const HISTORY_FILE: &str = "chat-history.enc";
const FACTS_FILE: &str = "facts.enc";
const KEY_FILE: &str = ".key";

/// Memory store persisted as AES-256-GCM encrypted JSON
pub struct EncryptedFileStore {
    history_path: PathBuf,
    facts_path: PathBuf,
    cipher: MemoryCipher,
    max_messages: usize,
    /// Serializes read-modify-write cycles on the files
    write_lock: Mutex<()>,
}

impl EncryptedFileStore {
    /// Open the store in `dir`, creating the key on first use
    pub async fn open(dir: impl AsRef<Path>, max_messages: usize) -> Result<Self> {
        let dir = dir.as_ref();
        tokio::fs::create_dir_all(dir).await?;
        let cipher = MemoryCipher::load_or_create(&dir.join(KEY_FILE)).await?;

        Ok(Self {
            history_path: dir.join(HISTORY_FILE),
            facts_path: dir.join(FACTS_FILE),
            cipher,
            max_messages: if max_messages == 0 {
                DEFAULT_MAX_MESSAGES
            } else {
                max_messages
            },
            write_lock: Mutex::new(()),
        })
    }

    /// Open the store at `<echo_home>/memory` with the configured ceiling
    pub async fn open_default(settings: &Settings) -> Result<Self> {
        Self::open(Settings::memory_dir(), settings.memory.max_messages).await
    }

    /// Path of the encrypted history file
    pub fn history_path(&self) -> &Path {
        &self.history_path
    }

    async fn read_json<T: DeserializeOwned>(&self, path: &Path) -> Result<Vec<T>> {
        let data = match tokio::fs::read(path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let plaintext = match self.cipher.decrypt(&data) {
            Ok(plaintext) => plaintext,
            Err(e) => {
                set_aside(path, &e).await?;
                return Ok(Vec::new());
            }
        };
        serde_json::from_slice(&plaintext)
            .map_err(|e| EchoError::Memory(format!("{} is corrupt: {}", path.display(), e)))
    }

    async fn write_json<T: Serialize>(&self, path: &Path, items: &[T]) -> Result<()> {
        let plaintext = serde_json::to_vec(items)?;
        let sealed = self.cipher.encrypt(&plaintext)?;

        // Write then rename so a crash never leaves a half-written file
        let tmp = path.with_extension("enc.tmp");
        tokio::fs::write(&tmp, sealed).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }
}

/// Move an undecryptable file out of the way, keeping it for recovery
async fn set_aside(path: &Path, cause: &EchoError) -> Result<()> {
    let aside = corrupt_path(path);
    tracing::warn!(
        "{} cannot be decrypted ({}); moving it to {} and starting empty",
        path.display(),
        cause,
        aside.display()
    );
    match tokio::fs::rename(path, &aside).await {
        Ok(()) => Ok(()),
        // A concurrent reader already moved it
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

fn corrupt_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".corrupt");
    path.with_file_name(name)
}

async fn remove_if_present(path: &Path) -> Result<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[async_trait]
impl MemoryStore for EncryptedFileStore {
    async fn save_message(&self, role: Role, text: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let mut history: Vec<Message> = self.read_json(&self.history_path).await?;
        history.push(Message::new(role, text));
        let history = keep_newest(history, self.max_messages);

        self.write_json(&self.history_path, &history).await?;
        tracing::debug!("Saved {} message ({} retained)", role, history.len());
        Ok(())
    }

    async fn get_history(&self, limit: Option<usize>) -> Result<Vec<Message>> {
        let history: Vec<Message> = self.read_json(&self.history_path).await?;
        Ok(match limit {
            Some(limit) => keep_newest(history, limit),
            None => history,
        })
    }

    async fn clear(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        remove_if_present(&self.history_path).await?;
        remove_if_present(&self.facts_path).await?;
        tracing::info!("Cleared conversation history and facts");
        Ok(())
    }

    async fn save_fact(&self, key: &str, value: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut facts: Vec<Fact> = self.read_json(&self.facts_path).await?;
        upsert_fact(&mut facts, key, value);
        self.write_json(&self.facts_path, &facts).await
    }

    async fn facts(&self) -> Result<Vec<Fact>> {
        self.read_json(&self.facts_path).await
    }
}
