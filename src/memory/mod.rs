// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Conversation memory
//!
//! A [`MemoryStore`] keeps an ordered, bounded log of chat messages plus a
//! small key/value fact sheet about the user. The brain reads recent history
//! before each request and appends both sides of the exchange afterwards.

pub mod cipher;
pub mod encrypted;
pub mod in_memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::llm::message::{Message, Role};

pub use encrypted::EncryptedFileStore;
pub use in_memory::InMemoryStore;

/// Messages retained when no ceiling is configured
pub const DEFAULT_MAX_MESSAGES: usize = 50;

/// A remembered fact about the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fact {
    pub key: String,
    pub value: String,
    pub updated_at: DateTime<Utc>,
}

/// Persistent conversation memory
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// Append a message, dropping the oldest entries beyond the ceiling
    async fn save_message(&self, role: Role, text: &str) -> Result<()>;

    /// Messages in insertion order, most recent last. `limit` keeps only
    /// the newest `limit` entries.
    async fn get_history(&self, limit: Option<usize>) -> Result<Vec<Message>>;

    /// Forget every message and fact
    async fn clear(&self) -> Result<()>;

    /// Messages whose text contains `query`, ignoring case
    async fn search(&self, query: &str) -> Result<Vec<Message>> {
        let needle = query.to_lowercase();
        Ok(self
            .get_history(None)
            .await?
            .into_iter()
            .filter(|m| m.content.to_lowercase().contains(&needle))
            .collect())
    }

    /// Insert or overwrite a fact
    async fn save_fact(&self, key: &str, value: &str) -> Result<()>;

    /// All facts, ordered by key
    async fn facts(&self) -> Result<Vec<Fact>>;
}

/// Keep only the newest `limit` items of an ordered log
pub(crate) fn keep_newest<T>(mut items: Vec<T>, limit: usize) -> Vec<T> {
    if items.len() > limit {
        items.drain(..items.len() - limit);
    }
    items
}

/// Insert or replace a fact, keeping the list sorted by key
pub(crate) fn upsert_fact(facts: &mut Vec<Fact>, key: &str, value: &str) {
    let fact = Fact {
        key: key.to_string(),
        value: value.to_string(),
        updated_at: Utc::now(),
    };
    match facts.binary_search_by(|f| f.key.as_str().cmp(key)) {
        Ok(pos) => facts[pos] = fact,
        Err(pos) => facts.insert(pos, fact),
    }
}
