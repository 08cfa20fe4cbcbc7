// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Volatile memory store for tests and ephemeral runs

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::Result;
use crate::llm::message::{Message, Role};

use super::{keep_newest, upsert_fact, Fact, MemoryStore, DEFAULT_MAX_MESSAGES};

/// Memory store that lives only as long as the process
pub struct InMemoryStore {
    messages: Mutex<Vec<Message>>,
    facts: Mutex<Vec<Fact>>,
    max_messages: usize,
}

impl InMemoryStore {
    pub fn new(max_messages: usize) -> Self {
        Self {
            messages: Mutex::new(Vec::new()),
            facts: Mutex::new(Vec::new()),
            max_messages: if max_messages == 0 {
                DEFAULT_MAX_MESSAGES
            } else {
                max_messages
            },
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_MESSAGES)
    }
}

#[async_trait]
impl MemoryStore for InMemoryStore {
    async fn save_message(&self, role: Role, text: &str) -> Result<()> {
        let mut messages = self.messages.lock().await;
        messages.push(Message::new(role, text));
        let overflow = messages.len().saturating_sub(self.max_messages);
        messages.drain(..overflow);
        Ok(())
    }

    async fn get_history(&self, limit: Option<usize>) -> Result<Vec<Message>> {
        let messages = self.messages.lock().await.clone();
        Ok(match limit {
            Some(limit) => keep_newest(messages, limit),
            None => messages,
        })
    }

    async fn clear(&self) -> Result<()> {
        self.messages.lock().await.clear();
        self.facts.lock().await.clear();
        Ok(())
    }

    async fn save_fact(&self, key: &str, value: &str) -> Result<()> {
        upsert_fact(&mut *self.facts.lock().await, key, value);
        Ok(())
    }

    async fn facts(&self) -> Result<Vec<Fact>> {
        Ok(self.facts.lock().await.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[tokio::test]
    async fn test_round_trip() {
        let store = InMemoryStore::default();
        store.save_message(Role::User, "hello").await.unwrap();
        store.save_message(Role::Assistant, "hi there").await.unwrap();

        let history = store.get_history(Some(10)).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, Role::User);
        assert_eq!(history[0].content, "hello");
        assert_eq!(history[1].role, Role::Assistant);
        assert_eq!(history[1].content, "hi there");
    }

    #[tokio::test]
    async fn test_limit_returns_newest() {
        let store = InMemoryStore::default();
        for text in ["a", "b", "c"] {
            store.save_message(Role::User, text).await.unwrap();
        }
        let history = store.get_history(Some(2)).await.unwrap();
        let texts: Vec<_> = history.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(texts, vec!["b", "c"]);
    }

    #[tokio::test]
    async fn test_clear_forgets_facts() {
        let store = InMemoryStore::default();
        store.save_message(Role::User, "hello").await.unwrap();
        store.save_fact("name", "Tony").await.unwrap();

        store.clear().await.unwrap();
        assert!(store.get_history(None).await.unwrap().is_empty());
        assert!(store.facts().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_default_search() {
        let store = InMemoryStore::default();
        store.save_message(Role::User, "What's the WEATHER").await.unwrap();
        store.save_message(Role::User, "tell a joke").await.unwrap();
        assert_eq!(store.search("weather").await.unwrap().len(), 1);
    }

    proptest! {
        #[test]
        fn test_history_never_exceeds_ceiling(count in 0usize..140, ceiling in 1usize..60) {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            rt.block_on(async {
                let store = InMemoryStore::new(ceiling);
                for i in 0..count {
                    store.save_message(Role::User, &i.to_string()).await.unwrap();
                }
                let history = store.get_history(None).await.unwrap();

                prop_assert_eq!(history.len(), count.min(ceiling));
                let expected: Vec<String> =
                    (count.saturating_sub(ceiling)..count).map(|i| i.to_string()).collect();
                let actual: Vec<String> = history.into_iter().map(|m| m.content).collect();
                prop_assert_eq!(actual, expected);
                Ok(())
            })?;
        }
    }
}
