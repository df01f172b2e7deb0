//! In-memory store implementations for testing and embedding hosts.
//!
//! Entries live in a `Vec` behind `std::sync::RwLock`; every operation takes
//! the lock once, so a scan never sees a partially applied mutation.

use std::sync::RwLock;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::models::{InteractionRecord, KnowledgeEntry, KnowledgePair, RemovePolicy};

use super::{InteractionLog, KnowledgeStore};

/// In-memory knowledge base.
#[derive(Default)]
pub struct InMemoryStore {
    entries: RwLock<Vec<KnowledgeEntry>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: T) -> anyhow::Error {
    anyhow!("in-memory store lock poisoned")
}

#[async_trait]
impl KnowledgeStore for InMemoryStore {
    async fn put(&self, entry: &KnowledgeEntry) -> Result<()> {
        self.entries.write().map_err(poisoned)?.push(entry.clone());
        Ok(())
    }

    async fn remove(&self, question: &str, policy: RemovePolicy) -> Result<u64> {
        let mut entries = self.entries.write().map_err(poisoned)?;
        match policy {
            RemovePolicy::All => {
                let before = entries.len();
                entries.retain(|e| e.question != question);
                Ok((before - entries.len()) as u64)
            }
            RemovePolicy::First => match entries.iter().position(|e| e.question == question) {
                Some(idx) => {
                    entries.remove(idx);
                    Ok(1)
                }
                None => Ok(0),
            },
        }
    }

    async fn list_all(&self) -> Result<Vec<KnowledgePair>> {
        let entries = self.entries.read().map_err(poisoned)?;
        Ok(entries.iter().map(KnowledgePair::from).collect())
    }

    async fn scan(&self) -> Result<Vec<KnowledgeEntry>> {
        Ok(self.entries.read().map_err(poisoned)?.clone())
    }

    async fn clear(&self) -> Result<u64> {
        let mut entries = self.entries.write().map_err(poisoned)?;
        let n = entries.len() as u64;
        entries.clear();
        Ok(n)
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.entries.read().map_err(poisoned)?.len() as u64)
    }
}

/// In-memory interaction log. Records are kept for inspection in tests.
#[derive(Default)]
pub struct InMemoryLog {
    records: RwLock<Vec<InteractionRecord>>,
}

impl InMemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<InteractionRecord> {
        self.records
            .read()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl InteractionLog for InMemoryLog {
    async fn append(&self, record: &InteractionRecord) -> Result<()> {
        self.records.write().map_err(poisoned)?.push(record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(q: &str, a: &str) -> KnowledgeEntry {
        KnowledgeEntry {
            question: q.to_string(),
            answer: a.to_string(),
            embedding: vec![1.0, 0.0],
        }
    }

    #[tokio::test]
    async fn test_put_and_list_in_insertion_order() {
        let store = InMemoryStore::new();
        store.put(&entry("b", "2")).await.unwrap();
        store.put(&entry("a", "1")).await.unwrap();

        let pairs = store.list_all().await.unwrap();
        let questions: Vec<&str> = pairs.iter().map(|p| p.question.as_str()).collect();
        assert_eq!(questions, vec!["b", "a"]);
        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_remove_is_exact_and_case_sensitive() {
        let store = InMemoryStore::new();
        store.put(&entry("Hello", "x")).await.unwrap();

        assert_eq!(store.remove("hello", RemovePolicy::All).await.unwrap(), 0);
        assert_eq!(store.remove("Hello ", RemovePolicy::All).await.unwrap(), 0);
        assert_eq!(store.count().await.unwrap(), 1);
        assert_eq!(store.remove("Hello", RemovePolicy::All).await.unwrap(), 1);
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_remove_duplicates_by_policy() {
        let store = InMemoryStore::new();
        store.put(&entry("dup", "first")).await.unwrap();
        store.put(&entry("dup", "second")).await.unwrap();

        assert_eq!(store.remove("dup", RemovePolicy::First).await.unwrap(), 1);
        let left = store.list_all().await.unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].answer, "second");

        store.put(&entry("dup", "third")).await.unwrap();
        assert_eq!(store.remove("dup", RemovePolicy::All).await.unwrap(), 2);
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_clear() {
        let store = InMemoryStore::new();
        store.put(&entry("a", "1")).await.unwrap();
        store.put(&entry("b", "2")).await.unwrap();
        assert_eq!(store.clear().await.unwrap(), 2);
        assert!(store.scan().await.unwrap().is_empty());
        assert_eq!(store.clear().await.unwrap(), 0);
    }
}
