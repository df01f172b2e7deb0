//! Storage abstraction for QA Harness.
//!
//! The [`KnowledgeStore`] trait covers the entry lifecycle of the knowledge
//! base; [`InteractionLog`] covers the append-only interaction log. The two
//! are independent: no record in one refers to the other.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{InteractionRecord, KnowledgeEntry, KnowledgePair, RemovePolicy};

/// Abstract knowledge base backend.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`put`](KnowledgeStore::put) | Insert a new entry (duplicates allowed) |
/// | [`remove`](KnowledgeStore::remove) | Delete entries by exact question |
/// | [`list_all`](KnowledgeStore::list_all) | All pairs, without embeddings |
/// | [`scan`](KnowledgeStore::scan) | Snapshot of all entries with embeddings |
/// | [`clear`](KnowledgeStore::clear) | Delete every entry |
/// | [`count`](KnowledgeStore::count) | Number of stored entries |
///
/// All listing methods return entries in insertion order.
#[async_trait]
pub trait KnowledgeStore: Send + Sync {
    /// Insert an entry. Either the whole entry is stored or nothing is.
    async fn put(&self, entry: &KnowledgeEntry) -> Result<()>;

    /// Delete entries whose question equals `question` byte-for-byte.
    ///
    /// Returns the number of rows removed (0 when absent).
    async fn remove(&self, question: &str, policy: RemovePolicy) -> Result<u64>;

    /// Return every `(question, answer)` pair.
    async fn list_all(&self) -> Result<Vec<KnowledgePair>>;

    /// Return a consistent snapshot of every entry with its embedding.
    ///
    /// A concurrent `put`/`remove`/`clear` is either fully visible or not
    /// visible at all.
    async fn scan(&self) -> Result<Vec<KnowledgeEntry>>;

    /// Delete every entry, returning how many were removed.
    async fn clear(&self) -> Result<u64>;

    /// Number of stored entries.
    async fn count(&self) -> Result<u64>;
}

/// Append-only sink for interaction records.
#[async_trait]
pub trait InteractionLog: Send + Sync {
    /// Append one record. The backend assigns the timestamp.
    async fn append(&self, record: &InteractionRecord) -> Result<()>;
}
