//! SQLite-backed [`KnowledgeStore`] and [`InteractionLog`].
//!
//! Each operation is a single SQL statement, so SQLite's statement-level
//! atomicity gives the guarantees the matcher relies on: an insert stores
//! text and embedding together or not at all, and a scan reads one
//! consistent snapshot of the table.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use tracing::warn;

use qa_harness_core::embedding::{blob_to_vec, vec_to_blob};
use qa_harness_core::models::{InteractionRecord, KnowledgeEntry, KnowledgePair, RemovePolicy};
use qa_harness_core::store::{InteractionLog, KnowledgeStore};

/// SQLite implementation of the store traits.
///
/// `model` is written next to every embedding so entries created with a
/// different model can be told apart later.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
    model: String,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool, model: impl Into<String>) -> Self {
        Self {
            pool,
            model: model.into(),
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl KnowledgeStore for SqliteStore {
    async fn put(&self, entry: &KnowledgeEntry) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        let blob = vec_to_blob(&entry.embedding);

        sqlx::query(
            r#"
            INSERT INTO knowledge_base (question, answer, embedding, dims, model, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&entry.question)
        .bind(&entry.answer)
        .bind(&blob)
        .bind(entry.embedding.len() as i64)
        .bind(&self.model)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn remove(&self, question: &str, policy: RemovePolicy) -> Result<u64> {
        let result = match policy {
            RemovePolicy::All => {
                sqlx::query("DELETE FROM knowledge_base WHERE question = ?")
                    .bind(question)
                    .execute(&self.pool)
                    .await?
            }
            RemovePolicy::First => {
                sqlx::query(
                    r#"
                    DELETE FROM knowledge_base
                    WHERE id = (SELECT id FROM knowledge_base WHERE question = ? ORDER BY id LIMIT 1)
                    "#,
                )
                .bind(question)
                .execute(&self.pool)
                .await?
            }
        };

        Ok(result.rows_affected())
    }

    async fn list_all(&self) -> Result<Vec<KnowledgePair>> {
        let rows = sqlx::query("SELECT question, answer FROM knowledge_base ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .iter()
            .map(|row| KnowledgePair {
                question: row.get("question"),
                answer: row.get("answer"),
            })
            .collect())
    }

    /// Rows whose blob length disagrees with their `dims` column are
    /// skipped with a warning.
    async fn scan(&self) -> Result<Vec<KnowledgeEntry>> {
        let rows = sqlx::query(
            "SELECT id, question, answer, embedding, dims FROM knowledge_base ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in &rows {
            let blob: Vec<u8> = row.get("embedding");
            let dims: i64 = row.get("dims");
            let expected_len = usize::try_from(dims).ok().and_then(|d| d.checked_mul(4));
            if expected_len != Some(blob.len()) {
                let id: i64 = row.get("id");
                warn!(id, dims, blob_len = blob.len(), "skipping corrupt embedding row");
                continue;
            }
            entries.push(KnowledgeEntry {
                question: row.get("question"),
                answer: row.get("answer"),
                embedding: blob_to_vec(&blob),
            });
        }
        Ok(entries)
    }

    async fn clear(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM knowledge_base")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn count(&self) -> Result<u64> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM knowledge_base")
            .fetch_one(&self.pool)
            .await?;
        Ok(n as u64)
    }
}

#[async_trait]
impl InteractionLog for SqliteStore {
    async fn append(&self, record: &InteractionRecord) -> Result<()> {
        let now = chrono::Utc::now().timestamp();

        sqlx::query(
            r#"
            INSERT INTO interaction_log (user_id, question, answer, feedback, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.user_id)
        .bind(&record.question)
        .bind(&record.answer)
        .bind(record.feedback.map(|r| r.get() as i64))
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
