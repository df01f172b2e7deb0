//! Error taxonomy for the retrieval core.
//!
//! Storage backends and embedding providers report failures as
//! [`anyhow::Error`]; the service layer wraps them into [`QaError`] so callers
//! can tell a bad query apart from a broken store.

use thiserror::Error;

/// Errors surfaced by [`KnowledgeService`](crate::service::KnowledgeService).
///
/// A missing question on removal is not an error: `remove` returns `false`.
#[derive(Debug, Error)]
pub enum QaError {
    /// Empty input text, or a vector that is empty, non-finite, or of the
    /// wrong dimension. Fails the current query or insert; the store is
    /// left untouched.
    #[error("invalid embedding: {0}")]
    InvalidEmbedding(String),

    /// A question or answer that is empty after trimming.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The embedding backend could not produce vectors (disabled, network,
    /// model load).
    #[error("embedding provider error: {0:#}")]
    EmbeddingProvider(anyhow::Error),

    /// Persistence failure. Fatal for the current operation.
    #[error("store error: {0:#}")]
    Store(anyhow::Error),

    /// The rewrite service failed. Recovered inside the service by falling
    /// back to the original answer; never returned from `answer`.
    #[error("rewrite service error: {0}")]
    RewriteService(String),

    /// Feedback rating outside `1..=5`.
    #[error("rating must be between 1 and 5, got {0}")]
    InvalidRating(i64),

    /// A mutation was attempted by a principal without the admin role.
    #[error("user '{0}' is not allowed to modify the knowledge base")]
    Unauthorized(String),
}

/// Convenience alias used across the core crate.
pub type Result<T> = std::result::Result<T, QaError>;

impl QaError {
    /// Whether the error was caused by the caller's input rather than by
    /// infrastructure.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            QaError::InvalidEmbedding(_)
                | QaError::InvalidInput(_)
                | QaError::InvalidRating(_)
                | QaError::Unauthorized(_)
        )
    }
}
