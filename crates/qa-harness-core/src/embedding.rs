//! Embedding provider trait and vector utilities.
//!
//! Defines the [`EmbeddingProvider`] trait that all embedding backends
//! implement, plus pure helpers for vector validation, serialization, and
//! similarity computation.
//!
//! Concrete providers (local fastembed, OpenAI, Ollama) live in the
//! `qa-harness` app crate.

use async_trait::async_trait;

use crate::error::{QaError, Result};

/// Trait for embedding providers.
///
/// A provider wraps a model that is loaded once and then shared read-only
/// across concurrent requests. Implementations that run inference on the
/// CPU must move the work off the async executor themselves.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Returns the model identifier (e.g. `"all-minilm-l6-v2"`).
    fn model_name(&self) -> &str;
    /// Returns the embedding vector dimensionality (e.g. `384`).
    fn dims(&self) -> usize;
    /// Embed a batch of texts, returning one vector per input in order.
    async fn embed(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;
}

/// Embed a single text and validate the result.
///
/// Rejects empty input before calling the provider, and rejects any vector
/// that is empty, contains NaN/infinity, has zero norm, or does not have
/// the provider's declared dimension.
pub async fn embed_text(provider: &dyn EmbeddingProvider, text: &str) -> Result<Vec<f32>> {
    if text.trim().is_empty() {
        return Err(QaError::InvalidEmbedding(
            "cannot embed empty text".to_string(),
        ));
    }

    let vectors = provider
        .embed(&[text.to_string()])
        .await
        .map_err(QaError::EmbeddingProvider)?;
    let vector = vectors.into_iter().next().ok_or_else(|| {
        QaError::EmbeddingProvider(anyhow::anyhow!("Empty embedding response"))
    })?;

    validate_embedding(&vector, provider.dims())?;
    Ok(vector)
}

/// Check that a vector is usable for similarity matching.
pub fn validate_embedding(vec: &[f32], dims: usize) -> Result<()> {
    if vec.is_empty() {
        return Err(QaError::InvalidEmbedding("embedding is empty".to_string()));
    }
    if vec.len() != dims {
        return Err(QaError::InvalidEmbedding(format!(
            "expected {} dimensions, got {}",
            dims,
            vec.len()
        )));
    }
    if let Some(pos) = vec.iter().position(|v| !v.is_finite()) {
        return Err(QaError::InvalidEmbedding(format!(
            "non-finite value at index {}",
            pos
        )));
    }
    // A zero vector scores 0.0 against everything and would never match.
    let norm_sq: f32 = vec.iter().map(|v| v * v).sum();
    if norm_sq < f32::EPSILON {
        return Err(QaError::InvalidEmbedding(
            "embedding has zero norm".to_string(),
        ));
    }
    Ok(())
}

/// Encode a float vector as a BLOB (little-endian f32 bytes).
///
/// # Example
///
/// ```rust
/// use qa_harness_core::embedding::{vec_to_blob, blob_to_vec};
///
/// let v = vec![1.0f32, -2.5, 3.125];
/// let blob = vec_to_blob(&v);
/// assert_eq!(blob.len(), 12); // 3 × 4 bytes
/// assert_eq!(blob_to_vec(&blob), v);
/// ```
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for &v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode a BLOB back into a float vector.
///
/// Reverses [`vec_to_blob`]. Trailing bytes that do not form a full `f32`
/// are ignored; stores that persist a dimension should check it against
/// the decoded length.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Compute cosine similarity between two embedding vectors.
///
/// Returns a value in `[-1.0, 1.0]`:
/// - `1.0` = identical direction
/// - `0.0` = orthogonal (unrelated)
/// - `-1.0` = opposite direction
///
/// Returns `0.0` for empty vectors, vectors of different lengths, or a
/// zero-norm operand.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    (dot / denom).clamp(-1.0, 1.0)
}
