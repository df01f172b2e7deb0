//! Answer rewriting through an external generative service.
//!
//! Rewriting only makes a matched answer read more naturally. Any failure
//! falls back to the stored answer, so the retrieval result never depends
//! on the rewrite service being up.

use async_trait::async_trait;
use tracing::warn;

use crate::error::Result;

/// A backend that paraphrases an answer.
///
/// Implementations return [`QaError::RewriteService`](crate::error::QaError::RewriteService)
/// on network errors, timeouts, non-success statuses, or malformed bodies.
#[async_trait]
pub trait Rewriter: Send + Sync {
    /// Short backend name for logs (e.g. `"gemini"`).
    fn name(&self) -> &str;
    /// Paraphrase `answer`, keeping its meaning.
    async fn rewrite(&self, answer: &str) -> Result<String>;
}

/// Build the instruction sent to the rewrite service.
pub fn build_rewrite_prompt(answer: &str) -> String {
    format!(
        "Please rewrite the following response in a more humanized way but having the exact \
         same meaning and return just 1 exactly trimmed rewritten sentence: '{}'",
        answer
    )
}

/// Normalize the service output: trim whitespace and one pair of wrapping
/// quotes. Returns `None` when nothing is left.
pub fn clean_rewrite_output(text: &str) -> Option<String> {
    let trimmed = text.trim();
    let unquoted = ['"', '\'']
        .iter()
        .find_map(|q| {
            trimmed
                .strip_prefix(*q)
                .and_then(|rest| rest.strip_suffix(*q))
        })
        .unwrap_or(trimmed)
        .trim();
    if unquoted.is_empty() {
        None
    } else {
        Some(unquoted.to_string())
    }
}

/// Rewrite `answer`, or return it unchanged if the rewriter fails.
///
/// The boolean is `true` only when the returned text came from the service.
pub async fn rewrite_or_original(rewriter: &dyn Rewriter, answer: &str) -> (String, bool) {
    match rewriter.rewrite(answer).await {
        Ok(text) => match clean_rewrite_output(&text) {
            Some(text) => (text, true),
            None => {
                warn!(backend = rewriter.name(), "rewrite service returned empty text");
                (answer.to_string(), false)
            }
        },
        Err(e) => {
            warn!(backend = rewriter.name(), error = %e, "rewrite failed, using original answer");
            (answer.to_string(), false)
        }
    }
}
