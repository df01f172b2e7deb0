//! Best-match selection over the knowledge base.
//!
//! # Algorithm
//!
//! 1. Compute the cosine similarity between the query vector and every
//!    stored embedding (exhaustive scan, insertion order).
//! 2. Keep the maximum. A later entry replaces the current best only when
//!    strictly greater, so the first of several tied entries wins.
//! 3. Accept the best entry only if its similarity is strictly greater
//!    than the threshold.
//!
//! Entries whose dimension differs from the query are skipped.

use serde::Serialize;
use tracing::{debug, warn};

use crate::embedding::cosine_similarity;
use crate::models::KnowledgeEntry;

/// The best-scoring entry of a scan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BestMatch {
    /// Position of the entry in the scanned slice.
    pub index: usize,
    pub question: String,
    pub answer: String,
    pub similarity: f32,
}

/// Result of matching a query against the knowledge base.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome {
    /// Best similarity strictly exceeded the threshold.
    Matched(BestMatch),
    /// Nothing relevant. `best` holds the closest entry, if any was scored.
    NoMatch { best: Option<BestMatch> },
}

impl MatchOutcome {
    pub fn is_match(&self) -> bool {
        matches!(self, MatchOutcome::Matched(_))
    }
}

/// Find the entry most similar to `query`, without applying a threshold.
///
/// Returns `None` for an empty slice or when no entry has the query's
/// dimension.
pub fn find_best(query: &[f32], entries: &[KnowledgeEntry]) -> Option<BestMatch> {
    let mut best: Option<(usize, f32)> = None;

    for (idx, entry) in entries.iter().enumerate() {
        if entry.embedding.len() != query.len() {
            warn!(
                question = %entry.question,
                stored_dims = entry.embedding.len(),
                query_dims = query.len(),
                "skipping entry with mismatched embedding dimension"
            );
            continue;
        }

        let similarity = cosine_similarity(query, &entry.embedding);
        debug!(question = %entry.question, similarity, "compared with knowledge entry");

        match best {
            Some((_, current)) if similarity <= current => {}
            _ => best = Some((idx, similarity)),
        }
    }

    best.map(|(index, similarity)| BestMatch {
        index,
        question: entries[index].question.clone(),
        answer: entries[index].answer.clone(),
        similarity,
    })
}

/// Find the best entry and apply the acceptance threshold.
pub fn match_query(query: &[f32], entries: &[KnowledgeEntry], threshold: f32) -> MatchOutcome {
    match find_best(query, entries) {
        Some(best) if best.similarity > threshold => MatchOutcome::Matched(best),
        best => MatchOutcome::NoMatch { best },
    }
}
