//! Service layer tying the embedding provider, knowledge store, matcher,
//! rewriter, and interaction log together.
//!
//! This is the surface the transport layers (CLI, HTTP) call. Mutations take
//! a [`Principal`] and are refused for non-admins; queries and feedback are
//! open to everyone.
//!
//! ```text
//! question ─▶ embed ─▶ scan store ─▶ best match > threshold?
//!                                        │ yes            │ no
//!                                        ▼                ▼
//!                                    rewrite ─▶ answer   no match
//!                                        └──── log interaction ────┘
//! ```

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::embedding::{embed_text, EmbeddingProvider};
use crate::error::{QaError, Result};
use crate::matcher::{match_query, MatchOutcome};
use crate::models::{
    EmbedTextPolicy, InteractionRecord, KnowledgeEntry, KnowledgePair, Principal, Rating,
    RemovePolicy,
};
use crate::rewrite::{rewrite_or_original, Rewriter};
use crate::store::{InteractionLog, KnowledgeStore};

/// Matching and storage policies, decoupled from application config.
#[derive(Debug, Clone, Copy)]
pub struct ServiceParams {
    /// A match is accepted only when the best similarity is strictly above this.
    pub threshold: f32,
    /// Text an entry's embedding is computed from.
    pub embed_text: EmbedTextPolicy,
    /// Rows deleted by `remove` when questions repeat.
    pub remove_policy: RemovePolicy,
}

impl Default for ServiceParams {
    fn default() -> Self {
        Self {
            threshold: 0.5,
            embed_text: EmbedTextPolicy::Question,
            remove_policy: RemovePolicy::All,
        }
    }
}

/// A successful answer to a user question.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Answer {
    /// Text delivered to the user (rewritten or original).
    pub text: String,
    /// Whether `text` came from the rewrite service.
    pub was_rewritten: bool,
    /// The stored answer of the matched entry.
    pub original_answer: String,
    /// The stored question of the matched entry.
    pub matched_question: String,
    pub similarity: f32,
}

/// Outcome of [`KnowledgeService::answer`].
#[derive(Debug, Clone, PartialEq)]
pub enum AnswerOutcome {
    Answered(Answer),
    /// The knowledge base has nothing relevant. Not an error.
    NoMatch,
}

/// Retrieval service over pluggable backends.
#[derive(Clone)]
pub struct KnowledgeService {
    store: Arc<dyn KnowledgeStore>,
    log: Arc<dyn InteractionLog>,
    embedder: Arc<dyn EmbeddingProvider>,
    rewriter: Option<Arc<dyn Rewriter>>,
    params: ServiceParams,
}

impl KnowledgeService {
    pub fn new(
        store: Arc<dyn KnowledgeStore>,
        log: Arc<dyn InteractionLog>,
        embedder: Arc<dyn EmbeddingProvider>,
        params: ServiceParams,
    ) -> Self {
        Self {
            store,
            log,
            embedder,
            rewriter: None,
            params,
        }
    }

    /// Attach a rewrite backend. Without one, answers are returned verbatim.
    pub fn with_rewriter(mut self, rewriter: Arc<dyn Rewriter>) -> Self {
        self.rewriter = Some(rewriter);
        self
    }

    pub fn params(&self) -> &ServiceParams {
        &self.params
    }

    pub fn embedder(&self) -> &dyn EmbeddingProvider {
        self.embedder.as_ref()
    }

    // ============ Mutation surface ============

    /// Embed and store a new entry. Duplicate questions are allowed.
    ///
    /// Both fields are trimmed; either one empty fails with
    /// [`QaError::InvalidInput`] whatever the embed-text policy.
    pub async fn add(&self, principal: &Principal, question: &str, answer: &str) -> Result<()> {
        principal.require_admin()?;

        let (question, answer) = (question.trim(), answer.trim());
        if question.is_empty() {
            return Err(QaError::InvalidInput("question must not be empty".to_string()));
        }
        if answer.is_empty() {
            return Err(QaError::InvalidInput("answer must not be empty".to_string()));
        }

        let text = self.params.embed_text.canonical_text(question, answer);
        let embedding = embed_text(self.embedder.as_ref(), &text).await?;

        let entry = KnowledgeEntry {
            question: question.to_string(),
            answer: answer.to_string(),
            embedding,
        };
        self.store.put(&entry).await.map_err(QaError::Store)?;

        info!(admin = %principal.id, question, "knowledge entry added");
        Ok(())
    }

    /// Remove entries whose question matches exactly.
    ///
    /// Returns `true` if at least one row was removed.
    pub async fn remove(&self, principal: &Principal, question: &str) -> Result<bool> {
        principal.require_admin()?;

        let removed = self
            .store
            .remove(question, self.params.remove_policy)
            .await
            .map_err(QaError::Store)?;

        if removed > 0 {
            info!(admin = %principal.id, question, removed, "knowledge entry removed");
        } else {
            warn!(admin = %principal.id, question, "no knowledge entry to remove");
        }
        Ok(removed > 0)
    }

    /// List every stored pair.
    pub async fn list(&self, principal: &Principal) -> Result<Vec<KnowledgePair>> {
        principal.require_admin()?;
        self.store.list_all().await.map_err(QaError::Store)
    }

    /// Delete every entry, returning how many were removed.
    pub async fn clear(&self, principal: &Principal) -> Result<u64> {
        principal.require_admin()?;
        let removed = self.store.clear().await.map_err(QaError::Store)?;
        info!(admin = %principal.id, removed, "knowledge base cleared");
        Ok(removed)
    }

    // ============ Query surface ============

    /// Embed `question` and match it against the store, without rewriting
    /// or logging.
    pub async fn find_match(&self, question: &str) -> Result<MatchOutcome> {
        let query_vec = embed_text(self.embedder.as_ref(), question).await?;
        let entries = self.store.scan().await.map_err(QaError::Store)?;

        let outcome = match_query(&query_vec, &entries, self.params.threshold);
        match &outcome {
            MatchOutcome::Matched(best) => {
                info!(similarity = best.similarity, matched = %best.question, "best match accepted")
            }
            MatchOutcome::NoMatch { best: Some(best) } => info!(
                similarity = best.similarity,
                threshold = self.params.threshold,
                "best match below threshold"
            ),
            MatchOutcome::NoMatch { best: None } => info!("knowledge base has no candidates"),
        }
        Ok(outcome)
    }

    /// Answer a user question.
    ///
    /// On a match the stored answer goes through the rewriter when one is
    /// attached and `allow_rewrite` is set. The interaction is logged in
    /// either case; a log failure does not affect the returned outcome.
    pub async fn answer(
        &self,
        user_id: &str,
        question: &str,
        allow_rewrite: bool,
    ) -> Result<AnswerOutcome> {
        let outcome = match self.find_match(question).await? {
            MatchOutcome::Matched(best) => {
                let (text, was_rewritten) = match (&self.rewriter, allow_rewrite) {
                    (Some(rewriter), true) => {
                        rewrite_or_original(rewriter.as_ref(), &best.answer).await
                    }
                    _ => (best.answer.clone(), false),
                };
                AnswerOutcome::Answered(Answer {
                    text,
                    was_rewritten,
                    original_answer: best.answer,
                    matched_question: best.question,
                    similarity: best.similarity,
                })
            }
            MatchOutcome::NoMatch { .. } => AnswerOutcome::NoMatch,
        };

        let delivered = match &outcome {
            AnswerOutcome::Answered(a) => Some(a.text.clone()),
            AnswerOutcome::NoMatch => None,
        };
        self.record(InteractionRecord {
            user_id: user_id.to_string(),
            question: question.to_string(),
            answer: delivered,
            feedback: None,
        })
        .await;

        Ok(outcome)
    }

    // ============ Feedback surface ============

    /// Log a 1–5 rating for a previously asked question.
    pub async fn submit_feedback(&self, user_id: &str, question: &str, rating: i64) -> Result<()> {
        let rating = Rating::new(rating)?;
        self.record(InteractionRecord {
            user_id: user_id.to_string(),
            question: question.to_string(),
            answer: None,
            feedback: Some(rating),
        })
        .await;
        Ok(())
    }

    async fn record(&self, record: InteractionRecord) {
        if let Err(e) = self.log.append(&record).await {
            let err = format!("{:#}", e);
            warn!(user = %record.user_id, error = %err, "failed to write interaction log");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::{InMemoryLog, InMemoryStore};
    use async_trait::async_trait;

    /// Bag-of-words embedder over a tiny fixed vocabulary. Deterministic,
    /// and paraphrases sharing most words land close together.
    struct VocabEmbedder;

    const VOCAB: &[&str] = &[
        "capital", "france", "what", "is", "the", "of", "rust", "language", "weather", "today",
    ];

    fn normalize(word: &str) -> String {
        let w: String = word
            .chars()
            .filter(|c| c.is_alphanumeric() || *c == '\'')
            .collect::<String>()
            .to_lowercase();
        match w.as_str() {
            "what's" => "what".to_string(),
            _ => w,
        }
    }

    #[async_trait]
    impl EmbeddingProvider for VocabEmbedder {
        fn model_name(&self) -> &str {
            "vocab"
        }
        fn dims(&self) -> usize {
            VOCAB.len() + 1
        }
        async fn embed(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|t| {
                    let mut v = vec![0.0f32; VOCAB.len() + 1];
                    for word in t.split_whitespace().map(normalize) {
                        match VOCAB.iter().position(|w| *w == word) {
                            Some(i) => v[i] += 1.0,
                            None => v[VOCAB.len()] += 1.0,
                        }
                    }
                    v
                })
                .collect())
        }
    }

    struct NanEmbedder;

    #[async_trait]
    impl EmbeddingProvider for NanEmbedder {
        fn model_name(&self) -> &str {
            "nan"
        }
        fn dims(&self) -> usize {
            2
        }
        async fn embed(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![f32::NAN, 1.0]).collect())
        }
    }

    struct ZeroEmbedder;

    #[async_trait]
    impl EmbeddingProvider for ZeroEmbedder {
        fn model_name(&self) -> &str {
            "zero"
        }
        fn dims(&self) -> usize {
            3
        }
        async fn embed(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![0.0; 3]).collect())
        }
    }

    struct FailingLog;

    #[async_trait]
    impl InteractionLog for FailingLog {
        async fn append(&self, _record: &InteractionRecord) -> anyhow::Result<()> {
            anyhow::bail!("disk full")
        }
    }

    struct FixedRewriter(Option<&'static str>);

    #[async_trait]
    impl Rewriter for FixedRewriter {
        fn name(&self) -> &str {
            "fixed"
        }
        async fn rewrite(&self, _answer: &str) -> Result<String> {
            self.0
                .map(str::to_string)
                .ok_or_else(|| QaError::RewriteService("503 Service Unavailable".to_string()))
        }
    }

    fn service_with(params: ServiceParams) -> (KnowledgeService, Arc<InMemoryStore>, Arc<InMemoryLog>) {
        let store = Arc::new(InMemoryStore::new());
        let log = Arc::new(InMemoryLog::new());
        let svc = KnowledgeService::new(store.clone(), log.clone(), Arc::new(VocabEmbedder), params);
        (svc, store, log)
    }

    fn service() -> (KnowledgeService, Arc<InMemoryStore>, Arc<InMemoryLog>) {
        service_with(ServiceParams::default())
    }

    fn admin() -> Principal {
        Principal::admin("admin")
    }

    #[tokio::test]
    async fn test_self_match_has_full_similarity() {
        let (svc, _, _) = service();
        svc.add(&admin(), "What is Rust language", "A systems language")
            .await
            .unwrap();

        match svc.find_match("What is Rust language").await.unwrap() {
            MatchOutcome::Matched(best) => assert!((best.similarity - 1.0).abs() < 1e-5),
            other => panic!("expected match, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_capital_of_france_scenario() {
        let (svc, _, _) = service();
        svc.add(&admin(), "What is the capital of France?", "Paris")
            .await
            .unwrap();

        match svc
            .answer("u1", "What's the capital of France", true)
            .await
            .unwrap()
        {
            AnswerOutcome::Answered(a) => {
                assert_eq!(a.original_answer, "Paris");
                assert_eq!(a.text, "Paris");
                assert!(!a.was_rewritten);
            }
            AnswerOutcome::NoMatch => panic!("expected a match"),
        }
    }

    #[tokio::test]
    async fn test_empty_store_is_no_match() {
        let (svc, _, log) = service();
        let outcome = svc.answer("u1", "anything", true).await.unwrap();
        assert_eq!(outcome, AnswerOutcome::NoMatch);

        let records = log.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].answer, None);
    }

    #[tokio::test]
    async fn test_clear_then_query_is_no_match() {
        let (svc, _, _) = service();
        svc.add(&admin(), "What is Rust language", "A language").await.unwrap();
        svc.add(&admin(), "weather today", "Sunny").await.unwrap();
        assert_eq!(svc.clear(&admin()).await.unwrap(), 2);

        for q in ["What is Rust language", "weather today", "capital"] {
            assert_eq!(svc.answer("u", q, true).await.unwrap(), AnswerOutcome::NoMatch);
        }
    }

    #[tokio::test]
    async fn test_remove_existing_and_missing() {
        let (svc, store, _) = service();
        svc.add(&admin(), "weather today", "Sunny").await.unwrap();
        svc.add(&admin(), "What is Rust language", "A language").await.unwrap();

        assert!(svc.remove(&admin(), "weather today").await.unwrap());
        let pairs = svc.list(&admin()).await.unwrap();
        assert!(pairs.iter().all(|p| p.question != "weather today"));

        let before = store.count().await.unwrap();
        assert!(!svc.remove(&admin(), "not there").await.unwrap());
        assert_eq!(store.count().await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_remove_duplicates_all_policy() {
        let (svc, store, _) = service();
        svc.add(&admin(), "weather today", "Sunny").await.unwrap();
        svc.add(&admin(), "weather today", "Rainy").await.unwrap();

        assert!(svc.remove(&admin(), "weather today").await.unwrap());
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_remove_duplicates_first_policy() {
        let (svc, _, _) = service_with(ServiceParams {
            remove_policy: RemovePolicy::First,
            ..ServiceParams::default()
        });
        svc.add(&admin(), "weather today", "Sunny").await.unwrap();
        svc.add(&admin(), "weather today", "Rainy").await.unwrap();

        assert!(svc.remove(&admin(), "weather today").await.unwrap());
        let pairs = svc.list(&admin()).await.unwrap();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].answer, "Rainy");
    }

    #[tokio::test]
    async fn test_duplicates_first_inserted_wins_match() {
        let (svc, _, _) = service();
        svc.add(&admin(), "weather today", "Sunny").await.unwrap();
        svc.add(&admin(), "weather today", "Rainy").await.unwrap();

        match svc.answer("u", "weather today", false).await.unwrap() {
            AnswerOutcome::Answered(a) => assert_eq!(a.text, "Sunny"),
            AnswerOutcome::NoMatch => panic!("expected a match"),
        }
    }

    #[tokio::test]
    async fn test_threshold_rejects_weak_match() {
        let (svc, _, _) = service_with(ServiceParams {
            threshold: 0.9,
            ..ServiceParams::default()
        });
        svc.add(&admin(), "What is the capital of France?", "Paris")
            .await
            .unwrap();

        assert_eq!(
            svc.answer("u", "capital", true).await.unwrap(),
            AnswerOutcome::NoMatch
        );
    }

    #[tokio::test]
    async fn test_question_and_answer_policy_embeds_answer_text() {
        let (svc, _, _) = service_with(ServiceParams {
            embed_text: EmbedTextPolicy::QuestionAndAnswer,
            threshold: 0.3,
            ..ServiceParams::default()
        });
        svc.add(&admin(), "weather", "today").await.unwrap();

        match svc.find_match("weather today").await.unwrap() {
            MatchOutcome::Matched(best) => assert!((best.similarity - 1.0).abs() < 1e-5),
            other => panic!("expected match, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_non_admin_cannot_mutate() {
        let (svc, store, _) = service();
        let user = Principal::user("42");

        assert!(matches!(
            svc.add(&user, "q", "a").await,
            Err(QaError::Unauthorized(_))
        ));
        assert!(matches!(svc.remove(&user, "q").await, Err(QaError::Unauthorized(_))));
        assert!(matches!(svc.list(&user).await, Err(QaError::Unauthorized(_))));
        assert!(matches!(svc.clear(&user).await, Err(QaError::Unauthorized(_))));
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_empty_query_is_invalid_embedding() {
        let (svc, _, _) = service();
        assert!(matches!(
            svc.answer("u", "", true).await,
            Err(QaError::InvalidEmbedding(_))
        ));
        assert!(matches!(
            svc.find_match(" \t ").await,
            Err(QaError::InvalidEmbedding(_))
        ));
    }

    #[tokio::test]
    async fn test_add_rejects_empty_fields_under_every_policy() {
        for embed_text in [EmbedTextPolicy::Question, EmbedTextPolicy::QuestionAndAnswer] {
            let (svc, store, _) = service_with(ServiceParams {
                embed_text,
                ..ServiceParams::default()
            });

            for (q, a) in [("", "Paris"), ("   ", "Paris"), ("capital", ""), ("capital", " \n")] {
                assert!(
                    matches!(svc.add(&admin(), q, a).await, Err(QaError::InvalidInput(_))),
                    "{:?}: ({:?}, {:?}) should be rejected",
                    embed_text,
                    q,
                    a
                );
            }
            assert_eq!(store.count().await.unwrap(), 0);
        }
    }

    #[tokio::test]
    async fn test_add_stores_trimmed_fields() {
        let (svc, _, _) = service();
        svc.add(&admin(), "  weather today \n", "  Sunny ").await.unwrap();

        let pairs = svc.list(&admin()).await.unwrap();
        assert_eq!(pairs[0].question, "weather today");
        assert_eq!(pairs[0].answer, "Sunny");
        assert!(svc.remove(&admin(), "weather today").await.unwrap());
    }

    #[tokio::test]
    async fn test_zero_embedding_does_not_touch_store() {
        let store = Arc::new(InMemoryStore::new());
        let svc = KnowledgeService::new(
            store.clone(),
            Arc::new(InMemoryLog::new()),
            Arc::new(ZeroEmbedder),
            ServiceParams::default(),
        );
        assert!(matches!(
            svc.add(&admin(), "q", "a").await,
            Err(QaError::InvalidEmbedding(_))
        ));
        assert!(matches!(
            svc.find_match("q").await,
            Err(QaError::InvalidEmbedding(_))
        ));
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_nan_embedding_does_not_touch_store() {
        let store = Arc::new(InMemoryStore::new());
        let svc = KnowledgeService::new(
            store.clone(),
            Arc::new(InMemoryLog::new()),
            Arc::new(NanEmbedder),
            ServiceParams::default(),
        );
        assert!(matches!(
            svc.add(&admin(), "q", "a").await,
            Err(QaError::InvalidEmbedding(_))
        ));
        assert!(matches!(
            svc.find_match("q").await,
            Err(QaError::InvalidEmbedding(_))
        ));
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_rewrite_success_and_fallback() {
        let (svc, _, log) = service();
        svc.add(&admin(), "What is the capital of France?", "Paris")
            .await
            .unwrap();

        let ok = svc
            .clone()
            .with_rewriter(Arc::new(FixedRewriter(Some("It's Paris."))));
        match ok.answer("u", "What is the capital of France?", true).await.unwrap() {
            AnswerOutcome::Answered(a) => {
                assert_eq!(a.text, "It's Paris.");
                assert!(a.was_rewritten);
            }
            AnswerOutcome::NoMatch => panic!("expected a match"),
        }

        let failing = svc.clone().with_rewriter(Arc::new(FixedRewriter(None)));
        match failing
            .answer("u", "What is the capital of France?", true)
            .await
            .unwrap()
        {
            AnswerOutcome::Answered(a) => {
                assert_eq!(a.text, "Paris");
                assert!(!a.was_rewritten);
            }
            AnswerOutcome::NoMatch => panic!("expected a match"),
        }

        let records = log.records();
        assert_eq!(records[0].answer.as_deref(), Some("It's Paris."));
        assert_eq!(records[1].answer.as_deref(), Some("Paris"));
    }

    #[tokio::test]
    async fn test_rewrite_can_be_skipped_per_call() {
        let (svc, _, _) = service();
        let svc = svc.with_rewriter(Arc::new(FixedRewriter(Some("rewritten"))));
        svc.add(&admin(), "weather today", "Sunny").await.unwrap();

        match svc.answer("u", "weather today", false).await.unwrap() {
            AnswerOutcome::Answered(a) => {
                assert_eq!(a.text, "Sunny");
                assert!(!a.was_rewritten);
            }
            AnswerOutcome::NoMatch => panic!("expected a match"),
        }
    }

    #[tokio::test]
    async fn test_log_failure_does_not_fail_answer() {
        let store = Arc::new(InMemoryStore::new());
        let svc = KnowledgeService::new(
            store,
            Arc::new(FailingLog),
            Arc::new(VocabEmbedder),
            ServiceParams::default(),
        );
        svc.add(&admin(), "weather today", "Sunny").await.unwrap();

        assert!(svc.answer("u", "weather today", true).await.unwrap() != AnswerOutcome::NoMatch);
        assert!(svc.submit_feedback("u", "weather today", 4).await.is_ok());
    }

    #[tokio::test]
    async fn test_feedback_is_logged_and_validated() {
        let (svc, _, log) = service();
        svc.submit_feedback("u9", "weather today", 5).await.unwrap();
        assert!(matches!(
            svc.submit_feedback("u9", "weather today", 0).await,
            Err(QaError::InvalidRating(0))
        ));

        let records = log.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].user_id, "u9");
        assert_eq!(records[0].feedback.map(Rating::get), Some(5));
    }
}
