//! End-to-end service tests over a real SQLite store.

use std::sync::Arc;

use async_trait::async_trait;
use qa_harness::{db, migrate, sqlite_store::SqliteStore};
use qa_harness_core::embedding::EmbeddingProvider;
use qa_harness_core::error::QaError;
use qa_harness_core::models::{EmbedTextPolicy, Principal, RemovePolicy};
use qa_harness_core::rewrite::Rewriter;
use qa_harness_core::service::{AnswerOutcome, KnowledgeService, ServiceParams};
use sqlx::Row;
use tempfile::TempDir;

/// Bag-of-words embedder over a fixed vocabulary.
struct VocabEmbedder;

const VOCAB: &[&str] = &["capital", "france", "paris", "hours", "open", "weekdays", "refund"];

#[async_trait]
impl EmbeddingProvider for VocabEmbedder {
    fn model_name(&self) -> &str {
        "vocab"
    }
    fn dims(&self) -> usize {
        VOCAB.len()
    }
    async fn embed(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|t| {
                let lower = t.to_lowercase();
                VOCAB
                    .iter()
                    .map(|w| lower.matches(w).count() as f32)
                    .collect()
            })
            .collect())
    }
}

struct FailingRewriter;

#[async_trait]
impl Rewriter for FailingRewriter {
    fn name(&self) -> &str {
        "failing"
    }
    async fn rewrite(&self, _answer: &str) -> qa_harness_core::Result<String> {
        Err(QaError::RewriteService("timed out".to_string()))
    }
}

async fn setup(params: ServiceParams) -> (TempDir, SqliteStore, KnowledgeService) {
    let tmp = TempDir::new().unwrap();
    let pool = db::connect_path(&tmp.path().join("qa.sqlite")).await.unwrap();
    migrate::apply_schema(&pool).await.unwrap();
    let store = SqliteStore::new(pool, "vocab");
    let shared = Arc::new(store.clone());
    let service = KnowledgeService::new(shared.clone(), shared, Arc::new(VocabEmbedder), params);
    (tmp, store, service)
}

#[tokio::test]
async fn test_add_answer_remove_roundtrip() {
    let (_tmp, store, service) = setup(ServiceParams::default()).await;
    let admin = Principal::admin("42");

    service
        .add(&admin, "What is the capital of France?", "Paris")
        .await
        .unwrap();
    service
        .add(&admin, "When are you open?", "9 to 5 on weekdays")
        .await
        .unwrap();

    match service.answer("u1", "capital of france", true).await.unwrap() {
        AnswerOutcome::Answered(a) => {
            assert_eq!(a.text, "Paris");
            assert!(!a.was_rewritten);
            assert_eq!(a.matched_question, "What is the capital of France?");
        }
        AnswerOutcome::NoMatch => panic!("expected a match"),
    }

    assert!(matches!(
        service.answer("u1", "refund", true).await.unwrap(),
        AnswerOutcome::NoMatch
    ));

    assert!(service
        .remove(&admin, "What is the capital of France?")
        .await
        .unwrap());
    assert!(!service
        .remove(&admin, "What is the capital of France?")
        .await
        .unwrap());

    let rows = sqlx::query("SELECT user_id, answer FROM interaction_log ORDER BY id")
        .fetch_all(store.pool())
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);
    let first: Option<String> = rows[0].get("answer");
    let second: Option<String> = rows[1].get("answer");
    assert_eq!(first.as_deref(), Some("Paris"));
    assert_eq!(second, None);
}

#[tokio::test]
async fn test_rewrite_failure_returns_original_answer() {
    let (_tmp, _store, service) = setup(ServiceParams::default()).await;
    let service = service.with_rewriter(Arc::new(FailingRewriter));

    service
        .add(&Principal::admin("42"), "What is the capital of France?", "Paris")
        .await
        .unwrap();

    match service.answer("u1", "capital france", true).await.unwrap() {
        AnswerOutcome::Answered(a) => {
            assert_eq!(a.text, "Paris");
            assert!(!a.was_rewritten);
        }
        AnswerOutcome::NoMatch => panic!("expected a match"),
    }
}

#[tokio::test]
async fn test_non_admin_cannot_mutate() {
    let (_tmp, store, service) = setup(ServiceParams::default()).await;
    let user = Principal::user("7");

    assert!(matches!(
        service.add(&user, "q capital", "a").await,
        Err(QaError::Unauthorized(_))
    ));
    assert!(matches!(
        service.clear(&user).await,
        Err(QaError::Unauthorized(_))
    ));
    assert!(matches!(
        service.list(&user).await,
        Err(QaError::Unauthorized(_))
    ));

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM knowledge_base")
        .fetch_one(store.pool())
        .await
        .unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
async fn test_remove_first_policy_keeps_later_duplicates() {
    let (_tmp, _store, service) = setup(ServiceParams {
        remove_policy: RemovePolicy::First,
        embed_text: EmbedTextPolicy::QuestionAndAnswer,
        ..ServiceParams::default()
    })
    .await;
    let admin = Principal::admin("42");

    service.add(&admin, "hours", "open 9-5").await.unwrap();
    service.add(&admin, "hours", "open weekdays").await.unwrap();

    assert!(service.remove(&admin, "hours").await.unwrap());
    let left = service.list(&admin).await.unwrap();
    assert_eq!(left.len(), 1);
    assert_eq!(left[0].answer, "open weekdays");

    assert_eq!(service.clear(&admin).await.unwrap(), 1);
    assert!(service.list(&admin).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_feedback_persists_rating() {
    let (_tmp, store, service) = setup(ServiceParams::default()).await;

    service.submit_feedback("7", "capital", 3).await.unwrap();
    assert!(matches!(
        service.submit_feedback("7", "capital", 0).await,
        Err(QaError::InvalidRating(0))
    ));

    let ratings: Vec<i64> = sqlx::query_scalar("SELECT feedback FROM interaction_log")
        .fetch_all(store.pool())
        .await
        .unwrap();
    assert_eq!(ratings, vec![3]);
}
