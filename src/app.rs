//! Wiring from configuration to a ready [`KnowledgeService`].

use std::sync::Arc;

use anyhow::{Context, Result};
use qa_harness_core::service::KnowledgeService;
use qa_harness_core::store::InteractionLog;

use crate::background_log::BackgroundLog;
use crate::config::Config;
use crate::db;
use crate::embedding::{create_provider, DisabledProvider, EmbeddingProvider};
use crate::migrate::apply_schema;
use crate::rewrite::create_rewriter;
use crate::sqlite_store::SqliteStore;

/// How interaction records reach the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogDelivery {
    /// Awaited before the call returns. For one-shot CLI commands.
    Inline,
    /// Spawned onto the runtime. For the server.
    Background,
}

/// Build the full service: SQLite store and log, the configured embedding
/// provider (local models are loaded here), and the rewriter if enabled.
pub async fn build_service(config: &Config, delivery: LogDelivery) -> Result<KnowledgeService> {
    let embedder = create_provider(&config.embedding)
        .context("Failed to create embedding provider")?;
    let service = assemble(config, embedder, delivery).await?;

    match create_rewriter(&config.rewrite).context("Failed to create rewriter")? {
        Some(rewriter) => Ok(service.with_rewriter(rewriter)),
        None => Ok(service),
    }
}

/// Build a service for commands that never embed (list, remove, clear).
///
/// Skips model loading so these stay fast.
pub async fn build_service_without_embeddings(config: &Config) -> Result<KnowledgeService> {
    assemble(config, Arc::new(DisabledProvider), LogDelivery::Inline).await
}

async fn assemble(
    config: &Config,
    embedder: Arc<dyn EmbeddingProvider>,
    delivery: LogDelivery,
) -> Result<KnowledgeService> {
    let pool = db::connect(config).await?;
    apply_schema(&pool).await?;

    let store = Arc::new(SqliteStore::new(pool, embedder.model_name()));
    let log: Arc<dyn InteractionLog> = match delivery {
        LogDelivery::Inline => store.clone(),
        LogDelivery::Background => Arc::new(BackgroundLog::new(store.clone())),
    };
    Ok(KnowledgeService::new(
        store,
        log,
        embedder,
        config.matching.service_params(),
    ))
}
