//! Detached delivery for the interaction log.
//!
//! [`BackgroundLog`] hands each record to a spawned tokio task and returns
//! at once, so a slow or failing log write never delays the answer. Used by
//! the long-running server; the one-shot CLI writes inline because its
//! runtime shuts down right after the command finishes.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use qa_harness_core::models::InteractionRecord;
use qa_harness_core::store::InteractionLog;
use tracing::warn;

/// Wraps another [`InteractionLog`] and appends to it off the request path.
pub struct BackgroundLog {
    inner: Arc<dyn InteractionLog>,
}

impl BackgroundLog {
    pub fn new(inner: Arc<dyn InteractionLog>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl InteractionLog for BackgroundLog {
    async fn append(&self, record: &InteractionRecord) -> Result<()> {
        let inner = Arc::clone(&self.inner);
        let record = record.clone();
        tokio::spawn(async move {
            if let Err(e) = inner.append(&record).await {
                let err = format!("{:#}", e);
                warn!(user = %record.user_id, error = %err, "background interaction log write failed");
            }
        });
        Ok(())
    }
}
