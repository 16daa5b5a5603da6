//! Batch re-embedding of all memories under a target model.
//!
//! Iterates the partition by id ascending with offset paging, so newly
//! appended rows (monotonically increasing ids) are picked up and rows
//! inserted into already-visited ranges are not revisited. Cancellation is
//! checked at batch boundaries; per-memory failures accumulate into the
//! stats and the run continues.

use crate::db::Db;
use crate::embedding::EmbeddingProvider;
use crate::error::Result;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct ReembedConfig {
    /// Memories fetched per page.
    pub batch_size: i64,
    /// Fixed delay between batches (provider rate limiting).
    pub delay_between_batches: Duration,
    /// After a successful upsert, drop the memory's other-model embeddings.
    pub delete_old_embeddings: bool,
    /// Count memories that already have a target-model embedding as skipped.
    pub skip_existing: bool,
    /// Model to re-embed under; defaults to the provider's model.
    pub target_model: Option<String>,
}

impl Default for ReembedConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            delay_between_batches: Duration::from_millis(100),
            delete_old_embeddings: false,
            skip_existing: true,
            target_model: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct ReembedStats {
    pub total: i64,
    pub processed: i64,
    pub skipped: i64,
    pub errors: i64,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u128,
    /// True when the run stopped early on a cancellation signal.
    pub cancelled: bool,
}

pub struct Reembedder {
    db: Arc<Db>,
    provider: Arc<dyn EmbeddingProvider>,
    config: ReembedConfig,
}

impl Reembedder {
    pub fn new(db: Arc<Db>, provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            db,
            provider,
            config: ReembedConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ReembedConfig) -> Self {
        self.config = config;
        self
    }

    fn target_model(&self) -> &str {
        self.config
            .target_model
            .as_deref()
            .unwrap_or_else(|| self.provider.model_name())
    }

    /// Re-embed every memory in the partition. `on_progress` receives
    /// (processed, total) after each memory. Returns partial stats when
    /// `cancel` fires between batches.
    pub async fn run(
        &self,
        mut cancel: Option<watch::Receiver<bool>>,
        mut on_progress: impl FnMut(i64, i64),
    ) -> Result<ReembedStats> {
        let start = Instant::now();
        let mut stats = ReembedStats {
            total: self.db.count_memories().await?,
            ..Default::default()
        };

        if stats.total == 0 {
            stats.duration_ms = start.elapsed().as_millis();
            return Ok(stats);
        }

        let model = self.target_model().to_string();
        let mut offset: i64 = 0;

        loop {
            if let Some(cancel) = cancel.as_mut() {
                if *cancel.borrow_and_update() {
                    stats.cancelled = true;
                    break;
                }
            }

            let batch: Vec<(i64, String)> = sqlx::query_as(
                "SELECT id, text FROM memories \
                 WHERE tenant_id = $1 AND workspace_id = $2 \
                 ORDER BY id \
                 LIMIT $3 OFFSET $4",
            )
            .bind(self.db.tenant_id())
            .bind(self.db.workspace_id())
            .bind(self.config.batch_size)
            .bind(offset)
            .fetch_all(self.db.pool())
            .await?;

            if batch.is_empty() {
                break;
            }

            for (id, text) in &batch {
                if self.config.skip_existing && self.has_embedding(*id, &model).await? {
                    stats.skipped += 1;
                    stats.processed += 1;
                    on_progress(stats.processed, stats.total);
                    continue;
                }

                if let Err(e) = self.reembed_one(*id, text, &model).await {
                    warn!(memory_id = id, error = %e, "re-embed failed");
                    stats.errors += 1;
                }

                stats.processed += 1;
                on_progress(stats.processed, stats.total);
            }

            offset += batch.len() as i64;

            if !self.config.delay_between_batches.is_zero() {
                tokio::time::sleep(self.config.delay_between_batches).await;
            }
        }

        stats.duration_ms = start.elapsed().as_millis();
        Ok(stats)
    }

    async fn has_embedding(&self, memory_id: i64, model: &str) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM memory_embeddings \
             WHERE memory_id = $1 AND model = $2)",
        )
        .bind(memory_id)
        .bind(model)
        .fetch_one(self.db.pool())
        .await?;
        Ok(exists)
    }

    async fn reembed_one(&self, memory_id: i64, text: &str, model: &str) -> Result<()> {
        let vector = self.provider.embed(text).await?;
        self.db.upsert_embedding(memory_id, model, &vector).await?;

        if self.config.delete_old_embeddings {
            sqlx::query("DELETE FROM memory_embeddings WHERE memory_id = $1 AND model != $2")
                .bind(memory_id)
                .bind(model)
                .execute(self.db.pool())
                .await?;
        }

        Ok(())
    }
}
