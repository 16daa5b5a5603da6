//! PostgreSQL store: connection pool, schema migration, and SQL primitives.
//!
//! [`Db`] wraps a shared [`sqlx::PgPool`] with the (tenant, workspace)
//! partition every query is scoped to. The pool is the process's only global
//! mutable resource; it is shared by the request handler, the sweeper, and
//! batch jobs.

pub mod entity;
pub mod memory;
pub mod migrations;

use crate::error::{Error, Result};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{debug, info};

/// Process-wide latch for the lazily created HNSW index. pgvector can only
/// build the index once at least one row's dimensionality is observable, so
/// creation happens after the first embedding upsert.
static HNSW_INDEX_CREATED: tokio::sync::Mutex<bool> = tokio::sync::Mutex::const_new(false);

/// Shared database handle, scoped to one (tenant, workspace) partition.
#[derive(Clone)]
pub struct Db {
    pool: PgPool,
    tenant_id: String,
    workspace_id: String,
}

impl Db {
    /// Connect to PostgreSQL and verify the connection. Does not migrate.
    pub async fn connect(
        url: &str,
        tenant_id: impl Into<String>,
        workspace_id: impl Into<String>,
    ) -> Result<Self> {
        Self::connect_with(url, tenant_id, workspace_id, 10).await
    }

    pub async fn connect_with(
        url: &str,
        tenant_id: impl Into<String>,
        workspace_id: impl Into<String>,
        max_connections: u32,
    ) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(1)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(1800))
            .connect(url)
            .await?;

        Ok(Self {
            pool,
            tenant_id: tenant_id.into(),
            workspace_id: workspace_id.into(),
        })
    }

    /// Wrap an existing pool (tests, workspace switches).
    pub fn with_pool(
        pool: PgPool,
        tenant_id: impl Into<String>,
        workspace_id: impl Into<String>,
    ) -> Self {
        Self {
            pool,
            tenant_id: tenant_id.into(),
            workspace_id: workspace_id.into(),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    pub fn workspace_id(&self) -> &str {
        &self.workspace_id
    }

    /// Apply all schema statements in lexicographic name order.
    ///
    /// Statements are individually idempotent, so this is safe to run on
    /// every startup and concurrently-started instances converge.
    pub async fn migrate(&self) -> Result<()> {
        let mut ordered: Vec<_> = migrations::MIGRATIONS.to_vec();
        ordered.sort_by_key(|(name, _)| *name);

        for (name, sql) in ordered {
            debug!(migration = name, "applying schema statement");
            sqlx::query(sql)
                .execute(&self.pool)
                .await
                .map_err(|source| Error::Migration {
                    name: name.to_string(),
                    source,
                })?;
        }

        info!("database schema up to date");
        Ok(())
    }

    /// Create the HNSW cosine index on `memory_embeddings` if it is missing.
    ///
    /// Called after embedding upserts. The latch keeps the existence check to
    /// one round-trip per process lifetime.
    pub async fn ensure_hnsw_index(&self) -> Result<()> {
        let mut created = HNSW_INDEX_CREATED.lock().await;
        if *created {
            return Ok(());
        }

        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM pg_indexes WHERE indexname = 'idx_memory_embed_hnsw')",
        )
        .fetch_one(&self.pool)
        .await?;

        if !exists {
            sqlx::query(
                "CREATE INDEX IF NOT EXISTS idx_memory_embed_hnsw \
                 ON memory_embeddings USING hnsw (embedding vector_cosine_ops)",
            )
            .execute(&self.pool)
            .await?;
            info!("created HNSW index on memory_embeddings");
        }

        *created = true;
        Ok(())
    }

    /// Verify connectivity. Used by the liveness endpoint.
    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Close the pool, waiting for checked-out connections to return.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
