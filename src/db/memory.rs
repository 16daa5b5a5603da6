//! Memory and embedding SQL primitives.
//!
//! All queries are scoped to the store's (tenant, workspace) partition.
//! Vector search scores are `1 - cosine_distance`; lexical search scores are
//! pg_trgm `similarity()` in `[0, 1]` with zero-similarity rows excluded by
//! the `%` match predicate.

use crate::db::Db;
use crate::error::{Error, Result};
use crate::memory::types::{
    AddMemoryParams, Memory, MemoryWithScore, StoredEmbedding, UpdateMemoryParams,
};
use pgvector::Vector;
use sqlx::postgres::PgRow;
use sqlx::{QueryBuilder, Row};
use tracing::warn;

/// Columns of a full memory row, in the order [`memory_from_row`] expects.
pub(crate) const MEMORY_COLS: &str = "id, tenant_id, workspace_id, kind, text, source, \
                           created_at, updated_at, tags, importance, ttl_days, meta";

/// Map a row holding [`MEMORY_COLS`] into a [`Memory`].
pub(crate) fn memory_from_row(row: &PgRow) -> std::result::Result<Memory, sqlx::Error> {
    Ok(Memory {
        id: row.try_get("id")?,
        tenant_id: row.try_get("tenant_id")?,
        workspace_id: row.try_get("workspace_id")?,
        kind: row.try_get("kind")?,
        text: row.try_get("text")?,
        source: row.try_get("source")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        tags: row.try_get("tags")?,
        importance: row.try_get("importance")?,
        ttl_days: row.try_get("ttl_days")?,
        meta: row.try_get("meta")?,
    })
}

fn scored_from_row(row: &PgRow) -> std::result::Result<MemoryWithScore, sqlx::Error> {
    Ok(MemoryWithScore {
        memory: memory_from_row(row)?,
        score: row.try_get("score")?,
    })
}

impl Db {
    /// Insert a new memory and return its assigned id.
    pub async fn add_memory(&self, params: AddMemoryParams) -> Result<i64> {
        let meta = params.meta.unwrap_or_else(|| serde_json::json!({}));

        let id: i64 = sqlx::query_scalar(
            "INSERT INTO memories \
               (tenant_id, workspace_id, kind, text, source, tags, importance, ttl_days, meta) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING id",
        )
        .bind(self.tenant_id())
        .bind(self.workspace_id())
        .bind(&params.kind)
        .bind(&params.text)
        .bind(&params.source)
        .bind(&params.tags)
        .bind(params.importance)
        .bind(params.ttl_days)
        .bind(&meta)
        .fetch_one(self.pool())
        .await?;

        Ok(id)
    }

    /// Fetch a memory by id within the partition.
    pub async fn get_memory(&self, id: i64) -> Result<Option<Memory>> {
        let row = sqlx::query(sqlx::AssertSqlSafe(format!(
            "SELECT {MEMORY_COLS} FROM memories \
             WHERE id = $1 AND tenant_id = $2 AND workspace_id = $3"
        )))
        .bind(id)
        .bind(self.tenant_id())
        .bind(self.workspace_id())
        .fetch_optional(self.pool())
        .await?;

        row.as_ref().map(memory_from_row).transpose().map_err(Error::from)
    }

    /// Partial update. Only `Some` fields change; `updated_at` always bumps.
    pub async fn update_memory(&self, id: i64, patch: UpdateMemoryParams) -> Result<()> {
        let mut qb: QueryBuilder<sqlx::Postgres> =
            QueryBuilder::new("UPDATE memories SET updated_at = now()");

        if let Some(kind) = &patch.kind {
            qb.push(", kind = ").push_bind(kind);
        }
        if let Some(text) = &patch.text {
            qb.push(", text = ").push_bind(text);
        }
        if let Some(source) = &patch.source {
            qb.push(", source = ").push_bind(source);
        }
        if let Some(tags) = &patch.tags {
            qb.push(", tags = ").push_bind(tags);
        }
        if let Some(importance) = patch.importance {
            qb.push(", importance = ").push_bind(importance);
        }
        if let Some(ttl_days) = patch.ttl_days {
            qb.push(", ttl_days = ").push_bind(ttl_days);
        }
        if let Some(meta) = &patch.meta {
            qb.push(", meta = ").push_bind(meta);
        }

        qb.push(" WHERE id = ").push_bind(id);
        qb.push(" AND tenant_id = ").push_bind(self.tenant_id());
        qb.push(" AND workspace_id = ").push_bind(self.workspace_id());

        let result = qb.build().execute(self.pool()).await?;
        if result.rows_affected() == 0 {
            return Err(Error::not_found(format!("memory {id}")));
        }
        Ok(())
    }

    /// Delete a memory. Embeddings and entity links cascade.
    pub async fn delete_memory(&self, id: i64) -> Result<()> {
        let result = sqlx::query(
            "DELETE FROM memories WHERE id = $1 AND tenant_id = $2 AND workspace_id = $3",
        )
        .bind(id)
        .bind(self.tenant_id())
        .bind(self.workspace_id())
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::not_found(format!("memory {id}")));
        }
        Ok(())
    }

    /// Count memories in the partition.
    pub async fn count_memories(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM memories WHERE tenant_id = $1 AND workspace_id = $2",
        )
        .bind(self.tenant_id())
        .bind(self.workspace_id())
        .fetch_one(self.pool())
        .await?;
        Ok(count)
    }

    /// Insert or replace the embedding for (memory, model). The stored
    /// dimension count is always the vector length.
    pub async fn upsert_embedding(
        &self,
        memory_id: i64,
        model: &str,
        vector: &[f32],
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO memory_embeddings (memory_id, model, dims, embedding) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (memory_id, model) DO UPDATE SET \
                 dims = EXCLUDED.dims, \
                 embedding = EXCLUDED.embedding",
        )
        .bind(memory_id)
        .bind(model)
        .bind(vector.len() as i32)
        .bind(Vector::from(vector.to_vec()))
        .execute(self.pool())
        .await?;

        // Index creation is an optimization; a failure must not fail the write.
        if let Err(e) = self.ensure_hnsw_index().await {
            warn!(error = %e, "failed to create HNSW index");
        }

        Ok(())
    }

    /// All embeddings stored for a memory, one per model.
    pub async fn get_embeddings(&self, memory_id: i64) -> Result<Vec<StoredEmbedding>> {
        let rows = sqlx::query(
            "SELECT memory_id, model, dims, embedding \
             FROM memory_embeddings WHERE memory_id = $1 ORDER BY model",
        )
        .bind(memory_id)
        .fetch_all(self.pool())
        .await?;

        rows.iter()
            .map(|row| {
                let vector: Vector = row.try_get("embedding")?;
                Ok(StoredEmbedding {
                    memory_id: row.try_get("memory_id")?,
                    model: row.try_get("model")?,
                    dims: row.try_get("dims")?,
                    vector: vector.to_vec(),
                })
            })
            .collect::<std::result::Result<Vec<_>, sqlx::Error>>()
            .map_err(Error::from)
    }

    /// Remove one (memory, model) embedding.
    pub async fn delete_embedding(&self, memory_id: i64, model: &str) -> Result<()> {
        sqlx::query("DELETE FROM memory_embeddings WHERE memory_id = $1 AND model = $2")
            .bind(memory_id)
            .bind(model)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    /// Cosine similarity search, ordered by ascending distance.
    ///
    /// With a model filter only that model's embeddings participate. Without
    /// one, each memory contributes its best-matching embedding across all
    /// models (dedup by memory id, minimum distance kept).
    pub async fn vector_search(
        &self,
        embedding: &[f32],
        limit: i64,
        model: Option<&str>,
    ) -> Result<Vec<MemoryWithScore>> {
        let limit = if limit <= 0 { 10 } else { limit };

        let rows = match model {
            Some(model) => {
                sqlx::query(sqlx::AssertSqlSafe(format!(
                    "SELECT m.{}, (1 - (e.embedding <=> $1))::real AS score \
                     FROM memories m \
                     JOIN memory_embeddings e ON m.id = e.memory_id \
                     WHERE m.tenant_id = $2 AND m.workspace_id = $3 AND e.model = $4 \
                     ORDER BY e.embedding <=> $1 \
                     LIMIT $5",
                    MEMORY_COLS.replace(", ", ", m.")
                )))
                .bind(Vector::from(embedding.to_vec()))
                .bind(self.tenant_id())
                .bind(self.workspace_id())
                .bind(model)
                .bind(limit)
                .fetch_all(self.pool())
                .await?
            }
            None => {
                // DISTINCT ON keeps the closest embedding per memory; the
                // outer query restores distance ordering.
                sqlx::query(sqlx::AssertSqlSafe(format!(
                    "SELECT * FROM ( \
                         SELECT DISTINCT ON (m.id) m.{}, \
                                (1 - (e.embedding <=> $1))::real AS score \
                         FROM memories m \
                         JOIN memory_embeddings e ON m.id = e.memory_id \
                         WHERE m.tenant_id = $2 AND m.workspace_id = $3 \
                         ORDER BY m.id, e.embedding <=> $1 \
                     ) best \
                     ORDER BY best.score DESC \
                     LIMIT $4",
                    MEMORY_COLS.replace(", ", ", m.")
                )))
                .bind(Vector::from(embedding.to_vec()))
                .bind(self.tenant_id())
                .bind(self.workspace_id())
                .bind(limit)
                .fetch_all(self.pool())
                .await?
            }
        };

        rows.iter()
            .map(scored_from_row)
            .collect::<std::result::Result<Vec<_>, sqlx::Error>>()
            .map_err(Error::from)
    }

    /// Trigram similarity search over memory text, best matches first.
    /// Rows that do not pass the `%` match predicate are excluded.
    pub async fn lexical_search(&self, query: &str, limit: i64) -> Result<Vec<MemoryWithScore>> {
        let limit = if limit <= 0 { 10 } else { limit };

        let rows = sqlx::query(sqlx::AssertSqlSafe(format!(
            "SELECT m.{}, similarity(m.text, $1) AS score \
             FROM memories m \
             WHERE m.tenant_id = $2 AND m.workspace_id = $3 AND m.text % $1 \
             ORDER BY score DESC \
             LIMIT $4",
            MEMORY_COLS.replace(", ", ", m.")
        )))
        .bind(query)
        .bind(self.tenant_id())
        .bind(self.workspace_id())
        .bind(limit)
        .fetch_all(self.pool())
        .await?;

        rows.iter()
            .map(scored_from_row)
            .collect::<std::result::Result<Vec<_>, sqlx::Error>>()
            .map_err(Error::from)
    }
}
