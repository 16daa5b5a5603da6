//! JSONL export, ordered by memory id ascending.

use crate::db::Db;
use crate::error::{Error, Result};
use crate::transfer::{EmbeddingRecord, ExportOptions, ExportStats, MemoryRecord};
use pgvector::Vector;
use sqlx::Row;
use std::io::Write;

/// Write the partition's memories to `w`, one JSON object per line.
/// Per-record failures are counted, not fatal.
pub async fn export(db: &Db, w: &mut (dyn Write + Send), opts: ExportOptions) -> Result<ExportStats> {
    let mut stats = ExportStats::default();

    let mut qb: sqlx::QueryBuilder<sqlx::Postgres> = sqlx::QueryBuilder::new(
        "SELECT id, tenant_id, workspace_id, kind, text, source, created_at, updated_at, \
                tags, importance, ttl_days, meta \
         FROM memories WHERE tenant_id = ",
    );
    qb.push_bind(db.tenant_id());
    qb.push(" AND workspace_id = ").push_bind(db.workspace_id());
    if let Some(kind) = &opts.kind {
        qb.push(" AND kind = ").push_bind(kind);
    }
    qb.push(" ORDER BY id");
    if let Some(limit) = opts.limit {
        if limit > 0 {
            qb.push(" LIMIT ").push_bind(limit);
        }
    }

    let rows = qb.build().fetch_all(db.pool()).await?;

    for row in &rows {
        stats.total += 1;

        let mut record = match record_from_row(row) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(error = %e, "skipping unreadable row during export");
                stats.errors += 1;
                continue;
            }
        };

        if opts.include_embeddings {
            record.embedding =
                fetch_embedding(db, record.id, opts.embedding_model.as_deref()).await?;
        }

        let line = serde_json::to_string(&record)
            .map_err(|e| Error::Transfer(format!("encode record {}: {e}", record.id)))?;
        writeln!(w, "{line}").map_err(|e| Error::Transfer(format!("write: {e}")))?;

        stats.exported += 1;
    }

    Ok(stats)
}

fn record_from_row(row: &sqlx::postgres::PgRow) -> std::result::Result<MemoryRecord, sqlx::Error> {
    Ok(MemoryRecord {
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
        embedding: None,
    })
}

/// Fetch the vector to inline: the named model's when given, otherwise any
/// single embedding. A memory without embeddings exports without one.
async fn fetch_embedding(
    db: &Db,
    memory_id: i64,
    model: Option<&str>,
) -> Result<Option<EmbeddingRecord>> {
    let row = sqlx::query(
        "SELECT model, dims, embedding FROM memory_embeddings \
         WHERE memory_id = $1 AND ($2::text IS NULL OR model = $2) \
         ORDER BY model LIMIT 1",
    )
    .bind(memory_id)
    .bind(model)
    .fetch_optional(db.pool())
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let vector: Vector = row.try_get("embedding").map_err(Error::Database)?;
    Ok(Some(EmbeddingRecord {
        model: row.try_get("model").map_err(Error::Database)?,
        dims: row.try_get("dims").map_err(Error::Database)?,
        vector: vector.to_vec(),
    }))
}
