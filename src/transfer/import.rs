//! JSONL import with per-record transactions.
//!
//! Malformed lines and per-record failures are counted and skipped; the
//! overall call succeeds. Each record upserts its memory row and embedding
//! inside one transaction, so a half-imported record never persists.

use crate::db::Db;
use crate::embedding::EmbeddingProvider;
use crate::error::{Error, Result};
use crate::transfer::{ImportOptions, ImportStats, MemoryRecord};
use pgvector::Vector;
use std::sync::Arc;
use tracing::warn;

/// Read memories from JSONL `data` and upsert them into the store.
pub async fn import(
    db: &Db,
    data: &str,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    opts: ImportOptions,
) -> Result<ImportStats> {
    let mut stats = ImportStats::default();

    for line in data.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        stats.total += 1;

        let mut record: MemoryRecord = match serde_json::from_str(line) {
            Ok(record) => record,
            Err(e) => {
                warn!(error = %e, "skipping malformed import line");
                stats.errors += 1;
                continue;
            }
        };

        if let Some(tenant) = &opts.override_tenant_id {
            record.tenant_id = tenant.clone();
        }
        if let Some(workspace) = &opts.override_workspace_id {
            record.workspace_id = Some(workspace.clone());
        }
        if record.workspace_id.is_none() {
            record.workspace_id = Some("default".to_string());
        }

        if opts.dry_run {
            stats.imported += 1;
            continue;
        }

        if opts.skip_existing {
            match memory_exists(db, &record).await {
                Ok(true) => {
                    stats.skipped += 1;
                    continue;
                }
                Ok(false) => {}
                Err(e) => {
                    warn!(id = record.id, error = %e, "existence check failed");
                    stats.errors += 1;
                    continue;
                }
            }
        }

        match import_record(db, &record, embedder.as_deref(), &opts).await {
            Ok(()) => stats.imported += 1,
            Err(e) => {
                warn!(id = record.id, error = %e, "failed to import record");
                stats.errors += 1;
            }
        }
    }

    // Imported rows carry explicit ids; advance the sequence so later
    // inserts cannot collide.
    if !opts.dry_run && stats.imported > 0 {
        sqlx::query(
            "SELECT setval(pg_get_serial_sequence('memories', 'id'), \
                    GREATEST((SELECT COALESCE(MAX(id), 1) FROM memories), 1))",
        )
        .execute(db.pool())
        .await?;
    }

    Ok(stats)
}

async fn memory_exists(db: &Db, record: &MemoryRecord) -> Result<bool> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM memories \
         WHERE id = $1 AND tenant_id = $2 AND workspace_id = $3)",
    )
    .bind(record.id)
    .bind(&record.tenant_id)
    .bind(record.workspace_id.as_deref())
    .fetch_one(db.pool())
    .await?;
    Ok(exists)
}

async fn import_record(
    db: &Db,
    record: &MemoryRecord,
    embedder: Option<&dyn EmbeddingProvider>,
    opts: &ImportOptions,
) -> Result<()> {
    // Validate the carried vector before opening a transaction.
    let carried = match (&record.embedding, opts.regenerate_embeddings) {
        (Some(e), false) => {
            if e.vector.len() != e.dims as usize {
                return Err(Error::Transfer(format!(
                    "embedding dims mismatch for record {}: dims={} len={}",
                    record.id,
                    e.dims,
                    e.vector.len()
                )));
            }
            Some((e.model.clone(), e.vector.clone()))
        }
        _ => None,
    };

    let regenerated = match (embedder, opts.regenerate_embeddings) {
        (Some(embedder), true) => {
            let vector = embedder
                .embed(&record.text)
                .await
                .map_err(|e| Error::Transfer(format!("regenerate embedding: {e}")))?;
            Some((embedder.model_name().to_string(), vector))
        }
        _ => None,
    };

    let mut tx = db.pool().begin().await?;

    sqlx::query(
        "INSERT INTO memories \
           (id, tenant_id, workspace_id, kind, text, source, created_at, updated_at, \
            tags, importance, ttl_days, meta) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
         ON CONFLICT (id) DO UPDATE SET \
             workspace_id = EXCLUDED.workspace_id, \
             kind = EXCLUDED.kind, \
             text = EXCLUDED.text, \
             source = EXCLUDED.source, \
             updated_at = EXCLUDED.updated_at, \
             tags = EXCLUDED.tags, \
             importance = EXCLUDED.importance, \
             ttl_days = EXCLUDED.ttl_days, \
             meta = EXCLUDED.meta",
    )
    .bind(record.id)
    .bind(&record.tenant_id)
    .bind(record.workspace_id.as_deref())
    .bind(&record.kind)
    .bind(&record.text)
    .bind(&record.source)
    .bind(record.created_at)
    .bind(record.updated_at)
    .bind(&record.tags)
    .bind(record.importance)
    .bind(record.ttl_days)
    .bind(&record.meta)
    .execute(&mut *tx)
    .await?;

    if let Some((model, vector)) = regenerated.or(carried) {
        sqlx::query(
            "INSERT INTO memory_embeddings (memory_id, model, dims, embedding) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (memory_id, model) DO UPDATE SET \
                 dims = EXCLUDED.dims, \
                 embedding = EXCLUDED.embedding",
        )
        .bind(record.id)
        .bind(&model)
        .bind(vector.len() as i32)
        .bind(Vector::from(vector))
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(())
}
