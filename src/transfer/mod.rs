//! Lossless JSONL export/import of memories.
//!
//! One JSON object per line, stable across versions (additive fields only).
//! Timestamps are RFC 3339 with timezone, `tags` is always an array, `meta`
//! always an object, and ids are exact integers. When embeddings travel with
//! the export, each record carries its primary model's vector inline.

mod export;
mod import;

pub use export::export;
pub use import::import;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One line of the interchange format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub id: i64,
    pub tenant_id: String,
    #[serde(default)]
    pub workspace_id: Option<String>,
    pub kind: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub importance: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl_days: Option<i32>,
    #[serde(default = "empty_object")]
    pub meta: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<EmbeddingRecord>,
}

fn empty_object() -> serde_json::Value {
    serde_json::json!({})
}

/// An inline embedding. `dims` must equal `vector.len()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    pub model: String,
    pub dims: i32,
    pub vector: Vec<f32>,
}

#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    /// Inline each record's primary-model vector.
    pub include_embeddings: bool,
    /// Which model's vector to inline; `None` takes any one embedding.
    pub embedding_model: Option<String>,
    /// Restrict to one memory kind.
    pub kind: Option<String>,
    /// Cap the number of exported records.
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    /// Skip records whose id already exists instead of overwriting.
    pub skip_existing: bool,
    /// Compute fresh vectors from `text` instead of storing carried ones.
    pub regenerate_embeddings: bool,
    /// Parse and count, but write nothing.
    pub dry_run: bool,
    /// Rewrite `tenant_id` on every record before upsert.
    pub override_tenant_id: Option<String>,
    /// Rewrite `workspace_id` on every record before upsert.
    pub override_workspace_id: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ExportStats {
    pub total: i64,
    pub exported: i64,
    pub errors: i64,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ImportStats {
    pub total: i64,
    pub imported: i64,
    pub skipped: i64,
    pub errors: i64,
}
