#![allow(dead_code)]

//! Shared test fixtures.
//!
//! Integration suites need a live PostgreSQL with the `vector` and `pg_trgm`
//! extensions available. Set `TEST_DATABASE_URL` to run them; without it,
//! every suite skips with a note. Each test isolates itself in its own
//! workspace so suites can run concurrently against one database.

use async_trait::async_trait;
use engram::db::Db;
use engram::embedding::{ChatProvider, EmbeddingProvider, MultiEmbedder};
use engram::error::Result;
use std::collections::HashMap;
use std::sync::Arc;

pub const TEST_TENANT: &str = "test";

/// Connect, migrate, and wipe the given workspace. Returns `None` (skip)
/// when `TEST_DATABASE_URL` is unset.
pub async fn test_db(workspace: &str) -> Option<Arc<Db>> {
    let Ok(url) = std::env::var("TEST_DATABASE_URL") else {
        eprintln!("skipping: TEST_DATABASE_URL not set");
        return None;
    };

    let db = Db::connect(&url, TEST_TENANT, workspace)
        .await
        .expect("failed to connect to test database");
    db.migrate().await.expect("failed to migrate test database");
    wipe_partition(&db).await;

    Some(Arc::new(db))
}

/// Remove everything in the db's partition so each test starts clean.
pub async fn wipe_partition(db: &Db) {
    for table in ["memories", "entities", "entity_relations"] {
        sqlx::query(sqlx::AssertSqlSafe(format!(
            "DELETE FROM {table} WHERE tenant_id = $1 AND workspace_id = $2"
        )))
        .bind(db.tenant_id())
        .bind(db.workspace_id())
        .execute(db.pool())
        .await
        .expect("failed to wipe partition");
    }
}

/// Deterministic unit vector with a spike at `seed`.
pub fn spike_vector(seed: usize, dims: usize) -> Vec<f32> {
    let mut v = vec![0.0f32; dims];
    v[seed % dims] = 1.0;
    v
}

/// A vector close to `base` (cosine similarity near 1).
pub fn near_vector(base: &[f32]) -> Vec<f32> {
    let mut v = base.to_vec();
    let idx = (v.len() / 2) % v.len();
    v[idx] += 0.05;
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    v.iter_mut().for_each(|x| *x /= norm);
    v
}

/// Deterministic embedder: exact texts can be pinned to chosen vectors,
/// anything else hashes to a spike. No network, ever.
pub struct StubEmbedder {
    model: String,
    dims: usize,
    pinned: HashMap<String, Vec<f32>>,
}

impl StubEmbedder {
    pub fn new(model: &str, dims: usize) -> Self {
        Self {
            model: model.to_string(),
            dims,
            pinned: HashMap::new(),
        }
    }

    pub fn pin(mut self, text: &str, vector: Vec<f32>) -> Self {
        assert_eq!(vector.len(), self.dims);
        self.pinned.insert(text.to_string(), vector);
        self
    }

    fn hash_spike(&self, text: &str) -> Vec<f32> {
        use std::hash::{DefaultHasher, Hash, Hasher};
        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        spike_vector(hasher.finish() as usize, self.dims)
    }
}

#[async_trait]
impl EmbeddingProvider for StubEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self
            .pinned
            .get(text)
            .cloned()
            .unwrap_or_else(|| self.hash_spike(text)))
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dims
    }
}

#[async_trait]
impl ChatProvider for StubEmbedder {
    async fn complete(&self, _prompt: &str) -> Result<String> {
        Ok("{}".to_string())
    }

    fn chat_model_name(&self) -> &str {
        "stub-chat"
    }
}

/// Gateway over a single stub model.
pub fn stub_gateway(embedder: Arc<StubEmbedder>) -> Arc<MultiEmbedder> {
    let model = embedder.model_name().to_string();
    Arc::new(
        MultiEmbedder::from_providers(vec![(model, embedder as Arc<dyn EmbeddingProvider>)])
            .expect("stub gateway"),
    )
}

/// Gateway over two stub models (multi-model mode).
pub fn stub_gateway_two(a: Arc<StubEmbedder>, b: Arc<StubEmbedder>) -> Arc<MultiEmbedder> {
    let model_a = a.model_name().to_string();
    let model_b = b.model_name().to_string();
    Arc::new(
        MultiEmbedder::from_providers(vec![
            (model_a, a as Arc<dyn EmbeddingProvider>),
            (model_b, b as Arc<dyn EmbeddingProvider>),
        ])
        .expect("stub gateway"),
    )
}

/// Backdate a memory's created_at by `days` (TTL and recency tests).
pub async fn backdate_memory(db: &Db, id: i64, days: i64) {
    sqlx::query(sqlx::AssertSqlSafe(format!(
        "UPDATE memories SET created_at = created_at - INTERVAL '{days} days', \
         updated_at = updated_at - INTERVAL '{days} days' WHERE id = $1"
    )))
    .bind(id)
    .execute(db.pool())
    .await
    .expect("failed to backdate memory");
}

/// Count embedding rows for a memory.
pub async fn embedding_count(db: &Db, memory_id: i64) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM memory_embeddings WHERE memory_id = $1")
        .bind(memory_id)
        .fetch_one(db.pool())
        .await
        .expect("failed to count embeddings")
}
