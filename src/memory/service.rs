//! The memory service: the public operations behind the MCP tools and the
//! batch CLI.
//!
//! Holds the store, the embedding gateway, and the hybrid searcher; no
//! per-call state. Writes are durable before embeddings are attempted — an
//! embedding failure after `add` or `update` is logged at warning severity
//! and never surfaced, leaving the memory reachable by lexical search until
//! a later update or re-embed repairs it.

use crate::db::Db;
use crate::embedding::{EmbeddingProvider, MultiEmbedder, Provider};
use crate::error::{Error, Result};
use crate::memory::extract::Extractor;
use crate::memory::ranker::{self, RankingOptions};
use crate::memory::search::{HybridSearcher, SearchHit, SearchParams};
use crate::memory::types::{
    AddEntityParams, AddMemoryParams, Entity, MemoryWithScore, UpdateMemoryParams,
};
use crate::transfer::{self, ExportOptions, ExportStats, ImportOptions, ImportStats};
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

/// Arguments accepted by [`MemoryService::add`].
#[derive(Debug, Clone, Default)]
pub struct AddArgs {
    pub text: String,
    pub kind: Option<String>,
    pub importance: Option<f32>,
    pub tags: Vec<String>,
    pub ttl_days: Option<i32>,
    pub source: Option<String>,
}

/// Arguments accepted by [`MemoryService::search`].
#[derive(Debug, Clone)]
pub struct SearchArgs {
    pub query: String,
    pub k: Option<i64>,
    pub hybrid: Option<bool>,
    pub model: Option<String>,
}

/// Arguments accepted by [`MemoryService::export`].
#[derive(Debug, Clone, Default)]
pub struct ExportArgs {
    pub include_embeddings: bool,
    pub kind: Option<String>,
    pub limit: Option<i64>,
}

/// Arguments accepted by [`MemoryService::import`].
#[derive(Debug, Clone, Default)]
pub struct ImportArgs {
    pub data: String,
    pub skip_existing: bool,
    pub regenerate_embeddings: bool,
    pub dry_run: bool,
}

#[derive(Debug, serde::Serialize)]
pub struct ExportOutput {
    pub data: String,
    pub exported: i64,
    pub errors: i64,
}

pub struct MemoryService {
    db: Arc<Db>,
    provider: Arc<dyn Provider>,
    embedder: Arc<MultiEmbedder>,
    searcher: HybridSearcher,
    ranking: Option<RankingOptions>,
    extract_entities: bool,
}

impl MemoryService {
    pub fn new(db: Arc<Db>, provider: Arc<dyn Provider>, embedder: Arc<MultiEmbedder>) -> Self {
        let searcher = HybridSearcher::new(
            Arc::clone(&db),
            Arc::clone(&embedder) as Arc<dyn EmbeddingProvider>,
        );
        Self {
            db,
            provider,
            embedder,
            searcher,
            ranking: Some(RankingOptions::default()),
            extract_entities: false,
        }
    }

    /// Replace or disable the post-fusion ranking boosts.
    pub fn with_ranking(mut self, ranking: Option<RankingOptions>) -> Self {
        self.ranking = ranking;
        self
    }

    /// Enable the LLM entity-extraction pass after each add.
    pub fn with_extraction(mut self, enabled: bool) -> Self {
        self.extract_entities = enabled;
        self
    }

    pub fn db(&self) -> &Arc<Db> {
        &self.db
    }

    pub fn embedder(&self) -> &Arc<MultiEmbedder> {
        &self.embedder
    }

    /// Store a new memory. The row is committed before any embedding is
    /// attempted; embedding failures are non-fatal.
    pub async fn add(&self, args: AddArgs) -> Result<i64> {
        if args.text.is_empty() {
            return Err(Error::invalid("text is required and cannot be empty"));
        }
        let importance = args.importance.unwrap_or(0.5);
        if !(0.0..=1.0).contains(&importance) {
            return Err(Error::invalid("importance must be between 0.0 and 1.0"));
        }
        if let Some(ttl) = args.ttl_days {
            if ttl <= 0 {
                return Err(Error::invalid("ttl_days must be positive"));
            }
        }

        let id = self
            .db
            .add_memory(AddMemoryParams {
                kind: args.kind.unwrap_or_else(|| "note".to_string()),
                text: args.text.clone(),
                source: args.source,
                tags: args.tags,
                importance,
                ttl_days: args.ttl_days,
                meta: None,
            })
            .await?;

        self.embed_and_store(id, &args.text).await;

        if self.extract_entities {
            if let Err(e) = self.extract_and_link(id, &args.text).await {
                warn!(memory_id = id, error = %e, "entity extraction failed");
            }
        }

        info!(memory_id = id, "memory added");
        Ok(id)
    }

    /// Hybrid (or pure-vector) retrieval with optional ranking boosts.
    pub async fn search(&self, args: SearchArgs) -> Result<Vec<SearchHit>> {
        if args.query.is_empty() {
            return Err(Error::invalid("query is required and cannot be empty"));
        }

        let k = args.k.unwrap_or(10).clamp(1, 100);
        let hybrid = args.hybrid.unwrap_or(true);

        let mut results = self
            .searcher
            .search(SearchParams {
                query: args.query,
                limit: k,
                hybrid,
                alpha: None,
                model: args.model.filter(|m| !m.is_empty()),
            })
            .await?;

        if let Some(opts) = self.ranking {
            ranker::apply_boosts(&mut results, opts, Utc::now());
        }

        Ok(results)
    }

    /// Partial update. A text change regenerates embeddings for every
    /// configured model; regeneration failures are non-fatal.
    pub async fn update(&self, id: i64, patch: UpdateMemoryParams) -> Result<()> {
        if id <= 0 {
            return Err(Error::invalid("id must be a positive integer"));
        }
        if let Some(importance) = patch.importance {
            if !(0.0..=1.0).contains(&importance) {
                return Err(Error::invalid("importance must be between 0.0 and 1.0"));
            }
        }

        let new_text = patch.text.clone();
        self.db.update_memory(id, patch).await?;

        if let Some(text) = new_text {
            self.embed_and_store(id, &text).await;
        }

        Ok(())
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        if id <= 0 {
            return Err(Error::invalid("id must be a positive integer"));
        }
        self.db.delete_memory(id).await?;
        info!(memory_id = id, "memory deleted");
        Ok(())
    }

    /// Entities linked to a memory.
    pub async fn entities(&self, memory_id: i64) -> Result<Vec<Entity>> {
        if memory_id <= 0 {
            return Err(Error::invalid("memory_id must be a positive integer"));
        }
        self.db.get_memory_entities(memory_id).await
    }

    /// Memories sharing entities with the given memory.
    pub async fn related(&self, memory_id: i64, k: Option<i64>) -> Result<Vec<MemoryWithScore>> {
        if memory_id <= 0 {
            return Err(Error::invalid("memory_id must be a positive integer"));
        }
        let k = k.unwrap_or(10).clamp(1, 100);
        self.db.related_memories(memory_id, k).await
    }

    /// Export the partition as JSONL.
    pub async fn export(&self, args: ExportArgs) -> Result<ExportOutput> {
        let mut buf = Vec::new();
        let stats: ExportStats = transfer::export(
            &self.db,
            &mut buf,
            ExportOptions {
                include_embeddings: args.include_embeddings,
                embedding_model: Some(self.embedder.primary().to_string()),
                kind: args.kind,
                limit: args.limit,
            },
        )
        .await?;

        Ok(ExportOutput {
            data: String::from_utf8(buf)
                .map_err(|e| Error::Transfer(format!("export is not UTF-8: {e}")))?,
            exported: stats.exported,
            errors: stats.errors,
        })
    }

    /// Import JSONL produced by [`Self::export`]. Records are pinned to this
    /// service's partition regardless of what they carry.
    pub async fn import(&self, args: ImportArgs) -> Result<ImportStats> {
        if args.data.is_empty() {
            return Err(Error::invalid("data is required"));
        }

        transfer::import(
            &self.db,
            &args.data,
            Some(Arc::clone(&self.embedder) as Arc<dyn EmbeddingProvider>),
            ImportOptions {
                skip_existing: args.skip_existing,
                regenerate_embeddings: args.regenerate_embeddings,
                dry_run: args.dry_run,
                override_tenant_id: Some(self.db.tenant_id().to_string()),
                override_workspace_id: Some(self.db.workspace_id().to_string()),
            },
        )
        .await
    }

    /// Generate and store one embedding per configured model. Failures are
    /// logged and swallowed; the memory row is already durable.
    async fn embed_and_store(&self, memory_id: i64, text: &str) {
        match self.embedder.embed_all(text).await {
            Ok(embeddings) => {
                for (model, vector) in embeddings {
                    if let Err(e) = self.db.upsert_embedding(memory_id, &model, &vector).await {
                        warn!(memory_id, model = %model, error = %e, "failed to store embedding");
                    }
                }
            }
            Err(e) => {
                warn!(memory_id, error = %e, "failed to generate embeddings");
            }
        }
    }

    /// Run the extraction pass and persist entities, links, and relations.
    async fn extract_and_link(&self, memory_id: i64, text: &str) -> Result<()> {
        let extractor = Extractor::new(self.provider.as_ref());
        let result = extractor.extract(text).await?;

        for entity in &result.entities {
            if entity.name.is_empty() {
                continue;
            }
            let entity_id = self
                .db
                .add_entity(AddEntityParams {
                    name: entity.name.clone(),
                    entity_type: entity.entity_type(),
                    aliases: entity.aliases.clone(),
                    description: entity.description.clone(),
                    meta: None,
                })
                .await?;
            self.db
                .link_memory_entity(
                    memory_id,
                    entity_id,
                    entity.role.as_deref(),
                    entity.confidence.unwrap_or(1.0).clamp(0.0, 1.0),
                )
                .await?;
        }

        for relation in &result.relations {
            let source = self.find_extracted(&result, &relation.source_name).await?;
            let target = self.find_extracted(&result, &relation.target_name).await?;
            if let (Some(source_id), Some(target_id)) = (source, target) {
                self.db
                    .add_entity_relation(source_id, target_id, &relation.relation_type)
                    .await?;
            }
        }

        Ok(())
    }

    async fn find_extracted(
        &self,
        result: &crate::memory::extract::ExtractionResult,
        name: &str,
    ) -> Result<Option<i64>> {
        let Some(entity) = result.entities.iter().find(|e| e.name == name) else {
            return Ok(None);
        };
        Ok(self
            .db
            .find_entity_by_name(name, entity.entity_type())
            .await?
            .map(|e| e.id))
    }
}
