//! MCP tool surface.
//!
//! [`EngramTools`] holds the shared [`MemoryService`] and exposes the memory
//! tools via the `#[tool_router]` macro. Tool failures are returned as
//! `Err(String)`, which the transport reports as a successful response with
//! `isError: true` — never as a JSON-RPC protocol error.

pub mod memory_add;
pub mod memory_delete;
pub mod memory_entities;
pub mod memory_export;
pub mod memory_import;
pub mod memory_related;
pub mod memory_search;
pub mod memory_update;

use memory_add::MemoryAddParams;
use memory_delete::MemoryDeleteParams;
use memory_entities::MemoryEntitiesParams;
use memory_export::MemoryExportParams;
use memory_import::MemoryImportParams;
use memory_related::MemoryRelatedParams;
use memory_search::MemorySearchParams;
use memory_update::MemoryUpdateParams;

use crate::memory::service::{AddArgs, ExportArgs, ImportArgs, MemoryService, SearchArgs};
use crate::memory::types::UpdateMemoryParams;
use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::{tool, tool_handler, tool_router, ServerHandler};
use std::sync::Arc;

/// The engram MCP tool handler.
#[derive(Clone)]
pub struct EngramTools {
    tool_router: ToolRouter<Self>,
    service: Arc<MemoryService>,
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string(value).map_err(|e| format!("serialization failed: {e}"))
}

#[tool_router]
impl EngramTools {
    pub fn new(service: Arc<MemoryService>) -> Self {
        Self {
            tool_router: Self::tool_router(),
            service,
        }
    }

    #[tool(
        name = "memory.add",
        description = "Add a new memory to the memory store. Memories can be facts, notes, preferences, todos, or other information to remember."
    )]
    async fn memory_add(
        &self,
        Parameters(params): Parameters<MemoryAddParams>,
    ) -> Result<String, String> {
        tracing::info!(text_len = params.text.len(), "memory.add called");

        let id = self
            .service
            .add(AddArgs {
                text: params.text,
                kind: params.kind,
                importance: params.importance,
                tags: params.tags.unwrap_or_default(),
                ttl_days: params.ttl_days,
                source: params.source,
            })
            .await
            .map_err(|e| e.to_string())?;

        to_json(&serde_json::json!({ "id": id }))
    }

    #[tool(
        name = "memory.search",
        description = "Search memories using semantic (vector) and lexical (trigram) similarity. Returns results ranked by relevance."
    )]
    async fn memory_search(
        &self,
        Parameters(params): Parameters<MemorySearchParams>,
    ) -> Result<String, String> {
        tracing::info!(query = %params.query, "memory.search called");

        let results = self
            .service
            .search(SearchArgs {
                query: params.query,
                k: params.k,
                hybrid: params.hybrid,
                model: params.model,
            })
            .await
            .map_err(|e| e.to_string())?;

        to_json(&results)
    }

    #[tool(
        name = "memory.update",
        description = "Update an existing memory by ID. Only the fields present in the patch change; a text change re-embeds the memory."
    )]
    async fn memory_update(
        &self,
        Parameters(params): Parameters<MemoryUpdateParams>,
    ) -> Result<String, String> {
        tracing::info!(id = params.id, "memory.update called");

        self.service
            .update(
                params.id,
                UpdateMemoryParams {
                    text: params.patch.text,
                    kind: params.patch.kind,
                    importance: params.patch.importance,
                    tags: params.patch.tags,
                    ttl_days: params.patch.ttl_days,
                    source: params.patch.source,
                    meta: None,
                },
            )
            .await
            .map_err(|e| e.to_string())?;

        to_json(&serde_json::json!({ "ok": true }))
    }

    #[tool(
        name = "memory.delete",
        description = "Delete a memory by ID. This operation cannot be undone."
    )]
    async fn memory_delete(
        &self,
        Parameters(params): Parameters<MemoryDeleteParams>,
    ) -> Result<String, String> {
        tracing::info!(id = params.id, "memory.delete called");

        self.service
            .delete(params.id)
            .await
            .map_err(|e| e.to_string())?;

        to_json(&serde_json::json!({ "ok": true }))
    }

    #[tool(
        name = "memory.export",
        description = "Export memories as JSONL, one record per line, ordered by id. Optionally inlines embedding vectors."
    )]
    async fn memory_export(
        &self,
        Parameters(params): Parameters<MemoryExportParams>,
    ) -> Result<String, String> {
        tracing::info!("memory.export called");

        let output = self
            .service
            .export(ExportArgs {
                include_embeddings: params.include_embeddings.unwrap_or(false),
                kind: params.kind.filter(|k| !k.is_empty()),
                limit: params.limit.filter(|l| *l > 0),
            })
            .await
            .map_err(|e| e.to_string())?;

        to_json(&output)
    }

    #[tool(
        name = "memory.import",
        description = "Import memories from JSONL data produced by memory.export. Malformed lines are counted and skipped."
    )]
    async fn memory_import(
        &self,
        Parameters(params): Parameters<MemoryImportParams>,
    ) -> Result<String, String> {
        tracing::info!(data_len = params.data.len(), "memory.import called");

        let stats = self
            .service
            .import(ImportArgs {
                data: params.data,
                skip_existing: params.skip_existing.unwrap_or(false),
                regenerate_embeddings: params.regenerate_embeddings.unwrap_or(false),
                dry_run: params.dry_run.unwrap_or(false),
            })
            .await
            .map_err(|e| e.to_string())?;

        to_json(&stats)
    }

    #[tool(
        name = "memory.entities",
        description = "List the entities linked to a memory."
    )]
    async fn memory_entities(
        &self,
        Parameters(params): Parameters<MemoryEntitiesParams>,
    ) -> Result<String, String> {
        let entities = self
            .service
            .entities(params.memory_id)
            .await
            .map_err(|e| e.to_string())?;

        to_json(&serde_json::json!({ "entities": entities }))
    }

    #[tool(
        name = "memory.related",
        description = "Find memories related to a memory through shared entities, ranked by overlap."
    )]
    async fn memory_related(
        &self,
        Parameters(params): Parameters<MemoryRelatedParams>,
    ) -> Result<String, String> {
        let related = self
            .service
            .related(params.memory_id, params.k)
            .await
            .map_err(|e| e.to_string())?;

        to_json(&related)
    }
}

#[tool_handler]
impl ServerHandler for EngramTools {
    fn get_info(&self) -> rmcp::model::ServerInfo {
        rmcp::model::ServerInfo {
            instructions: Some(
                "Engram is a memory substrate for coding agents. Use memory.add to store \
                 memories, memory.search for hybrid retrieval, and memory.export / \
                 memory.import to move memories between workspaces."
                    .into(),
            ),
            capabilities: rmcp::model::ServerCapabilities::builder()
                .enable_tools()
                .build(),
            ..Default::default()
        }
    }
}
