//! `memory.export` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `memory.export` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct MemoryExportParams {
    /// Inline each record's primary-model embedding vector.
    #[schemars(
        description = "Include embedding vectors in the export (larger output). Defaults to false."
    )]
    pub include_embeddings: Option<bool>,

    /// Restrict the export to one memory kind.
    #[schemars(description = "Export only memories of this kind (empty = all)")]
    pub kind: Option<String>,

    /// Cap the number of exported records.
    #[schemars(description = "Maximum number of records to export (0 = unlimited)")]
    pub limit: Option<i64>,
}
