//! `memory.import` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `memory.import` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct MemoryImportParams {
    /// JSONL data as produced by memory.export.
    #[schemars(description = "JSONL data as produced by memory.export")]
    pub data: String,

    /// Skip records whose id already exists instead of overwriting.
    #[schemars(
        description = "Skip records whose id already exists instead of overwriting them. Defaults to false."
    )]
    pub skip_existing: Option<bool>,

    /// Compute fresh embeddings instead of storing the carried vectors.
    #[schemars(
        description = "Generate new embeddings instead of using the exported ones. Defaults to false."
    )]
    pub regenerate_embeddings: Option<bool>,

    /// Parse and count, but write nothing.
    #[schemars(description = "Validate the import without writing to the database. Defaults to false.")]
    pub dry_run: Option<bool>,
}
