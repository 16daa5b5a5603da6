//! `memory.search` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `memory.search` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct MemorySearchParams {
    /// The search query to find relevant memories.
    #[schemars(description = "The search query to find relevant memories")]
    pub query: String,

    /// Maximum number of results (1-100). Defaults to 10.
    #[schemars(description = "Maximum number of results to return (1-100). Defaults to 10.")]
    pub k: Option<i64>,

    /// Hybrid vector + lexical fusion when true (default); vector-only when false.
    #[schemars(
        description = "If true, use hybrid search combining vector and lexical similarity. If false, use vector search only. Defaults to true."
    )]
    pub hybrid: Option<bool>,

    /// Restrict the vector leg to one embedding model.
    #[schemars(
        description = "Optional: filter search to a specific embedding model (e.g. 'text-embedding-3-small'). Leave empty to search all models."
    )]
    pub model: Option<String>,
}
