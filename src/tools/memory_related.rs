//! `memory.related` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `memory.related` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct MemoryRelatedParams {
    /// The memory to find neighbours for via shared entities.
    #[schemars(description = "The ID of the memory to find related memories for")]
    pub memory_id: i64,

    /// Maximum number of results (1-100). Defaults to 10.
    #[schemars(description = "Maximum number of results to return (1-100). Defaults to 10.")]
    pub k: Option<i64>,
}
