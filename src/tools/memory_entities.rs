//! `memory.entities` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `memory.entities` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct MemoryEntitiesParams {
    /// The memory whose linked entities to list.
    #[schemars(description = "The ID of the memory whose linked entities to list")]
    pub memory_id: i64,
}
