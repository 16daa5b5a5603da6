//! `memory.delete` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `memory.delete` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct MemoryDeleteParams {
    /// The id of the memory to delete. Cannot be undone.
    #[schemars(description = "The ID of the memory to delete. This operation cannot be undone.")]
    pub id: i64,
}
