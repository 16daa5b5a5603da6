//! `memory.update` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Fields to change. Only provided fields are updated.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct MemoryPatch {
    /// New text content; triggers embedding regeneration.
    #[schemars(description = "New text content for the memory")]
    pub text: Option<String>,

    /// New memory kind.
    #[schemars(description = "New memory kind")]
    pub kind: Option<String>,

    /// New importance score (0.0 to 1.0).
    #[schemars(description = "New importance score (0.0 to 1.0)")]
    pub importance: Option<f32>,

    /// New tags, replacing the existing sequence.
    #[schemars(description = "New tags for the memory")]
    pub tags: Option<Vec<String>>,

    /// New time-to-live in days.
    #[schemars(description = "New time-to-live in days")]
    pub ttl_days: Option<i32>,

    /// New source identifier.
    #[schemars(description = "New source identifier")]
    pub source: Option<String>,
}

/// Parameters for the `memory.update` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct MemoryUpdateParams {
    /// The id of the memory to update.
    #[schemars(description = "The ID of the memory to update")]
    pub id: i64,

    /// The fields to update.
    #[schemars(description = "The fields to update")]
    pub patch: MemoryPatch,
}
