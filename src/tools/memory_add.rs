//! `memory.add` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `memory.add` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct MemoryAddParams {
    /// The text content of the memory to store.
    #[schemars(description = "The text content of the memory to store")]
    pub text: String,

    /// Memory kind: note, fact, todo, preference, identity, project, ...
    #[schemars(
        description = "The type of memory: note, fact, todo, preference, identity, project, or other custom types. Defaults to 'note'."
    )]
    pub kind: Option<String>,

    /// Importance score in `[0.0, 1.0]`, used for ranking. Defaults to 0.5.
    #[schemars(
        description = "Importance score from 0.0 to 1.0, used for ranking and retention. Defaults to 0.5."
    )]
    pub importance: Option<f32>,

    /// Optional tags for categorizing the memory.
    #[schemars(description = "Optional tags for categorizing the memory")]
    pub tags: Option<Vec<String>>,

    /// Optional time-to-live in days; expired memories are swept.
    #[schemars(
        description = "Optional time-to-live in days. After this period the memory is automatically cleaned up."
    )]
    pub ttl_days: Option<i32>,

    /// Optional source identifier (e.g. 'chat', 'file:/path/to/file').
    #[schemars(description = "Optional source identifier (e.g. 'chat', 'file:/path/to/file')")]
    pub source: Option<String>,
}
