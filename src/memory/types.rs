//! Core record types shared by the store, searcher, service, and codec.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A memory row, the unit of storage and retrieval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Memory {
    /// Monotonically assigned integer id.
    pub id: i64,
    pub tenant_id: String,
    pub workspace_id: String,
    /// Free-form tag: note, fact, todo, preference, identity, project, ...
    pub kind: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub tags: Vec<String>,
    /// Ranking weight in `[0, 1]`, default 0.5.
    pub importance: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl_days: Option<i32>,
    /// Opaque key→value bag; always a JSON object.
    pub meta: serde_json::Value,
}

/// A memory annotated with a retrieval score.
#[derive(Debug, Clone, Serialize)]
pub struct MemoryWithScore {
    #[serde(flatten)]
    pub memory: Memory,
    pub score: f32,
}

/// Parameters for inserting a new memory. Partition keys come from the store.
#[derive(Debug, Clone, Default)]
pub struct AddMemoryParams {
    pub kind: String,
    pub text: String,
    pub source: Option<String>,
    pub tags: Vec<String>,
    pub importance: f32,
    pub ttl_days: Option<i32>,
    pub meta: Option<serde_json::Value>,
}

/// Partial update; only `Some` fields change. `updated_at` always bumps.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateMemoryParams {
    pub kind: Option<String>,
    pub text: Option<String>,
    pub source: Option<String>,
    pub tags: Option<Vec<String>>,
    pub importance: Option<f32>,
    pub ttl_days: Option<i32>,
    pub meta: Option<serde_json::Value>,
}

impl UpdateMemoryParams {
    /// True when no field is set. Such a patch still bumps `updated_at`.
    pub fn is_empty(&self) -> bool {
        self.kind.is_none()
            && self.text.is_none()
            && self.source.is_none()
            && self.tags.is_none()
            && self.importance.is_none()
            && self.ttl_days.is_none()
            && self.meta.is_none()
    }
}

/// A stored embedding vector for one (memory, model) pair.
#[derive(Debug, Clone, Serialize)]
pub struct StoredEmbedding {
    pub memory_id: i64,
    pub model: String,
    pub dims: i32,
    pub vector: Vec<f32>,
}

/// The closed set of entity categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Person,
    Organization,
    Location,
    Concept,
    Technology,
    Project,
    Event,
    Other,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Person => "person",
            Self::Organization => "organization",
            Self::Location => "location",
            Self::Concept => "concept",
            Self::Technology => "technology",
            Self::Project => "project",
            Self::Event => "event",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EntityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "person" => Ok(Self::Person),
            "organization" => Ok(Self::Organization),
            "location" => Ok(Self::Location),
            "concept" => Ok(Self::Concept),
            "technology" => Ok(Self::Technology),
            "project" => Ok(Self::Project),
            "event" => Ok(Self::Event),
            "other" => Ok(Self::Other),
            _ => Err(format!("unknown entity type: {s}")),
        }
    }
}

/// An entity record. Entities live independently of the memories linking them.
#[derive(Debug, Clone, Serialize)]
pub struct Entity {
    pub id: i64,
    pub tenant_id: String,
    pub workspace_id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    pub aliases: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub meta: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Parameters for upserting an entity.
#[derive(Debug, Clone)]
pub struct AddEntityParams {
    pub name: String,
    pub entity_type: EntityType,
    pub aliases: Vec<String>,
    pub description: Option<String>,
    pub meta: Option<serde_json::Value>,
}
