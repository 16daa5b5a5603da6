//! Entity SQL primitives: entities, memory links, and directed relations.
//!
//! Entities live independently of the memories that link to them — deleting
//! a memory cascades its links but leaves the entities in place.

use crate::db::Db;
use crate::error::{Error, Result};
use crate::memory::types::{AddEntityParams, Entity, EntityType, MemoryWithScore};
use sqlx::postgres::PgRow;
use sqlx::Row;

const ENTITY_COLS: &str = "id, tenant_id, workspace_id, name, type, aliases, \
                           description, meta, created_at, updated_at";

fn entity_from_row(row: &PgRow) -> std::result::Result<Entity, sqlx::Error> {
    let type_str: String = row.try_get("type")?;
    Ok(Entity {
        id: row.try_get("id")?,
        tenant_id: row.try_get("tenant_id")?,
        workspace_id: row.try_get("workspace_id")?,
        name: row.try_get("name")?,
        entity_type: type_str.parse().unwrap_or(EntityType::Other),
        aliases: row.try_get("aliases")?,
        description: row.try_get("description")?,
        meta: row.try_get("meta")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

impl Db {
    /// Insert an entity or merge into the existing one on
    /// (tenant, workspace, name, type) conflict: aliases union, description
    /// kept when the new one is null. Returns the entity id either way.
    pub async fn add_entity(&self, params: AddEntityParams) -> Result<i64> {
        let meta = params.meta.unwrap_or_else(|| serde_json::json!({}));

        let id: i64 = sqlx::query_scalar(
            "INSERT INTO entities (tenant_id, workspace_id, name, type, aliases, description, meta) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (tenant_id, workspace_id, name, type) DO UPDATE SET \
                 aliases = CASE \
                     WHEN entities.aliases @> EXCLUDED.aliases THEN entities.aliases \
                     ELSE entities.aliases || EXCLUDED.aliases \
                 END, \
                 description = COALESCE(EXCLUDED.description, entities.description), \
                 updated_at = now() \
             RETURNING id",
        )
        .bind(self.tenant_id())
        .bind(self.workspace_id())
        .bind(&params.name)
        .bind(params.entity_type.as_str())
        .bind(&params.aliases)
        .bind(&params.description)
        .bind(&meta)
        .fetch_one(self.pool())
        .await?;

        Ok(id)
    }

    pub async fn get_entity(&self, id: i64) -> Result<Option<Entity>> {
        let row = sqlx::query(sqlx::AssertSqlSafe(format!(
            "SELECT {ENTITY_COLS} FROM entities \
             WHERE id = $1 AND tenant_id = $2 AND workspace_id = $3"
        )))
        .bind(id)
        .bind(self.tenant_id())
        .bind(self.workspace_id())
        .fetch_optional(self.pool())
        .await?;

        row.as_ref().map(entity_from_row).transpose().map_err(Error::from)
    }

    /// Link a memory to an entity, updating role/confidence on re-link.
    pub async fn link_memory_entity(
        &self,
        memory_id: i64,
        entity_id: i64,
        role: Option<&str>,
        confidence: f32,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO memory_entities (memory_id, entity_id, role, confidence) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (memory_id, entity_id) DO UPDATE SET \
                 role = COALESCE(EXCLUDED.role, memory_entities.role), \
                 confidence = EXCLUDED.confidence",
        )
        .bind(memory_id)
        .bind(entity_id)
        .bind(role)
        .bind(confidence)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    /// All entities linked to a memory, strongest links first.
    pub async fn get_memory_entities(&self, memory_id: i64) -> Result<Vec<Entity>> {
        let rows = sqlx::query(sqlx::AssertSqlSafe(format!(
            "SELECT e.{} FROM entities e \
             JOIN memory_entities me ON e.id = me.entity_id \
             WHERE me.memory_id = $1 AND e.tenant_id = $2 AND e.workspace_id = $3 \
             ORDER BY me.confidence DESC, e.name ASC",
            ENTITY_COLS.replace(", ", ", e.")
        )))
        .bind(memory_id)
        .bind(self.tenant_id())
        .bind(self.workspace_id())
        .fetch_all(self.pool())
        .await?;

        rows.iter()
            .map(entity_from_row)
            .collect::<std::result::Result<Vec<_>, sqlx::Error>>()
            .map_err(Error::from)
    }

    /// Record a directed relation between two entities. Duplicate
    /// (source, target, relation) rows within the partition are ignored.
    pub async fn add_entity_relation(
        &self,
        source_id: i64,
        target_id: i64,
        relation_type: &str,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO entity_relations (tenant_id, workspace_id, source_id, target_id, relation_type) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (tenant_id, workspace_id, source_id, target_id, relation_type) DO NOTHING",
        )
        .bind(self.tenant_id())
        .bind(self.workspace_id())
        .bind(source_id)
        .bind(target_id)
        .bind(relation_type)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    /// Trigram search over entity names.
    pub async fn search_entities(&self, query: &str, limit: i64) -> Result<Vec<Entity>> {
        let limit = if limit <= 0 { 10 } else { limit };

        let rows = sqlx::query(sqlx::AssertSqlSafe(format!(
            "SELECT {ENTITY_COLS} FROM entities \
             WHERE tenant_id = $1 AND workspace_id = $2 AND name % $3 \
             ORDER BY similarity(name, $3) DESC \
             LIMIT $4"
        )))
        .bind(self.tenant_id())
        .bind(self.workspace_id())
        .bind(query)
        .bind(limit)
        .fetch_all(self.pool())
        .await?;

        rows.iter()
            .map(entity_from_row)
            .collect::<std::result::Result<Vec<_>, sqlx::Error>>()
            .map_err(Error::from)
    }

    /// Find an entity by exact name and type within the partition.
    pub async fn find_entity_by_name(
        &self,
        name: &str,
        entity_type: EntityType,
    ) -> Result<Option<Entity>> {
        let row = sqlx::query(sqlx::AssertSqlSafe(format!(
            "SELECT {ENTITY_COLS} FROM entities \
             WHERE tenant_id = $1 AND workspace_id = $2 AND name = $3 AND type = $4"
        )))
        .bind(self.tenant_id())
        .bind(self.workspace_id())
        .bind(name)
        .bind(entity_type.as_str())
        .fetch_optional(self.pool())
        .await?;

        row.as_ref().map(entity_from_row).transpose().map_err(Error::from)
    }

    /// Memories sharing entities with the given memory, scored by
    /// `shared / max(source_entity_count, 1)`. Ordered by score descending,
    /// ties broken by memory id ascending.
    pub async fn related_memories(
        &self,
        memory_id: i64,
        limit: i64,
    ) -> Result<Vec<MemoryWithScore>> {
        let limit = if limit <= 0 { 10 } else { limit };

        let rows = sqlx::query(
            "SELECT m.id, m.tenant_id, m.workspace_id, m.kind, m.text, m.source, \
                    m.created_at, m.updated_at, m.tags, m.importance, m.ttl_days, m.meta, \
                    (COUNT(DISTINCT me.entity_id)::real \
                     / GREATEST((SELECT COUNT(*) FROM memory_entities \
                                 WHERE memory_id = $1)::real, 1.0))::real AS score \
             FROM memories m \
             JOIN memory_entities me ON m.id = me.memory_id \
             WHERE me.entity_id IN (SELECT entity_id FROM memory_entities WHERE memory_id = $1) \
               AND m.id != $1 AND m.tenant_id = $2 AND m.workspace_id = $3 \
             GROUP BY m.id \
             ORDER BY score DESC, m.id ASC \
             LIMIT $4",
        )
        .bind(memory_id)
        .bind(self.tenant_id())
        .bind(self.workspace_id())
        .bind(limit)
        .fetch_all(self.pool())
        .await?;

        rows.iter()
            .map(|row| {
                Ok(MemoryWithScore {
                    memory: super::memory::memory_from_row(row)?,
                    score: row.try_get("score")?,
                })
            })
            .collect::<std::result::Result<Vec<_>, sqlx::Error>>()
            .map_err(Error::from)
    }
}
