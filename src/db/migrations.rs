//! Schema statements for all engram tables.
//!
//! A totally ordered list of idempotent statements, applied in lexicographic
//! name order at startup. Every statement is self-guarded (`IF NOT EXISTS`)
//! so re-running against a live database at any forward version is safe; no
//! version table is kept. The HNSW vector index is the one exception — it is
//! created lazily after the first embedding insert, because pgvector needs an
//! observable dimensionality to build it (see [`crate::db::Db::ensure_hnsw_index`]).

/// (name, statement) pairs. Names sort lexicographically into apply order.
pub const MIGRATIONS: &[(&str, &str)] = &[
    (
        "0001_vector_extension",
        "CREATE EXTENSION IF NOT EXISTS vector",
    ),
    (
        "0002_trgm_extension",
        "CREATE EXTENSION IF NOT EXISTS pg_trgm",
    ),
    (
        "0003_memories",
        r#"
        CREATE TABLE IF NOT EXISTS memories (
            id           BIGSERIAL PRIMARY KEY,
            tenant_id    TEXT NOT NULL,
            workspace_id TEXT NOT NULL DEFAULT 'default',
            kind         TEXT NOT NULL DEFAULT 'note',
            text         TEXT NOT NULL,
            source       TEXT,
            created_at   TIMESTAMPTZ NOT NULL DEFAULT now(),
            updated_at   TIMESTAMPTZ NOT NULL DEFAULT now(),
            tags         TEXT[] NOT NULL DEFAULT '{}',
            importance   REAL NOT NULL DEFAULT 0.5,
            ttl_days     INTEGER,
            meta         JSONB NOT NULL DEFAULT '{}'
        )
        "#,
    ),
    (
        "0004_memories_partition_idx",
        "CREATE INDEX IF NOT EXISTS idx_memories_tenant_workspace \
         ON memories (tenant_id, workspace_id)",
    ),
    (
        "0005_memories_text_trgm_idx",
        "CREATE INDEX IF NOT EXISTS idx_memories_text_trgm \
         ON memories USING gin (text gin_trgm_ops)",
    ),
    (
        "0006_memory_embeddings",
        r#"
        CREATE TABLE IF NOT EXISTS memory_embeddings (
            memory_id BIGINT NOT NULL REFERENCES memories(id) ON DELETE CASCADE,
            model     TEXT NOT NULL,
            dims      INTEGER NOT NULL,
            embedding VECTOR NOT NULL,
            PRIMARY KEY (memory_id, model)
        )
        "#,
    ),
    (
        "0007_entities",
        r#"
        CREATE TABLE IF NOT EXISTS entities (
            id           BIGSERIAL PRIMARY KEY,
            tenant_id    TEXT NOT NULL,
            workspace_id TEXT NOT NULL DEFAULT 'default',
            name         TEXT NOT NULL,
            type         TEXT NOT NULL DEFAULT 'other',
            aliases      TEXT[] NOT NULL DEFAULT '{}',
            description  TEXT,
            meta         JSONB NOT NULL DEFAULT '{}',
            created_at   TIMESTAMPTZ NOT NULL DEFAULT now(),
            updated_at   TIMESTAMPTZ NOT NULL DEFAULT now(),
            UNIQUE (tenant_id, workspace_id, name, type)
        )
        "#,
    ),
    (
        "0008_entities_name_trgm_idx",
        "CREATE INDEX IF NOT EXISTS idx_entities_name_trgm \
         ON entities USING gin (name gin_trgm_ops)",
    ),
    (
        "0009_memory_entities",
        r#"
        CREATE TABLE IF NOT EXISTS memory_entities (
            memory_id  BIGINT NOT NULL REFERENCES memories(id) ON DELETE CASCADE,
            entity_id  BIGINT NOT NULL REFERENCES entities(id) ON DELETE CASCADE,
            role       TEXT,
            confidence REAL NOT NULL DEFAULT 1.0,
            PRIMARY KEY (memory_id, entity_id)
        )
        "#,
    ),
    (
        "0010_entity_relations",
        r#"
        CREATE TABLE IF NOT EXISTS entity_relations (
            id            BIGSERIAL PRIMARY KEY,
            tenant_id     TEXT NOT NULL,
            workspace_id  TEXT NOT NULL DEFAULT 'default',
            source_id     BIGINT NOT NULL REFERENCES entities(id) ON DELETE CASCADE,
            target_id     BIGINT NOT NULL REFERENCES entities(id) ON DELETE CASCADE,
            relation_type TEXT NOT NULL,
            meta          JSONB NOT NULL DEFAULT '{}',
            created_at    TIMESTAMPTZ NOT NULL DEFAULT now(),
            UNIQUE (tenant_id, workspace_id, source_id, target_id, relation_type)
        )
        "#,
    ),
];
