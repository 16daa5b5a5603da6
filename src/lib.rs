//! Engram — a memory substrate for AI coding agents.
//!
//! Engram is an [MCP](https://modelcontextprotocol.io/) server that gives
//! agents persistent, searchable memory: short textual records stored in
//! PostgreSQL next to dense vector embeddings, retrieved by **hybrid
//! search** — cosine similarity over [pgvector](https://github.com/pgvector/pgvector)
//! plus trigram similarity over pg_trgm, fused by a weighted sum after
//! per-set max-normalization.
//!
//! # Architecture
//!
//! - **Storage**: PostgreSQL with pgvector (HNSW, cosine) for vectors and
//!   pg_trgm (GIN) for lexical match, partitioned by (tenant, workspace)
//! - **Embeddings**: OpenAI or Gemini over HTTP, one or many models at once
//! - **Search**: vector + trigram retrieval fused as `α·vec + (1−α)·lex`,
//!   with optional importance/recency boosts
//! - **Lifecycle**: TTL sweeper deletes expired memories in the background;
//!   a batch re-embed engine migrates vectors between models
//! - **Transport**: MCP over stdio; JSONL export/import for portability
//!
//! # Modules
//!
//! - [`config`] — TOML + environment configuration
//! - [`db`] — connection pool, schema migration, SQL primitives
//! - [`embedding`] — provider traits, OpenAI/Gemini clients, multi-model fan-out
//! - [`memory`] — the engine: service operations, hybrid search, ranking
//! - [`sweeper`] — TTL expiration sweeper
//! - [`reembed`] — batch re-embedding engine
//! - [`transfer`] — JSONL export/import codec
//! - [`server`], [`tools`], [`cli`] — MCP wiring, tool surface, batch commands

pub mod cli;
pub mod config;
pub mod db;
pub mod embedding;
pub mod error;
pub mod memory;
pub mod reembed;
pub mod server;
pub mod sweeper;
pub mod tools;
pub mod transfer;
