//! Hybrid retrieval: semantic (vector) plus lexical (trigram) with score
//! fusion.
//!
//! The two score spaces are incommensurable until each result set is
//! max-normalized; fused scores are `alpha * vec + (1 - alpha) * lex` with a
//! missing side contributing 0. Fusion, normalization, and sorting are pure
//! and synchronous — the only suspension points are the embed call and the
//! two store queries.

use crate::db::Db;
use crate::embedding::EmbeddingProvider;
use crate::error::{Error, Result};
use crate::memory::types::MemoryWithScore;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

/// Default vector weight in hybrid fusion.
pub const DEFAULT_ALPHA: f32 = 0.7;

/// Over-selection floor: both legs fetch at least this many candidates.
const MIN_FETCH: i64 = 20;

/// A search hit as returned to callers.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub id: i64,
    pub text: String,
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub tags: Vec<String>,
    pub importance: f32,
    #[serde(skip_serializing)]
    pub created_at: DateTime<Utc>,
    pub score: f32,
}

impl From<MemoryWithScore> for SearchHit {
    fn from(m: MemoryWithScore) -> Self {
        Self {
            id: m.memory.id,
            text: m.memory.text,
            kind: m.memory.kind,
            source: m.memory.source,
            tags: m.memory.tags,
            importance: m.memory.importance,
            created_at: m.memory.created_at,
            score: m.score,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SearchParams {
    pub query: String,
    pub limit: i64,
    /// false = pure vector search, scores unmodified.
    pub hybrid: bool,
    /// Per-call alpha override; used when `> 0`.
    pub alpha: Option<f32>,
    /// Restrict the vector leg to one embedding model.
    pub model: Option<String>,
}

pub struct HybridSearcher {
    db: Arc<Db>,
    embedder: Arc<dyn EmbeddingProvider>,
    alpha: f32,
}

impl HybridSearcher {
    pub fn new(db: Arc<Db>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            db,
            embedder,
            alpha: DEFAULT_ALPHA,
        }
    }

    pub fn with_alpha(mut self, alpha: f32) -> Self {
        self.alpha = alpha;
        self
    }

    pub async fn search(&self, params: SearchParams) -> Result<Vec<SearchHit>> {
        let limit = if params.limit <= 0 { 10 } else { params.limit };

        // One embed call per search; a provider failure fails the search.
        let query_vec = self
            .embedder
            .embed(&params.query)
            .await
            .map_err(|e| Error::Embed(e.to_string()))?;

        let alpha = match params.alpha {
            Some(a) if a > 0.0 => a,
            _ => self.alpha,
        };

        if !params.hybrid {
            let results = self
                .db
                .vector_search(&query_vec, limit, params.model.as_deref())
                .await?;
            return Ok(results.into_iter().map(SearchHit::from).collect());
        }

        // Over-select so fusion has candidates unique to each leg.
        let fetch = (limit * 3).max(MIN_FETCH);
        let vector = self
            .db
            .vector_search(&query_vec, fetch, params.model.as_deref())
            .await?;
        let lexical = self.db.lexical_search(&params.query, fetch).await?;

        Ok(fuse(vector, lexical, alpha, limit as usize))
    }
}

/// Normalize scores into [0, 1] by dividing by the set's max. A set whose max
/// is ≤ 0 is left untouched.
fn normalize_scores(results: &mut [MemoryWithScore]) {
    let max = results
        .iter()
        .map(|r| r.score)
        .fold(f32::NEG_INFINITY, f32::max);
    if !max.is_finite() || max <= 0.0 {
        return;
    }
    for r in results.iter_mut() {
        r.score /= max;
    }
}

/// Fuse two normalized result sets by memory id and return the top `limit`
/// hits, sorted by fused score descending with id-ascending tie-breaks.
fn fuse(
    mut vector: Vec<MemoryWithScore>,
    mut lexical: Vec<MemoryWithScore>,
    alpha: f32,
    limit: usize,
) -> Vec<SearchHit> {
    // Degenerate sets skip fusion entirely.
    if vector.is_empty() && lexical.is_empty() {
        return Vec::new();
    }
    if vector.is_empty() {
        lexical.truncate(limit);
        return lexical.into_iter().map(SearchHit::from).collect();
    }
    if lexical.is_empty() {
        vector.truncate(limit);
        return vector.into_iter().map(SearchHit::from).collect();
    }

    normalize_scores(&mut vector);
    normalize_scores(&mut lexical);

    let lex_scores: HashMap<i64, f32> =
        lexical.iter().map(|r| (r.memory.id, r.score)).collect();
    let vec_scores: HashMap<i64, f32> =
        vector.iter().map(|r| (r.memory.id, r.score)).collect();

    let mut merged: HashMap<i64, MemoryWithScore> = HashMap::new();

    for mut r in vector {
        let lex = lex_scores.get(&r.memory.id).copied().unwrap_or(0.0);
        r.score = alpha * r.score + (1.0 - alpha) * lex;
        merged.insert(r.memory.id, r);
    }
    for mut r in lexical {
        if merged.contains_key(&r.memory.id) {
            continue;
        }
        let vec = vec_scores.get(&r.memory.id).copied().unwrap_or(0.0);
        r.score = alpha * vec + (1.0 - alpha) * r.score;
        merged.insert(r.memory.id, r);
    }

    let mut results: Vec<MemoryWithScore> = merged.into_values().collect();
    results.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.memory.id.cmp(&b.memory.id))
    });
    results.truncate(limit);

    results.into_iter().map(SearchHit::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::types::Memory;

    fn scored(id: i64, score: f32) -> MemoryWithScore {
        MemoryWithScore {
            memory: Memory {
                id,
                tenant_id: "local".into(),
                workspace_id: "default".into(),
                kind: "note".into(),
                text: format!("memory {id}"),
                source: None,
                created_at: Utc::now(),
                updated_at: Utc::now(),
                tags: vec![],
                importance: 0.5,
                ttl_days: None,
                meta: serde_json::json!({}),
            },
            score,
        }
    }

    #[test]
    fn normalize_pegs_max_at_one() {
        let mut results = vec![scored(1, 0.4), scored(2, 0.8), scored(3, 0.2)];
        normalize_scores(&mut results);
        assert_eq!(results[1].score, 1.0);
        assert!((results[0].score - 0.5).abs() < 1e-6);
        assert!(results.iter().all(|r| (0.0..=1.0).contains(&r.score)));
    }

    #[test]
    fn normalize_skips_non_positive_max() {
        let mut results = vec![scored(1, -0.2), scored(2, 0.0)];
        normalize_scores(&mut results);
        assert_eq!(results[0].score, -0.2);
        assert_eq!(results[1].score, 0.0);
    }

    #[test]
    fn fuse_alpha_one_equals_normalized_vector_scores() {
        let vector = vec![scored(1, 0.8), scored(2, 0.4)];
        let lexical = vec![scored(1, 0.3), scored(3, 0.6)];
        let hits = fuse(vector, lexical, 1.0, 10);

        let by_id: HashMap<i64, f32> = hits.iter().map(|h| (h.id, h.score)).collect();
        assert_eq!(by_id[&1], 1.0);
        assert!((by_id[&2] - 0.5).abs() < 1e-6);
        // Lexical-only member contributes nothing at alpha = 1.
        assert_eq!(by_id[&3], 0.0);
    }

    #[test]
    fn fuse_alpha_zero_equals_normalized_lexical_scores() {
        let vector = vec![scored(1, 0.8), scored(2, 0.4)];
        let lexical = vec![scored(1, 0.3), scored(3, 0.6)];
        let hits = fuse(vector, lexical, 0.0, 10);

        let by_id: HashMap<i64, f32> = hits.iter().map(|h| (h.id, h.score)).collect();
        assert!((by_id[&1] - 0.5).abs() < 1e-6);
        assert_eq!(by_id[&3], 1.0);
        assert_eq!(by_id[&2], 0.0);
    }

    #[test]
    fn fused_scores_stay_in_unit_interval() {
        let vector = vec![scored(1, 0.9), scored(2, 0.1), scored(4, 0.5)];
        let lexical = vec![scored(2, 0.7), scored(3, 0.2)];
        let hits = fuse(vector, lexical, 0.7, 10);
        assert!(hits.iter().all(|h| (0.0..=1.0).contains(&h.score)));
    }

    #[test]
    fn members_of_both_sets_rank_above_single_set_members() {
        // id 1 tops both legs, id 2 only vector, id 3 only lexical.
        let vector = vec![scored(1, 0.9), scored(2, 0.9)];
        let lexical = vec![scored(1, 0.5), scored(3, 0.5)];
        let hits = fuse(vector, lexical, 0.7, 10);
        assert_eq!(hits[0].id, 1);
        assert!(hits[0].score > hits[1].score);
    }

    #[test]
    fn ties_break_by_id_ascending() {
        let vector = vec![scored(5, 0.5), scored(2, 0.5)];
        let lexical = vec![scored(9, 0.5), scored(1, 0.5)];
        let hits = fuse(vector, lexical, 0.5, 10);
        // All four normalize to 1.0 and fuse to 0.5; order is id ascending.
        let ids: Vec<i64> = hits.iter().map(|h| h.id).collect();
        assert_eq!(ids, vec![1, 2, 5, 9]);
    }

    #[test]
    fn empty_vector_leg_returns_lexical_truncated() {
        let lexical = vec![scored(1, 0.9), scored(2, 0.5), scored(3, 0.1)];
        let hits = fuse(Vec::new(), lexical, 0.7, 2);
        assert_eq!(hits.len(), 2);
        // No fusion: scores untouched.
        assert_eq!(hits[0].score, 0.9);
    }

    #[test]
    fn empty_lexical_leg_returns_vector_truncated() {
        let vector = vec![scored(1, 0.9), scored(2, 0.5)];
        let hits = fuse(vector, Vec::new(), 0.7, 1);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, 1);
    }

    #[test]
    fn both_empty_returns_empty() {
        assert!(fuse(Vec::new(), Vec::new(), 0.7, 5).is_empty());
    }

    #[test]
    fn truncates_to_limit() {
        let vector: Vec<_> = (1..=30).map(|i| scored(i, 1.0 / i as f32)).collect();
        let lexical: Vec<_> = (20..=40).map(|i| scored(i, 1.0 / i as f32)).collect();
        let hits = fuse(vector, lexical, 0.7, 5);
        assert_eq!(hits.len(), 5);
    }
}
