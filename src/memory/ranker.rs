//! Importance and recency boosts applied after fusion.
//!
//! `boosted = score * (1 + w_imp * importance) * (1 + w_rec * exp(-age / half_life))`
//!
//! Both weights are multiplicative around 1.0, so results with equal
//! pre-boost scores, equal importance, and equal age keep their order.

use crate::memory::search::SearchHit;
use chrono::{DateTime, Utc};
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct RankingOptions {
    /// Boost multiplier for importance; 0 disables.
    pub importance_weight: f32,
    /// Boost multiplier for recency; 0 disables.
    pub recency_weight: f32,
    /// Decay rate of the recency boost. Must be positive.
    pub half_life: Duration,
}

impl Default for RankingOptions {
    fn default() -> Self {
        Self {
            importance_weight: 0.2,
            recency_weight: 0.1,
            half_life: Duration::from_secs(7 * 24 * 3600),
        }
    }
}

/// Apply boosts and re-sort by boosted score, ties by id ascending.
pub fn apply_boosts(results: &mut Vec<SearchHit>, opts: RankingOptions, now: DateTime<Utc>) {
    if results.is_empty() {
        return;
    }

    for hit in results.iter_mut() {
        hit.score = boosted_score(hit, opts, now);
    }

    results.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
}

fn boosted_score(hit: &SearchHit, opts: RankingOptions, now: DateTime<Utc>) -> f32 {
    let mut score = hit.score;

    if opts.importance_weight > 0.0 {
        score *= 1.0 + opts.importance_weight * hit.importance;
    }

    if opts.recency_weight > 0.0 && !opts.half_life.is_zero() {
        // Future timestamps clamp to age 0.
        let age = (now - hit.created_at).to_std().unwrap_or(Duration::ZERO);
        let decay = (-(age.as_secs_f64() / opts.half_life.as_secs_f64())).exp();
        score *= 1.0 + opts.recency_weight * decay as f32;
    }

    score
}
