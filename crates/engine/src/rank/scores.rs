//! Cached score vector with rank and percentile queries
//!
//! A `ScoreIndex` is immutable once built; recomputes publish a new index
//! behind an `Arc` so readers never see a partially replaced vector.

use super::pagerank::normalize_score;
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::collections::HashMap;
use trustgraph_common::Identity;

/// Immutable PageRank result set
#[derive(Debug, Clone)]
pub struct ScoreIndex {
    scores: HashMap<Identity, f64>,

    /// Descending by score, ties by identity bytes ascending
    ranked: Vec<(Identity, f64)>,

    /// Ascending raw values for rank/percentile lookups
    sorted_values: Vec<f64>,

    computed_at: DateTime<Utc>,
}

impl ScoreIndex {
    /// Build an index from a computed score map
    pub fn new(scores: HashMap<Identity, f64>, computed_at: DateTime<Utc>) -> Self {
        let mut ranked: Vec<(Identity, f64)> = scores.iter().map(|(id, s)| (*id, *s)).collect();
        ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });

        let mut sorted_values: Vec<f64> = scores.values().copied().collect();
        sorted_values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

        Self {
            scores,
            ranked,
            sorted_values,
            computed_at,
        }
    }

    /// Raw score, if the identity was scored
    pub fn get(&self, id: &Identity) -> Option<f64> {
        self.scores.get(id).copied()
    }

    /// Raw score, zero when absent
    pub fn raw(&self, id: &Identity) -> f64 {
        self.get(id).unwrap_or(0.0)
    }

    /// Score on the 0-100 scale, zero when absent
    pub fn normalized(&self, id: &Identity) -> u32 {
        normalize_score(self.raw(id), self.len())
    }

    /// Normalize an arbitrary raw value against this index's size
    pub fn normalize(&self, raw: f64) -> u32 {
        normalize_score(raw, self.len())
    }

    /// Whether the identity was scored
    pub fn contains(&self, id: &Identity) -> bool {
        self.scores.contains_key(id)
    }

    /// Number of scored identities
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    /// Whether nothing was scored
    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// When the underlying PageRank finished
    pub fn computed_at(&self) -> DateTime<Utc> {
        self.computed_at
    }

    /// Top `n` identities by descending score; `0` returns all
    pub fn top_n(&self, n: usize) -> &[(Identity, f64)] {
        if n == 0 || n >= self.ranked.len() {
            &self.ranked
        } else {
            &self.ranked[..n]
        }
    }

    /// Fraction of scored identities with a strictly lower score
    pub fn percentile(&self, id: &Identity) -> f64 {
        match self.get(id) {
            Some(score) if !self.is_empty() => self.count_below(score) as f64 / self.len() as f64,
            _ => 0.0,
        }
    }

    /// 1 + number of identities with a strictly higher score; 0 when absent
    pub fn rank(&self, id: &Identity) -> usize {
        match self.get(id) {
            Some(score) => {
                let at_or_below = self.sorted_values.partition_point(|v| *v <= score);
                1 + self.len() - at_or_below
            }
            None => 0,
        }
    }

    fn count_below(&self, score: f64) -> usize {
        self.sorted_values.partition_point(|v| *v < score)
    }

    /// All raw scores, unordered
    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.scores.values().copied()
    }

    /// All scored identities with their raw scores, unordered
    pub fn iter(&self) -> impl Iterator<Item = (&Identity, &f64)> {
        self.scores.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::fixtures::id;

    fn index(values: &[(u64, f64)]) -> ScoreIndex {
        ScoreIndex::new(values.iter().map(|(n, s)| (id(*n), *s)).collect(), Utc::now())
    }

    #[test]
    fn test_top_n_breaks_ties_by_identity() {
        let idx = index(&[(3, 0.2), (1, 0.2), (2, 0.6)]);
        let top: Vec<Identity> = idx.top_n(0).iter().map(|(i, _)| *i).collect();
        assert_eq!(top, vec![id(2), id(1), id(3)]);
        assert_eq!(idx.top_n(1).len(), 1);
        assert_eq!(idx.top_n(10).len(), 3);
    }

    #[test]
    fn test_rank_and_percentile() {
        let idx = index(&[(1, 0.1), (2, 0.2), (3, 0.3), (4, 0.4)]);
        assert_eq!(idx.rank(&id(4)), 1);
        assert_eq!(idx.rank(&id(1)), 4);
        assert_eq!(idx.percentile(&id(1)), 0.0);
        assert_eq!(idx.percentile(&id(4)), 0.75);

        // rank(x) + |{y : s(y) < s(x)}| = |scored| with distinct values
        for n in 1..=4 {
            let below = (idx.percentile(&id(n)) * 4.0).round() as usize;
            assert_eq!(idx.rank(&id(n)) + below, 4);
        }
    }

    #[test]
    fn test_ties_share_rank() {
        let idx = index(&[(1, 0.5), (2, 0.5), (3, 0.1)]);
        assert_eq!(idx.rank(&id(1)), 1);
        assert_eq!(idx.rank(&id(2)), 1);
        assert_eq!(idx.rank(&id(3)), 3);
    }

    #[test]
    fn test_absent_identity() {
        let idx = index(&[(1, 0.5)]);
        assert_eq!(idx.get(&id(9)), None);
        assert_eq!(idx.normalized(&id(9)), 0);
        assert_eq!(idx.rank(&id(9)), 0);
        assert_eq!(idx.percentile(&id(9)), 0.0);
    }
}
