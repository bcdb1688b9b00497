//! Follow-set similarity and friends-of-friends recommendation

use crate::graph::Adjacency;
use crate::rank::ScoreIndex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use trustgraph_common::Identity;

/// Upper bound on similarity/recommendation results
pub const MAX_SIMILARITY_LIMIT: usize = 50;

/// Candidates following fewer identities are ignored
const MIN_CANDIDATE_FOLLOWS: usize = 3;

/// Recommendations need at least this many friends in common
const MIN_MUTUAL_FRIENDS: usize = 2;

/// An identity whose follow set overlaps the queried one
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarIdentity {
    pub pubkey: Identity,
    pub jaccard: f64,
    pub shared_follows: usize,
    pub normalized: u32,

    /// Ranking key: 0.7 * jaccard + 0.3 * normalized / 100
    pub similarity: f64,
}

/// Identities with the most similar follow sets to `x`
pub fn similar(adjacency: &Adjacency, scores: &ScoreIndex, x: Identity, limit: usize) -> Vec<SimilarIdentity> {
    let limit = limit.clamp(1, MAX_SIMILARITY_LIMIT);
    let target = adjacency.follow_set(&x);
    if target.is_empty() {
        return Vec::new();
    }

    // Anyone sharing a follow must appear among the followers of a target
    let candidates: HashSet<Identity> = target
        .iter()
        .flat_map(|t| adjacency.followers(t).iter().copied())
        .filter(|y| *y != x)
        .collect();

    let mut results: Vec<SimilarIdentity> = candidates
        .into_iter()
        .filter_map(|y| {
            // Activity counts every follow edge, duplicates included
            if adjacency.follows(&y).len() < MIN_CANDIDATE_FOLLOWS {
                return None;
            }

            let theirs = adjacency.follow_set(&y);

            let shared = theirs.intersection(&target).count();
            if shared == 0 {
                return None;
            }

            let union = target.len() + theirs.len() - shared;
            let jaccard = shared as f64 / union as f64;
            let normalized = scores.normalized(&y);

            Some(SimilarIdentity {
                pubkey: y,
                jaccard,
                shared_follows: shared,
                normalized,
                similarity: 0.7 * jaccard + 0.3 * (normalized as f64 / 100.0),
            })
        })
        .collect();

    results.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.pubkey.cmp(&b.pubkey))
    });
    results.truncate(limit);
    results
}

/// A suggested follow
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub pubkey: Identity,

    /// Friends of `x` who follow this identity
    pub mutual_count: usize,

    /// `mutual_count` over the size of `x`'s follow set
    pub mutual_ratio: f64,

    pub normalized: u32,

    /// Ranking key: 0.6 * mutual_ratio + 0.4 * normalized / 100
    pub score: f64,
}

/// Friends-of-friends that `x` does not follow yet
pub fn recommend(adjacency: &Adjacency, scores: &ScoreIndex, x: Identity, limit: usize) -> Vec<Recommendation> {
    let limit = limit.clamp(1, MAX_SIMILARITY_LIMIT);
    let friends = adjacency.follow_set(&x);
    if friends.is_empty() {
        return Vec::new();
    }

    let mut counts: HashMap<Identity, usize> = HashMap::new();
    for friend in &friends {
        for candidate in adjacency.follow_set(friend) {
            if candidate == x || friends.contains(&candidate) {
                continue;
            }
            *counts.entry(candidate).or_insert(0) += 1;
        }
    }

    let mut results: Vec<Recommendation> = counts
        .into_iter()
        .filter(|(_, count)| *count >= MIN_MUTUAL_FRIENDS)
        .map(|(pubkey, count)| {
            let ratio = count as f64 / friends.len() as f64;
            let normalized = scores.normalized(&pubkey);
            Recommendation {
                pubkey,
                mutual_count: count,
                mutual_ratio: ratio,
                normalized,
                score: 0.6 * ratio + 0.4 * (normalized as f64 / 100.0),
            }
        })
        .collect();

    results.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.pubkey.cmp(&b.pubkey))
    });
    results.truncate(limit);
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::fixtures::{adjacency, id};
    use crate::rank::{PageRankConfig, PageRankScorer};
    use chrono::Utc;

    fn scored(adj: &Adjacency) -> ScoreIndex {
        ScoreIndex::new(
            PageRankScorer::new(PageRankConfig::default()).compute(adj, Utc::now()),
            Utc::now(),
        )
    }

    #[test]
    fn test_jaccard_over_follow_sets() {
        // A=1 follows X,Y,Z (10,11,12); B=2 follows X,Y,W (10,11,13)
        let adj = adjacency(&[(1, 10), (1, 11), (1, 12), (2, 10), (2, 11), (2, 13)]);
        let results = similar(&adj, &scored(&adj), id(1), 10);

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].pubkey, id(2));
        assert_eq!(results[0].shared_follows, 2);
        assert!((results[0].jaccard - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_small_follow_sets_ignored() {
        let adj = adjacency(&[(1, 10), (1, 11), (2, 10), (2, 11)]);
        assert!(similar(&adj, &scored(&adj), id(1), 10).is_empty());
    }

    #[test]
    fn test_duplicate_follows_count_toward_activity() {
        // 2 has two distinct follows, one of them repeated
        let adj = adjacency(&[(1, 10), (1, 11), (1, 12), (2, 10), (2, 11), (2, 10)]);
        let results = similar(&adj, &scored(&adj), id(1), 10);

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].shared_follows, 2);
        assert!((results[0].jaccard - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_recommend_requires_two_friends() {
        // 1 follows 2,3,4; 2 and 3 follow 9; only 4 follows 8
        let adj = adjacency(&[(1, 2), (1, 3), (1, 4), (2, 9), (3, 9), (4, 8), (2, 1)]);
        let results = recommend(&adj, &scored(&adj), id(1), 10);

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].pubkey, id(9));
        assert_eq!(results[0].mutual_count, 2);
        assert!((results[0].mutual_ratio - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_recommend_skips_existing_follows() {
        let adj = adjacency(&[(1, 2), (1, 3), (2, 3), (3, 2)]);
        assert!(recommend(&adj, &scored(&adj), id(1), 10).is_empty());
    }

    #[test]
    fn test_unknown_identity_is_empty() {
        let adj = adjacency(&[(1, 2)]);
        assert!(similar(&adj, &scored(&adj), id(42), 10).is_empty());
        assert!(recommend(&adj, &scored(&adj), id(42), 10).is_empty());
    }
}
