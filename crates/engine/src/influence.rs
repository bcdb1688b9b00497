//! Structural influence statistics

use crate::graph::Adjacency;
use crate::rank::ScoreIndex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use trustgraph_common::Identity;

/// Per-identity reach and standing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfluenceReport {
    pub pubkey: Identity,
    pub followers: usize,
    pub follows: usize,
    pub mutuals: usize,
    pub normalized: u32,
    pub rank: usize,
    pub percentile: f64,

    /// Distinct identities within two reverse hops, `x` excluded
    pub reach_2hop: usize,

    /// Mean normalized score of followers
    pub follower_avg_score: f64,

    /// followers / max(follows, 1)
    pub influence_ratio: f64,
}

pub fn influence(adjacency: &Adjacency, scores: &ScoreIndex, x: Identity) -> InfluenceReport {
    let followers = adjacency.follower_set(&x);
    let follows = adjacency.follow_set(&x);
    let mutuals = followers.iter().filter(|f| follows.contains(f)).count();

    let mut reach: HashSet<Identity> = followers.clone();
    for follower in &followers {
        reach.extend(adjacency.followers(follower).iter().copied());
    }
    reach.remove(&x);

    let follower_avg_score = if followers.is_empty() {
        0.0
    } else {
        followers.iter().map(|f| scores.normalized(f) as f64).sum::<f64>() / followers.len() as f64
    };

    InfluenceReport {
        pubkey: x,
        followers: followers.len(),
        follows: follows.len(),
        mutuals,
        normalized: scores.normalized(&x),
        rank: scores.rank(&x),
        percentile: scores.percentile(&x),
        reach_2hop: reach.len(),
        follower_avg_score,
        influence_ratio: followers.len() as f64 / follows.len().max(1) as f64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::fixtures::{adjacency, id};
    use crate::rank::{PageRankConfig, PageRankScorer};
    use chrono::Utc;

    #[test]
    fn test_two_hop_reach_excludes_self() {
        // 2 and 3 follow 1; 4 follows 2; 1 follows 3 back
        let adj = adjacency(&[(2, 1), (3, 1), (4, 2), (1, 3)]);
        let scores = ScoreIndex::new(
            PageRankScorer::new(PageRankConfig::default()).compute(&adj, Utc::now()),
            Utc::now(),
        );
        let report = influence(&adj, &scores, id(1));

        assert_eq!(report.followers, 2);
        assert_eq!(report.follows, 1);
        assert_eq!(report.mutuals, 1);
        assert_eq!(report.reach_2hop, 3);
        assert_eq!(report.influence_ratio, 2.0);
        assert_eq!(report.rank, 1);
    }

    #[test]
    fn test_unknown_identity_is_zeroed() {
        let adj = adjacency(&[(1, 2)]);
        let scores = ScoreIndex::new(
            PageRankScorer::new(PageRankConfig::default()).compute(&adj, Utc::now()),
            Utc::now(),
        );
        let report = influence(&adj, &scores, id(9));
        assert_eq!(report.reach_2hop, 0);
        assert_eq!(report.influence_ratio, 0.0);
        assert_eq!(report.follower_avg_score, 0.0);
    }
}
