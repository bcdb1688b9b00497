//! What-if analysis on a detached copy of the graph

use crate::graph::Adjacency;
use crate::rank::{PageRankScorer, ScoreIndex};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use trustgraph_common::Identity;

/// Standing of one identity under one score vector
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Standing {
    pub raw: f64,
    pub normalized: u32,
    pub rank: usize,
}

impl Standing {
    fn of(index: &ScoreIndex, x: &Identity) -> Self {
        Self {
            raw: index.raw(x),
            normalized: index.normalized(x),
            rank: index.rank(x),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnfollowSimulation {
    pub follower: Identity,
    pub target: Identity,

    /// Occurrences of `follower -> target` removed from the copy
    pub edges_removed: usize,

    pub before: Standing,
    pub after: Standing,

    /// `after.rank - before.rank`; positive means the target drops
    pub rank_change: i64,
}

/// Score `target` with and without every `follower -> target` edge
///
/// Consumes a snapshot; the live graph is never touched.
pub fn simulate_unfollow(
    mut snapshot: Adjacency,
    scorer: &PageRankScorer,
    follower: Identity,
    target: Identity,
    now: DateTime<Utc>,
) -> UnfollowSimulation {
    let before = ScoreIndex::new(scorer.compute(&snapshot, now), now);
    let edges_removed = snapshot.remove_edge(follower, target);
    let after = ScoreIndex::new(scorer.compute(&snapshot, now), now);

    let before = Standing::of(&before, &target);
    let after = Standing::of(&after, &target);

    UnfollowSimulation {
        follower,
        target,
        edges_removed,
        before,
        after,
        rank_change: after.rank as i64 - before.rank as i64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::fixtures::{adjacency, id};
    use crate::rank::PageRankConfig;

    #[test]
    fn test_unfollow_lowers_target() {
        let adj = adjacency(&[(1, 2), (1, 2), (3, 2), (2, 1), (4, 3)]);
        let scorer = PageRankScorer::new(PageRankConfig::default());
        let result = simulate_unfollow(adj.clone(), &scorer, id(1), id(2), Utc::now());

        assert_eq!(result.edges_removed, 2);
        assert!(result.after.raw < result.before.raw);

        // The caller's graph is untouched
        assert_eq!(adj.follows(&id(1)).len(), 2);
    }

    #[test]
    fn test_missing_edge_changes_nothing() {
        let adj = adjacency(&[(1, 2), (2, 3)]);
        let scorer = PageRankScorer::new(PageRankConfig::default());
        let result = simulate_unfollow(adj, &scorer, id(3), id(1), Utc::now());

        assert_eq!(result.edges_removed, 0);
        assert_eq!(result.before, result.after);
        assert_eq!(result.rank_change, 0);
    }
}
