//! Trust scoring
//!
//! Implements PageRank over the follow graph and the cached score index
//! every read path consults.

mod pagerank;
mod scores;

pub use pagerank::{decay_weight, normalize_score, PageRankConfig, PageRankScorer};
pub use scores::ScoreIndex;

use crate::graph::Adjacency;
use serde::{Deserialize, Serialize};
use trustgraph_common::Identity;

/// Score lookup result for one identity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreReport {
    pub pubkey: Identity,

    /// Raw PageRank mass
    pub raw: f64,

    /// Score on the 0-100 scale
    pub normalized: u32,

    /// Whether the identity was scored by the last recompute
    pub present: bool,

    /// Number of scored identities
    pub graph_size: usize,

    /// 1-based rank; 0 when absent
    pub rank: usize,

    /// Fraction of identities scoring strictly lower
    pub percentile: f64,

    /// Distinct followers in the live graph
    pub followers: usize,

    /// Distinct follow targets in the live graph
    pub follows: usize,
}

impl ScoreReport {
    /// Assemble a report; absent identities get zero metrics
    pub fn build(adjacency: &Adjacency, index: &ScoreIndex, pubkey: Identity) -> Self {
        Self {
            pubkey,
            raw: index.raw(&pubkey),
            normalized: index.normalized(&pubkey),
            present: index.contains(&pubkey),
            graph_size: index.len(),
            rank: index.rank(&pubkey),
            percentile: index.percentile(&pubkey),
            followers: adjacency.follower_set(&pubkey).len(),
            follows: adjacency.follow_set(&pubkey).len(),
        }
    }
}

/// Entry in a top-N listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopEntry {
    pub pubkey: Identity,
    pub raw: f64,
    pub normalized: u32,
    pub rank: usize,
    pub followers: usize,
}

/// Top `n` identities with follower counts; `0` lists everything
pub fn top_entries(adjacency: &Adjacency, index: &ScoreIndex, n: usize) -> Vec<TopEntry> {
    index
        .top_n(n)
        .iter()
        .map(|(pubkey, raw)| TopEntry {
            pubkey: *pubkey,
            raw: *raw,
            normalized: index.normalize(*raw),
            rank: index.rank(pubkey),
            followers: adjacency.follower_set(pubkey).len(),
        })
        .collect()
}
