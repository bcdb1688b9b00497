//! PageRank-based trust scoring
//!
//! Fixed-iteration power method over a follow graph snapshot. Edges can be
//! weighted by exponential time decay; untimed edges always weigh 1.0.

use crate::graph::{Adjacency, IndexedGraph};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use trustgraph_common::Identity;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// PageRank configuration
#[derive(Debug, Clone)]
pub struct PageRankConfig {
    /// Damping factor (typically 0.85)
    pub damping: f64,

    /// Power-iteration rounds; there is no convergence test
    pub iterations: usize,

    /// Edge half-life in days; `None` weighs every edge equally
    pub half_life_days: Option<f64>,
}

impl Default for PageRankConfig {
    fn default() -> Self {
        Self {
            damping: 0.85,
            iterations: 20,
            half_life_days: None,
        }
    }
}

/// Weight of an edge created at `time` as seen from `now`
///
/// Unknown times, non-positive half-lives, and future timestamps weigh 1.0.
pub fn decay_weight(time: Option<DateTime<Utc>>, now: DateTime<Utc>, half_life_days: f64) -> f64 {
    let Some(time) = time else {
        return 1.0;
    };
    if half_life_days <= 0.0 {
        return 1.0;
    }

    let age_days = ((now - time).num_milliseconds() as f64 / 1000.0 / SECONDS_PER_DAY).max(0.0);
    (-std::f64::consts::LN_2 * age_days / half_life_days).exp()
}

/// Map a raw score onto the 0-100 integer scale
pub fn normalize_score(raw: f64, node_count: usize) -> u32 {
    if raw <= 0.0 || node_count == 0 {
        return 0;
    }

    let scaled = ((raw * node_count as f64 + 1.0).log10() * 25.0).round();
    scaled.clamp(0.0, 100.0) as u32
}

/// PageRank scorer for identities
pub struct PageRankScorer {
    config: PageRankConfig,
}

impl PageRankScorer {
    /// Create a new scorer
    pub fn new(config: PageRankConfig) -> Self {
        Self { config }
    }

    /// Active configuration
    pub fn config(&self) -> &PageRankConfig {
        &self.config
    }

    /// Compute scores for every identity on an edge
    pub fn compute(&self, adjacency: &Adjacency, now: DateTime<Utc>) -> HashMap<Identity, f64> {
        let graph = IndexedGraph::from_adjacency(adjacency);
        let scores = self.compute_indexed(&graph, adjacency, now);

        graph
            .identities()
            .iter()
            .copied()
            .zip(scores)
            .collect()
    }

    /// Compute scores by slot over an existing projection
    pub fn compute_indexed(
        &self,
        graph: &IndexedGraph,
        adjacency: &Adjacency,
        now: DateTime<Utc>,
    ) -> Vec<f64> {
        let n = graph.node_count();
        if n == 0 {
            return Vec::new();
        }

        let n_f64 = n as f64;
        let damping = self.config.damping;
        let teleport = (1.0 - damping) / n_f64;

        // Per-edge weights aligned with out_neighbors, plus per-source totals
        let weights: Vec<Vec<f64>> = (0..n as u32)
            .map(|slot| {
                let source = graph.identity(slot);
                graph
                    .out_neighbors(slot)
                    .iter()
                    .map(|&t| match self.config.half_life_days {
                        Some(h) => {
                            let time = adjacency.edge_time(&source, &graph.identity(t));
                            decay_weight(time, now, h)
                        }
                        None => 1.0,
                    })
                    .collect()
            })
            .collect();
        let totals: Vec<f64> = weights.iter().map(|w| w.iter().sum()).collect();

        // Initialize scores
        let mut scores = vec![1.0 / n_f64; n];
        let mut next = vec![0.0; n];

        for _ in 0..self.config.iterations {
            next.iter_mut().for_each(|s| *s = teleport);

            for source in 0..n {
                let total = totals[source];
                if total == 0.0 {
                    continue;
                }

                let share = damping * scores[source] / total;
                for (&target, &w) in graph.out_neighbors(source as u32).iter().zip(&weights[source]) {
                    next[target as usize] += share * w;
                }
            }

            std::mem::swap(&mut scores, &mut next);
        }

        scores
    }
}
