//! Community detection by asynchronous label propagation
//!
//! Runs over the undirected projection of a snapshot. Results are cached
//! by the coordinator and replaced wholesale after each recompute.

use crate::graph::{Adjacency, IndexedGraph};
use crate::rank::ScoreIndex;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use trustgraph_common::Identity;

/// Default number of propagation passes
pub const DEFAULT_MAX_ITERATIONS: usize = 10;

/// Members returned by a membership lookup
pub const MAX_COMMUNITY_MEMBERS: usize = 50;

/// Upper bound on `top_communities` results
pub const MAX_TOP_COMMUNITIES: usize = 20;

/// Members listed per community summary
const TOP_MEMBERS_PER_COMMUNITY: usize = 5;

/// Groups at or above this size count as non-trivial
const NONTRIVIAL_SIZE: usize = 3;

/// Label propagation settings
#[derive(Debug, Clone)]
pub struct LabelPropagation {
    pub max_iterations: usize,

    /// Fixed shuffle seed; `None` draws from entropy
    pub seed: Option<u64>,
}

impl Default for LabelPropagation {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            seed: None,
        }
    }
}

impl LabelPropagation {
    pub fn new(max_iterations: usize) -> Self {
        Self {
            max_iterations,
            seed: None,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Assign a community label to every slot
    pub fn run(&self, graph: &IndexedGraph) -> Vec<u32> {
        let n = graph.node_count();
        let mut labels: Vec<u32> = (0..n as u32).collect();
        if n == 0 {
            return labels;
        }

        let neighbors: Vec<Vec<u32>> = (0..n as u32).map(|slot| graph.undirected_neighbors(slot)).collect();
        let mut order: Vec<u32> = (0..n as u32).collect();
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut counts: HashMap<u32, usize> = HashMap::new();
        for pass in 0..self.max_iterations {
            order.shuffle(&mut rng);
            let mut changed = false;

            for &slot in &order {
                let around = &neighbors[slot as usize];
                if around.is_empty() {
                    continue;
                }

                counts.clear();
                for &neighbor in around {
                    *counts.entry(labels[neighbor as usize]).or_insert(0) += 1;
                }

                let best = dominant_label(&counts).unwrap_or(labels[slot as usize]);

                if best != labels[slot as usize] {
                    labels[slot as usize] = best;
                    changed = true;
                }
            }

            if !changed {
                tracing::debug!(passes = pass + 1, "Label propagation converged");
                break;
            }
        }

        labels
    }
}

/// Most frequent label, highest label on ties
fn dominant_label(counts: &HashMap<u32, usize>) -> Option<u32> {
    counts
        .iter()
        .max_by(|a, b| a.1.cmp(b.1).then_with(|| a.0.cmp(b.0)))
        .map(|(label, _)| *label)
}

/// One detected community
#[derive(Debug, Clone)]
struct Group {
    id: u32,
    members: Vec<Identity>,
}

/// Cached partition of the graph into communities
#[derive(Debug, Clone, Default)]
pub struct CommunityIndex {
    labels: HashMap<Identity, u32>,

    /// Sorted by size descending, then id ascending
    groups: Vec<Group>,

    /// Label -> position in `groups`
    positions: HashMap<u32, usize>,
}

impl CommunityIndex {
    /// Detect communities over a snapshot
    pub fn detect(adjacency: &Adjacency, propagation: &LabelPropagation) -> Self {
        let graph = IndexedGraph::from_adjacency(adjacency);
        let labels = propagation.run(&graph);
        Self::from_labels(&graph, &labels)
    }

    fn from_labels(graph: &IndexedGraph, slot_labels: &[u32]) -> Self {
        let mut members: HashMap<u32, Vec<Identity>> = HashMap::new();
        let mut labels = HashMap::with_capacity(slot_labels.len());

        for (slot, &label) in slot_labels.iter().enumerate() {
            let id = graph.identity(slot as u32);
            labels.insert(id, label);
            members.entry(label).or_default().push(id);
        }

        let mut groups: Vec<Group> = members
            .into_iter()
            .map(|(id, members)| Group { id, members })
            .collect();
        groups.sort_by(|a, b| b.members.len().cmp(&a.members.len()).then_with(|| a.id.cmp(&b.id)));

        let positions = groups.iter().enumerate().map(|(i, g)| (g.id, i)).collect();

        Self {
            labels,
            groups,
            positions,
        }
    }

    /// Community label of an identity
    pub fn label_of(&self, x: &Identity) -> Option<u32> {
        self.labels.get(x).copied()
    }

    /// Number of communities, singletons included
    pub fn community_count(&self) -> usize {
        self.groups.len()
    }

    /// Communities with at least three members
    pub fn nontrivial_count(&self) -> usize {
        self.groups
            .iter()
            .filter(|g| g.members.len() >= NONTRIVIAL_SIZE)
            .count()
    }

    /// Size of the largest community
    pub fn largest(&self) -> usize {
        self.groups.first().map(|g| g.members.len()).unwrap_or(0)
    }

    /// Membership of `x`'s community, highest-scored members first
    pub fn community_of(&self, scores: &ScoreIndex, x: &Identity) -> Option<CommunityMembership> {
        let label = self.label_of(x)?;
        let group = &self.groups[*self.positions.get(&label)?];

        Some(CommunityMembership {
            pubkey: *x,
            community_id: group.id,
            size: group.members.len(),
            members: ranked_members(scores, &group.members, MAX_COMMUNITY_MEMBERS),
        })
    }

    /// Largest communities with at least `min_size` members
    pub fn top_communities(&self, scores: &ScoreIndex, limit: usize, min_size: usize) -> Vec<CommunitySummary> {
        let limit = limit.clamp(1, MAX_TOP_COMMUNITIES);
        let min_size = min_size.max(2);

        self.groups
            .iter()
            .filter(|g| g.members.len() >= min_size)
            .take(limit)
            .map(|g| {
                let total: u32 = g.members.iter().map(|m| scores.normalized(m)).sum();
                CommunitySummary {
                    community_id: g.id,
                    size: g.members.len(),
                    avg_score: total as f64 / g.members.len() as f64,
                    top_members: ranked_members(scores, &g.members, TOP_MEMBERS_PER_COMMUNITY),
                }
            })
            .collect()
    }
}

fn ranked_members(scores: &ScoreIndex, members: &[Identity], limit: usize) -> Vec<CommunityMember> {
    let mut ranked: Vec<CommunityMember> = members
        .iter()
        .map(|m| CommunityMember {
            pubkey: *m,
            normalized: scores.normalized(m),
            raw: scores.raw(m),
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.raw
            .partial_cmp(&a.raw)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.pubkey.cmp(&b.pubkey))
    });
    ranked.truncate(limit);
    ranked
}

/// A scored community member
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommunityMember {
    pub pubkey: Identity,
    pub normalized: u32,
    pub raw: f64,
}

/// Community lookup for one identity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommunityMembership {
    pub pubkey: Identity,
    pub community_id: u32,
    pub size: usize,
    pub members: Vec<CommunityMember>,
}

/// Summary row for the community listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommunitySummary {
    pub community_id: u32,
    pub size: usize,

    /// Mean normalized score of all members
    pub avg_score: f64,

    pub top_members: Vec<CommunityMember>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::fixtures::{adjacency, id};
    use crate::rank::{PageRankConfig, PageRankScorer};
    use chrono::Utc;

    fn two_triangles() -> Adjacency {
        adjacency(&[(1, 2), (2, 3), (3, 1), (4, 5), (5, 6), (6, 4), (7, 8)])
    }

    fn seeded() -> LabelPropagation {
        LabelPropagation::default().with_seed(7)
    }

    #[test]
    fn test_disjoint_triangles_split() {
        let index = CommunityIndex::detect(&two_triangles(), &seeded());

        assert_eq!(index.label_of(&id(1)), index.label_of(&id(2)));
        assert_eq!(index.label_of(&id(2)), index.label_of(&id(3)));
        assert_eq!(index.label_of(&id(4)), index.label_of(&id(6)));
        assert_ne!(index.label_of(&id(1)), index.label_of(&id(4)));

        assert_eq!(index.community_count(), 3);
        assert_eq!(index.nontrivial_count(), 2);
        assert_eq!(index.largest(), 3);
    }

    #[test]
    fn test_seed_makes_runs_reproducible() {
        let graph = IndexedGraph::from_adjacency(&adjacency(&[(1, 2), (2, 3), (3, 4), (4, 1), (2, 4), (5, 1)]));
        let first = seeded().run(&graph);
        let second = seeded().run(&graph);
        assert_eq!(first, second);
    }

    #[test]
    fn test_dominant_label_prefers_highest_on_ties() {
        let counts: HashMap<u32, usize> = [(3, 2), (9, 2), (5, 1)].into_iter().collect();
        assert_eq!(dominant_label(&counts), Some(9));

        let counts: HashMap<u32, usize> = [(3, 3), (9, 2)].into_iter().collect();
        assert_eq!(dominant_label(&counts), Some(3));

        assert_eq!(dominant_label(&HashMap::new()), None);
    }

    #[test]
    fn test_isolated_self_loop_keeps_own_label() {
        let graph = IndexedGraph::from_adjacency(&adjacency(&[(1, 1), (2, 3)]));
        let labels = seeded().run(&graph);
        assert_eq!(labels[0], 0);
    }

    #[test]
    fn test_queries() {
        let adj = two_triangles();
        let scores = ScoreIndex::new(
            PageRankScorer::new(PageRankConfig::default()).compute(&adj, Utc::now()),
            Utc::now(),
        );
        let index = CommunityIndex::detect(&adj, &seeded());

        let membership = index.community_of(&scores, &id(5)).unwrap();
        assert_eq!(membership.size, 3);
        assert_eq!(membership.members.len(), 3);
        assert!(index.community_of(&scores, &id(99)).is_none());

        // min_size clamps to 2, so the pair {7, 8} is listed last
        let top = index.top_communities(&scores, 10, 0);
        assert_eq!(top.len(), 3);
        assert_eq!(top[0].size, 3);
        assert_eq!(top[2].size, 2);
        assert!(top[0].community_id < top[1].community_id);

        let big = index.top_communities(&scores, 10, 3);
        assert_eq!(big.len(), 2);
        assert!(big.iter().all(|c| c.top_members.len() == 3));
    }
}
