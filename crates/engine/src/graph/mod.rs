//! Follow graph representation
//!
//! Provides the in-memory follow graph shared by every analytic:
//! - `Adjacency`: forward, reverse, and edge-time tables
//! - `GraphStore`: the lock-guarded live graph with append-only ingest
//! - `IndexedGraph`: a dense integer projection for whole-graph algorithms

mod projection;
mod store;

pub use projection::IndexedGraph;
pub use store::{GraphReadGuard, GraphStore};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use trustgraph_common::Identity;

/// A follow edge as delivered by a crawler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeRecord {
    /// Identity asserting the follow
    pub from: Identity,

    /// Identity being followed
    pub to: Identity,

    /// When the follow was created, if the source knows
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl EdgeRecord {
    /// Edge without time data
    pub fn new(from: Identity, to: Identity) -> Self {
        Self { from, to, created_at: None }
    }

    /// Edge stamped with its creation time
    pub fn timed(from: Identity, to: Identity, created_at: DateTime<Utc>) -> Self {
        Self { from, to, created_at: Some(created_at) }
    }
}

/// Adjacency tables for the follow graph
///
/// Sequences keep insertion order and may hold duplicates. For every
/// occurrence of `v` in `forward[u]` there is exactly one occurrence of
/// `u` in `reverse[v]`.
#[derive(Debug, Clone, Default)]
pub struct Adjacency {
    /// identity -> identities it follows
    forward: HashMap<Identity, Vec<Identity>>,

    /// identity -> identities following it
    reverse: HashMap<Identity, Vec<Identity>>,

    /// (from, to) -> follow creation time; absent means unknown
    edge_times: HashMap<(Identity, Identity), DateTime<Utc>>,
}

impl Adjacency {
    /// Create empty tables
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an edge to both directions, recording its time if known
    pub(crate) fn push_edge(&mut self, from: Identity, to: Identity, time: Option<DateTime<Utc>>) {
        self.forward.entry(from).or_default().push(to);
        self.reverse.entry(to).or_default().push(from);

        if let Some(time) = time {
            self.edge_times.insert((from, to), time);
        }
    }

    /// Remove every occurrence of `from -> to`; returns how many were removed
    pub(crate) fn remove_edge(&mut self, from: Identity, to: Identity) -> usize {
        let mut removed = 0;

        if let Some(targets) = self.forward.get_mut(&from) {
            let before = targets.len();
            targets.retain(|t| *t != to);
            removed = before - targets.len();
            if targets.is_empty() {
                self.forward.remove(&from);
            }
        }

        if let Some(sources) = self.reverse.get_mut(&to) {
            sources.retain(|s| *s != from);
            if sources.is_empty() {
                self.reverse.remove(&to);
            }
        }

        self.edge_times.remove(&(from, to));
        removed
    }

    /// Identities `x` follows, in insertion order
    pub fn follows(&self, x: &Identity) -> &[Identity] {
        self.forward.get(x).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Identities following `x`, in insertion order
    pub fn followers(&self, x: &Identity) -> &[Identity] {
        self.reverse.get(x).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Distinct follow targets of `x`
    pub fn follow_set(&self, x: &Identity) -> HashSet<Identity> {
        self.follows(x).iter().copied().collect()
    }

    /// Distinct followers of `x`
    pub fn follower_set(&self, x: &Identity) -> HashSet<Identity> {
        self.followers(x).iter().copied().collect()
    }

    /// Whether `from` follows `to`
    pub fn is_following(&self, from: &Identity, to: &Identity) -> bool {
        self.follows(from).contains(to)
    }

    /// Distinct identities that both follow and are followed by `x`
    pub fn mutuals(&self, x: &Identity) -> HashSet<Identity> {
        let follows = self.follow_set(x);
        self.followers(x)
            .iter()
            .filter(|f| follows.contains(f))
            .copied()
            .collect()
    }

    /// Creation time of `from -> to`, if recorded
    pub fn edge_time(&self, from: &Identity, to: &Identity) -> Option<DateTime<Utc>> {
        self.edge_times.get(&(*from, *to)).copied()
    }

    /// Number of recorded edge times
    pub fn timed_edge_count(&self) -> usize {
        self.edge_times.len()
    }

    /// Total edges, duplicates included
    pub fn edge_count(&self) -> usize {
        self.forward.values().map(|v| v.len()).sum()
    }

    /// Sources with at least one outgoing edge
    pub fn sources(&self) -> impl Iterator<Item = (&Identity, &Vec<Identity>)> {
        self.forward.iter()
    }

    /// Every identity that appears on any edge, in byte order
    pub fn nodes(&self) -> BTreeSet<Identity> {
        self.forward
            .iter()
            .flat_map(|(from, targets)| std::iter::once(from).chain(targets.iter()))
            .copied()
            .collect()
    }

    /// Number of identities that appear on any edge
    pub fn node_count(&self) -> usize {
        let mut seen: HashSet<&Identity> = self.forward.keys().collect();
        seen.extend(self.reverse.keys());
        seen.len()
    }

    /// Whether no edge has been added
    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// Identity shorthand for tests
    pub fn id(n: u64) -> Identity {
        Identity::from_u64(n)
    }

    /// Build adjacency from untimed (from, to) pairs
    pub fn adjacency(edges: &[(u64, u64)]) -> Adjacency {
        let mut adj = Adjacency::new();
        for &(from, to) in edges {
            adj.push_edge(id(from), id(to), None);
        }
        adj
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::{adjacency, id};
    use super::*;

    #[test]
    fn test_followers_mirror_follows() {
        let adj = adjacency(&[(1, 2), (1, 3), (2, 3), (1, 2)]);

        // Multiset equality: followers(x) = {u : x in follows(u)}
        for x in adj.nodes() {
            let mut expected: Vec<Identity> = adj
                .sources()
                .flat_map(|(u, targets)| targets.iter().filter(|t| **t == x).map(move |_| *u))
                .collect();
            let mut actual = adj.followers(&x).to_vec();
            expected.sort();
            actual.sort();
            assert_eq!(actual, expected);
        }
    }

    #[test]
    fn test_duplicates_are_kept() {
        let adj = adjacency(&[(1, 2), (1, 2)]);
        assert_eq!(adj.follows(&id(1)), &[id(2), id(2)]);
        assert_eq!(adj.followers(&id(2)), &[id(1), id(1)]);
        assert_eq!(adj.edge_count(), 2);
        assert_eq!(adj.follow_set(&id(1)).len(), 1);
    }

    #[test]
    fn test_nodes_cover_both_ends() {
        let adj = adjacency(&[(1, 2), (3, 2)]);
        let nodes: Vec<Identity> = adj.nodes().into_iter().collect();
        assert_eq!(nodes, vec![id(1), id(2), id(3)]);
        assert_eq!(adj.node_count(), 3);
    }

    #[test]
    fn test_mutuals() {
        let adj = adjacency(&[(1, 2), (2, 1), (1, 3), (4, 1)]);
        let mutuals = adj.mutuals(&id(1));
        assert_eq!(mutuals.len(), 1);
        assert!(mutuals.contains(&id(2)));
    }

    #[test]
    fn test_remove_edge_clears_all_occurrences() {
        let mut adj = adjacency(&[(1, 2), (1, 2), (1, 3)]);
        assert_eq!(adj.remove_edge(id(1), id(2)), 2);
        assert_eq!(adj.follows(&id(1)), &[id(3)]);
        assert!(adj.followers(&id(2)).is_empty());
    }

    #[test]
    fn test_edge_time_is_sparse() {
        let mut adj = Adjacency::new();
        let when = Utc::now();
        adj.push_edge(id(1), id(2), Some(when));
        adj.push_edge(id(1), id(3), None);
        assert_eq!(adj.edge_time(&id(1), &id(2)), Some(when));
        assert_eq!(adj.edge_time(&id(1), &id(3)), None);
        assert_eq!(adj.timed_edge_count(), 1);
    }
}
