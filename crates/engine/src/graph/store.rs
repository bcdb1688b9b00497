//! Lock-guarded live follow graph
//!
//! One reader-writer lock covers forward, reverse, and edge-time tables so a
//! single `add_edge` is atomic across both directions.

use super::{Adjacency, EdgeRecord};
use chrono::{DateTime, Utc};
use parking_lot::{RwLock, RwLockReadGuard};
use trustgraph_common::Identity;

/// Read access held for the duration of a short computation
pub type GraphReadGuard<'a> = RwLockReadGuard<'a, Adjacency>;

/// The process-wide follow graph
#[derive(Debug, Default)]
pub struct GraphStore {
    adjacency: RwLock<Adjacency>,

    /// Ignore edges whose (from, to) pair already exists
    dedupe: bool,
}

impl GraphStore {
    /// Create an empty store with multiset edge semantics
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store, optionally dropping repeated edges on ingest
    pub fn with_dedupe(dedupe: bool) -> Self {
        Self {
            adjacency: RwLock::new(Adjacency::new()),
            dedupe,
        }
    }

    /// Append one edge; returns whether the edge was added
    pub fn add_edge(&self, from: Identity, to: Identity, time: Option<DateTime<Utc>>) -> bool {
        let mut adjacency = self.adjacency.write();
        Self::append(&mut adjacency, self.dedupe, from, to, time)
    }

    /// Append many edges under a single write lock; returns the number added
    pub fn add_edges<I>(&self, edges: I) -> usize
    where
        I: IntoIterator<Item = EdgeRecord>,
    {
        let mut adjacency = self.adjacency.write();
        edges
            .into_iter()
            .filter(|e| Self::append(&mut adjacency, self.dedupe, e.from, e.to, e.created_at))
            .count()
    }

    fn append(
        adjacency: &mut Adjacency,
        dedupe: bool,
        from: Identity,
        to: Identity,
        time: Option<DateTime<Utc>>,
    ) -> bool {
        if dedupe && adjacency.is_following(&from, &to) {
            // Keep the freshest known time for the existing edge
            if let Some(time) = time {
                adjacency.edge_times.insert((from, to), time);
            }
            return false;
        }

        adjacency.push_edge(from, to, time);
        true
    }

    /// Copy of the identities `x` follows
    pub fn follows(&self, x: &Identity) -> Vec<Identity> {
        self.adjacency.read().follows(x).to_vec()
    }

    /// Copy of the identities following `x`
    pub fn followers(&self, x: &Identity) -> Vec<Identity> {
        self.adjacency.read().followers(x).to_vec()
    }

    /// Immutable clone of all tables taken in one lock acquisition
    pub fn snapshot_adjacency(&self) -> Adjacency {
        self.adjacency.read().clone()
    }

    /// Hold the read lock for a short computation
    pub fn read(&self) -> GraphReadGuard<'_> {
        self.adjacency.read()
    }

    /// Total edges, duplicates included
    pub fn edge_count(&self) -> usize {
        self.adjacency.read().edge_count()
    }

    /// Whether repeated edges are dropped on ingest
    pub fn dedupes(&self) -> bool {
        self.dedupe
    }
}
