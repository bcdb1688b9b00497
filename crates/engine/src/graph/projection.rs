//! Dense integer projection of a follow graph snapshot
//!
//! Whole-graph algorithms (PageRank, components, label propagation) run on
//! contiguous `u32` indices instead of hashing 32-byte keys per visit.

use super::Adjacency;
use std::collections::HashMap;
use trustgraph_common::Identity;

/// Index-keyed copy of an adjacency snapshot
#[derive(Debug, Clone)]
pub struct IndexedGraph {
    /// Slot -> identity, in byte order
    nodes: Vec<Identity>,

    /// Identity -> slot
    index: HashMap<Identity, u32>,

    /// Outgoing targets per slot, duplicates preserved
    out_edges: Vec<Vec<u32>>,

    /// Incoming sources per slot, duplicates preserved
    in_edges: Vec<Vec<u32>>,
}

impl IndexedGraph {
    /// Project every identity that appears on an edge
    pub fn from_adjacency(adjacency: &Adjacency) -> Self {
        let nodes: Vec<Identity> = adjacency.nodes().into_iter().collect();
        let index: HashMap<Identity, u32> = nodes
            .iter()
            .enumerate()
            .map(|(slot, id)| (*id, slot as u32))
            .collect();

        let mut out_edges = vec![Vec::new(); nodes.len()];
        let mut in_edges = vec![Vec::new(); nodes.len()];

        for (slot, id) in nodes.iter().enumerate() {
            for target in adjacency.follows(id) {
                let t = index[target];
                out_edges[slot].push(t);
                in_edges[t as usize].push(slot as u32);
            }
        }

        Self {
            nodes,
            index,
            out_edges,
            in_edges,
        }
    }

    /// Number of projected identities
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Total edges, duplicates included
    pub fn edge_count(&self) -> usize {
        self.out_edges.iter().map(|v| v.len()).sum()
    }

    /// Identity at a slot
    pub fn identity(&self, slot: u32) -> Identity {
        self.nodes[slot as usize]
    }

    /// All identities in slot order
    pub fn identities(&self) -> &[Identity] {
        &self.nodes
    }

    /// Slot of an identity
    pub fn slot(&self, id: &Identity) -> Option<u32> {
        self.index.get(id).copied()
    }

    /// Outgoing targets of a slot
    pub fn out_neighbors(&self, slot: u32) -> &[u32] {
        &self.out_edges[slot as usize]
    }

    /// Incoming sources of a slot
    pub fn in_neighbors(&self, slot: u32) -> &[u32] {
        &self.in_edges[slot as usize]
    }

    /// Distinct neighbors ignoring direction, self excluded
    pub fn undirected_neighbors(&self, slot: u32) -> Vec<u32> {
        let mut neighbors: Vec<u32> = self
            .out_neighbors(slot)
            .iter()
            .chain(self.in_neighbors(slot))
            .copied()
            .filter(|n| *n != slot)
            .collect();
        neighbors.sort_unstable();
        neighbors.dedup();
        neighbors
    }

    /// In-degree per slot, duplicates included
    pub fn in_degrees(&self) -> Vec<usize> {
        self.in_edges.iter().map(|v| v.len()).collect()
    }

    /// Out-degree per slot, duplicates included
    pub fn out_degrees(&self) -> Vec<usize> {
        self.out_edges.iter().map(|v| v.len()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::fixtures::{adjacency, id};

    #[test]
    fn test_projection_slots_in_byte_order() {
        let graph = IndexedGraph::from_adjacency(&adjacency(&[(3, 1), (2, 3)]));
        assert_eq!(graph.identities(), &[id(1), id(2), id(3)]);
        assert_eq!(graph.slot(&id(3)), Some(2));
        assert_eq!(graph.slot(&id(9)), None);
    }

    #[test]
    fn test_projection_preserves_duplicates() {
        let graph = IndexedGraph::from_adjacency(&adjacency(&[(1, 2), (1, 2), (2, 1)]));
        assert_eq!(graph.edge_count(), 3);
        assert_eq!(graph.out_neighbors(0), &[1, 1]);
        assert_eq!(graph.in_neighbors(1), &[0, 0]);
        assert_eq!(graph.undirected_neighbors(0), vec![1]);
    }

    #[test]
    fn test_degrees() {
        let graph = IndexedGraph::from_adjacency(&adjacency(&[(1, 2), (1, 3), (2, 3)]));
        assert_eq!(graph.out_degrees(), vec![2, 1, 0]);
        assert_eq!(graph.in_degrees(), vec![0, 1, 2]);
    }
}
