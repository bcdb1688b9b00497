//! Whole-graph topology analytics
//!
//! Provides:
//! - Weakly connected components
//! - Degree statistics
//! - Gini inequality of scores
//! - Hill estimator of the in-degree power-law exponent
//! - Reciprocity and density
//! - A blended network health score

use crate::graph::{Adjacency, IndexedGraph};
use crate::rank::ScoreIndex;
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use trustgraph_common::Identity;

/// Weakly connected component summary
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentSummary {
    pub largest_component: usize,
    pub component_count: usize,

    /// Components of size one
    pub isolated_nodes: usize,
}

/// Components ignoring edge direction
pub fn weakly_connected_components(graph: &IndexedGraph) -> ComponentSummary {
    let n = graph.node_count();
    let mut visited = vec![false; n];
    let mut summary = ComponentSummary::default();

    for start in 0..n {
        if visited[start] {
            continue;
        }
        visited[start] = true;

        let mut size = 0;
        let mut queue = VecDeque::from([start as u32]);
        while let Some(current) = queue.pop_front() {
            size += 1;
            for &next in graph.out_neighbors(current).iter().chain(graph.in_neighbors(current)) {
                if !visited[next as usize] {
                    visited[next as usize] = true;
                    queue.push_back(next);
                }
            }
        }

        summary.component_count += 1;
        summary.largest_component = summary.largest_component.max(size);
        if size == 1 {
            summary.isolated_nodes += 1;
        }
    }

    summary
}

/// Mean, median, and max of a degree vector
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DegreeSummary {
    pub mean: f64,

    /// Value at index n/2 of the sorted vector
    pub median: usize,

    pub max: usize,
}

impl DegreeSummary {
    pub fn from_degrees(degrees: &[usize]) -> Self {
        if degrees.is_empty() {
            return Self::default();
        }

        let mut sorted = degrees.to_vec();
        sorted.sort_unstable();

        Self {
            mean: sorted.iter().sum::<usize>() as f64 / sorted.len() as f64,
            median: sorted[sorted.len() / 2],
            max: sorted[sorted.len() - 1],
        }
    }
}

/// In- and out-degree statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DegreeStats {
    pub in_degree: DegreeSummary,
    pub out_degree: DegreeSummary,
}

pub fn degree_stats(graph: &IndexedGraph) -> DegreeStats {
    DegreeStats {
        in_degree: DegreeSummary::from_degrees(&graph.in_degrees()),
        out_degree: DegreeSummary::from_degrees(&graph.out_degrees()),
    }
}

/// Gini coefficient; 0 for an empty or all-zero sequence
pub fn gini(values: &[f64]) -> f64 {
    let n = values.len();
    let total: f64 = values.iter().sum();
    if n == 0 || total == 0.0 {
        return 0.0;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let weighted: f64 = sorted
        .iter()
        .enumerate()
        .map(|(i, v)| (2.0 * (i as f64 + 1.0) - n as f64 - 1.0) * v)
        .sum();

    weighted / (n as f64 * total)
}

/// Minimum nonzero degrees before the tail estimate is attempted
const MIN_POWER_LAW_SAMPLES: usize = 10;

/// Hill estimator over the top 10% of nonzero degrees; 0 when undetermined
pub fn power_law_alpha(degrees: &[usize]) -> f64 {
    let mut nonzero: Vec<usize> = degrees.iter().copied().filter(|d| *d > 0).collect();
    if nonzero.len() < MIN_POWER_LAW_SAMPLES {
        return 0.0;
    }
    nonzero.sort_unstable();

    let tail_len = nonzero.len() / 10;
    if tail_len == 0 {
        return 0.0;
    }

    let tail = &nonzero[nonzero.len() - tail_len..];
    let x_min = tail[0].max(1) as f64;
    let sum_log: f64 = tail.iter().map(|&x| (x as f64 / x_min).ln()).sum();
    if sum_log == 0.0 {
        return 0.0;
    }

    1.0 + tail_len as f64 / sum_log
}

/// Fraction of edges (u, v) whose reverse (v, u) also exists
///
/// Each mutual pair contributes both of its edges, duplicates included.
pub fn reciprocity(adjacency: &Adjacency) -> f64 {
    let total = adjacency.edge_count();
    if total == 0 {
        return 0.0;
    }

    let pairs: HashSet<(Identity, Identity)> = adjacency
        .sources()
        .flat_map(|(from, targets)| targets.iter().map(move |to| (*from, *to)))
        .collect();

    let reciprocated = adjacency
        .sources()
        .flat_map(|(from, targets)| targets.iter().map(move |to| (*from, *to)))
        .filter(|(from, to)| pairs.contains(&(*to, *from)))
        .count();

    reciprocated as f64 / total as f64
}

/// edges / (n * (n - 1)); 0 below two nodes
pub fn density(nodes: usize, edges: usize) -> f64 {
    if nodes < 2 {
        return 0.0;
    }
    edges as f64 / (nodes as f64 * (nodes as f64 - 1.0))
}

/// Health bands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthClass {
    Excellent,
    Good,
    Developing,
    Weak,
    Nascent,
}

impl HealthClass {
    pub fn from_score(score: u32) -> Self {
        match score {
            80.. => HealthClass::Excellent,
            60..=79 => HealthClass::Good,
            40..=59 => HealthClass::Developing,
            20..=39 => HealthClass::Weak,
            _ => HealthClass::Nascent,
        }
    }
}

/// Whole-network structural report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkHealth {
    pub nodes: usize,
    pub edges: usize,
    pub density: f64,
    pub reciprocity: f64,

    /// Inequality of raw PageRank scores
    pub gini: f64,

    pub power_law_alpha: f64,
    pub components: ComponentSummary,
    pub degrees: DegreeStats,
    pub health_score: u32,
    pub classification: HealthClass,
}

/// Blend structural signals into a 0-100 health score
pub fn health_score(
    nodes: usize,
    largest_component: usize,
    reciprocity: f64,
    gini: f64,
    alpha: f64,
) -> u32 {
    if nodes == 0 {
        return 0;
    }

    let connectivity = largest_component as f64 / nodes as f64;
    let mutuality = (reciprocity / 0.5).min(1.0);
    let equality = 1.0 - gini;
    let scale = ((nodes as f64).log10() / 5.0).clamp(0.0, 1.0);
    let shape = (1.0 - (alpha - 2.5).abs() / 2.0).max(0.0);

    let blended = 0.30 * connectivity + 0.20 * mutuality + 0.20 * equality + 0.15 * scale + 0.15 * shape;
    (blended * 100.0).round().clamp(0.0, 100.0) as u32
}

/// Compute the full network report over a snapshot
pub fn network_health(adjacency: &Adjacency, scores: &ScoreIndex) -> NetworkHealth {
    let graph = IndexedGraph::from_adjacency(adjacency);
    let nodes = graph.node_count();
    let edges = graph.edge_count();

    let components = weakly_connected_components(&graph);
    let degrees = degree_stats(&graph);
    let reciprocity = reciprocity(adjacency);
    let values: Vec<f64> = scores.values().collect();
    let gini = gini(&values);
    let alpha = power_law_alpha(&graph.in_degrees());

    let score = health_score(nodes, components.largest_component, reciprocity, gini, alpha);

    NetworkHealth {
        nodes,
        edges,
        density: density(nodes, edges),
        reciprocity,
        gini,
        power_law_alpha: alpha,
        components,
        degrees,
        health_score: score,
        classification: HealthClass::from_score(score),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::fixtures::adjacency;

    #[test]
    fn test_components() {
        // {1,2,3} connected by direction-agnostic edges, {4,5} separate
        let graph = IndexedGraph::from_adjacency(&adjacency(&[(1, 2), (3, 2), (4, 5)]));
        let summary = weakly_connected_components(&graph);
        assert_eq!(summary.component_count, 2);
        assert_eq!(summary.largest_component, 3);
        assert_eq!(summary.isolated_nodes, 0);
    }

    #[test]
    fn test_self_loop_is_isolated() {
        let graph = IndexedGraph::from_adjacency(&adjacency(&[(1, 1), (2, 3)]));
        let summary = weakly_connected_components(&graph);
        assert_eq!(summary.isolated_nodes, 1);
    }

    #[test]
    fn test_degree_summary() {
        let summary = DegreeSummary::from_degrees(&[3, 1, 2, 10]);
        assert_eq!(summary.median, 3);
        assert_eq!(summary.max, 10);
        assert!((summary.mean - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_gini_bounds() {
        assert_eq!(gini(&[0.25, 0.25, 0.25, 0.25]), 0.0);
        assert_eq!(gini(&[]), 0.0);

        let mut skewed = vec![0.0; 9];
        skewed.push(1.0);
        assert!(gini(&skewed) > 0.5);
    }

    #[test]
    fn test_power_law_needs_samples() {
        assert_eq!(power_law_alpha(&[1, 2, 3]), 0.0);
        assert_eq!(power_law_alpha(&[5; 40]), 0.0);

        let degrees: Vec<usize> = (1..=100).collect();
        let alpha = power_law_alpha(&degrees);
        assert!(alpha > 1.0);
    }

    #[test]
    fn test_reciprocity_extremes() {
        assert_eq!(reciprocity(&adjacency(&[(1, 2), (2, 1), (3, 4), (4, 3)])), 1.0);
        assert_eq!(reciprocity(&adjacency(&[(1, 2), (2, 3)])), 0.0);
        assert_eq!(reciprocity(&adjacency(&[(1, 2), (2, 1), (1, 3)])), 2.0 / 3.0);
    }

    #[test]
    fn test_density() {
        assert_eq!(density(1, 0), 0.0);
        assert_eq!(density(3, 6), 1.0);
    }

    #[test]
    fn test_health_classes() {
        assert_eq!(HealthClass::from_score(85), HealthClass::Excellent);
        assert_eq!(HealthClass::from_score(60), HealthClass::Good);
        assert_eq!(HealthClass::from_score(40), HealthClass::Developing);
        assert_eq!(HealthClass::from_score(20), HealthClass::Weak);
        assert_eq!(HealthClass::from_score(19), HealthClass::Nascent);
        assert_eq!(health_score(0, 0, 0.0, 0.0, 0.0), 0);
    }

    #[test]
    fn test_health_score_bounds() {
        let perfect = health_score(100_000, 100_000, 1.0, 0.0, 2.5);
        assert_eq!(perfect, 100);
    }
}
