//! Trust paths and neighborhoods
//!
//! Provides:
//! - BFS shortest path over follow edges
//! - k vertex-disjoint paths (intermediates never reused)
//! - Per-path and combined trust scoring
//! - 1-2 hop neighborhoods labeled by relationship

use crate::graph::Adjacency;
use crate::rank::ScoreIndex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet, VecDeque};
use trustgraph_common::Identity;

/// Hard cap on hops for path queries
pub const MAX_PATH_DEPTH: usize = 6;

/// Upper bound on disjoint paths per query
pub const MAX_DISJOINT_PATHS: usize = 5;

/// Upper bound on neighborhood results
pub const MAX_NEIGHBORHOOD_LIMIT: usize = 200;

const MUTUAL_HOP_BONUS: f64 = 1.2;
const LENGTH_PENALTY_BASE: f64 = 1.3;
const MIN_HOP_FACTOR: f64 = 0.01;

/// Shortest follow path from `source` to `target` within `max_depth` hops
///
/// Nodes in `excluded` are treated as already visited.
pub fn shortest_path(
    adjacency: &Adjacency,
    source: Identity,
    target: Identity,
    max_depth: usize,
    excluded: &HashSet<Identity>,
) -> Option<Vec<Identity>> {
    if source == target {
        return Some(vec![source]);
    }

    let mut visited: HashSet<Identity> = excluded.clone();
    visited.insert(source);

    let mut parents: HashMap<Identity, Identity> = HashMap::new();
    let mut queue = VecDeque::from([(source, 0usize)]);

    while let Some((current, depth)) = queue.pop_front() {
        if depth >= max_depth {
            continue;
        }

        for &next in adjacency.follows(&current) {
            if !visited.insert(next) {
                continue;
            }
            parents.insert(next, current);

            if next == target {
                return Some(rebuild_path(&parents, source, target));
            }
            queue.push_back((next, depth + 1));
        }
    }

    None
}

fn rebuild_path(parents: &HashMap<Identity, Identity>, source: Identity, target: Identity) -> Vec<Identity> {
    let mut path = vec![target];
    let mut current = target;

    while current != source {
        current = parents[&current];
        path.push(current);
    }

    path.reverse();
    path
}

/// Up to `k` paths whose intermediate identities never repeat across paths
///
/// Stops early when no further path exists or a direct edge is found.
pub fn disjoint_paths(
    adjacency: &Adjacency,
    source: Identity,
    target: Identity,
    k: usize,
    max_depth: usize,
) -> Vec<Vec<Identity>> {
    let mut paths = Vec::new();
    let mut excluded = HashSet::new();

    while paths.len() < k {
        let Some(path) = shortest_path(adjacency, source, target, max_depth, &excluded) else {
            break;
        };

        let intermediates: Vec<Identity> = if path.len() > 2 {
            path[1..path.len() - 1].to_vec()
        } else {
            Vec::new()
        };
        paths.push(path);

        if intermediates.is_empty() {
            break;
        }
        excluded.extend(intermediates);
    }

    paths
}

/// Trust carried along one path
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathTrust {
    /// Identities from source to target
    pub hops: Vec<Identity>,

    /// Product of hop factors with a length penalty, in [0, 1]
    pub trust: f64,

    /// Position in `hops` of the lowest-scored identity
    pub weakest_hop: usize,
}

/// Score a path by the trust of each hop's source
pub fn score_path(adjacency: &Adjacency, scores: &ScoreIndex, path: &[Identity]) -> PathTrust {
    let product: f64 = path
        .windows(2)
        .map(|hop| {
            let (a, b) = (hop[0], hop[1]);
            let mut factor = (scores.normalized(&a) as f64 / 100.0).max(MIN_HOP_FACTOR);
            if adjacency.is_following(&b, &a) {
                factor = (factor * MUTUAL_HOP_BONUS).min(1.0);
            }
            factor
        })
        .product();

    let penalty = LENGTH_PENALTY_BASE
        .powf(-(path.len() as f64 - 2.0))
        .min(1.0);

    let weakest_hop = path
        .iter()
        .enumerate()
        .min_by_key(|(_, id)| scores.normalized(id))
        .map(|(i, _)| i)
        .unwrap_or(0);

    PathTrust {
        hops: path.to_vec(),
        trust: (product * penalty).clamp(0.0, 1.0),
        weakest_hop,
    }
}

/// Probability that at least one path carries trust
pub fn combined_trust(trusts: impl IntoIterator<Item = f64>) -> f64 {
    1.0 - trusts.into_iter().map(|t| 1.0 - t).product::<f64>()
}

/// Single shortest path lookup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathReport {
    pub source: Identity,
    pub target: Identity,
    pub found: bool,

    /// Empty when no path exists within the depth budget
    pub path: Vec<Identity>,

    /// Number of edges traversed
    pub hops: usize,
}

impl PathReport {
    pub fn new(source: Identity, target: Identity, path: Option<Vec<Identity>>) -> Self {
        let path = path.unwrap_or_default();
        Self {
            source,
            target,
            found: !path.is_empty(),
            hops: path.len().saturating_sub(1),
            path,
        }
    }
}

/// Multi-path trust between two identities
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustPathReport {
    pub source: Identity,
    pub target: Identity,
    pub paths: Vec<PathTrust>,
    pub combined_trust: f64,
}

/// Find up to `k` disjoint paths and score them
pub fn trust_paths(
    adjacency: &Adjacency,
    scores: &ScoreIndex,
    source: Identity,
    target: Identity,
    k: usize,
    max_depth: usize,
) -> TrustPathReport {
    let k = k.clamp(1, MAX_DISJOINT_PATHS);
    let paths: Vec<PathTrust> = disjoint_paths(adjacency, source, target, k, max_depth)
        .iter()
        .map(|p| score_path(adjacency, scores, p))
        .collect();
    let combined = combined_trust(paths.iter().map(|p| p.trust));

    TrustPathReport {
        source,
        target,
        paths,
        combined_trust: combined,
    }
}

/// How a neighbor relates to the queried identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relation {
    Follows,
    Follower,
    Mutual,
    Extended,
}

/// One identity in a neighborhood listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Neighbor {
    pub pubkey: Identity,
    pub relation: Relation,
    pub normalized: u32,
    pub raw: f64,
}

/// Follows, followers, and optionally follows-of-follows of `x`
pub fn neighborhood(
    adjacency: &Adjacency,
    scores: &ScoreIndex,
    x: Identity,
    depth: usize,
    limit: usize,
) -> Vec<Neighbor> {
    let depth = depth.clamp(1, 2);
    let limit = limit.clamp(1, MAX_NEIGHBORHOOD_LIMIT);

    let follows = adjacency.follow_set(&x);
    let followers = adjacency.follower_set(&x);

    let mut seen: HashSet<Identity> = HashSet::new();
    let mut entries: Vec<(Identity, Relation)> = Vec::new();

    for &id in adjacency.follows(&x).iter().chain(adjacency.followers(&x)) {
        if id == x || !seen.insert(id) {
            continue;
        }
        let relation = match (follows.contains(&id), followers.contains(&id)) {
            (true, true) => Relation::Mutual,
            (true, false) => Relation::Follows,
            _ => Relation::Follower,
        };
        entries.push((id, relation));
    }

    if depth == 2 {
        'outer: for friend in adjacency.follows(&x) {
            for &id in adjacency.follows(friend) {
                if entries.len() >= limit {
                    break 'outer;
                }
                if id != x && seen.insert(id) {
                    entries.push((id, Relation::Extended));
                }
            }
        }
    }

    let mut neighbors: Vec<Neighbor> = entries
        .into_iter()
        .map(|(pubkey, relation)| Neighbor {
            pubkey,
            relation,
            normalized: scores.normalized(&pubkey),
            raw: scores.raw(&pubkey),
        })
        .collect();

    neighbors.sort_by(|a, b| {
        b.normalized
            .cmp(&a.normalized)
            .then_with(|| b.raw.partial_cmp(&a.raw).unwrap_or(Ordering::Equal))
            .then_with(|| a.pubkey.cmp(&b.pubkey))
    });
    neighbors.truncate(limit);
    neighbors
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

    // alice=1 bob=2 carol=3 dave=4 eve=5 frank=6
    fn two_route_graph() -> Adjacency {
        adjacency(&[(1, 2), (2, 3), (3, 4), (1, 5), (5, 6), (6, 4)])
    }

    #[test]
    fn test_bfs_finds_three_hop_path() {
        let adj = two_route_graph();
        let path = shortest_path(&adj, id(1), id(4), MAX_PATH_DEPTH, &HashSet::new()).unwrap();

        assert_eq!(path.len(), 4);
        assert_eq!(path.first(), Some(&id(1)));
        assert_eq!(path.last(), Some(&id(4)));
        for hop in path.windows(2) {
            assert!(adj.is_following(&hop[0], &hop[1]));
        }
    }

    #[test]
    fn test_same_endpoints() {
        let adj = two_route_graph();
        assert_eq!(
            shortest_path(&adj, id(1), id(1), MAX_PATH_DEPTH, &HashSet::new()),
            Some(vec![id(1)])
        );
    }

    #[test]
    fn test_depth_budget() {
        let adj = adjacency(&[(1, 2), (2, 3), (3, 4)]);
        assert!(shortest_path(&adj, id(1), id(4), 2, &HashSet::new()).is_none());
        let path = shortest_path(&adj, id(1), id(4), 3, &HashSet::new()).unwrap();
        assert!(path.len() <= 3 + 1);
    }

    #[test]
    fn test_unreachable() {
        let adj = adjacency(&[(1, 2), (3, 4)]);
        assert!(shortest_path(&adj, id(1), id(4), MAX_PATH_DEPTH, &HashSet::new()).is_none());
    }

    #[test]
    fn test_disjoint_paths_share_no_intermediates() {
        let adj = two_route_graph();
        let paths = disjoint_paths(&adj, id(1), id(4), 5, MAX_PATH_DEPTH);
        assert_eq!(paths.len(), 2);

        let mut used: HashSet<Identity> = HashSet::new();
        for path in &paths {
            let inner: HashSet<Identity> = path[1..path.len() - 1].iter().copied().collect();
            assert!(inner.is_disjoint(&used));
            used.extend(inner);
        }
    }

    #[test]
    fn test_direct_edge_stops_enumeration() {
        let adj = adjacency(&[(1, 4), (1, 2), (2, 4)]);
        let paths = disjoint_paths(&adj, id(1), id(4), 5, MAX_PATH_DEPTH);
        assert_eq!(paths, vec![vec![id(1), id(4)]]);
    }

    #[test]
    fn test_path_trust_bounds() {
        let adj = two_route_graph();
        let scores = scored(&adj);
        let report = trust_paths(&adj, &scores, id(1), id(4), 3, MAX_PATH_DEPTH);

        assert_eq!(report.paths.len(), 2);
        for p in &report.paths {
            assert!(p.trust > 0.0 && p.trust <= 1.0);
            assert!(p.weakest_hop < p.hops.len());
        }
        let best = report.paths.iter().map(|p| p.trust).fold(0.0, f64::max);
        assert!(report.combined_trust >= best);
        assert!(report.combined_trust <= 1.0);
    }

    #[test]
    fn test_mutual_hop_bonus() {
        let one_way = adjacency(&[(1, 2), (3, 1)]);
        let mutual = adjacency(&[(1, 2), (2, 1), (3, 1)]);
        let a = score_path(&one_way, &scored(&one_way), &[id(1), id(2)]);
        let b = score_path(&mutual, &scored(&mutual), &[id(1), id(2)]);
        let a_factor = scored(&one_way).normalized(&id(1)) as f64 / 100.0;
        let b_factor = scored(&mutual).normalized(&id(1)) as f64 / 100.0;

        assert!((a.trust - a_factor).abs() < 1e-12);
        assert!((b.trust - (b_factor * 1.2).min(1.0)).abs() < 1e-12);
    }

    #[test]
    fn test_combined_trust() {
        assert_eq!(combined_trust(Vec::<f64>::new()), 0.0);
        assert!((combined_trust([0.5, 0.5]) - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_neighborhood_labels() {
        // 1 follows 2 and 3; 2 and 4 follow 1; 3 follows 5
        let adj = adjacency(&[(1, 2), (1, 3), (2, 1), (4, 1), (3, 5)]);
        let scores = scored(&adj);

        let near = neighborhood(&adj, &scores, id(1), 1, 50);
        let relation = |n: u64| near.iter().find(|e| e.pubkey == id(n)).map(|e| e.relation);
        assert_eq!(relation(2), Some(Relation::Mutual));
        assert_eq!(relation(3), Some(Relation::Follows));
        assert_eq!(relation(4), Some(Relation::Follower));
        assert_eq!(relation(5), None);

        let wide = neighborhood(&adj, &scores, id(1), 2, 50);
        assert!(wide.iter().any(|e| e.pubkey == id(5) && e.relation == Relation::Extended));

        for pair in wide.windows(2) {
            assert!(pair[0].normalized >= pair[1].normalized);
        }
    }

    #[test]
    fn test_neighborhood_limit() {
        let edges: Vec<(u64, u64)> = (2..40).map(|n| (1, n)).collect();
        let adj = adjacency(&edges);
        let near = neighborhood(&adj, &scored(&adj), id(1), 1, 10);
        assert_eq!(near.len(), 10);
    }
}
