//! Trust circles (mutual follows) and circle comparison

use crate::graph::Adjacency;
use crate::rank::ScoreIndex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use trustgraph_common::Identity;

/// Overlap members listed in a comparison
const MAX_OVERLAP_LISTED: usize = 50;

/// A mutual of the queried identity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircleMember {
    pub pubkey: Identity,
    pub normalized: u32,

    /// Follow targets shared with the circle owner
    pub shared_follows: usize,

    /// Tie strength in [0, 1]
    pub strength: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustCircle {
    pub pubkey: Identity,
    pub normalized: u32,
    pub size: usize,
    pub avg_strength: f64,

    /// Strongest ties first
    pub members: Vec<CircleMember>,
}

/// Strength of the tie between two mutuals
pub fn member_strength(owner_score: u32, member_score: u32, shared: usize) -> f64 {
    let base = ((owner_score as f64) * (member_score as f64)).sqrt() / 100.0;
    let overlap = 1.0 + ((shared as f64) + 1.0).log10() / 3.0;
    (base * overlap).min(1.0)
}

/// Mutuals of `x` with per-member tie strength
pub fn trust_circle(adjacency: &Adjacency, scores: &ScoreIndex, x: Identity) -> TrustCircle {
    let follows = adjacency.follow_set(&x);
    let owner_score = scores.normalized(&x);

    let mut members: Vec<CircleMember> = adjacency
        .mutuals(&x)
        .into_iter()
        .filter(|m| *m != x)
        .map(|m| {
            let shared = adjacency.follow_set(&m).intersection(&follows).count();
            let normalized = scores.normalized(&m);
            CircleMember {
                pubkey: m,
                normalized,
                shared_follows: shared,
                strength: member_strength(owner_score, normalized, shared),
            }
        })
        .collect();

    members.sort_by(|a, b| {
        b.strength
            .partial_cmp(&a.strength)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.pubkey.cmp(&b.pubkey))
    });

    let avg_strength = if members.is_empty() {
        0.0
    } else {
        members.iter().map(|m| m.strength).sum::<f64>() / members.len() as f64
    };

    TrustCircle {
        pubkey: x,
        normalized: owner_score,
        size: members.len(),
        avg_strength,
        members,
    }
}

/// The adjacency rows a comparison needs, copied out of the live graph
#[derive(Debug, Clone)]
pub struct CompareInputs {
    pub a: Identity,
    pub b: Identity,
    follows_a: HashSet<Identity>,
    followers_a: HashSet<Identity>,
    follows_b: HashSet<Identity>,
    followers_b: HashSet<Identity>,
}

impl CompareInputs {
    pub fn from_adjacency(adjacency: &Adjacency, a: Identity, b: Identity) -> Self {
        Self {
            a,
            b,
            follows_a: adjacency.follow_set(&a),
            followers_a: adjacency.follower_set(&a),
            follows_b: adjacency.follow_set(&b),
            followers_b: adjacency.follower_set(&b),
        }
    }

    fn circle(follows: &HashSet<Identity>, followers: &HashSet<Identity>, skip: [Identity; 2]) -> HashSet<Identity> {
        follows
            .intersection(followers)
            .filter(|m| !skip.contains(m))
            .copied()
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Compatibility {
    High,
    Moderate,
    Low,
    None,
}

impl Compatibility {
    pub fn from_score(score: u32) -> Self {
        match score {
            60.. => Compatibility::High,
            30..=59 => Compatibility::Moderate,
            10..=29 => Compatibility::Low,
            _ => Compatibility::None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircleComparison {
    pub a: Identity,
    pub b: Identity,

    /// Mutuals both identities share, excluding the two themselves
    pub overlap_count: usize,

    /// Highest-scored shared mutuals
    pub overlap: Vec<Identity>,

    /// Overlap over the union of both circles
    pub jaccard: f64,

    pub shared_follows_count: usize,

    /// Shared follows over the union of both follow sets
    pub follow_similarity: f64,

    /// Mean normalized score of the overlap
    pub avg_overlap_score: f64,

    pub compatibility_score: u32,
    pub classification: Compatibility,
}

/// Compare two identities' circles; symmetric in its arguments
pub fn compare(inputs: &CompareInputs, scores: &ScoreIndex) -> CircleComparison {
    let skip = [inputs.a, inputs.b];
    let circle_a = CompareInputs::circle(&inputs.follows_a, &inputs.followers_a, skip);
    let circle_b = CompareInputs::circle(&inputs.follows_b, &inputs.followers_b, skip);

    // Sorted so float sums do not depend on argument order
    let mut overlap: Vec<(Identity, u32)> = circle_a
        .intersection(&circle_b)
        .map(|m| (*m, scores.normalized(m)))
        .collect();
    overlap.sort_by(|x, y| y.1.cmp(&x.1).then_with(|| x.0.cmp(&y.0)));

    let union = circle_a.union(&circle_b).count();
    let jaccard = ratio(overlap.len(), union);

    let shared_follows = inputs.follows_a.intersection(&inputs.follows_b).count();
    let follow_union = inputs.follows_a.union(&inputs.follows_b).count();
    let follow_similarity = ratio(shared_follows, follow_union);

    let avg_overlap_score = if overlap.is_empty() {
        0.0
    } else {
        overlap.iter().map(|(_, n)| *n as f64).sum::<f64>() / overlap.len() as f64
    };

    let blended = 0.40 * jaccard * 100.0 + 0.30 * follow_similarity * 100.0 + 0.30 * avg_overlap_score;
    let compatibility_score = blended.round().clamp(0.0, 100.0) as u32;

    CircleComparison {
        a: inputs.a,
        b: inputs.b,
        overlap_count: overlap.len(),
        overlap: overlap.iter().take(MAX_OVERLAP_LISTED).map(|(m, _)| *m).collect(),
        jaccard,
        shared_follows_count: shared_follows,
        follow_similarity,
        avg_overlap_score,
        compatibility_score,
        classification: Compatibility::from_score(compatibility_score),
    }
}

fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
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

    #[test]
    fn test_strength_is_capped() {
        assert_eq!(member_strength(100, 100, 1000), 1.0);
        assert_eq!(member_strength(0, 80, 5), 0.0);
        assert!((member_strength(50, 50, 0) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_circle_is_mutuals_only() {
        let adj = adjacency(&[(1, 2), (2, 1), (1, 3), (3, 1), (1, 4), (5, 1)]);
        let circle = trust_circle(&adj, &scored(&adj), id(1));
        assert_eq!(circle.size, 2);
        let members: HashSet<Identity> = circle.members.iter().map(|m| m.pubkey).collect();
        assert_eq!(members, HashSet::from([id(2), id(3)]));
    }

    #[test]
    fn test_follow_similarity() {
        // A=1 follows X,Y,Z; B=2 follows X,Y,W
        let adj = adjacency(&[(1, 10), (1, 11), (1, 12), (2, 10), (2, 11), (2, 13)]);
        let result = compare(&CompareInputs::from_adjacency(&adj, id(1), id(2)), &scored(&adj));
        assert_eq!(result.shared_follows_count, 2);
        assert!((result.follow_similarity - 0.5).abs() < 1e-12);
        assert_eq!(result.overlap_count, 0);
    }

    #[test]
    fn test_compare_is_symmetric() {
        let adj = adjacency(&[
            (1, 3), (3, 1), (1, 4), (4, 1), (1, 5), (5, 1),
            (2, 3), (3, 2), (2, 4), (4, 2), (2, 6), (6, 2),
            (1, 2), (2, 1), (7, 3), (8, 4),
        ]);
        let scores = scored(&adj);
        let forward = compare(&CompareInputs::from_adjacency(&adj, id(1), id(2)), &scores);
        let backward = compare(&CompareInputs::from_adjacency(&adj, id(2), id(1)), &scores);

        assert_eq!(forward.compatibility_score, backward.compatibility_score);
        assert_eq!(forward.overlap, backward.overlap);
        assert_eq!(forward.overlap_count, 2);

        // The queried pair never counts toward overlap
        assert!(!forward.overlap.contains(&id(1)));
        assert!(!forward.overlap.contains(&id(2)));
        assert!((forward.jaccard - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_compatibility_bands() {
        assert_eq!(Compatibility::from_score(60), Compatibility::High);
        assert_eq!(Compatibility::from_score(30), Compatibility::Moderate);
        assert_eq!(Compatibility::from_score(10), Compatibility::Low);
        assert_eq!(Compatibility::from_score(9), Compatibility::None);
    }
}
