//! Composite reputation grade

use super::{follow_quality, sybil};
use crate::graph::Adjacency;
use crate::rank::ScoreIndex;
use serde::{Deserialize, Serialize};
use trustgraph_common::Identity;

/// Circle size at which breadth saturates
const FULL_CIRCLE: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
}

impl Grade {
    pub fn from_score(score: u32) -> Self {
        match score {
            80.. => Grade::A,
            60..=79 => Grade::B,
            40..=59 => Grade::C,
            20..=39 => Grade::D,
            _ => Grade::F,
        }
    }
}

/// Inputs to the reputation blend, each on the 0-100 scale
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReputationComponents {
    pub normalized: u32,
    pub sybil_score: u32,
    pub follow_quality: u32,
    pub circle_breadth: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reputation {
    pub pubkey: Identity,
    pub reputation_score: u32,
    pub grade: Grade,
    pub components: ReputationComponents,
}

impl ReputationComponents {
    pub fn blended(&self) -> u32 {
        let total = 0.40 * self.normalized as f64
            + 0.25 * self.sybil_score as f64
            + 0.20 * self.follow_quality as f64
            + 0.15 * self.circle_breadth;
        total.round().clamp(0.0, 100.0) as u32
    }
}

pub fn reputation(adjacency: &Adjacency, scores: &ScoreIndex, x: Identity) -> Reputation {
    let circle = adjacency.mutuals(&x).len();
    let components = ReputationComponents {
        normalized: scores.normalized(&x),
        sybil_score: sybil::assess(adjacency, scores, x).sybil_score,
        follow_quality: follow_quality::assess(adjacency, scores, x, 0).quality_score,
        circle_breadth: (circle as f64 / FULL_CIRCLE).min(1.0) * 100.0,
    };
    let reputation_score = components.blended();

    Reputation {
        pubkey: x,
        reputation_score,
        grade: Grade::from_score(reputation_score),
        components,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::fixtures::{adjacency, id};
    use crate::rank::{PageRankConfig, PageRankScorer};
    use chrono::Utc;

    #[test]
    fn test_grades() {
        assert_eq!(Grade::from_score(80), Grade::A);
        assert_eq!(Grade::from_score(79), Grade::B);
        assert_eq!(Grade::from_score(40), Grade::C);
        assert_eq!(Grade::from_score(20), Grade::D);
        assert_eq!(Grade::from_score(0), Grade::F);
    }

    #[test]
    fn test_blend_weights() {
        let full = ReputationComponents {
            normalized: 100,
            sybil_score: 100,
            follow_quality: 100,
            circle_breadth: 100.0,
        };
        assert_eq!(full.blended(), 100);

        let score_only = ReputationComponents {
            normalized: 100,
            sybil_score: 0,
            follow_quality: 0,
            circle_breadth: 0.0,
        };
        assert_eq!(score_only.blended(), 40);
    }

    #[test]
    fn test_unknown_identity_grades_low() {
        let adj = adjacency(&[(1, 2)]);
        let scores = ScoreIndex::new(
            PageRankScorer::new(PageRankConfig::default()).compute(&adj, Utc::now()),
            Utc::now(),
        );
        let rep = reputation(&adj, &scores, id(42));
        assert_eq!(rep.components.normalized, 0);
        assert_eq!(rep.components.circle_breadth, 0.0);
        assert_eq!(rep.grade, Grade::F);
    }
}
