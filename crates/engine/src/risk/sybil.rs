//! Sybil likelihood from five weighted structural signals

use crate::graph::Adjacency;
use crate::rank::ScoreIndex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use trustgraph_common::Identity;

const FOLLOWER_QUALITY_WEIGHT: f64 = 0.30;
const MUTUAL_TRUST_WEIGHT: f64 = 0.25;
const SCORE_CONSISTENCY_WEIGHT: f64 = 0.15;
const FOLLOWER_DIVERSITY_WEIGHT: f64 = 0.15;
const ACCOUNT_SUBSTANCE_WEIGHT: f64 = 0.15;

/// Followers sampled for the diversity signal
const DIVERSITY_SAMPLE: usize = 50;

/// Mutuals scoring above this count as high-value
const HIGH_VALUE_SCORE: u32 = 50;

/// Sybil classification bands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SybilClass {
    Genuine,
    LikelyGenuine,
    Suspicious,
    LikelySybil,
}

impl SybilClass {
    pub fn from_score(score: u32) -> Self {
        match score {
            75.. => SybilClass::Genuine,
            50..=74 => SybilClass::LikelyGenuine,
            25..=49 => SybilClass::Suspicious,
            _ => SybilClass::LikelySybil,
        }
    }
}

/// Individual signals, each in [0, 1]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SybilSignals {
    pub follower_quality: f64,
    pub mutual_trust: f64,
    pub score_consistency: f64,
    pub follower_diversity: f64,
    pub account_substance: f64,
}

impl SybilSignals {
    /// Weighted blend on the 0-100 scale
    pub fn blended(&self) -> u32 {
        let total = FOLLOWER_QUALITY_WEIGHT * self.follower_quality
            + MUTUAL_TRUST_WEIGHT * self.mutual_trust
            + SCORE_CONSISTENCY_WEIGHT * self.score_consistency
            + FOLLOWER_DIVERSITY_WEIGHT * self.follower_diversity
            + ACCOUNT_SUBSTANCE_WEIGHT * self.account_substance;
        (total * 100.0).round().clamp(0.0, 100.0) as u32
    }
}

/// Sybil assessment for one identity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SybilReport {
    pub pubkey: Identity,

    /// 0-100; higher is more likely genuine
    pub sybil_score: u32,

    pub classification: SybilClass,

    /// How much data backs the score, in [0.1, 1.0]
    pub confidence: f64,

    pub signals: SybilSignals,
    pub followers: usize,
    pub follows: usize,
    pub mutual_count: usize,
}

/// Assess one identity against the graph and score index
pub fn assess(adjacency: &Adjacency, scores: &ScoreIndex, x: Identity) -> SybilReport {
    let mut followers: Vec<Identity> = adjacency.follower_set(&x).into_iter().collect();
    followers.sort();
    let follows = adjacency.follow_set(&x);
    let mutuals: Vec<Identity> = followers.iter().filter(|f| follows.contains(f)).copied().collect();

    let signals = SybilSignals {
        follower_quality: follower_quality(scores, &followers),
        mutual_trust: mutual_trust(scores, &mutuals, followers.len()),
        score_consistency: score_consistency(scores, &x, followers.len()),
        follower_diversity: follower_diversity(adjacency, &x, &followers),
        account_substance: account_substance(scores.normalized(&x), follows.len(), followers.len()),
    };
    let sybil_score = signals.blended();

    SybilReport {
        pubkey: x,
        sybil_score,
        classification: SybilClass::from_score(sybil_score),
        confidence: confidence(followers.len(), follows.len(), scores.contains(&x)),
        signals,
        followers: followers.len(),
        follows: follows.len(),
        mutual_count: mutuals.len(),
    }
}

fn follower_quality(scores: &ScoreIndex, followers: &[Identity]) -> f64 {
    if followers.is_empty() {
        return 0.0;
    }
    let total: u32 = followers.iter().map(|f| scores.normalized(f)).sum();
    let average = total as f64 / followers.len() as f64;
    (average / 30.0).min(1.0)
}

fn mutual_trust(scores: &ScoreIndex, mutuals: &[Identity], follower_count: usize) -> f64 {
    let ratio = if follower_count == 0 {
        0.0
    } else {
        mutuals.len() as f64 / follower_count as f64
    };

    let base: f64 = if (0.10..=0.60).contains(&ratio) {
        0.8
    } else if ratio > 0.90 {
        0.2
    } else if ratio > 0.60 {
        0.5
    } else {
        0.4
    };

    let high_value = mutuals
        .iter()
        .filter(|m| scores.normalized(m) > HIGH_VALUE_SCORE)
        .count();
    if high_value > 3 {
        (base + 0.2).min(1.0)
    } else {
        base
    }
}

fn score_consistency(scores: &ScoreIndex, x: &Identity, follower_count: usize) -> f64 {
    if !scores.contains(x) || follower_count == 0 {
        return 0.5;
    }
    let expected = (follower_count as f64 / 1000.0).min(0.99);
    (1.0 - 2.0 * (scores.percentile(x) - expected).abs()).max(0.0)
}

/// Diversity of what an even sample of followers also follows
///
/// `followers` must be sorted so the sample is deterministic.
fn follower_diversity(adjacency: &Adjacency, x: &Identity, followers: &[Identity]) -> f64 {
    if followers.len() < 3 {
        return 0.3;
    }

    let sample_size = followers.len().min(DIVERSITY_SAMPLE);
    let mut target_counts: HashMap<Identity, usize> = HashMap::new();
    for i in 0..sample_size {
        let follower = &followers[i * followers.len() / sample_size];
        for target in adjacency.follow_set(follower) {
            if target != *x {
                *target_counts.entry(target).or_insert(0) += 1;
            }
        }
    }

    if target_counts.is_empty() {
        return 0.0;
    }

    let overlapping = target_counts.values().filter(|c| **c * 2 >= sample_size).count();
    let overlap_ratio = overlapping as f64 / target_counts.len() as f64;
    let breadth = (target_counts.len() as f64 / 500.0).min(1.0);

    0.6 * (1.0 - overlap_ratio) + 0.4 * breadth
}

fn account_substance(normalized: u32, follows: usize, followers: usize) -> f64 {
    let mut substance = (normalized as f64 / 50.0).min(0.6);
    if follows > 5 && follows < 2000 {
        substance += 0.2;
    }
    if followers > 5 {
        substance += 0.2;
    }
    substance.min(1.0)
}

fn confidence(followers: usize, follows: usize, present: bool) -> f64 {
    let followers_part = 0.3 * (followers as f64 / 50.0).min(1.0);
    let follows_part = 0.3 * (follows as f64 / 50.0).min(1.0);
    let presence = if present { 0.3 } else { 0.0 };
    (0.1 + followers_part + follows_part + presence).clamp(0.1, 1.0)
}
