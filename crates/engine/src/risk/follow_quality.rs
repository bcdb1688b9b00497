//! Quality of the identities someone chooses to follow

use crate::graph::Adjacency;
use crate::rank::ScoreIndex;
use serde::{Deserialize, Serialize};
use trustgraph_common::Identity;

/// Upper bound on suggestions returned
pub const MAX_SUGGESTIONS: usize = 50;

/// Follows scoring below this are suggestion candidates
const SUGGESTION_THRESHOLD: u32 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FollowQualityClass {
    Excellent,
    Good,
    Moderate,
    Poor,
}

impl FollowQualityClass {
    pub fn from_score(score: u32) -> Self {
        match score {
            75.. => FollowQualityClass::Excellent,
            50..=74 => FollowQualityClass::Good,
            25..=49 => FollowQualityClass::Moderate,
            _ => FollowQualityClass::Poor,
        }
    }
}

/// Follow counts per trust band
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowBreakdown {
    /// Normalized score >= 60
    pub strong: usize,

    /// Normalized score >= 30
    pub moderate: usize,

    /// Normalized score >= 1
    pub weak: usize,

    /// Unscored or zero
    pub unknown: usize,
}

impl FollowBreakdown {
    fn add(&mut self, normalized: u32) {
        match normalized {
            60.. => self.strong += 1,
            30..=59 => self.moderate += 1,
            1..=29 => self.weak += 1,
            0 => self.unknown += 1,
        }
    }

    /// Shannon entropy over the four bands, scaled to [0, 1]
    pub fn diversity(&self) -> f64 {
        let counts = [self.strong, self.moderate, self.weak, self.unknown];
        let total: usize = counts.iter().sum();
        if total == 0 {
            return 0.0;
        }

        let entropy: f64 = counts
            .iter()
            .filter(|c| **c > 0)
            .map(|&c| {
                let p = c as f64 / total as f64;
                -p * p.log2()
            })
            .sum();
        entropy / 4f64.log2()
    }
}

/// A follow worth reconsidering
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowSuggestion {
    pub pubkey: Identity,
    pub normalized: u32,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowQualityReport {
    pub pubkey: Identity,
    pub follows: usize,
    pub breakdown: FollowBreakdown,

    /// Mean normalized score of scored follows
    pub avg_trust: f64,

    /// Median normalized score of scored follows
    pub median_trust: u32,

    /// Fraction of follows that follow back
    pub reciprocity: f64,

    /// Fraction of follows with a nonzero score
    pub signal_ratio: f64,

    pub diversity: f64,
    pub quality_score: u32,
    pub classification: FollowQualityClass,
    pub suggestions: Vec<FollowSuggestion>,
}

/// Assess `x`'s follow list, returning up to `suggestions` weak follows
pub fn assess(adjacency: &Adjacency, scores: &ScoreIndex, x: Identity, suggestions: usize) -> FollowQualityReport {
    let suggestion_limit = suggestions.min(MAX_SUGGESTIONS);
    let mut follows: Vec<(Identity, u32)> = adjacency
        .follow_set(&x)
        .into_iter()
        .map(|f| (f, scores.normalized(&f)))
        .collect();
    follows.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));

    let mut breakdown = FollowBreakdown::default();
    for (_, normalized) in &follows {
        breakdown.add(*normalized);
    }

    let scored: Vec<u32> = follows.iter().map(|(_, n)| *n).filter(|n| *n > 0).collect();
    let avg_trust = if scored.is_empty() {
        0.0
    } else {
        scored.iter().sum::<u32>() as f64 / scored.len() as f64
    };
    // `follows` is sorted by score, so `scored` is too
    let median_trust = scored.get(scored.len() / 2).copied().unwrap_or(0);

    let (reciprocity, signal_ratio) = if follows.is_empty() {
        (0.0, 0.0)
    } else {
        let followed_back = follows.iter().filter(|(f, _)| adjacency.is_following(f, &x)).count();
        (
            followed_back as f64 / follows.len() as f64,
            scored.len() as f64 / follows.len() as f64,
        )
    };
    let diversity = breakdown.diversity();

    let blended = 0.40 * (avg_trust / 40.0).min(1.0) + 0.20 * reciprocity + 0.20 * signal_ratio + 0.20 * diversity;
    let quality_score = (blended * 100.0).round().clamp(0.0, 100.0) as u32;

    let suggestions = follows
        .iter()
        .filter(|(_, n)| *n < SUGGESTION_THRESHOLD)
        .take(suggestion_limit)
        .map(|(pubkey, normalized)| FollowSuggestion {
            pubkey: *pubkey,
            normalized: *normalized,
            reason: suggestion_reason(adjacency, &x, pubkey, *normalized),
        })
        .collect();

    FollowQualityReport {
        pubkey: x,
        follows: follows.len(),
        breakdown,
        avg_trust,
        median_trust,
        reciprocity,
        signal_ratio,
        diversity,
        quality_score,
        classification: FollowQualityClass::from_score(quality_score),
        suggestions,
    }
}

fn suggestion_reason(adjacency: &Adjacency, x: &Identity, follow: &Identity, normalized: u32) -> String {
    let follows_back = adjacency.is_following(follow, x);
    match (normalized, follows_back) {
        (0, false) => "no trust score and does not follow back".to_string(),
        (0, true) => "no trust score".to_string(),
        (n, false) => format!("low trust score ({n}) and does not follow back"),
        (n, true) => format!("low trust score ({n})"),
    }
}
