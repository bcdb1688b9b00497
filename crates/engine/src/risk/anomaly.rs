//! Rule-based anomaly flags

use crate::graph::Adjacency;
use crate::rank::ScoreIndex;
use serde::{Deserialize, Serialize};
use trustgraph_common::Identity;

/// Flag severity, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// Highest severity across all flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    None,
    Low,
    Medium,
    High,
}

impl From<Option<Severity>> for RiskLevel {
    fn from(severity: Option<Severity>) -> Self {
        match severity {
            None => RiskLevel::None,
            Some(Severity::Low) => RiskLevel::Low,
            Some(Severity::Medium) => RiskLevel::Medium,
            Some(Severity::High) => RiskLevel::High,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    FollowFarming,
    GhostFollowers,
    TrustConcentration,
    ScoreFollowerDivergence,
    ExcessiveFollowing,
}

/// A raised flag with the measurement that triggered it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Anomaly {
    pub kind: AnomalyKind,
    pub severity: Severity,
    pub value: f64,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnomalyReport {
    pub pubkey: Identity,
    pub anomalies: Vec<Anomaly>,
    pub risk_level: RiskLevel,
    pub followers: usize,
    pub follows: usize,
}

/// Run every anomaly rule against one identity
pub fn detect(adjacency: &Adjacency, scores: &ScoreIndex, x: Identity) -> AnomalyReport {
    let followers = adjacency.follower_set(&x);
    let follows = adjacency.follow_set(&x);
    let percentile = scores.percentile(&x);
    let normalized = scores.normalized(&x);

    let mut anomalies = Vec::new();

    // Follow farming: nearly everyone who follows gets followed back
    if followers.len() > 50 {
        let followed_back = followers.iter().filter(|f| follows.contains(f)).count();
        let ratio = followed_back as f64 / followers.len() as f64;
        if ratio > 0.90 {
            anomalies.push(Anomaly {
                kind: AnomalyKind::FollowFarming,
                severity: if ratio > 0.95 { Severity::High } else { Severity::Medium },
                value: ratio,
                description: format!("{:.0}% of followers are followed back", ratio * 100.0),
            });
        }
    }

    // Ghost followers: followers nobody follows
    if followers.len() > 20 && percentile < 0.99 {
        let ghosts = followers
            .iter()
            .filter(|f| adjacency.followers(f).is_empty())
            .count();
        let ratio = ghosts as f64 / followers.len() as f64;
        if ratio > 0.70 {
            anomalies.push(Anomaly {
                kind: AnomalyKind::GhostFollowers,
                severity: if ratio > 0.90 { Severity::High } else { Severity::Medium },
                value: ratio,
                description: format!("{:.0}% of followers have no followers of their own", ratio * 100.0),
            });
        }
    }

    // Trust concentration: one follower supplies most of the score
    let raw = scores.raw(&x);
    if followers.len() >= 5 && raw > 0.0 {
        let top_contribution = followers
            .iter()
            .map(|f| {
                let out = adjacency.follows(f).len().max(1);
                scores.raw(f) / out as f64
            })
            .fold(0.0_f64, f64::max);
        let share = top_contribution / raw;
        if share > 0.50 {
            anomalies.push(Anomaly {
                kind: AnomalyKind::TrustConcentration,
                severity: if share > 0.80 { Severity::High } else { Severity::Medium },
                value: share,
                description: format!("a single follower contributes {:.0}% of the score", share * 100.0),
            });
        }
    }

    // Many followers but a low standing
    if followers.len() > 100 && percentile < 0.50 {
        anomalies.push(Anomaly {
            kind: AnomalyKind::ScoreFollowerDivergence,
            severity: if percentile < 0.25 { Severity::Medium } else { Severity::Low },
            value: percentile,
            description: format!("{} followers but percentile {:.2}", followers.len(), percentile),
        });
    }

    if follows.len() > 5000 && normalized < 30 {
        anomalies.push(Anomaly {
            kind: AnomalyKind::ExcessiveFollowing,
            severity: if follows.len() > 10_000 { Severity::High } else { Severity::Low },
            value: follows.len() as f64,
            description: format!("follows {} identities with score {}", follows.len(), normalized),
        });
    }

    let risk_level = anomalies.iter().map(|a| a.severity).max().into();

    AnomalyReport {
        pubkey: x,
        anomalies,
        risk_level,
        followers: followers.len(),
        follows: follows.len(),
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

    fn kinds(report: &AnomalyReport) -> Vec<AnomalyKind> {
        report.anomalies.iter().map(|a| a.kind).collect()
    }

    #[test]
    fn test_quiet_identity_has_no_flags() {
        let adj = adjacency(&[(1, 2), (2, 1), (3, 1)]);
        let report = detect(&adj, &scored(&adj), id(1));
        assert!(report.anomalies.is_empty());
        assert_eq!(report.risk_level, RiskLevel::None);
    }

    #[test]
    fn test_follow_farming() {
        // 60 followers, every one followed back
        let mut edges = Vec::new();
        for n in 100..160 {
            edges.push((n, 1));
            edges.push((1, n));
        }
        let adj = adjacency(&edges);
        let report = detect(&adj, &scored(&adj), id(1));

        let farming = report
            .anomalies
            .iter()
            .find(|a| a.kind == AnomalyKind::FollowFarming)
            .unwrap();
        assert_eq!(farming.severity, Severity::High);
        assert_eq!(report.risk_level, RiskLevel::High);
    }

    #[test]
    fn test_ghost_followers() {
        // 25 followers with no followers of their own; something else ranks higher
        let mut edges: Vec<(u64, u64)> = (100..125).map(|n| (n, 1)).collect();
        edges.extend((200..260).map(|n| (n, 2)));
        edges.push((1, 2));
        let adj = adjacency(&edges);
        let report = detect(&adj, &scored(&adj), id(1));

        assert!(kinds(&report).contains(&AnomalyKind::GhostFollowers));
        assert_eq!(report.risk_level, RiskLevel::High);
    }

    #[test]
    fn test_trust_concentration() {
        // Hub 9 pours its whole score into 1; four weak followers add little
        let mut edges: Vec<(u64, u64)> = (100..140).map(|n| (n, 9)).collect();
        edges.push((9, 1));
        edges.extend([(2, 1), (3, 1), (4, 1), (5, 1)]);
        let adj = adjacency(&edges);
        let report = detect(&adj, &scored(&adj), id(1));

        assert!(kinds(&report).contains(&AnomalyKind::TrustConcentration));
    }

    fn find(report: &AnomalyReport, kind: AnomalyKind) -> Option<&Anomaly> {
        report.anomalies.iter().find(|a| a.kind == kind)
    }

    /// Scores pinned by hand so the percentile of `x` is controlled exactly
    fn pinned(values: impl IntoIterator<Item = (u64, f64)>) -> ScoreIndex {
        ScoreIndex::new(values.into_iter().map(|(n, s)| (id(n), s)).collect(), Utc::now())
    }

    #[test]
    fn test_score_follower_divergence_severity() {
        // 101 followers, every one of them outscoring 1
        let edges: Vec<(u64, u64)> = (100..201).map(|n| (n, 1)).collect();
        let adj = adjacency(&edges);

        let mut values: Vec<(u64, f64)> = (100..201).map(|n| (n, 0.01)).collect();
        values.push((1, 0.001));
        let report = detect(&adj, &pinned(values.clone()), id(1));
        let divergence = find(&report, AnomalyKind::ScoreFollowerDivergence).unwrap();
        assert_eq!(divergence.value, 0.0);
        assert_eq!(divergence.severity, Severity::Medium);

        // 60 weaker identities lift 1 to percentile 60/162
        values.extend((500..560).map(|n| (n, 0.0001)));
        let report = detect(&adj, &pinned(values), id(1));
        let divergence = find(&report, AnomalyKind::ScoreFollowerDivergence).unwrap();
        assert!(divergence.value >= 0.25 && divergence.value < 0.50);
        assert_eq!(divergence.severity, Severity::Low);
    }

    #[test]
    fn test_divergence_needs_many_followers() {
        let edges: Vec<(u64, u64)> = (100..200).map(|n| (n, 1)).collect();
        let adj = adjacency(&edges);
        let mut values: Vec<(u64, f64)> = (100..200).map(|n| (n, 0.01)).collect();
        values.push((1, 0.001));

        let report = detect(&adj, &pinned(values), id(1));
        assert!(find(&report, AnomalyKind::ScoreFollowerDivergence).is_none());
    }

    #[test]
    fn test_excessive_following_severity() {
        let edges: Vec<(u64, u64)> = (10_000..15_001).map(|n| (1, n)).collect();
        let adj = adjacency(&edges);
        let report = detect(&adj, &scored(&adj), id(1));
        let excessive = find(&report, AnomalyKind::ExcessiveFollowing).unwrap();
        assert_eq!(report.follows, 5001);
        assert_eq!(excessive.severity, Severity::Low);
        assert_eq!(report.risk_level, RiskLevel::Low);

        let edges: Vec<(u64, u64)> = (10_000..20_001).map(|n| (1, n)).collect();
        let adj = adjacency(&edges);
        let report = detect(&adj, &scored(&adj), id(1));
        let excessive = find(&report, AnomalyKind::ExcessiveFollowing).unwrap();
        assert_eq!(report.follows, 10_001);
        assert_eq!(excessive.severity, Severity::High);
        assert_eq!(report.risk_level, RiskLevel::High);
    }

    #[test]
    fn test_exactly_five_thousand_follows_is_not_excessive() {
        let edges: Vec<(u64, u64)> = (10_000..15_000).map(|n| (1, n)).collect();
        let adj = adjacency(&edges);
        let report = detect(&adj, &scored(&adj), id(1));
        assert!(find(&report, AnomalyKind::ExcessiveFollowing).is_none());
    }

    #[test]
    fn test_risk_level_ordering() {
        assert_eq!(RiskLevel::from(None), RiskLevel::None);
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Medium > Severity::Low);
    }
}
