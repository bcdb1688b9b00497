//! Time-aware analytics
//!
//! Provides:
//! - Decayed PageRank with a caller-chosen half-life
//! - Monthly follower timelines with an estimated score trajectory

use crate::graph::Adjacency;
use crate::rank::{top_entries, PageRankConfig, PageRankScorer, ScoreIndex, TopEntry};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use trustgraph_common::Identity;

pub const MIN_HALF_LIFE_DAYS: f64 = 1.0;
pub const MAX_HALF_LIFE_DAYS: f64 = 3650.0;

/// Upper bound on decayed top listings
pub const MAX_DECAYED_TOP: usize = 200;

/// Longest run of empty months a timeline fills in; longer gaps are skipped
pub const MAX_TIMELINE_GAP_MONTHS: i64 = 24;

/// Clamp a requested half-life into the supported range
pub fn clamp_half_life(days: f64) -> f64 {
    if days.is_nan() {
        return MIN_HALF_LIFE_DAYS;
    }
    days.clamp(MIN_HALF_LIFE_DAYS, MAX_HALF_LIFE_DAYS)
}

/// Run PageRank with time decay as of `now`
pub fn decayed_index(
    adjacency: &Adjacency,
    base: &PageRankConfig,
    half_life_days: f64,
    now: DateTime<Utc>,
) -> ScoreIndex {
    let config = PageRankConfig {
        half_life_days: Some(clamp_half_life(half_life_days)),
        ..base.clone()
    };
    ScoreIndex::new(PageRankScorer::new(config).compute(adjacency, now), now)
}

/// Decayed versus static score for one identity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecayedScore {
    pub pubkey: Identity,
    pub half_life_days: f64,
    pub present: bool,
    pub raw: f64,
    pub normalized: u32,
    pub rank: usize,

    /// Undecayed score from the last recompute
    pub static_normalized: u32,

    /// `normalized - static_normalized`
    pub delta: i64,
}

impl DecayedScore {
    pub fn build(decayed: &ScoreIndex, published: &ScoreIndex, x: Identity, half_life_days: f64) -> Self {
        let normalized = decayed.normalized(&x);
        let static_normalized = published.normalized(&x);
        Self {
            pubkey: x,
            half_life_days: clamp_half_life(half_life_days),
            present: decayed.contains(&x),
            raw: decayed.raw(&x),
            normalized,
            rank: decayed.rank(&x),
            static_normalized,
            delta: normalized as i64 - static_normalized as i64,
        }
    }
}

/// Top identities under decay
pub fn decayed_top(adjacency: &Adjacency, decayed: &ScoreIndex, limit: usize) -> Vec<TopEntry> {
    top_entries(adjacency, decayed, limit.clamp(1, MAX_DECAYED_TOP))
}

/// Follower growth in one calendar month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineBucket {
    /// UTC month as `YYYY-MM`
    pub month: String,

    pub new_followers: usize,

    /// Followers known by the end of the month, baseline included
    pub cumulative: usize,

    /// New followers per day of the month
    pub velocity: f64,

    /// Score an identity with `cumulative` followers would roughly reach
    pub estimated_score: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowerTimeline {
    pub pubkey: Identity,
    pub total_followers: usize,

    /// Followers with a known follow time
    pub timed_followers: usize,

    /// Followers with no time data, counted as pre-existing
    pub baseline: usize,

    pub buckets: Vec<TimelineBucket>,
}

/// Estimated normalized score for a follower count
pub fn estimated_score(cumulative: usize) -> u32 {
    ((cumulative as f64 / 12.0 + 1.0).log10() * 25.0)
        .round()
        .clamp(0.0, 100.0) as u32
}

/// Bucket `x`'s followers by the month they followed
pub fn follower_timeline(adjacency: &Adjacency, x: Identity) -> FollowerTimeline {
    let followers = adjacency.follower_set(&x);

    let mut by_month: BTreeMap<(i32, u32), usize> = BTreeMap::new();
    let mut baseline = 0;
    for follower in &followers {
        match adjacency.edge_time(follower, &x) {
            Some(time) => *by_month.entry((time.year(), time.month())).or_insert(0) += 1,
            None => baseline += 1,
        }
    }

    let mut buckets = Vec::new();
    let mut cumulative = baseline;
    let mut previous: Option<(i32, u32)> = None;
    for (&month, &new_followers) in &by_month {
        // Quiet months are filled in only across short gaps
        if let Some(prev) = previous {
            if months_between(prev, month) <= MAX_TIMELINE_GAP_MONTHS {
                let mut gap = next_month(prev);
                while gap != month {
                    buckets.push(bucket(gap, 0, cumulative));
                    gap = next_month(gap);
                }
            }
        }

        cumulative += new_followers;
        buckets.push(bucket(month, new_followers, cumulative));
        previous = Some(month);
    }

    FollowerTimeline {
        pubkey: x,
        total_followers: followers.len(),
        timed_followers: followers.len() - baseline,
        baseline,
        buckets,
    }
}

fn bucket(month: (i32, u32), new_followers: usize, cumulative: usize) -> TimelineBucket {
    TimelineBucket {
        month: format!("{:04}-{:02}", month.0, month.1),
        new_followers,
        cumulative,
        velocity: new_followers as f64 / days_in_month(month.0, month.1) as f64,
        estimated_score: estimated_score(cumulative),
    }
}

fn months_between(from: (i32, u32), to: (i32, u32)) -> i64 {
    (to.0 as i64 - from.0 as i64) * 12 + to.1 as i64 - from.1 as i64
}

fn next_month((year, month): (i32, u32)) -> (i32, u32) {
    if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    }
}

fn days_in_month(year: i32, month: u32) -> i64 {
    let (next_year, next) = next_month((year, month));
    match (
        NaiveDate::from_ymd_opt(year, month, 1),
        NaiveDate::from_ymd_opt(next_year, next, 1),
    ) {
        (Some(start), Some(end)) => (end - start).num_days(),
        _ => 30,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::fixtures::id;
    use chrono::{Duration, TimeZone};

    fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_half_life_clamp() {
        assert_eq!(clamp_half_life(0.0), 1.0);
        assert_eq!(clamp_half_life(10_000.0), 3650.0);
        assert_eq!(clamp_half_life(30.0), 30.0);
        assert_eq!(clamp_half_life(f64::NAN), 1.0);
    }

    #[test]
    fn test_days_in_month() {
        assert_eq!(days_in_month(2024, 2), 29);
        assert_eq!(days_in_month(2023, 2), 28);
        assert_eq!(days_in_month(2023, 12), 31);
        assert_eq!(days_in_month(2023, 4), 30);
    }

    #[test]
    fn test_timeline_fills_gaps_and_keeps_baseline() {
        let mut adj = Adjacency::new();
        adj.push_edge(id(2), id(1), Some(at(2024, 1, 5)));
        adj.push_edge(id(3), id(1), Some(at(2024, 1, 20)));
        adj.push_edge(id(4), id(1), Some(at(2024, 3, 2)));
        adj.push_edge(id(5), id(1), None);

        let timeline = follower_timeline(&adj, id(1));
        assert_eq!(timeline.total_followers, 4);
        assert_eq!(timeline.baseline, 1);
        assert_eq!(timeline.timed_followers, 3);

        let months: Vec<&str> = timeline.buckets.iter().map(|b| b.month.as_str()).collect();
        assert_eq!(months, vec!["2024-01", "2024-02", "2024-03"]);

        let cumulative: Vec<usize> = timeline.buckets.iter().map(|b| b.cumulative).collect();
        assert_eq!(cumulative, vec![3, 3, 4]);
        assert_eq!(timeline.buckets[1].new_followers, 0);
        assert!((timeline.buckets[0].velocity - 2.0 / 31.0).abs() < 1e-12);
    }

    #[test]
    fn test_timeline_skips_long_gaps() {
        let mut adj = Adjacency::new();
        adj.push_edge(id(2), id(1), Some(at(1, 1, 1)));
        adj.push_edge(id(3), id(1), Some(at(2024, 6, 1)));

        let timeline = follower_timeline(&adj, id(1));
        let months: Vec<&str> = timeline.buckets.iter().map(|b| b.month.as_str()).collect();
        assert_eq!(months, vec!["0001-01", "2024-06"]);
        assert_eq!(timeline.buckets[1].cumulative, 2);
    }

    #[test]
    fn test_timeline_gap_fill_boundary() {
        // Exactly MAX_TIMELINE_GAP_MONTHS apart: filled
        let mut adj = Adjacency::new();
        adj.push_edge(id(2), id(1), Some(at(2022, 1, 10)));
        adj.push_edge(id(3), id(1), Some(at(2024, 1, 10)));
        assert_eq!(follower_timeline(&adj, id(1)).buckets.len(), 25);

        // One month further: only the two populated months
        let mut adj = Adjacency::new();
        adj.push_edge(id(2), id(1), Some(at(2022, 1, 10)));
        adj.push_edge(id(3), id(1), Some(at(2024, 2, 10)));
        assert_eq!(follower_timeline(&adj, id(1)).buckets.len(), 2);
    }

    #[test]
    fn test_timeline_without_times() {
        let mut adj = Adjacency::new();
        adj.push_edge(id(2), id(1), None);
        let timeline = follower_timeline(&adj, id(1));
        assert!(timeline.buckets.is_empty());
        assert_eq!(timeline.baseline, 1);
    }

    #[test]
    fn test_estimated_score() {
        assert_eq!(estimated_score(0), 0);
        // log10(1000/12 + 1) * 25 ~= 48.1
        assert_eq!(estimated_score(1000), 48);
        assert!(estimated_score(100) < estimated_score(1000));
    }

    #[test]
    fn test_recent_edges_dominate_under_decay() {
        // A->B 30 days ago, C->B 730 days ago; A->D and C->D both 30 days ago
        let now = Utc::now();
        let recent = now - Duration::days(30);
        let old = now - Duration::days(730);

        let mut adj = Adjacency::new();
        adj.push_edge(id(1), id(2), Some(recent));
        adj.push_edge(id(3), id(2), Some(old));
        adj.push_edge(id(1), id(4), Some(recent));
        adj.push_edge(id(3), id(4), Some(recent));

        let decayed = decayed_index(&adj, &PageRankConfig::default(), 365.0, now);
        assert!(decayed.raw(&id(4)) > decayed.raw(&id(2)));

        let top = decayed_top(&adj, &decayed, 1);
        assert_eq!(top[0].pubkey, id(4));
    }
}
