//! Engine facade
//!
//! Owns the live graph, the published score and community indexes, and the
//! subscriber registry. Built once at startup and shared behind an `Arc`.
//!
//! Lock discipline:
//! - Point queries hold the graph read lock for their short computation
//! - Whole-graph work (recompute, health, decay, simulation) clones a
//!   snapshot and releases the lock first
//! - Circle comparison copies the four rows it needs, then releases

use crate::community::{CommunityIndex, CommunityMembership, CommunitySummary, LabelPropagation};
use crate::graph::{EdgeRecord, GraphStore};
use crate::influence::{influence, InfluenceReport};
use crate::paths::{self, Neighbor, PathReport, TrustPathReport, MAX_PATH_DEPTH};
use crate::rank::{top_entries, PageRankConfig, PageRankScorer, ScoreIndex, ScoreReport, TopEntry};
use crate::risk::{
    anomaly, follow_quality, reputation, sybil, trust_circle, AnomalyReport, CircleComparison, CompareInputs,
    FollowQualityReport, Reputation, SybilReport, TrustCircle,
};
use crate::similarity::{self, Recommendation, SimilarIdentity};
use crate::simulate::{simulate_unfollow, UnfollowSimulation};
use crate::subscription::{SubscriberRegistry, Subscription, SubscriptionSettings};
use crate::temporal::{self, DecayedScore, FollowerTimeline};
use crate::topology::{network_health, NetworkHealth};
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument};
use trustgraph_common::metrics::{record_ingest, record_query, record_recompute};
use trustgraph_common::{AppConfig, AppError, Identity, Result, MAX_ANALYTICS_BATCH, MAX_SCORE_BATCH};
use uuid::Uuid;

/// Default size of a `top` listing
pub const DEFAULT_TOP: usize = 50;

/// Tunables the engine reads on every query or recompute
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub pagerank: PageRankConfig,
    pub default_half_life_days: f64,
    pub max_path_depth: usize,
    pub communities: LabelPropagation,
    pub dedupe_edges: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            pagerank: PageRankConfig::default(),
            default_half_life_days: 365.0,
            max_path_depth: MAX_PATH_DEPTH,
            communities: LabelPropagation::default(),
            dedupe_edges: false,
        }
    }
}

impl EngineSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        let engine = &config.engine;
        Self {
            pagerank: PageRankConfig {
                damping: engine.damping,
                iterations: engine.pagerank_iterations,
                half_life_days: None,
            },
            default_half_life_days: engine.default_half_life_days,
            max_path_depth: engine.max_path_depth.clamp(1, MAX_PATH_DEPTH),
            communities: LabelPropagation::new(engine.community_max_iterations),
            dedupe_edges: engine.dedupe_edges,
        }
    }
}

/// Result of one recompute
#[derive(Debug, Clone)]
pub struct RecomputeOutcome {
    /// Index that was replaced, if any
    pub previous: Option<Arc<ScoreIndex>>,

    pub current: Arc<ScoreIndex>,
    pub nodes: usize,
    pub edges: usize,
    pub communities: usize,
    pub duration: Duration,
}

/// Graph size and readiness
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphStats {
    pub nodes: usize,
    pub edges: usize,
    pub last_rebuild: Option<DateTime<Utc>>,
    pub ready: bool,
}

/// The trust engine
pub struct Engine {
    graph: GraphStore,

    /// Published PageRank result; `None` until the first recompute
    scores: RwLock<Option<Arc<ScoreIndex>>>,

    /// Communities derived from the published scores' snapshot
    communities: RwLock<Option<Arc<CommunityIndex>>>,

    /// Serializes recomputes
    recompute_lock: Mutex<()>,

    subscribers: SubscriberRegistry,
    settings: EngineSettings,
}

impl Engine {
    /// Create an engine from application configuration
    pub fn new(config: &AppConfig) -> Self {
        Self::with_settings(
            EngineSettings::from_config(config),
            SubscriptionSettings {
                max_subset: config.subscription.max_subset,
                push_timeout: config.push_timeout(),
                channel_capacity: config.subscription.channel_capacity,
            },
        )
    }

    /// Create an engine with explicit settings
    pub fn with_settings(settings: EngineSettings, subscriptions: SubscriptionSettings) -> Self {
        Self {
            graph: GraphStore::with_dedupe(settings.dedupe_edges),
            scores: RwLock::new(None),
            communities: RwLock::new(None),
            recompute_lock: Mutex::new(()),
            subscribers: SubscriberRegistry::new(subscriptions),
            settings,
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    // =========================================================================
    // Ingest
    // =========================================================================

    /// Append one follow edge
    pub fn add_edge(&self, from: Identity, to: Identity, time: Option<DateTime<Utc>>) -> bool {
        let added = self.graph.add_edge(from, to, time);
        if added {
            record_ingest(1);
        }
        added
    }

    /// Append a batch of edges under one write lock
    pub fn add_edges(&self, edges: Vec<EdgeRecord>) -> usize {
        let received = edges.len();
        let added = self.graph.add_edges(edges);
        record_ingest(added);
        debug!(received, added, "Ingested edges");
        added
    }

    // =========================================================================
    // Recompute
    // =========================================================================

    /// Rerun PageRank and community detection, then publish both
    ///
    /// Blocking; callers on an async runtime should use `spawn_blocking`.
    #[instrument(skip(self))]
    pub fn recompute(&self) -> RecomputeOutcome {
        let _guard = self.recompute_lock.lock();
        let started = Instant::now();

        let snapshot = self.graph.snapshot_adjacency();
        let nodes = snapshot.node_count();
        let edges = snapshot.edge_count();
        info!(nodes, edges, "Recompute started");

        let now = Utc::now();
        let scores = PageRankScorer::new(self.settings.pagerank.clone()).compute(&snapshot, now);
        let current = Arc::new(ScoreIndex::new(scores, now));

        // Scores are published first; community reads tolerate the gap
        let previous = self.scores.write().replace(current.clone());

        let communities = CommunityIndex::detect(&snapshot, &self.settings.communities);
        let community_count = communities.nontrivial_count();
        *self.communities.write() = Some(Arc::new(communities));

        let duration = started.elapsed();
        record_recompute(duration.as_secs_f64(), nodes, edges, true);
        info!(
            nodes,
            edges,
            communities = community_count,
            duration_ms = duration.as_millis() as u64,
            "Recompute finished"
        );

        RecomputeOutcome {
            previous,
            current,
            nodes,
            edges,
            communities: community_count,
            duration,
        }
    }

    /// Push the outcome of a recompute to every subscriber
    pub async fn publish(&self, outcome: &RecomputeOutcome) -> usize {
        self.subscribers
            .broadcast(outcome.previous.as_deref(), &outcome.current)
            .await
    }

    // =========================================================================
    // State
    // =========================================================================

    /// Whether a recompute has completed
    pub fn is_ready(&self) -> bool {
        self.scores.read().is_some()
    }

    /// Currently published score index
    pub fn current_scores(&self) -> Option<Arc<ScoreIndex>> {
        self.scores.read().clone()
    }

    fn ready_scores(&self) -> Result<Arc<ScoreIndex>> {
        self.current_scores().ok_or(AppError::NotReady)
    }

    fn ready_communities(&self) -> Result<(Arc<ScoreIndex>, Arc<CommunityIndex>)> {
        let scores = self.ready_scores()?;
        let communities = self.communities.read().clone().ok_or(AppError::NotReady)?;
        Ok((scores, communities))
    }

    pub fn stats(&self) -> GraphStats {
        let (nodes, edges) = {
            let graph = self.graph.read();
            (graph.node_count(), graph.edge_count())
        };
        let scores = self.current_scores();

        GraphStats {
            nodes,
            edges,
            last_rebuild: scores.as_ref().map(|s| s.computed_at()),
            ready: scores.is_some(),
        }
    }

    // =========================================================================
    // Scores
    // =========================================================================

    pub fn score(&self, x: Identity) -> Result<ScoreReport> {
        let scores = self.ready_scores()?;
        record_query("score");
        Ok(ScoreReport::build(&self.graph.read(), &scores, x))
    }

    pub fn batch_score(&self, xs: &[Identity]) -> Result<Vec<ScoreReport>> {
        check_batch(xs.len(), MAX_SCORE_BATCH)?;
        let scores = self.ready_scores()?;
        record_query("batch_score");

        let graph = self.graph.read();
        Ok(xs.iter().map(|x| ScoreReport::build(&graph, &scores, *x)).collect())
    }

    /// Highest-scored identities; `None` lists the default count
    pub fn top(&self, n: Option<usize>) -> Result<Vec<TopEntry>> {
        let scores = self.ready_scores()?;
        record_query("top");
        let n = n.unwrap_or(DEFAULT_TOP).max(1);
        Ok(top_entries(&self.graph.read(), &scores, n))
    }

    // =========================================================================
    // Paths and neighborhoods
    // =========================================================================

    pub fn path(&self, source: Identity, target: Identity) -> Result<PathReport> {
        check_endpoints(&source, &target)?;
        self.ready_scores()?;
        record_query("path");

        let found = paths::shortest_path(
            &self.graph.read(),
            source,
            target,
            self.settings.max_path_depth,
            &Default::default(),
        );
        Ok(PathReport::new(source, target, found))
    }

    pub fn trust_paths(&self, source: Identity, target: Identity, k: usize) -> Result<TrustPathReport> {
        check_endpoints(&source, &target)?;
        let scores = self.ready_scores()?;
        record_query("paths");

        Ok(paths::trust_paths(
            &self.graph.read(),
            &scores,
            source,
            target,
            k,
            self.settings.max_path_depth,
        ))
    }

    pub fn neighborhood(&self, x: Identity, depth: usize, limit: usize) -> Result<Vec<Neighbor>> {
        let scores = self.ready_scores()?;
        record_query("neighborhood");
        Ok(paths::neighborhood(&self.graph.read(), &scores, x, depth, limit))
    }

    // =========================================================================
    // Similarity
    // =========================================================================

    pub fn similar(&self, x: Identity, limit: usize) -> Result<Vec<SimilarIdentity>> {
        let scores = self.ready_scores()?;
        record_query("similar");
        Ok(similarity::similar(&self.graph.read(), &scores, x, limit))
    }

    pub fn recommend(&self, x: Identity, limit: usize) -> Result<Vec<Recommendation>> {
        let scores = self.ready_scores()?;
        record_query("recommend");
        Ok(similarity::recommend(&self.graph.read(), &scores, x, limit))
    }

    // =========================================================================
    // Risk
    // =========================================================================

    pub fn sybil(&self, x: Identity) -> Result<SybilReport> {
        let scores = self.ready_scores()?;
        record_query("sybil");
        Ok(sybil::assess(&self.graph.read(), &scores, x))
    }

    pub fn sybil_batch(&self, xs: &[Identity]) -> Result<Vec<SybilReport>> {
        check_batch(xs.len(), MAX_ANALYTICS_BATCH)?;
        let scores = self.ready_scores()?;
        record_query("sybil_batch");

        let graph = self.graph.read();
        Ok(xs.iter().map(|x| sybil::assess(&graph, &scores, *x)).collect())
    }

    pub fn anomalies(&self, x: Identity) -> Result<AnomalyReport> {
        let scores = self.ready_scores()?;
        record_query("anomalies");
        Ok(anomaly::detect(&self.graph.read(), &scores, x))
    }

    pub fn follow_quality(&self, x: Identity, suggestions: usize) -> Result<FollowQualityReport> {
        let scores = self.ready_scores()?;
        record_query("follow_quality");
        Ok(follow_quality::assess(&self.graph.read(), &scores, x, suggestions))
    }

    pub fn trust_circle(&self, x: Identity) -> Result<TrustCircle> {
        let scores = self.ready_scores()?;
        record_query("trust_circle");
        Ok(trust_circle::trust_circle(&self.graph.read(), &scores, x))
    }

    pub fn compare_circles(&self, a: Identity, b: Identity) -> Result<CircleComparison> {
        let scores = self.ready_scores()?;
        record_query("trust_circle_compare");

        let inputs = CompareInputs::from_adjacency(&self.graph.read(), a, b);
        Ok(trust_circle::compare(&inputs, &scores))
    }

    pub fn reputation(&self, x: Identity) -> Result<Reputation> {
        let scores = self.ready_scores()?;
        record_query("reputation");
        Ok(reputation::reputation(&self.graph.read(), &scores, x))
    }

    pub fn influence_batch(&self, xs: &[Identity]) -> Result<Vec<InfluenceReport>> {
        check_batch(xs.len(), MAX_ANALYTICS_BATCH)?;
        let scores = self.ready_scores()?;
        record_query("influence_batch");

        let graph = self.graph.read();
        Ok(xs.iter().map(|x| influence(&graph, &scores, *x)).collect())
    }

    // =========================================================================
    // Temporal
    // =========================================================================

    fn half_life(&self, requested: Option<f64>) -> f64 {
        temporal::clamp_half_life(requested.unwrap_or(self.settings.default_half_life_days))
    }

    pub fn decayed_score(&self, x: Identity, half_life_days: Option<f64>) -> Result<DecayedScore> {
        let published = self.ready_scores()?;
        record_query("decayed_score");

        let half_life = self.half_life(half_life_days);
        let snapshot = self.graph.snapshot_adjacency();
        let decayed = temporal::decayed_index(&snapshot, &self.settings.pagerank, half_life, Utc::now());
        Ok(DecayedScore::build(&decayed, &published, x, half_life))
    }

    pub fn decayed_top(&self, limit: usize, half_life_days: Option<f64>) -> Result<Vec<TopEntry>> {
        self.ready_scores()?;
        record_query("decayed_top");

        let snapshot = self.graph.snapshot_adjacency();
        let decayed = temporal::decayed_index(
            &snapshot,
            &self.settings.pagerank,
            self.half_life(half_life_days),
            Utc::now(),
        );
        Ok(temporal::decayed_top(&snapshot, &decayed, limit))
    }

    pub fn timeline(&self, x: Identity) -> Result<FollowerTimeline> {
        self.ready_scores()?;
        record_query("timeline");
        Ok(temporal::follower_timeline(&self.graph.read(), x))
    }

    // =========================================================================
    // Whole-graph analytics
    // =========================================================================

    pub fn network_health(&self) -> Result<NetworkHealth> {
        let scores = self.ready_scores()?;
        record_query("network_health");

        let snapshot = self.graph.snapshot_adjacency();
        Ok(network_health(&snapshot, &scores))
    }

    pub fn community_of(&self, x: Identity) -> Result<CommunityMembership> {
        let (scores, communities) = self.ready_communities()?;
        record_query("community");

        communities
            .community_of(&scores, &x)
            .ok_or_else(|| AppError::UnknownIdentity { id: x.to_hex() })
    }

    pub fn top_communities(&self, limit: usize, min_size: usize) -> Result<Vec<CommunitySummary>> {
        let (scores, communities) = self.ready_communities()?;
        record_query("communities");
        Ok(communities.top_communities(&scores, limit, min_size))
    }

    /// Score `target` as if `follower` stopped following it
    pub fn simulate_unfollow(&self, follower: Identity, target: Identity) -> Result<UnfollowSimulation> {
        self.ready_scores()?;
        record_query("simulate_unfollow");

        let snapshot = self.graph.snapshot_adjacency();
        let scorer = PageRankScorer::new(self.settings.pagerank.clone());
        Ok(simulate_unfollow(snapshot, &scorer, follower, target, Utc::now()))
    }

    // =========================================================================
    // Subscriptions
    // =========================================================================

    pub fn subscribe(&self, subset: Vec<Identity>) -> Result<Subscription> {
        self.subscribers.subscribe(subset)
    }

    pub fn update_subscription(&self, id: Uuid, subset: Vec<Identity>) -> Result<()> {
        self.subscribers.update_subset(id, subset)
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

fn check_batch(size: usize, limit: usize) -> Result<()> {
    if size > limit {
        return Err(AppError::ResourceExhausted { size, limit });
    }
    Ok(())
}

fn check_endpoints(source: &Identity, target: &Identity) -> Result<()> {
    if source == target {
        return Err(AppError::BadRequest {
            message: "source and target must differ".to_string(),
        });
    }
    Ok(())
}
