//! Per-identity analytics: similarity, risk, reputation, influence

use super::{blocking, parse_batch, parse_identity, BatchRequest, LimitQuery};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use trustgraph_common::{errors::Result, MAX_ANALYTICS_BATCH};
use trustgraph_engine::{
    influence::InfluenceReport,
    risk::{
        follow_quality::MAX_SUGGESTIONS, AnomalyReport, CircleComparison, FollowQualityReport,
        Reputation, SybilReport, TrustCircle,
    },
    similarity::{Recommendation, SimilarIdentity, MAX_SIMILARITY_LIMIT},
    simulate::UnfollowSimulation,
};

const DEFAULT_SIMILAR: usize = 20;
const DEFAULT_SUGGESTIONS: usize = 10;

#[derive(Serialize)]
pub struct SimilarResponse {
    pub pubkey: String,
    pub count: usize,
    pub similar: Vec<SimilarIdentity>,
}

#[derive(Serialize)]
pub struct RecommendResponse {
    pub pubkey: String,
    pub count: usize,
    pub recommendations: Vec<Recommendation>,
}

#[derive(Serialize)]
pub struct SybilBatchResponse {
    pub count: usize,
    pub reports: Vec<SybilReport>,
}

#[derive(Serialize)]
pub struct InfluenceBatchResponse {
    pub count: usize,
    pub reports: Vec<InfluenceReport>,
}

#[derive(Debug, Default, Deserialize)]
pub struct FollowQualityQuery {
    /// Pruning suggestions to return (default 10, max 50)
    pub suggestions: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct CompareQuery {
    pub a: String,
    pub b: String,
}

#[derive(Debug, Deserialize)]
pub struct UnfollowQuery {
    pub follower: String,
    pub target: String,
}

/// GET /similar/{pubkey}?limit=
pub async fn similar(
    State(state): State<AppState>,
    Path(pubkey): Path<String>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<SimilarResponse>> {
    let pubkey = parse_identity(&pubkey)?;
    let limit = query.limit.unwrap_or(DEFAULT_SIMILAR).clamp(1, MAX_SIMILARITY_LIMIT);

    let engine = state.engine.clone();
    let similar = blocking(move || engine.similar(pubkey, limit)).await?;

    Ok(Json(SimilarResponse {
        pubkey: pubkey.to_hex(),
        count: similar.len(),
        similar,
    }))
}

/// GET /recommend/{pubkey}?limit=
pub async fn recommend(
    State(state): State<AppState>,
    Path(pubkey): Path<String>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<RecommendResponse>> {
    let pubkey = parse_identity(&pubkey)?;
    let limit = query.limit.unwrap_or(DEFAULT_SIMILAR).clamp(1, MAX_SIMILARITY_LIMIT);

    let engine = state.engine.clone();
    let recommendations = blocking(move || engine.recommend(pubkey, limit)).await?;

    Ok(Json(RecommendResponse {
        pubkey: pubkey.to_hex(),
        count: recommendations.len(),
        recommendations,
    }))
}

/// GET /sybil/{pubkey}
pub async fn sybil(
    State(state): State<AppState>,
    Path(pubkey): Path<String>,
) -> Result<Json<SybilReport>> {
    let pubkey = parse_identity(&pubkey)?;
    Ok(Json(state.engine.sybil(pubkey)?))
}

/// POST /sybil/batch
pub async fn sybil_batch(
    State(state): State<AppState>,
    Json(request): Json<BatchRequest>,
) -> Result<Json<SybilBatchResponse>> {
    let pubkeys = parse_batch(&request.pubkeys, MAX_ANALYTICS_BATCH)?;

    let engine = state.engine.clone();
    let reports = blocking(move || engine.sybil_batch(&pubkeys)).await?;

    Ok(Json(SybilBatchResponse {
        count: reports.len(),
        reports,
    }))
}

/// GET /anomalies/{pubkey}
pub async fn anomalies(
    State(state): State<AppState>,
    Path(pubkey): Path<String>,
) -> Result<Json<AnomalyReport>> {
    let pubkey = parse_identity(&pubkey)?;
    Ok(Json(state.engine.anomalies(pubkey)?))
}

/// GET /follow-quality/{pubkey}?suggestions=
pub async fn follow_quality(
    State(state): State<AppState>,
    Path(pubkey): Path<String>,
    Query(query): Query<FollowQualityQuery>,
) -> Result<Json<FollowQualityReport>> {
    let pubkey = parse_identity(&pubkey)?;
    let suggestions = query
        .suggestions
        .unwrap_or(DEFAULT_SUGGESTIONS)
        .min(MAX_SUGGESTIONS);

    Ok(Json(state.engine.follow_quality(pubkey, suggestions)?))
}

/// GET /trust-circle/{pubkey}
pub async fn trust_circle(
    State(state): State<AppState>,
    Path(pubkey): Path<String>,
) -> Result<Json<TrustCircle>> {
    let pubkey = parse_identity(&pubkey)?;
    Ok(Json(state.engine.trust_circle(pubkey)?))
}

/// GET /trust-circle/compare?a=&b=
pub async fn compare(
    State(state): State<AppState>,
    Query(query): Query<CompareQuery>,
) -> Result<Json<CircleComparison>> {
    let a = parse_identity(&query.a)?;
    let b = parse_identity(&query.b)?;
    Ok(Json(state.engine.compare_circles(a, b)?))
}

/// GET /reputation/{pubkey}
pub async fn reputation(
    State(state): State<AppState>,
    Path(pubkey): Path<String>,
) -> Result<Json<Reputation>> {
    let pubkey = parse_identity(&pubkey)?;
    Ok(Json(state.engine.reputation(pubkey)?))
}

/// POST /influence/batch
pub async fn influence_batch(
    State(state): State<AppState>,
    Json(request): Json<BatchRequest>,
) -> Result<Json<InfluenceBatchResponse>> {
    let pubkeys = parse_batch(&request.pubkeys, MAX_ANALYTICS_BATCH)?;

    let engine = state.engine.clone();
    let reports = blocking(move || engine.influence_batch(&pubkeys)).await?;

    Ok(Json(InfluenceBatchResponse {
        count: reports.len(),
        reports,
    }))
}

/// GET /simulate/unfollow?follower=&target=
pub async fn simulate_unfollow(
    State(state): State<AppState>,
    Query(query): Query<UnfollowQuery>,
) -> Result<Json<UnfollowSimulation>> {
    let follower = parse_identity(&query.follower)?;
    let target = parse_identity(&query.target)?;

    let engine = state.engine.clone();
    let simulation = blocking(move || engine.simulate_unfollow(follower, target)).await?;
    Ok(Json(simulation))
}
