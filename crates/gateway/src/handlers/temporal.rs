//! Time-decayed scores and follower timelines

use super::{blocking, parse_identity};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use trustgraph_common::errors::Result;
use trustgraph_engine::{
    rank::TopEntry,
    temporal::{DecayedScore, FollowerTimeline, MAX_DECAYED_TOP},
};

#[derive(Debug, Default, Deserialize)]
pub struct DecayQuery {
    /// Half-life in days, clamped to [1, 3650]
    pub half_life: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DecayTopQuery {
    pub half_life: Option<f64>,
    pub limit: Option<usize>,
}

#[derive(Serialize)]
pub struct DecayTopResponse {
    pub count: usize,
    pub entries: Vec<TopEntry>,
}

/// GET /decay/{pubkey}?half_life=
pub async fn decay(
    State(state): State<AppState>,
    Path(pubkey): Path<String>,
    Query(query): Query<DecayQuery>,
) -> Result<Json<DecayedScore>> {
    let pubkey = parse_identity(&pubkey)?;

    let engine = state.engine.clone();
    let score = blocking(move || engine.decayed_score(pubkey, query.half_life)).await?;
    Ok(Json(score))
}

/// GET /decay/top?half_life=&limit=
pub async fn decay_top(
    State(state): State<AppState>,
    Query(query): Query<DecayTopQuery>,
) -> Result<Json<DecayTopResponse>> {
    let limit = query.limit.unwrap_or(50).clamp(1, MAX_DECAYED_TOP);

    let engine = state.engine.clone();
    let entries = blocking(move || engine.decayed_top(limit, query.half_life)).await?;

    Ok(Json(DecayTopResponse {
        count: entries.len(),
        entries,
    }))
}

/// GET /timeline/{pubkey}
pub async fn timeline(
    State(state): State<AppState>,
    Path(pubkey): Path<String>,
) -> Result<Json<FollowerTimeline>> {
    let pubkey = parse_identity(&pubkey)?;
    Ok(Json(state.engine.timeline(pubkey)?))
}
