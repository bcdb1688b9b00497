//! Score lookups

use super::{parse_batch, parse_identity, BatchRequest, LimitQuery};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Serialize;
use trustgraph_common::{errors::Result, MAX_SCORE_BATCH};
use trustgraph_engine::{
    engine::DEFAULT_TOP,
    rank::{ScoreReport, TopEntry},
    GraphStats,
};

/// Upper bound on `/top` listings
const MAX_TOP: usize = 1000;

#[derive(Serialize)]
pub struct BatchScoreResponse {
    pub count: usize,
    pub scores: Vec<ScoreReport>,
}

#[derive(Serialize)]
pub struct TopResponse {
    pub count: usize,
    pub entries: Vec<TopEntry>,
}

/// GET /score/{pubkey}
pub async fn get_score(
    State(state): State<AppState>,
    Path(pubkey): Path<String>,
) -> Result<Json<ScoreReport>> {
    let pubkey = parse_identity(&pubkey)?;
    Ok(Json(state.engine.score(pubkey)?))
}

/// POST /score/batch
pub async fn batch_score(
    State(state): State<AppState>,
    Json(request): Json<BatchRequest>,
) -> Result<Json<BatchScoreResponse>> {
    let pubkeys = parse_batch(&request.pubkeys, MAX_SCORE_BATCH)?;
    let scores = state.engine.batch_score(&pubkeys)?;

    Ok(Json(BatchScoreResponse {
        count: scores.len(),
        scores,
    }))
}

/// GET /top?limit=
pub async fn top(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<TopResponse>> {
    let limit = query.limit.unwrap_or(DEFAULT_TOP).clamp(1, MAX_TOP);
    let entries = state.engine.top(Some(limit))?;

    Ok(Json(TopResponse {
        count: entries.len(),
        entries,
    }))
}

/// GET /stats
pub async fn stats(State(state): State<AppState>) -> Json<GraphStats> {
    Json(state.engine.stats())
}
