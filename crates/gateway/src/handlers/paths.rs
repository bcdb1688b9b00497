//! Trust paths and neighborhoods

use super::{blocking, parse_identity};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use trustgraph_common::errors::Result;
use trustgraph_engine::paths::{
    Neighbor, PathReport, TrustPathReport, MAX_DISJOINT_PATHS, MAX_NEIGHBORHOOD_LIMIT,
};

#[derive(Debug, Deserialize)]
pub struct PathQuery {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Deserialize)]
pub struct PathsQuery {
    pub from: String,
    pub to: String,

    /// Number of disjoint paths (default 3, max 5)
    pub k: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct NeighborhoodQuery {
    /// 1 or 2 hops (default 1)
    pub depth: Option<usize>,

    /// Default 50, max 200
    pub limit: Option<usize>,
}

#[derive(Serialize)]
pub struct NeighborhoodResponse {
    pub pubkey: String,
    pub depth: usize,
    pub count: usize,
    pub neighbors: Vec<Neighbor>,
}

/// GET /path?from=&to=
pub async fn path(
    State(state): State<AppState>,
    Query(query): Query<PathQuery>,
) -> Result<Json<PathReport>> {
    let from = parse_identity(&query.from)?;
    let to = parse_identity(&query.to)?;

    let engine = state.engine.clone();
    let report = blocking(move || engine.path(from, to)).await?;
    Ok(Json(report))
}

/// GET /paths?from=&to=&k=
pub async fn paths(
    State(state): State<AppState>,
    Query(query): Query<PathsQuery>,
) -> Result<Json<TrustPathReport>> {
    let from = parse_identity(&query.from)?;
    let to = parse_identity(&query.to)?;
    let k = query.k.unwrap_or(3).clamp(1, MAX_DISJOINT_PATHS);

    let engine = state.engine.clone();
    let report = blocking(move || engine.trust_paths(from, to, k)).await?;
    Ok(Json(report))
}

/// GET /neighborhood/{pubkey}?depth=&limit=
pub async fn neighborhood(
    State(state): State<AppState>,
    Path(pubkey): Path<String>,
    Query(query): Query<NeighborhoodQuery>,
) -> Result<Json<NeighborhoodResponse>> {
    let pubkey = parse_identity(&pubkey)?;
    let depth = query.depth.unwrap_or(1).clamp(1, 2);
    let limit = query.limit.unwrap_or(50).clamp(1, MAX_NEIGHBORHOOD_LIMIT);

    let neighbors = state.engine.neighborhood(pubkey, depth, limit)?;

    Ok(Json(NeighborhoodResponse {
        pubkey: pubkey.to_hex(),
        depth,
        count: neighbors.len(),
        neighbors,
    }))
}
