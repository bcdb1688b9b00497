//! Whole-graph views: topology health and communities

use super::{blocking, parse_identity};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use trustgraph_common::errors::Result;
use trustgraph_engine::{
    community::{CommunityMembership, CommunitySummary, MAX_TOP_COMMUNITIES},
    topology::NetworkHealth,
};

#[derive(Debug, Default, Deserialize)]
pub struct CommunitiesQuery {
    /// Default 10, max 20
    pub limit: Option<usize>,

    /// Smallest community to list (default 3, at least 2)
    pub min_size: Option<usize>,
}

#[derive(Serialize)]
pub struct CommunitiesResponse {
    pub count: usize,
    pub communities: Vec<CommunitySummary>,
}

/// GET /network-health
pub async fn network_health(State(state): State<AppState>) -> Result<Json<NetworkHealth>> {
    let engine = state.engine.clone();
    let health = blocking(move || engine.network_health()).await?;
    Ok(Json(health))
}

/// GET /community/{pubkey}
pub async fn community(
    State(state): State<AppState>,
    Path(pubkey): Path<String>,
) -> Result<Json<CommunityMembership>> {
    let pubkey = parse_identity(&pubkey)?;
    Ok(Json(state.engine.community_of(pubkey)?))
}

/// GET /communities?limit=&min_size=
pub async fn communities(
    State(state): State<AppState>,
    Query(query): Query<CommunitiesQuery>,
) -> Result<Json<CommunitiesResponse>> {
    let limit = query.limit.unwrap_or(10).clamp(1, MAX_TOP_COMMUNITIES);
    let min_size = query.min_size.unwrap_or(3).max(2);

    let communities = state.engine.top_communities(limit, min_size)?;

    Ok(Json(CommunitiesResponse {
        count: communities.len(),
        communities,
    }))
}
