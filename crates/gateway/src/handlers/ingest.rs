//! Edge ingest and recompute triggers

use crate::AppState;
use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use trustgraph_common::errors::{AppError, Result};
use trustgraph_engine::EdgeRecord;

/// Largest edge batch accepted per request
pub const MAX_INGEST_BATCH: usize = 10_000;

#[derive(Debug, Deserialize)]
pub struct IngestRequest {
    pub edges: Vec<EdgeRecord>,

    /// Start a recompute once the edges are queued
    #[serde(default)]
    pub recompute: bool,
}

#[derive(Serialize)]
pub struct IngestResponse {
    pub accepted: usize,
    pub pending: usize,
    pub recompute_requested: bool,
}

#[derive(Serialize)]
pub struct RecomputeResponse {
    pub status: String,
}

/// POST /edges
///
/// Edges are queued on the coordinator's source and land in the graph on
/// the next cycle.
pub async fn ingest_edges(
    State(state): State<AppState>,
    Json(request): Json<IngestRequest>,
) -> Result<(StatusCode, Json<IngestResponse>)> {
    if request.edges.len() > MAX_INGEST_BATCH {
        return Err(AppError::ResourceExhausted {
            size: request.edges.len(),
            limit: MAX_INGEST_BATCH,
        });
    }

    let accepted = state.source.push(request.edges);
    if request.recompute {
        state.coordinator.trigger();
    }

    tracing::debug!(accepted, recompute = request.recompute, "Edges queued");

    Ok((
        StatusCode::ACCEPTED,
        Json(IngestResponse {
            accepted,
            pending: state.source.pending(),
            recompute_requested: request.recompute,
        }),
    ))
}

/// POST /recompute
pub async fn recompute(State(state): State<AppState>) -> (StatusCode, Json<RecomputeResponse>) {
    state.coordinator.trigger();
    (
        StatusCode::ACCEPTED,
        Json(RecomputeResponse {
            status: "scheduled".to_string(),
        }),
    )
}
