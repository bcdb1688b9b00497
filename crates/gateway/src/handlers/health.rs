//! Health check handlers

use crate::AppState;
use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Serialize)]
pub struct ReadyResponse {
    pub status: String,
    pub checks: ReadyChecks,
}

#[derive(Serialize)]
pub struct ReadyChecks {
    pub scores: CheckResult,
}

#[derive(Serialize)]
pub struct CheckResult {
    pub status: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_rebuild: Option<DateTime<Utc>>,

    pub nodes: usize,
    pub edges: usize,
}

/// Liveness probe - always returns healthy if server is running
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: trustgraph_common::VERSION.to_string(),
    })
}

/// Readiness probe - ready once the first recompute has published scores
pub async fn ready(State(state): State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    let stats = state.engine.stats();

    let (code, status) = if stats.ready {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not_ready")
    };

    let scores = CheckResult {
        status: if stats.ready { "up" } else { "pending" }.to_string(),
        last_rebuild: stats.last_rebuild,
        nodes: stats.nodes,
        edges: stats.edges,
    };

    (
        code,
        Json(ReadyResponse {
            status: status.to_string(),
            checks: ReadyChecks { scores },
        }),
    )
}
