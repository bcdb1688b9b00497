//! Score subscriptions over server-sent events

use super::{parse_batch, parse_identity, BatchRequest};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::{stream, Stream, StreamExt};
use serde::Deserialize;
use std::time::Duration;
use trustgraph_common::{
    errors::{AppError, Result},
    Identity,
};
use uuid::Uuid;

#[derive(Debug, Default, Deserialize)]
pub struct SubscribeQuery {
    /// Comma-separated identities
    #[serde(default)]
    pub pubkeys: String,
}

/// Split and parse a comma list, rejecting it on size before any parsing
fn parse_list(raw: &str, limit: usize) -> Result<Vec<Identity>> {
    let entries: Vec<&str> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    if entries.len() > limit {
        return Err(AppError::ResourceExhausted {
            size: entries.len(),
            limit,
        });
    }
    entries.into_iter().map(parse_identity).collect()
}

/// GET /subscribe?pubkeys=a,b,c
///
/// The first event (`subscribed`) carries the subscriber id; each completed
/// recompute then emits one `scores` event for the subscribed identities.
pub async fn subscribe(
    State(state): State<AppState>,
    Query(query): Query<SubscribeQuery>,
) -> Result<Sse<impl Stream<Item = std::result::Result<Event, axum::Error>>>> {
    let subset = parse_list(&query.pubkeys, state.config.subscription.max_subset)?;
    let subscription = state.engine.subscribe(subset)?;
    let id = subscription.id();

    tracing::info!(subscriber = %id, "Score subscription opened");

    let hello = stream::once(async move {
        Event::default()
            .event("subscribed")
            .json_data(serde_json::json!({ "id": id }))
    });
    let updates = subscription
        .into_stream()
        .map(|update| Event::default().event("scores").json_data(&update));

    Ok(Sse::new(hello.chain(updates)).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    ))
}

/// PUT /subscribe/{id}
pub async fn update_subscription(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<BatchRequest>,
) -> Result<StatusCode> {
    let subset = parse_batch(&request.pubkeys, state.config.subscription.max_subset)?;

    state.engine.update_subscription(id, subset)?;
    Ok(StatusCode::NO_CONTENT)
}
