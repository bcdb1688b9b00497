//! API handlers module

pub mod analytics;
pub mod health;
pub mod ingest;
pub mod network;
pub mod paths;
pub mod scores;
pub mod subscribe;
pub mod temporal;

use serde::Deserialize;
use trustgraph_common::errors::{AppError, Result};
use trustgraph_common::Identity;

/// Parse a path or query identity
pub fn parse_identity(raw: &str) -> Result<Identity> {
    Identity::parse(raw.trim())
}

/// Parse a batch of identities, rejecting oversized batches before any work
pub fn parse_batch(raw: &[String], limit: usize) -> Result<Vec<Identity>> {
    if raw.len() > limit {
        return Err(AppError::ResourceExhausted {
            size: raw.len(),
            limit,
        });
    }
    raw.iter().map(|s| parse_identity(s)).collect()
}

/// Body of the batch endpoints
#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    pub pubkeys: Vec<String>,
}

/// `?limit=` on listing endpoints
#[derive(Debug, Default, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

/// Run engine work off the async workers
pub async fn blocking<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| AppError::Internal {
            message: format!("analytics task failed: {}", e),
        })?
}
