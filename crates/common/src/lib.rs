//! TrustGraph Common Library
//!
//! Shared code for the TrustGraph engine and gateway including:
//! - Identity keys
//! - Error types and handling
//! - Configuration management
//! - Metrics and observability

pub mod config;
pub mod errors;
pub mod identity;
pub mod metrics;

// Re-export commonly used types
pub use config::AppConfig;
pub use errors::{AppError, Result};
pub use identity::Identity;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Maximum identities accepted by `batch_score`
pub const MAX_SCORE_BATCH: usize = 100;

/// Maximum identities accepted by the sybil and influence batch queries
pub const MAX_ANALYTICS_BATCH: usize = 50;
