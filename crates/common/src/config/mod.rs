//! Configuration management for TrustGraph services
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config.toml, config.yaml)
//! - Default values

use crate::errors::{AppError, Result};
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Trust engine configuration
    #[serde(default)]
    pub engine: EngineConfig,

    /// Score subscription configuration
    #[serde(default)]
    pub subscription: SubscriptionConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Shutdown timeout in seconds
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineConfig {
    /// Power-iteration rounds (no convergence test)
    #[serde(default = "default_pagerank_iterations")]
    pub pagerank_iterations: usize,

    /// PageRank damping factor
    #[serde(default = "default_damping")]
    pub damping: f64,

    /// Half-life used by decayed queries when the caller gives none
    #[serde(default = "default_half_life_days")]
    pub default_half_life_days: f64,

    /// Seconds between scheduled crawl/recompute cycles
    #[serde(default = "default_recompute_interval")]
    pub recompute_interval_secs: u64,

    /// BFS hop budget for path queries
    #[serde(default = "default_max_path_depth")]
    pub max_path_depth: usize,

    /// Label propagation pass limit
    #[serde(default = "default_community_iterations")]
    pub community_max_iterations: usize,

    /// Drop repeated (from, to) edges on ingest
    #[serde(default)]
    pub dedupe_edges: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SubscriptionConfig {
    /// Maximum identities a single subscriber may watch
    #[serde(default = "default_max_subset")]
    pub max_subset: usize,

    /// Per-message push timeout in seconds
    #[serde(default = "default_push_timeout")]
    pub push_timeout_secs: u64,

    /// Buffered updates per subscriber
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Metrics port (0 to disable)
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,

    /// Service name for tracing
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    /// Requests per second (global)
    #[serde(default = "default_rate_limit")]
    pub requests_per_second: u32,

    /// Burst capacity
    #[serde(default = "default_burst")]
    pub burst: u32,

    /// Enable rate limiting
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_request_timeout() -> u64 { 30 }
fn default_shutdown_timeout() -> u64 { 30 }
fn default_pagerank_iterations() -> usize { 20 }
fn default_damping() -> f64 { 0.85 }
fn default_half_life_days() -> f64 { 365.0 }
fn default_recompute_interval() -> u64 { 21_600 }
fn default_max_path_depth() -> usize { 6 }
fn default_community_iterations() -> usize { 10 }
fn default_max_subset() -> usize { 100 }
fn default_push_timeout() -> u64 { 5 }
fn default_channel_capacity() -> usize { 16 }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }
fn default_metrics_port() -> u16 { 9090 }
fn default_service_name() -> String { "trustgraph".to_string() }
fn default_rate_limit() -> u32 { 50 }
fn default_burst() -> u32 { 100 }
fn default_enabled() -> bool { true }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
            shutdown_timeout_secs: default_shutdown_timeout(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pagerank_iterations: default_pagerank_iterations(),
            damping: default_damping(),
            default_half_life_days: default_half_life_days(),
            recompute_interval_secs: default_recompute_interval(),
            max_path_depth: default_max_path_depth(),
            community_max_iterations: default_community_iterations(),
            dedupe_edges: false,
        }
    }
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            max_subset: default_max_subset(),
            push_timeout_secs: default_push_timeout(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
            metrics_port: default_metrics_port(),
            service_name: default_service_name(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: default_rate_limit(),
            burst: default_burst(),
            enabled: default_enabled(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> std::result::Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Start with defaults
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?

            // Load base config file
            .add_source(File::with_name("config/default").required(false))

            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))

            // Load local overrides
            .add_source(File::with_name("config/local").required(false))

            // Load from environment variables with APP__ prefix
            // e.g., APP__ENGINE__DAMPING=0.9
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
            )

            .build()?;

        config.try_deserialize()
    }

    /// Reject values the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        let engine = &self.engine;

        if !(engine.damping > 0.0 && engine.damping < 1.0) {
            return Err(AppError::Configuration {
                message: format!("engine.damping must be in (0, 1), got {}", engine.damping),
            });
        }

        if engine.pagerank_iterations == 0 {
            return Err(AppError::Configuration {
                message: "engine.pagerank_iterations must be positive".to_string(),
            });
        }

        if engine.recompute_interval_secs == 0 {
            return Err(AppError::Configuration {
                message: "engine.recompute_interval_secs must be positive".to_string(),
            });
        }

        if self.subscription.channel_capacity == 0 {
            return Err(AppError::Configuration {
                message: "subscription.channel_capacity must be positive".to_string(),
            });
        }

        Ok(())
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }

    /// Get shutdown timeout as Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.server.shutdown_timeout_secs)
    }

    /// Get the recompute cadence as Duration
    pub fn recompute_interval(&self) -> Duration {
        Duration::from_secs(self.engine.recompute_interval_secs)
    }

    /// Get the subscriber push timeout as Duration
    pub fn push_timeout(&self) -> Duration {
        Duration::from_secs(self.subscription.push_timeout_secs)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            engine: EngineConfig::default(),
            subscription: SubscriptionConfig::default(),
            observability: ObservabilityConfig::default(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.engine.pagerank_iterations, 20);
        assert_eq!(config.engine.recompute_interval_secs, 21_600);
        assert_eq!(config.subscription.max_subset, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_damping() {
        let mut config = AppConfig::default();
        config.engine.damping = 1.0;
        assert!(matches!(config.validate(), Err(AppError::Configuration { .. })));
    }

    #[test]
    fn test_rejects_zero_interval() {
        let mut config = AppConfig::default();
        config.engine.recompute_interval_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_durations() {
        let config = AppConfig::default();
        assert_eq!(config.push_timeout(), Duration::from_secs(5));
        assert_eq!(config.recompute_interval(), Duration::from_secs(21_600));
    }
}
