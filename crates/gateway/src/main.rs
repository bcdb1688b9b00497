//! TrustGraph API Gateway
//!
//! The HTTP surface of the trust engine.
//! Handles:
//! - Score and analytics queries
//! - Edge ingest and recompute triggers
//! - Score subscriptions (server-sent events)
//! - Rate limiting and observability (logging, metrics, tracing)

mod handlers;
mod middleware;

use anyhow::Context;
use axum::{
    http::StatusCode,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post, put},
    Router,
};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use trustgraph_common::{
    config::AppConfig,
    metrics::{self, LATENCY_BUCKETS, METRICS_PREFIX, RECOMPUTE_BUCKETS},
};
use trustgraph_engine::{BufferedSource, Coordinator, CoordinatorHandle, EdgeSource, Engine};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub engine: Arc<Engine>,
    pub source: Arc<BufferedSource>,
    pub coordinator: Arc<CoordinatorHandle>,
}

impl AppState {
    /// Wire an engine to a buffered source and start its coordinator
    pub fn start(config: Arc<AppConfig>, engine: Arc<Engine>) -> Self {
        let source = Arc::new(BufferedSource::new());
        let coordinator = Coordinator::new(
            engine.clone(),
            source.clone() as Arc<dyn EdgeSource>,
            config.recompute_interval(),
        )
        .spawn();

        Self {
            config,
            engine,
            source,
            coordinator: Arc::new(coordinator),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load().context("failed to load configuration")?;
    config.validate()?;
    let config = Arc::new(config);

    init_tracing(&config);

    info!(
        service = %config.observability.service_name,
        "Starting TrustGraph API Gateway v{}",
        trustgraph_common::VERSION
    );

    // Initialize metrics
    init_metrics(&config)?;

    let engine = Arc::new(Engine::new(&config));
    let state = AppState::start(config.clone(), engine);
    let coordinator = state.coordinator.clone();

    // Build the router
    let app = create_router(state)?;

    // Start the server
    let listener = tokio::net::TcpListener::bind((config.server.host.as_str(), config.server.port))
        .await
        .with_context(|| format!("failed to bind {}:{}", config.server.host, config.server.port))?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Let an in-flight recompute finish, bounded by the shutdown timeout
    if tokio::time::timeout(config.shutdown_timeout(), coordinator.shutdown())
        .await
        .is_err()
    {
        warn!(
            timeout_secs = config.server.shutdown_timeout_secs,
            "Coordinator did not stop in time"
        );
    }

    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.observability.log_level));
    let registry = tracing_subscriber::registry().with(filter);

    if config.observability.json_logging {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .init();
    }
}

fn init_metrics(config: &AppConfig) -> anyhow::Result<()> {
    metrics::register_metrics();

    if config.observability.metrics_port == 0 {
        info!("Prometheus exporter disabled");
        return Ok(());
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], config.observability.metrics_port));
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full(format!("{}_request_duration_seconds", METRICS_PREFIX)),
            LATENCY_BUCKETS,
        )?
        .set_buckets_for_metric(
            Matcher::Full(format!("{}_recompute_duration_seconds", METRICS_PREFIX)),
            RECOMPUTE_BUCKETS,
        )?
        .with_http_listener(addr)
        .install()
        .context("failed to install Prometheus exporter")?;

    info!(%addr, "Prometheus exporter listening");
    Ok(())
}

/// Create the main application router
fn create_router(state: AppState) -> anyhow::Result<Router> {
    let config = state.config.clone();

    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // API routes
    let mut api_routes = Router::new()
        // Scores
        .route("/score/batch", post(handlers::scores::batch_score))
        .route("/score/{pubkey}", get(handlers::scores::get_score))
        .route("/top", get(handlers::scores::top))
        .route("/stats", get(handlers::scores::stats))

        // Paths
        .route("/path", get(handlers::paths::path))
        .route("/paths", get(handlers::paths::paths))
        .route("/neighborhood/{pubkey}", get(handlers::paths::neighborhood))

        // Analytics
        .route("/similar/{pubkey}", get(handlers::analytics::similar))
        .route("/recommend/{pubkey}", get(handlers::analytics::recommend))
        .route("/sybil/batch", post(handlers::analytics::sybil_batch))
        .route("/sybil/{pubkey}", get(handlers::analytics::sybil))
        .route("/anomalies/{pubkey}", get(handlers::analytics::anomalies))
        .route("/follow-quality/{pubkey}", get(handlers::analytics::follow_quality))
        .route("/trust-circle/compare", get(handlers::analytics::compare))
        .route("/trust-circle/{pubkey}", get(handlers::analytics::trust_circle))
        .route("/reputation/{pubkey}", get(handlers::analytics::reputation))
        .route("/influence/batch", post(handlers::analytics::influence_batch))
        .route("/simulate/unfollow", get(handlers::analytics::simulate_unfollow))

        // Temporal
        .route("/decay/top", get(handlers::temporal::decay_top))
        .route("/decay/{pubkey}", get(handlers::temporal::decay))
        .route("/timeline/{pubkey}", get(handlers::temporal::timeline))

        // Network
        .route("/network-health", get(handlers::network::network_health))
        .route("/community/{pubkey}", get(handlers::network::community))
        .route("/communities", get(handlers::network::communities))

        // Ingest
        .route("/edges", post(handlers::ingest::ingest_edges))
        .route("/recompute", post(handlers::ingest::recompute))

        // Subscriptions
        .route("/subscribe", get(handlers::subscribe::subscribe))
        .route("/subscribe/{id}", put(handlers::subscribe::update_subscription))
        .route_layer(from_fn(middleware::metrics::track_metrics));

    if config.rate_limit.enabled {
        let limiter = middleware::rate_limit::create_rate_limiter(
            config.rate_limit.requests_per_second,
            config.rate_limit.burst,
        )?;
        api_routes = api_routes.layer(from_fn_with_state(
            limiter,
            middleware::rate_limit::rate_limit_middleware,
        ));
    }

    // Compose the app
    let app = Router::new()
        // Health endpoints (not rate limited)
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        .nest("/v1", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(cors)
                .layer(TimeoutLayer::with_status_code(
                    StatusCode::REQUEST_TIMEOUT,
                    config.request_timeout(),
                )),
        )
        .with_state(state);

    Ok(app)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}
