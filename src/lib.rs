//! embedgate - admission-controlled HTTP server for text embeddings.
//!
//! The server wraps a heavyweight, blocking text-to-vector computation behind
//! one synchronous-looking endpoint while keeping the process bounded:
//!
//! - a capacity-bounded [`gate::RequestGate`] admits at most N concurrent
//!   compute calls and queues the rest
//! - a [`pool::ComputeWorkerPool`] dispatches blocking compute onto worker
//!   threads in memory-bounded micro-batches
//! - a [`stats::StatsAggregator`] accumulates wait-time/queue-depth windows
//!   flushed to the log on a fixed interval
//! - an [`reclaim::IdleReclaimer`] hands retained memory back to the OS after
//!   sustained idleness
//!
//! All background work is supervised by [`lifecycle::Lifecycle`] and wound
//! down on shutdown.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

pub mod activity;
pub mod compute;
pub mod config;
pub mod error;
pub mod gate;
pub mod lifecycle;
pub mod pool;
pub mod reclaim;
pub mod routes;
pub mod state;
pub mod stats;
pub mod types;

pub use config::ServerConfig;
pub use state::AppState;

use compute::HashEmbedder;
use lifecycle::Lifecycle;

/// Build the HTTP router over a service context.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/metrics", get(routes::metrics))
        .route("/v1/embeddings", post(routes::create_embeddings))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the embeddings server until ctrl-c.
///
/// Constructs the service context, spawns the supervised background tasks,
/// serves HTTP, and winds the background tasks down after the listener
/// stops.
pub async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    config.validate()?;

    info!(
        port = config.port,
        model = %config.model_name,
        max_concurrent = config.max_concurrent,
        workers = config.workers,
        micro_batch = config.micro_batch,
        "starting embedgate v{}",
        env!("CARGO_PKG_VERSION")
    );

    let embedder = Arc::new(HashEmbedder::new(config.dimension));
    let state = Arc::new(AppState::new(config.clone(), embedder));
    let lifecycle = Lifecycle::start(Arc::clone(&state));

    let app = build_router(state);
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("embedgate listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    lifecycle.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to install ctrl-c handler: {e}");
    }
    info!("shutdown signal received");
}
