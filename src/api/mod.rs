//! API Module - Read-only HTTP exporter
//!
//! Structure:
//! - `config.rs` - `ServerConfig` from the environment
//! - `error.rs` - `ApiError` with a JSON `{error, status}` body
//! - `handlers/` - health, snapshot, topology and DNS endpoints
//!
//! Every handler reads the engine's latest published snapshot; nothing here
//! mutates measurement state.

pub mod config;
pub mod error;
pub mod handlers;


use axum::{
    routing::{get, post},
    Router,
};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
};

use crate::logic::engine::Engine;

pub use config::ServerConfig;
pub use error::{ApiError, ApiResult};

/// Shared application state
pub type AppState = Arc<Engine>;

/// Create the exporter router
pub fn create_router(engine: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::check))
        .route("/api/v1/snapshot", get(handlers::snapshot::get))
        .route("/api/v1/snapshot/score", get(handlers::snapshot::score))
        .route("/api/v1/topology", get(handlers::snapshot::topology))
        .route("/api/v1/dns", get(handlers::dns::get))
        .route("/api/v1/dns/refresh", post(handlers::dns::refresh))
        .layer(CompressionLayer::new())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(engine)
}

/// Serve until `shutdown` resolves
pub async fn serve<F>(config: &ServerConfig, engine: AppState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("[API] Exporter listening on http://{}", addr);

    axum::serve(listener, create_router(engine))
        .with_graceful_shutdown(shutdown)
        .await
}
