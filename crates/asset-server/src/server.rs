//! HTTP server implementation using Axum.

use crate::handler::{
    handle_fetch_asset, handle_health, handle_suggest_all, handle_suggest_class,
    handle_suggest_name, handle_suggest_subclass,
};
use asset_core::AssetService;
use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Application state shared across handlers.
pub struct AppState {
    /// Asset lookups (database plus cache)
    pub service: Arc<AssetService>,
}

/// Build the API router; unknown paths are served from `www_root`.
pub fn build_router(service: Arc<AssetService>, www_root: &Path) -> Router {
    let state = Arc::new(AppState { service });

    // Allow a separately served UI during development
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/api/1/fetch/:name/:class/:var", get(handle_fetch_asset))
        .route("/api/1/suggest", get(handle_suggest_all))
        .route("/api/1/suggest/:page/:name", get(handle_suggest_name))
        .route("/api/1/suggest/:page/:name/:class", get(handle_suggest_class))
        .route(
            "/api/1/suggest/:page/:name/:class/:var",
            get(handle_suggest_subclass),
        )
        .fallback_service(ServeDir::new(www_root))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server.
///
/// Returns the actual address the server is bound to (useful when port=0).
pub async fn start_server(
    service: Arc<AssetService>,
    www_root: &Path,
    host: &str,
    port: u16,
) -> anyhow::Result<SocketAddr> {
    let app = build_router(service, www_root);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    info!("Server listening on {}", actual_addr);

    // Spawn the server in the background
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Server error: {}", e);
        }
    });

    Ok(actual_addr)
}
