//! Main HTTP Gateway Server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use axum::{
    extract::DefaultBodyLimit,
    routing::{any, get},
    Router,
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, instrument};

use fnrelay_functions::FunctionRegistry;

use crate::dispatch;
use crate::health_api;

/// Largest request body handed to a function. Functions apply their own
/// per-file limits below this.
pub const MAX_REQUEST_BODY: usize = 256 * 1024 * 1024;

/// Application state shared across routes.
#[derive(Clone)]
pub struct GatewayState {
    pub registry: Arc<FunctionRegistry>,
    pub started_at: Instant,
}

impl GatewayState {
    pub fn new(registry: FunctionRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
            started_at: Instant::now(),
        }
    }
}

pub fn build_router(state: GatewayState) -> Router {
    Router::new()
        .route("/api/health", get(health_api::get_health))
        .route("/:function", any(dispatch::invoke_root))
        .route("/:function/*path", any(dispatch::invoke_path))
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve until Ctrl-C.
#[instrument(skip(state))]
pub async fn start_server(addr: SocketAddr, state: GatewayState) -> Result<()> {
    let functions = state.registry.names();
    let app = build_router(state);

    let listener = TcpListener::bind(&addr).await?;
    info!(%addr, ?functions, "Gateway HTTP server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await?;

    Ok(())
}
