//! HTTP API
//!
//! # Structure
//!
//! - [`health`] - service and printer status
//! - [`print`] - print jobs

pub mod health;
pub mod print;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::AppState;

/// Build a router with all routes registered (no middleware, no state)
pub fn build_router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(print::router())
}

/// Build the application with middleware and state
///
/// Used by the server and by oneshot calls in tests.
pub fn build_app(state: AppState) -> Router {
    build_router()
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the API on `0.0.0.0:port` until the listener fails
pub async fn serve(state: AppState, port: u16) -> anyhow::Result<()> {
    let app = build_app(state);
    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    tracing::info!(addr = %listener.local_addr()?, "HTTP API listening");
    axum::serve(listener, app).await?;
    Ok(())
}
