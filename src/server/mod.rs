//! Thin HTTP surface over the cache proxy.

mod error;
mod handlers;

use axum::routing::get;
use axum::Router;
use color_eyre::{eyre::eyre, Result};
use std::net::SocketAddr;

use crate::proxy::CacheProxy;

#[derive(Clone)]
pub struct AppState {
  pub proxy: CacheProxy,
}

pub fn router(state: AppState) -> Router {
  Router::new()
    .route("/", get(handlers::home))
    .route("/health", get(handlers::health))
    .route("/api/user/profile/{username}", get(handlers::fetch_profile))
    .route("/api/user/analyze/{username}", get(handlers::analyze_profile))
    .with_state(state)
}

/// Serve until Ctrl-C.
pub async fn serve(bind: SocketAddr, state: AppState) -> Result<()> {
  let listener = tokio::net::TcpListener::bind(bind)
    .await
    .map_err(|e| eyre!("Failed to bind {}: {}", bind, e))?;
  tracing::info!(addr = %bind, "listening");

  axum::serve(listener, router(state))
    .with_graceful_shutdown(shutdown_signal())
    .await
    .map_err(|e| eyre!("Server error: {}", e))
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::warn!(error = %e, "failed to listen for shutdown signal");
    std::future::pending::<()>().await;
  }
  tracing::info!("shutting down");
}
