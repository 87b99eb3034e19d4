// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes and shared state. The gateway carries no business logic:
//! it validates, ACKs, and hands deliveries to the pipeline.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use parley_config::model::{ChannelConfig, GatewayConfig};
use parley_core::ParleyError;
use parley_sync::SyncPipeline;

use crate::handlers;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    /// Ingestion pipeline deliveries are handed to.
    pub pipeline: Arc<SyncPipeline>,
    /// Channel verification/signature configuration.
    pub channel: ChannelConfig,
}

/// Build the gateway router over the given state.
pub fn build_router(state: GatewayState) -> Router {
    Router::new()
        .route(
            "/webhook",
            get(handlers::get_webhook).post(handlers::post_webhook),
        )
        .route("/healthz", get(handlers::get_health))
        .with_state(state)
}

/// Start the gateway HTTP server.
///
/// Binds to the configured host:port and serves:
/// - GET /webhook (subscription verification)
/// - POST /webhook (signed receive, fire-and-forget ingestion)
/// - GET /healthz
pub async fn start_server(config: &GatewayConfig, state: GatewayState) -> Result<(), ParleyError> {
    let app = build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| ParleyError::Config(format!("failed to bind gateway to {addr}: {e}")))?;

    tracing::info!("gateway listening on {addr}");

    axum::serve(listener, app)
        .await
        .map_err(|e| ParleyError::Internal(format!("gateway server error: {e}")))?;

    Ok(())
}
