// SPDX-FileCopyrightText: 2026 QueryChain Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the gateway.

use std::sync::Arc;

use axum::{
    Router, middleware as axum_middleware,
    routing::{delete, get, post},
};
use querychain_agent::AgentRuntime;
use querychain_core::QueryChainError;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;

use crate::auth::{AuthConfig, auth_middleware};
use crate::handlers;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub runtime: Arc<AgentRuntime>,
    pub auth: AuthConfig,
    /// Renders the Prometheus exposition text; `None` disables `/metrics`.
    pub prometheus_render: Option<Arc<dyn Fn() -> String + Send + Sync>>,
}

impl GatewayState {
    pub fn new(runtime: Arc<AgentRuntime>) -> Self {
        Self {
            runtime,
            auth: AuthConfig::default(),
            prometheus_render: None,
        }
    }

    pub fn with_bearer_token(mut self, token: Option<String>) -> Self {
        self.auth = AuthConfig {
            bearer_token: token,
        };
        self
    }

    pub fn with_prometheus(mut self, render: Arc<dyn Fn() -> String + Send + Sync>) -> Self {
        self.prometheus_render = Some(render);
        self
    }
}

/// Gateway server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Assemble the router: `/metrics` and `/api/health` are public, the rest
/// of `/api/*` sits behind auth.
pub fn build_router(state: GatewayState) -> Router {
    let public_routes = Router::new()
        .route("/metrics", get(handlers::get_metrics))
        .route("/api/health", get(handlers::get_health))
        .with_state(state.clone());

    let api_routes = Router::new()
        .route("/api/agent", post(handlers::post_agent))
        .route("/api/update", post(handlers::post_update))
        .route("/api/agent/history/{session_id}", get(handlers::get_history))
        .route("/api/agent/session/{session_id}", delete(handlers::delete_session))
        .route_layer(axum_middleware::from_fn_with_state(
            state.auth.clone(),
            auth_middleware,
        ))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .layer(CorsLayer::permissive())
}

/// Bind and serve until `shutdown` is cancelled.
pub async fn start_server(
    config: &ServerConfig,
    state: GatewayState,
    shutdown: CancellationToken,
) -> Result<(), QueryChainError> {
    let app = build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| QueryChainError::Internal(format!("failed to bind gateway to {addr}: {e}")))?;

    tracing::info!("Gateway server listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| QueryChainError::Internal(format!("gateway server error: {e}")))?;

    tracing::info!("Gateway server stopped");
    Ok(())
}
