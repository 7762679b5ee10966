// SPDX-FileCopyrightText: 2026 QueryChain Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `querychain serve` command implementation.
//!
//! Binds the gateway first, then connects MongoDB, SQLite and Gemini in a
//! background task. Until that task finishes the agent endpoints answer 503.
//! A startup failure stops the server and exits non-zero.

use std::sync::Arc;

use querychain_agent::{AgentRuntime, shutdown};
use querychain_config::model::QueryChainConfig;
use querychain_core::QueryChainError;
use querychain_gateway::{GatewayState, ServerConfig};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::startup;

type RenderFn = Arc<dyn Fn() -> String + Send + Sync>;

/// Runs the `querychain serve` command.
pub async fn run_serve(config: QueryChainConfig) -> Result<(), QueryChainError> {
    init_tracing(&config.agent.log_level);

    info!(agent = %config.agent.name, "starting querychain serve");

    let prometheus_render = install_prometheus(&config);

    let runtime = Arc::new(AgentRuntime::new());
    let cancel = shutdown::install_signal_handler();

    let startup_task = tokio::spawn(initialize(config.clone(), runtime.clone(), cancel.clone()));

    let mut state = GatewayState::new(runtime.clone())
        .with_bearer_token(config.gateway.bearer_token.clone());
    if let Some(render) = prometheus_render {
        state = state.with_prometheus(render);
    }
    if config.gateway.bearer_token.is_none() {
        warn!("gateway.bearer_token not set, /api/* is unauthenticated");
    }

    let server_config = ServerConfig {
        host: config.gateway.host.clone(),
        port: config.gateway.port,
    };
    let served = querychain_gateway::start_server(&server_config, state, cancel.clone()).await;
    cancel.cancel();

    let started = match startup_task.await {
        Ok(result) => result,
        Err(e) => Err(QueryChainError::Internal(format!("startup task failed: {e}"))),
    };

    runtime.shutdown().await;
    served?;
    started?;
    info!("querychain serve shutdown complete");
    Ok(())
}

/// Connects backends and flips the runtime to ready.
///
/// Cancels `cancel` on failure so the gateway stops.
async fn initialize(
    config: QueryChainConfig,
    runtime: Arc<AgentRuntime>,
    cancel: CancellationToken,
) -> Result<(), QueryChainError> {
    let assembled = tokio::select! {
        result = startup::assemble_planner(&config) => result,
        _ = cancel.cancelled() => {
            debug!("shutdown requested during startup");
            return Ok(());
        }
    };
    match assembled {
        Ok(planner) => {
            runtime.mark_ready(Arc::new(planner));
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "agent startup failed");
            cancel.cancel();
            Err(e)
        }
    }
}

#[cfg(feature = "prometheus")]
fn install_prometheus(config: &QueryChainConfig) -> Option<RenderFn> {
    if !config.prometheus.enabled {
        debug!("prometheus metrics disabled by configuration");
        return None;
    }
    match querychain_prometheus::PrometheusExporter::install() {
        Ok(exporter) => {
            info!("prometheus metrics enabled");
            Some(Arc::new(move || exporter.render()) as RenderFn)
        }
        Err(e) => {
            warn!(error = %e, "prometheus initialization failed, continuing without metrics");
            None
        }
    }
}

#[cfg(not(feature = "prometheus"))]
fn install_prometheus(_config: &QueryChainConfig) -> Option<RenderFn> {
    None
}

/// Initializes the tracing subscriber with the given log level.
///
/// `RUST_LOG` wins over the configured level.
pub fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "querychain={log_level},querychain_agent={log_level},querychain_tools={log_level},\
             querychain_gateway={log_level},warn"
        ))
    });

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .try_init();
}
