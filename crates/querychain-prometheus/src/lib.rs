// SPDX-FileCopyrightText: 2026 QueryChain Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prometheus metrics for the QueryChain agent.
//!
//! Uses the metrics-rs facade with the Prometheus exporter. The gateway
//! serves [`PrometheusExporter::render`] at `/metrics`.

pub mod recording;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use querychain_core::QueryChainError;

pub use recording::{
    record_guard_rejection, record_tool, record_turn, record_turn_latency, register_metrics,
    set_active_sessions,
};

/// Owns the handle of the process-wide Prometheus recorder.
#[derive(Clone)]
pub struct PrometheusExporter {
    handle: PrometheusHandle,
}

impl PrometheusExporter {
    /// Install the Prometheus recorder globally.
    ///
    /// Only one recorder can be installed per process; a second call fails.
    pub fn install() -> Result<Self, QueryChainError> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .map_err(|e| {
                QueryChainError::Internal(format!("failed to install Prometheus recorder: {e}"))
            })?;

        recording::register_metrics();
        tracing::info!("prometheus metrics recorder installed");

        Ok(Self { handle })
    }

    /// Wrap a handle built elsewhere, e.g. by a test with a local recorder.
    pub fn from_handle(handle: PrometheusHandle) -> Self {
        Self { handle }
    }

    /// Render all collected metrics in Prometheus text format.
    pub fn render(&self) -> String {
        self.handle.render()
    }
}
