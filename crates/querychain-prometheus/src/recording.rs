// SPDX-FileCopyrightText: 2026 QueryChain Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric registration and recording helpers.
//!
//! Everything goes through the metrics-rs facade; without an installed
//! recorder these calls are no-ops.

use metrics::{describe_counter, describe_gauge, describe_histogram};

pub const TURNS_TOTAL: &str = "querychain_turns_total";
pub const TOOL_INVOCATIONS_TOTAL: &str = "querychain_tool_invocations_total";
pub const GUARD_REJECTIONS_TOTAL: &str = "querychain_guard_rejections_total";
pub const TURN_LATENCY_SECONDS: &str = "querychain_turn_latency_seconds";
pub const ACTIVE_SESSIONS: &str = "querychain_active_sessions";

/// Register all QueryChain metric descriptions.
///
/// Called once at startup after the recorder is installed.
pub fn register_metrics() {
    describe_counter!(TURNS_TOTAL, "Agent turns by outcome");
    describe_counter!(TOOL_INVOCATIONS_TOTAL, "Tool executions by tool and success");
    describe_counter!(
        GUARD_REJECTIONS_TOTAL,
        "Updates refused by the empty-filter guard"
    );
    describe_histogram!(TURN_LATENCY_SECONDS, "End-to-end turn latency in seconds");
    describe_gauge!(ACTIVE_SESSIONS, "Sessions with a turn in flight");
}

/// Record a finished turn. `outcome` is `ok` or an error kind.
pub fn record_turn(outcome: &str) {
    metrics::counter!(TURNS_TOTAL, "outcome" => outcome.to_string()).increment(1);
}

pub fn record_tool(tool: &str, success: bool) {
    metrics::counter!(
        TOOL_INVOCATIONS_TOTAL,
        "tool" => tool.to_string(),
        "success" => if success { "true" } else { "false" }
    )
    .increment(1);
}

pub fn record_guard_rejection() {
    metrics::counter!(GUARD_REJECTIONS_TOTAL).increment(1);
}

pub fn record_turn_latency(seconds: f64) {
    metrics::histogram!(TURN_LATENCY_SECONDS).record(seconds);
}

pub fn set_active_sessions(count: usize) {
    metrics::gauge!(ACTIVE_SESSIONS).set(count as f64);
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics_exporter_prometheus::PrometheusBuilder;

    fn rendered(record: impl FnOnce()) -> String {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        metrics::with_local_recorder(&recorder, record);
        handle.render()
    }

    #[test]
    fn tool_counter_carries_labels() {
        let text = rendered(|| {
            record_tool("calculator", true);
            record_tool("calculator", true);
            record_tool("aggregation", false);
        });

        assert!(text.contains(
            "querychain_tool_invocations_total{tool=\"calculator\",success=\"true\"} 2"
        ));
        assert!(text.contains(
            "querychain_tool_invocations_total{tool=\"aggregation\",success=\"false\"} 1"
        ));
    }

    #[test]
    fn turn_outcome_and_guard_are_recorded() {
        let text = rendered(|| {
            record_turn("ok");
            record_turn("parse");
            record_guard_rejection();
        });

        assert!(text.contains("querychain_turns_total{outcome=\"ok\"} 1"));
        assert!(text.contains("querychain_turns_total{outcome=\"parse\"} 1"));
        assert!(text.contains("querychain_guard_rejections_total 1"));
    }
}
