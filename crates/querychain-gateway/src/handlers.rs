// SPDX-FileCopyrightText: 2026 QueryChain Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the gateway REST API.

use std::collections::BTreeMap;

use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use querychain_core::{AgentResponse, HealthStatus, Turn, UpdateSummary};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::server::GatewayState;

const DEFAULT_USER: &str = "anonymous";

/// Request body for POST /api/agent.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentRequest {
    #[serde(default)]
    pub user_input: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
}

/// Request body for POST /api/update.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRequest {
    #[serde(default)]
    pub user_input: String,
    #[serde(default)]
    pub collection_name: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentReply {
    pub success: bool,
    pub session_id: String,
    #[serde(flatten)]
    pub response: AgentResponse,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateReply {
    pub success: bool,
    pub session_id: String,
    #[serde(flatten)]
    pub summary: UpdateSummary,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryReply {
    pub success: bool,
    pub session_id: String,
    pub history: Vec<Turn>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearReply {
    pub success: bool,
    pub message: String,
    pub removed: u64,
}

/// Response body for GET /api/health.
#[derive(Debug, Serialize)]
pub struct HealthReply {
    pub status: String,
    /// `ready` or `initializing`.
    pub agent: String,
    pub version: String,
    pub adapters: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Trimmed user input, or a 400.
fn required_input(input: &str) -> Result<&str, ApiError> {
    let input = input.trim();
    if input.is_empty() {
        Err(ApiError::InvalidRequest("userInput is required".to_string()))
    } else {
        Ok(input)
    }
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ApiError::InvalidRequest(rejection.body_text()))
}

fn session_or_new(session_id: Option<String>) -> String {
    session_id
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| format!("session_{}", uuid::Uuid::new_v4()))
}

fn user_or_anonymous(user_id: Option<String>) -> String {
    user_id
        .filter(|u| !u.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_USER.to_string())
}

/// POST /api/agent
pub async fn post_agent(
    State(state): State<GatewayState>,
    payload: Result<Json<AgentRequest>, JsonRejection>,
) -> Result<Json<AgentReply>, ApiError> {
    let request = body(payload)?;
    let input = required_input(&request.user_input)?;
    let session_id = session_or_new(request.session_id);
    let user_id = user_or_anonymous(request.user_id);

    let response = state.runtime.run_turn(input, &session_id, &user_id).await?;
    Ok(Json(AgentReply {
        success: true,
        session_id,
        response,
    }))
}

/// POST /api/update
pub async fn post_update(
    State(state): State<GatewayState>,
    payload: Result<Json<UpdateRequest>, JsonRejection>,
) -> Result<Json<UpdateReply>, ApiError> {
    let request = body(payload)?;
    let input = required_input(&request.user_input)?;
    let session_id = session_or_new(request.session_id);
    let user_id = user_or_anonymous(request.user_id);

    let summary = state
        .runtime
        .run_update(
            input,
            request.collection_name.as_deref(),
            &session_id,
            &user_id,
        )
        .await?;
    Ok(Json(UpdateReply {
        success: true,
        session_id,
        summary,
    }))
}

/// GET /api/agent/history/{session_id}
pub async fn get_history(
    State(state): State<GatewayState>,
    Path(session_id): Path<String>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<HistoryReply>, ApiError> {
    let history = state.runtime.history(&session_id, params.limit).await?;
    Ok(Json(HistoryReply {
        success: true,
        session_id,
        history,
    }))
}

/// DELETE /api/agent/session/{session_id}
pub async fn delete_session(
    State(state): State<GatewayState>,
    Path(session_id): Path<String>,
) -> Result<Json<ClearReply>, ApiError> {
    let removed = state.runtime.clear_session(&session_id).await?;
    Ok(Json(ClearReply {
        success: true,
        message: "Session cleared".to_string(),
        removed,
    }))
}

/// GET /api/health
///
/// Always answers; `agent` reports whether startup has finished.
pub async fn get_health(State(state): State<GatewayState>) -> Json<HealthReply> {
    let ready = state.runtime.is_ready();
    let adapters: BTreeMap<String, String> = state
        .runtime
        .health()
        .await
        .into_iter()
        .map(|(name, status)| (name, describe(&status)))
        .collect();
    let degraded = adapters.values().any(|s| s != "healthy");

    let status = if !ready || degraded { "degraded" } else { "healthy" };
    Json(HealthReply {
        status: status.to_string(),
        agent: if ready { "ready" } else { "initializing" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        adapters,
    })
}

fn describe(status: &HealthStatus) -> String {
    match status {
        HealthStatus::Healthy => "healthy".to_string(),
        HealthStatus::Degraded(reason) => format!("degraded: {reason}"),
        HealthStatus::Unhealthy(reason) => format!("unhealthy: {reason}"),
    }
}

/// GET /metrics
pub async fn get_metrics(State(state): State<GatewayState>) -> Response {
    match &state.prometheus_render {
        Some(render) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
            render(),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "metrics disabled").into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_request_uses_camel_case() {
        let req: AgentRequest = serde_json::from_str(
            r#"{"userInput": "hello", "sessionId": "s1", "userId": "u1"}"#,
        )
        .unwrap();
        assert_eq!(req.user_input, "hello");
        assert_eq!(req.session_id.as_deref(), Some("s1"));
        assert_eq!(req.user_id.as_deref(), Some("u1"));
    }

    #[test]
    fn update_request_collection_is_optional() {
        let req: UpdateRequest = serde_json::from_str(r#"{"userInput": "x"}"#).unwrap();
        assert!(req.collection_name.is_none());
    }

    #[test]
    fn missing_session_gets_generated_id() {
        let id = session_or_new(None);
        assert!(id.starts_with("session_"));
        assert_eq!(session_or_new(Some("  ".into())).len(), id.len());
        assert_eq!(session_or_new(Some("abc".into())), "abc");
    }

    #[test]
    fn blank_user_is_anonymous() {
        assert_eq!(user_or_anonymous(None), "anonymous");
        assert_eq!(user_or_anonymous(Some(" ".into())), "anonymous");
        assert_eq!(user_or_anonymous(Some("u1".into())), "u1");
    }

    #[test]
    fn blank_input_is_rejected() {
        assert!(required_input("   ").is_err());
        assert_eq!(required_input(" hi ").unwrap(), "hi");
    }
}
