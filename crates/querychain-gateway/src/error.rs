// SPDX-FileCopyrightText: 2026 QueryChain Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mapping from agent errors to HTTP responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use querychain_core::{ErrorKind, QueryChainError};
use serde::Serialize;

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub kind: String,
}

/// A failed API call, rendered as `{success: false, error, kind}`.
#[derive(Debug)]
pub enum ApiError {
    /// Request body or parameters were unusable.
    InvalidRequest(String),
    Agent(QueryChainError),
}

impl From<QueryChainError> for ApiError {
    fn from(e: QueryChainError) -> Self {
        Self::Agent(e)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::Agent(e) => match e.kind() {
                ErrorKind::NotReady => StatusCode::SERVICE_UNAVAILABLE,
                ErrorKind::GuardRejected => StatusCode::UNPROCESSABLE_ENTITY,
                ErrorKind::Parse | ErrorKind::Model => StatusCode::BAD_GATEWAY,
                ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn body(&self) -> ErrorResponse {
        let (error, kind) = match self {
            Self::InvalidRequest(message) => (message.clone(), "invalid_request".to_string()),
            Self::Agent(e) => (e.to_string(), e.kind().to_string()),
        };
        ErrorResponse {
            success: false,
            error,
            kind,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = ?self, "request failed");
        }
        (status, Json(self.body())).into_response()
    }
}
