// SPDX-FileCopyrightText: 2026 QueryChain Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bearer token middleware for `/api/*`.
//!
//! When no token is configured the API is open; the gateway binds to
//! loopback by default.

use axum::{
    extract::{Request, State},
    http::{StatusCode, header},
    middleware::Next,
    response::Response,
};

/// Authentication configuration for the gateway.
#[derive(Clone, Default)]
pub struct AuthConfig {
    /// Expected bearer token. `None` disables auth.
    pub bearer_token: Option<String>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field(
                "bearer_token",
                &self.bearer_token.as_ref().map(|_| "[redacted]"),
            )
            .finish()
    }
}

impl AuthConfig {
    fn accepts(&self, request: &Request) -> bool {
        let Some(expected) = self.bearer_token.as_deref() else {
            return true;
        };
        request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .is_some_and(|token| token == expected)
    }
}

pub async fn auth_middleware(
    State(auth): State<AuthConfig>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    if auth.accepts(&request) {
        Ok(next.run(request).await)
    } else {
        tracing::warn!(path = %request.uri().path(), "rejected request without valid bearer token");
        Err(StatusCode::UNAUTHORIZED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request(auth: Option<&str>) -> Request {
        let mut builder = Request::builder().uri("/api/health");
        if let Some(value) = auth {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn open_when_no_token_configured() {
        let auth = AuthConfig::default();
        assert!(auth.accepts(&request(None)));
    }

    #[test]
    fn token_must_match() {
        let auth = AuthConfig {
            bearer_token: Some("secret".into()),
        };
        assert!(auth.accepts(&request(Some("Bearer secret"))));
        assert!(!auth.accepts(&request(Some("Bearer wrong"))));
        assert!(!auth.accepts(&request(Some("secret"))));
        assert!(!auth.accepts(&request(None)));
    }

    #[test]
    fn debug_redacts_token() {
        let auth = AuthConfig {
            bearer_token: Some("secret".into()),
        };
        let debug = format!("{auth:?}");
        assert!(!debug.contains("secret"));
        assert!(debug.contains("[redacted]"));
    }
}
