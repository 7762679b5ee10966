// SPDX-FileCopyrightText: 2026 QueryChain Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the QueryChain agent.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;

/// Boxed error source carried by adapter failures.
pub type BoxedSource = Box<dyn std::error::Error + Send + Sync>;

/// The primary error type used across adapter traits, tools and the planner.
#[derive(Debug, Error)]
pub enum QueryChainError {
    /// The agent has not finished its asynchronous startup.
    #[error("agent is still initializing, try again shortly")]
    NotReady,

    /// The language model returned no usable candidate or the call failed.
    #[error("model error: {message}")]
    Model {
        message: String,
        source: Option<BoxedSource>,
    },

    /// Model output could not be parsed or failed structural validation.
    #[error("could not interpret model output: {message}")]
    Parse { message: String },

    /// A mutation was refused by the update guard before reaching the store.
    #[error("{message}")]
    GuardRejected { message: String },

    /// The document store rejected or failed an operation.
    #[error("document store error: {message}")]
    Store {
        message: String,
        source: Option<BoxedSource>,
    },

    /// Classification named a tool that does not exist.
    #[error("unknown tool `{name}`")]
    ToolUnknown { name: String },

    /// Configuration errors (invalid values, missing secrets).
    #[error("configuration error: {0}")]
    Config(String),

    /// Session memory backend errors.
    #[error("storage error: {source}")]
    Storage { source: BoxedSource },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Machine-readable classification of a [`QueryChainError`].
///
/// Carried on failed tool results and HTTP error bodies.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotReady,
    Model,
    Parse,
    GuardRejected,
    Store,
    ToolUnknown,
    Config,
    Storage,
    Timeout,
    Internal,
}

impl QueryChainError {
    /// Model failure without an underlying error value.
    pub fn model(message: impl Into<String>) -> Self {
        Self::Model {
            message: message.into(),
            source: None,
        }
    }

    /// Parse failure for malformed or disallowed model output.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    /// Document store failure without an underlying error value.
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
            source: None,
        }
    }

    /// Wrap any error as a session memory failure.
    pub fn storage<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Storage {
            source: Box::new(err),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotReady => ErrorKind::NotReady,
            Self::Model { .. } => ErrorKind::Model,
            Self::Parse { .. } => ErrorKind::Parse,
            Self::GuardRejected { .. } => ErrorKind::GuardRejected,
            Self::Store { .. } => ErrorKind::Store,
            Self::ToolUnknown { .. } => ErrorKind::ToolUnknown,
            Self::Config(_) => ErrorKind::Config,
            Self::Storage { .. } => ErrorKind::Storage,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_matches_variant() {
        assert_eq!(QueryChainError::NotReady.kind(), ErrorKind::NotReady);
        assert_eq!(QueryChainError::model("x").kind(), ErrorKind::Model);
        assert_eq!(QueryChainError::parse("x").kind(), ErrorKind::Parse);
        assert_eq!(QueryChainError::store("x").kind(), ErrorKind::Store);
        assert_eq!(
            QueryChainError::storage(std::io::Error::other("disk")).kind(),
            ErrorKind::Storage
        );
        assert_eq!(
            QueryChainError::Timeout {
                duration: std::time::Duration::from_secs(1)
            }
            .kind(),
            ErrorKind::Timeout
        );
    }

    #[test]
    fn guard_message_is_displayed_verbatim() {
        let err = QueryChainError::GuardRejected {
            message: "Update filter is too broad. Please be more specific.".into(),
        };
        assert_eq!(
            err.to_string(),
            "Update filter is too broad. Please be more specific."
        );
    }

    #[test]
    fn error_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::GuardRejected).unwrap();
        assert_eq!(json, "\"guard_rejected\"");
        assert_eq!(ErrorKind::ToolUnknown.to_string(), "tool_unknown");
    }
}
