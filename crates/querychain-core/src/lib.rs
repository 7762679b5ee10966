// SPDX-FileCopyrightText: 2026 QueryChain Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the QueryChain agent.
//!
//! Defines the error taxonomy, the domain types exchanged between the planner
//! and its tools, and the adapter traits behind which the language model, the
//! embedding model, the document store and session memory live.

pub mod error;
pub mod traits;
pub mod types;

pub use error::{ErrorKind, QueryChainError};
pub use types::{
    AdapterType, AgentResponse, Document, FindOptions, HealthStatus, ModelOutput,
    ResponseFormat, Role, ToolChoice, ToolKind, ToolResult, ToolSelection, Turn, UpdateCounts,
    UpdateOperation, UpdateSummary, VectorQuery,
};

pub use traits::{DocumentStore, EmbeddingAdapter, ModelAdapter, PluginAdapter, SessionMemory};
