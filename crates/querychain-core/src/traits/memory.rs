// SPDX-FileCopyrightText: 2026 QueryChain Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session memory trait for durable conversation transcripts.

use async_trait::async_trait;

use crate::error::QueryChainError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{Role, Turn};

/// Append-only, per-session log of conversation turns.
#[async_trait]
pub trait SessionMemory: PluginAdapter {
    /// Prepare the backend (open connections, run migrations).
    async fn initialize(&self) -> Result<(), QueryChainError>;

    /// Record one turn. No uniqueness or content validation is applied.
    async fn append(
        &self,
        session_id: &str,
        user_id: &str,
        role: Role,
        content: &str,
    ) -> Result<Turn, QueryChainError>;

    /// The `limit` most recent turns, oldest first.
    ///
    /// Unknown sessions yield an empty sequence.
    async fn recent_history(
        &self,
        session_id: &str,
        limit: usize,
    ) -> Result<Vec<Turn>, QueryChainError>;

    /// Delete every turn of the session. Idempotent; returns the number removed.
    async fn clear(&self, session_id: &str) -> Result<u64, QueryChainError>;
}
