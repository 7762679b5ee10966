// SPDX-FileCopyrightText: 2026 QueryChain Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Runtime lifecycle: `Uninitialized` until startup finishes, then `Ready`.
//!
//! The HTTP gateway starts accepting requests before the document store and
//! session memory are connected. Every entry point checks the lifecycle and
//! answers [`QueryChainError::NotReady`] until the planner is installed.

use std::sync::Arc;

use arc_swap::ArcSwap;
use querychain_core::{AgentResponse, HealthStatus, QueryChainError, Turn, UpdateSummary};
use tracing::info;

use crate::planner::Planner;

enum Lifecycle {
    Uninitialized,
    Ready(Arc<Planner>),
}

pub struct AgentRuntime {
    state: ArcSwap<Lifecycle>,
}

impl Default for AgentRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentRuntime {
    /// A runtime that rejects every call until [`AgentRuntime::mark_ready`].
    pub fn new() -> Self {
        Self {
            state: ArcSwap::from_pointee(Lifecycle::Uninitialized),
        }
    }

    /// A runtime that is ready immediately.
    pub fn ready(planner: Planner) -> Self {
        let runtime = Self::new();
        runtime.mark_ready(Arc::new(planner));
        runtime
    }

    pub fn mark_ready(&self, planner: Arc<Planner>) {
        self.state.store(Arc::new(Lifecycle::Ready(planner)));
        info!("agent runtime ready");
    }

    pub fn is_ready(&self) -> bool {
        matches!(**self.state.load(), Lifecycle::Ready(_))
    }

    pub fn planner(&self) -> Result<Arc<Planner>, QueryChainError> {
        match &**self.state.load() {
            Lifecycle::Ready(planner) => Ok(Arc::clone(planner)),
            Lifecycle::Uninitialized => Err(QueryChainError::NotReady),
        }
    }

    pub async fn run_turn(
        &self,
        user_input: &str,
        session_id: &str,
        user_id: &str,
    ) -> Result<AgentResponse, QueryChainError> {
        self.planner()?.run_turn(user_input, session_id, user_id).await
    }

    pub async fn run_update(
        &self,
        instruction: &str,
        collection: Option<&str>,
        session_id: &str,
        user_id: &str,
    ) -> Result<UpdateSummary, QueryChainError> {
        self.planner()?
            .run_update(instruction, collection, session_id, user_id)
            .await
    }

    pub async fn history(
        &self,
        session_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<Turn>, QueryChainError> {
        self.planner()?.history(session_id, limit).await
    }

    pub async fn clear_session(&self, session_id: &str) -> Result<u64, QueryChainError> {
        self.planner()?.clear_session(session_id).await
    }

    /// Adapter health, empty while uninitialized.
    pub async fn health(&self) -> Vec<(String, HealthStatus)> {
        match self.planner() {
            Ok(planner) => planner.health().await,
            Err(_) => Vec::new(),
        }
    }

    /// Shut down adapters if the runtime ever became ready.
    pub async fn shutdown(&self) {
        if let Ok(planner) = self.planner() {
            planner.shutdown().await;
        }
    }
}
