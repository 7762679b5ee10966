// SPDX-FileCopyrightText: 2026 QueryChain Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The orchestration planner.
//!
//! One turn is five sequential stages: recall, classify, execute, narrate,
//! commit. Classify and narrate failures abort the turn before anything is
//! written. Tool failures are not turn failures: they are narrated and
//! committed like any other result.

use std::sync::Arc;
use std::time::Instant;

use querychain_config::model::QueryChainConfig;
use querychain_core::{
    AgentResponse, ErrorKind, HealthStatus, PluginAdapter, QueryChainError, Role, SessionMemory,
    ToolChoice, ToolKind, ToolResult, ToolSelection, Turn, UpdateSummary,
};
use querychain_prometheus::recording;
use querychain_tools::Toolbox;
use tracing::{debug, info, warn};

use crate::classify::{ChoicePolicy, RawChoice};
use crate::prompts;
use crate::session::{SessionGuard, SessionLocks};

const CONFIDENCE_SUCCESS: f64 = 0.9;
const CONFIDENCE_FAILURE: f64 = 0.3;

/// Planner knobs drawn from `[agent]` and `[memory]`.
#[derive(Debug, Clone)]
pub struct PlannerSettings {
    pub recall_window: usize,
    pub history_page_size: usize,
    pub serialize_session_turns: bool,
    pub policy: ChoicePolicy,
}

impl PlannerSettings {
    pub fn from_config(config: &QueryChainConfig) -> Self {
        Self {
            recall_window: config.memory.recall_window,
            history_page_size: config.memory.history_page_size,
            serialize_session_turns: config.agent.serialize_session_turns,
            policy: ChoicePolicy {
                default_collection: config.agent.default_collection.clone(),
                default_limit: config.agent.default_limit,
                max_limit: config.agent.max_limit,
            },
        }
    }
}

/// Composes session memory, the toolbox and the model bridge into turns.
pub struct Planner {
    memory: Arc<dyn SessionMemory>,
    tools: Toolbox,
    settings: PlannerSettings,
    locks: Option<SessionLocks>,
    adapters: Vec<Arc<dyn PluginAdapter>>,
}

impl Planner {
    pub fn new(memory: Arc<dyn SessionMemory>, tools: Toolbox, settings: PlannerSettings) -> Self {
        let locks = settings.serialize_session_turns.then(SessionLocks::new);
        Self {
            memory,
            tools,
            settings,
            locks,
            adapters: Vec::new(),
        }
    }

    /// Adapters reported by [`Planner::health`] and closed by [`Planner::shutdown`].
    pub fn with_adapters(mut self, adapters: Vec<Arc<dyn PluginAdapter>>) -> Self {
        self.adapters = adapters;
        self
    }

    pub fn settings(&self) -> &PlannerSettings {
        &self.settings
    }

    async fn lock(&self, session_id: &str) -> Option<SessionGuard> {
        match &self.locks {
            Some(locks) => Some(locks.acquire(session_id).await),
            None => None,
        }
    }

    /// Answer one user turn.
    pub async fn run_turn(
        &self,
        user_input: &str,
        session_id: &str,
        user_id: &str,
    ) -> Result<AgentResponse, QueryChainError> {
        let started = Instant::now();
        let _guard = self.lock(session_id).await;
        let result = self.turn_stages(user_input, session_id, user_id).await;
        record_outcome(&result, started);
        if let Err(e) = &result {
            warn!(session_id, error = %e, "turn aborted");
        }
        result
    }

    async fn turn_stages(
        &self,
        user_input: &str,
        session_id: &str,
        user_id: &str,
    ) -> Result<AgentResponse, QueryChainError> {
        let recalled = self
            .memory
            .recent_history(session_id, self.settings.recall_window)
            .await?;
        let history = prompts::format_history(&recalled);

        let choice = self.classify(&history, user_input).await?;
        let tool_used = choice.tool.name();
        info!(
            session_id,
            tool = %tool_used,
            collection = %choice.collection,
            limit = choice.limit,
            "turn classified"
        );

        let tool_result = self.execute(&choice, user_input).await;
        recording::record_tool(&tool_used, tool_result.success);

        let prompt = prompts::narration_prompt(&history, user_input, &tool_used, &tool_result);
        let answer = self.tools.bridge().call_text(&prompt).await?.trim().to_string();

        self.commit(session_id, user_id, user_input, &answer).await?;

        let confidence = if tool_result.success {
            CONFIDENCE_SUCCESS
        } else {
            CONFIDENCE_FAILURE
        };
        Ok(AgentResponse {
            answer,
            tool_used,
            tool_result,
            confidence,
        })
    }

    async fn classify(&self, history: &str, user_input: &str) -> Result<ToolChoice, QueryChainError> {
        let prompt = prompts::classification_prompt(
            history,
            user_input,
            &self.settings.policy.default_collection,
        );
        let raw: RawChoice = self.tools.bridge().call_json(&prompt).await?;
        debug!(?raw, "classification output");
        Ok(self.settings.policy.resolve(raw))
    }

    /// Run the chosen tool. Never fails: errors come back as failed results.
    async fn execute(&self, choice: &ToolChoice, user_input: &str) -> ToolResult {
        let kind = match &choice.tool {
            ToolSelection::Known(kind) => *kind,
            ToolSelection::Unrecognized(name) => {
                warn!(tool = %name, "classification chose an unknown tool");
                return ToolResult::failure_message(ErrorKind::ToolUnknown, "unknown tool");
            }
        };
        let collection = choice.collection.as_str();
        match kind {
            ToolKind::VectorSearch => {
                self.tools
                    .vector_search(collection, user_input, choice.limit)
                    .await
            }
            ToolKind::DatabaseQuery => {
                self.tools
                    .database_query(collection, user_input, choice.limit)
                    .await
            }
            ToolKind::UpdateDatabase => {
                let result = self.tools.update_database(collection, user_input).await;
                if result.error_kind == Some(ErrorKind::GuardRejected) {
                    recording::record_guard_rejection();
                }
                result
            }
            ToolKind::Calculator => self
                .tools
                .calculator(choice.expression.as_deref().unwrap_or(user_input)),
            ToolKind::Aggregation => self.tools.aggregation(collection, user_input).await,
        }
    }

    async fn commit(
        &self,
        session_id: &str,
        user_id: &str,
        user_input: &str,
        answer: &str,
    ) -> Result<(), QueryChainError> {
        self.memory
            .append(session_id, user_id, Role::User, user_input)
            .await?;
        self.memory
            .append(session_id, user_id, Role::Assistant, answer)
            .await?;
        Ok(())
    }

    /// Apply a guarded update directly, skipping classification and narration.
    ///
    /// Failures (guard, parse, model, store) are returned as errors and leave
    /// the session untouched.
    pub async fn run_update(
        &self,
        instruction: &str,
        collection: Option<&str>,
        session_id: &str,
        user_id: &str,
    ) -> Result<UpdateSummary, QueryChainError> {
        let started = Instant::now();
        let _guard = self.lock(session_id).await;
        let collection = collection
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(self.settings.policy.default_collection.as_str());

        let result = self.update_stages(instruction, collection, session_id, user_id).await;
        record_outcome(&result, started);
        result
    }

    async fn update_stages(
        &self,
        instruction: &str,
        collection: &str,
        session_id: &str,
        user_id: &str,
    ) -> Result<UpdateSummary, QueryChainError> {
        let tool = ToolKind::UpdateDatabase.to_string();
        let tool_result = match self.tools.guarded_update(collection, instruction).await {
            Ok(result) => result,
            Err(e) => {
                if matches!(e, QueryChainError::GuardRejected { .. }) {
                    recording::record_guard_rejection();
                }
                recording::record_tool(&tool, false);
                warn!(session_id, collection, error = %e, "direct update failed");
                return Err(e);
            }
        };
        recording::record_tool(&tool, true);

        let modified_count = tool_result.modified_count.unwrap_or(0);
        let matched_count = tool_result.matched.unwrap_or(0);
        let message = update_message(matched_count, modified_count);
        self.commit(session_id, user_id, instruction, &message).await?;
        info!(session_id, collection, matched_count, modified_count, "direct update committed");

        Ok(UpdateSummary {
            message,
            modified_count,
            matched_count,
            tool_result,
        })
    }

    /// Chronological transcript; `None` uses the history page size.
    pub async fn history(
        &self,
        session_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<Turn>, QueryChainError> {
        let limit = limit
            .filter(|l| *l > 0)
            .unwrap_or(self.settings.history_page_size);
        self.memory.recent_history(session_id, limit).await
    }

    /// Forget a session. Returns the number of turns removed.
    pub async fn clear_session(&self, session_id: &str) -> Result<u64, QueryChainError> {
        let _guard = self.lock(session_id).await;
        let removed = self.memory.clear(session_id).await?;
        info!(session_id, removed, "session cleared");
        Ok(removed)
    }

    /// Health of every registered adapter, by name.
    pub async fn health(&self) -> Vec<(String, HealthStatus)> {
        let mut report = Vec::with_capacity(self.adapters.len());
        for adapter in &self.adapters {
            let status = match adapter.health_check().await {
                Ok(status) => status,
                Err(e) => HealthStatus::Unhealthy(e.to_string()),
            };
            report.push((adapter.name().to_string(), status));
        }
        report
    }

    /// Shut down every registered adapter, logging failures.
    pub async fn shutdown(&self) {
        for adapter in &self.adapters {
            if let Err(e) = adapter.shutdown().await {
                warn!(adapter = adapter.name(), error = %e, "adapter shutdown failed");
            }
        }
    }
}

fn update_message(matched: u64, modified: u64) -> String {
    if modified > 0 {
        format!("Successfully updated {modified} record(s).")
    } else if matched > 0 {
        format!("Found {matched} matching record(s) but no changes were needed.")
    } else {
        "No matching records found.".to_string()
    }
}

fn record_outcome<T>(result: &Result<T, QueryChainError>, started: Instant) {
    let outcome = match result {
        Ok(_) => "ok".to_string(),
        Err(e) => e.kind().to_string(),
    };
    recording::record_turn(&outcome);
    recording::record_turn_latency(started.elapsed().as_secs_f64());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_messages() {
        assert_eq!(update_message(1, 1), "Successfully updated 1 record(s).");
        assert_eq!(
            update_message(2, 0),
            "Found 2 matching record(s) but no changes were needed."
        );
        assert_eq!(update_message(0, 0), "No matching records found.");
    }

    #[test]
    fn settings_follow_config() {
        let mut config = QueryChainConfig::default();
        config.agent.max_limit = 20;
        config.memory.recall_window = 4;
        let settings = PlannerSettings::from_config(&config);
        assert_eq!(settings.policy.max_limit, 20);
        assert_eq!(settings.recall_window, 4);
        assert_eq!(settings.history_page_size, 50);
        assert!(settings.serialize_session_turns);
    }
}
