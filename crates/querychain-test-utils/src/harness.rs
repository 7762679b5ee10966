// SPDX-FileCopyrightText: 2026 QueryChain Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` assembles a ready [`AgentRuntime`] over mock model and
//! embedding adapters, an in-memory document store and a temp SQLite
//! session memory.

use std::sync::Arc;

use querychain_agent::{AgentRuntime, Planner, PlannerSettings};
use querychain_config::model::{QueryChainConfig, StorageConfig};
use querychain_core::{AgentResponse, PluginAdapter, QueryChainError, SessionMemory};
use querychain_storage::SqliteSessionMemory;
use querychain_tools::{descriptive_text, Toolbox, ToolSettings};
use serde_json::Value;

use crate::memory_store::InMemoryDocumentStore;
use crate::mock_embedder::MockEmbedder;
use crate::mock_model::MockModel;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    responses: Vec<String>,
    config: QueryChainConfig,
    documents: Vec<(String, Value)>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            responses: Vec::new(),
            config: QueryChainConfig::default(),
            documents: Vec::new(),
        }
    }

    /// Replies the mock model returns, in call order.
    pub fn with_mock_responses(mut self, responses: Vec<String>) -> Self {
        self.responses = responses;
        self
    }

    /// Adjust the configuration before anything is built.
    pub fn with_config(mut self, edit: impl FnOnce(&mut QueryChainConfig)) -> Self {
        edit(&mut self.config);
        self
    }

    /// Seed a document. Its embedding is computed from its descriptive text.
    pub fn with_document(mut self, collection: &str, doc: Value) -> Self {
        self.documents.push((collection.to_string(), doc));
        self
    }

    /// Build the harness, creating the temp database and the runtime.
    pub async fn build(self) -> Result<TestHarness, QueryChainError> {
        let temp_dir = tempfile::TempDir::new().map_err(QueryChainError::storage)?;
        let mut config = self.config;
        config.storage = StorageConfig {
            database_path: temp_dir.path().join("memory.db").display().to_string(),
            wal_mode: true,
        };

        let memory = Arc::new(SqliteSessionMemory::new(config.storage.clone()));
        memory.initialize().await?;

        let model = Arc::new(MockModel::with_responses(self.responses));
        let embedder = Arc::new(MockEmbedder::new());
        let store = Arc::new(InMemoryDocumentStore::new());

        let settings = ToolSettings::from_config(&config);
        for (collection, mut doc) in self.documents {
            if let Some(map) = doc.as_object() {
                let text = descriptive_text(map, &settings.descriptive_fields);
                doc[settings.embedding_field.as_str()] = serde_json::json!(embedder.vector_for(&text));
            }
            store.insert(&collection, doc);
        }

        let tools = Toolbox::new(model.clone(), embedder.clone(), store.clone(), settings);
        let planner = Planner::new(memory.clone(), tools, PlannerSettings::from_config(&config))
            .with_adapters(vec![
                memory.clone() as Arc<dyn PluginAdapter>,
                store.clone() as Arc<dyn PluginAdapter>,
                model.clone() as Arc<dyn PluginAdapter>,
            ]);

        Ok(TestHarness {
            runtime: Arc::new(AgentRuntime::ready(planner)),
            model,
            embedder,
            store,
            memory,
            config,
            _temp_dir: temp_dir,
        })
    }
}

/// A ready runtime over mocks, plus handles for assertions.
pub struct TestHarness {
    pub runtime: Arc<AgentRuntime>,
    pub model: Arc<MockModel>,
    pub embedder: Arc<MockEmbedder>,
    pub store: Arc<InMemoryDocumentStore>,
    /// SQLite session memory (temp DB, removed on drop).
    pub memory: Arc<SqliteSessionMemory>,
    pub config: QueryChainConfig,
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Queue a classification reply followed by a narration reply.
    pub async fn script_turn(&self, classification: Value, narration: &str) {
        self.model.add_response(classification.to_string()).await;
        self.model.add_response(narration).await;
    }

    /// Run one turn for the `test-user` in `session_id`.
    pub async fn ask(&self, session_id: &str, input: &str) -> Result<AgentResponse, QueryChainError> {
        self.runtime.run_turn(input, session_id, "test-user").await
    }
}
