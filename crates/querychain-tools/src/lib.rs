// SPDX-FileCopyrightText: 2026 QueryChain Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Model bridge and capability tools for the QueryChain agent.
//!
//! The [`Toolbox`] owns the three collaborators every tool needs (the model
//! bridge, the embedder and the document store) and exposes one method per
//! tool. Tools never fail past their own boundary: each returns a
//! [`ToolResult`] whose `success` flag carries the outcome. The one
//! exception is [`Toolbox::guarded_update`], which returns the typed error
//! for callers that report update failures directly.
//!
//! Tools:
//! - [`Toolbox::vector_search`] -- similarity search over document embeddings
//! - [`Toolbox::database_query`] -- model-written filter, validated, then run
//! - [`Toolbox::update_database`] -- guarded `$set` update with re-embedding
//! - [`Toolbox::calculator`] -- local arithmetic, no model involved
//! - [`Toolbox::aggregation`] -- model-written read-only pipeline

pub mod bridge;
pub mod calculator;
pub mod prompts;
pub mod validate;

mod aggregate;
mod query;
mod search;
mod update;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use querychain_config::model::QueryChainConfig;
use querychain_core::{DocumentStore, EmbeddingAdapter, ModelAdapter, QueryChainError, ToolResult};

pub use bridge::ModelBridge;
pub use prompts::SchemaHints;
pub use update::{descriptive_text, GUARD_MESSAGE};

/// Per-deployment knobs the tools read on every call.
#[derive(Debug, Clone)]
pub struct ToolSettings {
    pub vector_index: String,
    pub embedding_field: String,
    pub num_candidates: u32,
    /// Fields rendered into the embedded text, in order.
    pub descriptive_fields: Vec<String>,
    pub hints: SchemaHints,
    pub timeout: Duration,
}

impl ToolSettings {
    pub fn from_config(config: &QueryChainConfig) -> Self {
        let docstore = &config.docstore;
        Self {
            vector_index: docstore.vector_index.clone(),
            embedding_field: docstore.embedding_field.clone(),
            num_candidates: docstore.num_candidates,
            descriptive_fields: docstore.descriptive_fields.clone(),
            hints: SchemaHints {
                fields: docstore.descriptive_fields.clone(),
                code_table: docstore.code_table.clone(),
                numeric_fields: docstore.numeric_fields.clone(),
            },
            timeout: Duration::from_secs(config.agent.call_timeout_secs),
        }
    }
}

/// The five capability tools over shared model, embedder and store handles.
#[derive(Clone)]
pub struct Toolbox {
    bridge: ModelBridge,
    embedder: Arc<dyn EmbeddingAdapter>,
    store: Arc<dyn DocumentStore>,
    settings: ToolSettings,
}

impl Toolbox {
    pub fn new(
        model: Arc<dyn ModelAdapter>,
        embedder: Arc<dyn EmbeddingAdapter>,
        store: Arc<dyn DocumentStore>,
        settings: ToolSettings,
    ) -> Self {
        Self {
            bridge: ModelBridge::new(model, settings.timeout),
            embedder,
            store,
            settings,
        }
    }

    /// The bridge shared with the planner's classify and narrate stages.
    pub fn bridge(&self) -> &ModelBridge {
        &self.bridge
    }

    pub fn settings(&self) -> &ToolSettings {
        &self.settings
    }

    /// Arithmetic on a free-form expression.
    pub fn calculator(&self, expression: &str) -> ToolResult {
        calculator::calculate(expression)
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, QueryChainError> {
        bridge::bounded(self.settings.timeout, self.embedder.embed(text)).await
    }

    async fn with_deadline<T, F>(&self, fut: F) -> Result<T, QueryChainError>
    where
        F: Future<Output = Result<T, QueryChainError>>,
    {
        bridge::bounded(self.settings.timeout, fut).await
    }

    fn exclude_embedding(&self) -> Vec<String> {
        vec![self.settings.embedding_field.clone()]
    }
}
