// SPDX-FileCopyrightText: 2026 QueryChain Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gemini adapters for the QueryChain agent.
//!
//! [`GeminiChat`] implements [`ModelAdapter`] over `generateContent` and
//! [`GeminiEmbedder`] implements [`EmbeddingAdapter`] over `embedContent`.
//! API key resolution order: config -> `GEMINI_API_KEY` env var -> error.

pub mod client;
pub mod types;

use async_trait::async_trait;
use querychain_config::model::GeminiConfig;
use querychain_core::{
    AdapterType, EmbeddingAdapter, HealthStatus, ModelAdapter, PluginAdapter, QueryChainError,
    ResponseFormat,
};
use tracing::{debug, info};

use crate::client::GeminiClient;

/// Chat model adapter.
pub struct GeminiChat {
    client: GeminiClient,
    model: String,
}

impl GeminiChat {
    pub fn new(config: &GeminiConfig) -> Result<Self, QueryChainError> {
        let api_key = resolve_api_key(&config.api_key)?;
        let client = GeminiClient::new(&api_key, &config.base_url)?;
        info!(model = config.chat_model, "Gemini chat adapter initialized");
        Ok(Self {
            client,
            model: config.chat_model.clone(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl PluginAdapter for GeminiChat {
    fn name(&self) -> &str {
        "gemini-chat"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Model
    }

    async fn health_check(&self) -> Result<HealthStatus, QueryChainError> {
        match self.client.get_model(&self.model).await {
            Ok(()) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(e.to_string())),
        }
    }

    async fn shutdown(&self) -> Result<(), QueryChainError> {
        Ok(())
    }
}

#[async_trait]
impl ModelAdapter for GeminiChat {
    async fn generate(
        &self,
        prompt: &str,
        format: ResponseFormat,
    ) -> Result<String, QueryChainError> {
        debug!(model = %self.model, %format, prompt_len = prompt.len(), "generateContent");
        self.client.generate_text(&self.model, prompt, format).await
    }
}

/// Embedding model adapter.
pub struct GeminiEmbedder {
    client: GeminiClient,
    model: String,
}

impl GeminiEmbedder {
    pub fn new(config: &GeminiConfig) -> Result<Self, QueryChainError> {
        let api_key = resolve_api_key(&config.api_key)?;
        let client = GeminiClient::new(&api_key, &config.base_url)?;
        info!(model = config.embedding_model, "Gemini embedding adapter initialized");
        Ok(Self {
            client,
            model: config.embedding_model.clone(),
        })
    }
}

#[async_trait]
impl PluginAdapter for GeminiEmbedder {
    fn name(&self) -> &str {
        "gemini-embedding"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Embedding
    }

    async fn health_check(&self) -> Result<HealthStatus, QueryChainError> {
        match self.client.get_model(&self.model).await {
            Ok(()) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(e.to_string())),
        }
    }

    async fn shutdown(&self) -> Result<(), QueryChainError> {
        Ok(())
    }
}

#[async_trait]
impl EmbeddingAdapter for GeminiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, QueryChainError> {
        self.client.embed_text(&self.model, text).await
    }
}

fn resolve_api_key(config_key: &Option<String>) -> Result<String, QueryChainError> {
    if let Some(key) = config_key
        && !key.is_empty()
    {
        return Ok(key.clone());
    }

    std::env::var("GEMINI_API_KEY")
        .ok()
        .filter(|k| !k.is_empty())
        .ok_or_else(|| {
            QueryChainError::Config(
                "Gemini API key not found. Set gemini.api_key in config or the GEMINI_API_KEY environment variable.".into(),
            )
        })
}
