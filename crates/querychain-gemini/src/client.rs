// SPDX-FileCopyrightText: 2026 QueryChain Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the Gemini `generateContent` and `embedContent` endpoints.
//!
//! Calls are made exactly once. Retrying is left to the caller, which sees
//! every failure as a typed [`QueryChainError::Model`].

use querychain_core::{QueryChainError, ResponseFormat};
use reqwest::header::{HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::types::{
    ApiErrorResponse, Content, EmbedContentRequest, EmbedContentResponse, GenerateContentRequest,
    GenerateContentResponse, GenerationConfig,
};

/// HTTP client for Gemini API communication.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
}

impl GeminiClient {
    /// Creates a client authenticating with `api_key` against `base_url`.
    pub fn new(api_key: &str, base_url: &str) -> Result<Self, QueryChainError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-goog-api-key",
            HeaderValue::from_str(api_key)
                .map_err(|e| QueryChainError::Config(format!("invalid API key header value: {e}")))?,
        );
        headers.insert("content-type", HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| QueryChainError::Model {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Overrides the base URL (for testing with wiremock).
    #[cfg(test)]
    pub fn with_base_url(mut self, url: String) -> Self {
        self.base_url = url;
        self
    }

    fn endpoint(&self, model: &str, method: &str) -> String {
        format!("{}/models/{model}:{method}", self.base_url)
    }

    /// Generate content and return the first candidate's text.
    pub async fn generate_text(
        &self,
        model: &str,
        prompt: &str,
        format: ResponseFormat,
    ) -> Result<String, QueryChainError> {
        let request = GenerateContentRequest {
            contents: vec![Content::user_text(prompt)],
            generation_config: GenerationConfig {
                response_mime_type: match format {
                    ResponseFormat::Json => "application/json",
                    ResponseFormat::Text => "text/plain",
                },
            },
        };

        let response: GenerateContentResponse = self
            .post(&self.endpoint(model, "generateContent"), &request)
            .await?;

        if let Some(text) = response.first_text() {
            return Ok(text);
        }

        let reason = response
            .prompt_feedback
            .and_then(|f| f.block_reason)
            .map(|r| format!("prompt blocked: {r}"))
            .or_else(|| {
                response
                    .candidates
                    .first()
                    .and_then(|c| c.finish_reason.clone())
                    .map(|r| format!("candidate finished without text: {r}"))
            })
            .unwrap_or_else(|| "no candidates in response".to_string());
        Err(QueryChainError::model(reason))
    }

    /// Embed `text` and return the vector.
    pub async fn embed_text(&self, model: &str, text: &str) -> Result<Vec<f32>, QueryChainError> {
        let request = EmbedContentRequest {
            content: Content {
                role: None,
                ..Content::user_text(text)
            },
        };
        let response: EmbedContentResponse = self
            .post(&self.endpoint(model, "embedContent"), &request)
            .await?;
        if response.embedding.values.is_empty() {
            return Err(QueryChainError::model("embedding response contained no values"));
        }
        Ok(response.embedding.values)
    }

    /// Fetch model metadata, used as a cheap liveness probe.
    pub async fn get_model(&self, model: &str) -> Result<(), QueryChainError> {
        let url = format!("{}/models/{model}", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| QueryChainError::Model {
                message: format!("HTTP request failed: {e}"),
                source: Some(Box::new(e)),
            })?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(QueryChainError::model(api_error_message(status, &body)))
        }
    }

    async fn post<B, R>(&self, url: &str, body: &B) -> Result<R, QueryChainError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| QueryChainError::Model {
                message: format!("HTTP request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        debug!(status = %status, url, "Gemini response received");

        let text = response.text().await.map_err(|e| QueryChainError::Model {
            message: format!("failed to read response body: {e}"),
            source: Some(Box::new(e)),
        })?;

        if !status.is_success() {
            return Err(QueryChainError::model(api_error_message(status, &text)));
        }

        serde_json::from_str(&text).map_err(|e| QueryChainError::Model {
            message: format!("failed to parse API response: {e}"),
            source: Some(Box::new(e)),
        })
    }
}

/// Prefer the service's own error message over the raw body.
fn api_error_message(status: reqwest::StatusCode, body: &str) -> String {
    match serde_json::from_str::<ApiErrorResponse>(body) {
        Ok(api_err) => format!(
            "Gemini API error ({}): {}",
            api_err
                .error
                .status
                .unwrap_or_else(|| status.as_u16().to_string()),
            api_err.error.message
        ),
        Err(_) => format!("API returned {status}: {body}"),
    }
}
