// SPDX-FileCopyrightText: 2026 QueryChain Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tool invocation bridge: the single choke point for model calls.
//!
//! Every call is bounded by a timeout. JSON mode parses the model's text
//! strictly, so malformed output surfaces as [`QueryChainError::Parse`] and
//! never as a model failure.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use querychain_core::{ModelAdapter, ModelOutput, QueryChainError, ResponseFormat};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

/// Run `fut`, converting an elapsed deadline into [`QueryChainError::Timeout`].
pub async fn bounded<T, F>(duration: Duration, fut: F) -> Result<T, QueryChainError>
where
    F: Future<Output = Result<T, QueryChainError>>,
{
    tokio::time::timeout(duration, fut)
        .await
        .map_err(|_| QueryChainError::Timeout { duration })?
}

/// Wraps a [`ModelAdapter`] with format handling and a per-call deadline.
#[derive(Clone)]
pub struct ModelBridge {
    model: Arc<dyn ModelAdapter>,
    timeout: Duration,
}

impl ModelBridge {
    pub fn new(model: Arc<dyn ModelAdapter>, timeout: Duration) -> Self {
        Self { model, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Send `prompt` and shape the reply according to `format`.
    pub async fn call(
        &self,
        prompt: &str,
        format: ResponseFormat,
    ) -> Result<ModelOutput, QueryChainError> {
        let text = bounded(self.timeout, self.model.generate(prompt, format)).await?;
        match format {
            ResponseFormat::Text => Ok(ModelOutput::Text(text)),
            ResponseFormat::Json => serde_json::from_str(text.trim())
                .map(ModelOutput::Json)
                .map_err(|e| {
                    warn!(error = %e, len = text.len(), "model returned malformed JSON");
                    QueryChainError::parse(format!("model output is not valid JSON: {e}"))
                }),
        }
    }

    /// JSON-mode call deserialized straight into `T`.
    ///
    /// A well-formed value of the wrong shape is also a parse error.
    pub async fn call_json<T: DeserializeOwned>(&self, prompt: &str) -> Result<T, QueryChainError> {
        let value = self.call(prompt, ResponseFormat::Json).await?.into_json()?;
        serde_json::from_value(value).map_err(|e| {
            debug!(error = %e, "model JSON has unexpected shape");
            QueryChainError::parse(format!("model output has unexpected shape: {e}"))
        })
    }

    /// Free-text call.
    pub async fn call_text(&self, prompt: &str) -> Result<String, QueryChainError> {
        Ok(self.call(prompt, ResponseFormat::Text).await?.into_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use querychain_test_utils::MockModel;
    use serde_json::json;

    fn bridge(model: MockModel) -> ModelBridge {
        ModelBridge::new(Arc::new(model), Duration::from_secs(5))
    }

    #[tokio::test]
    async fn json_mode_parses_value() {
        let b = bridge(MockModel::with_responses(vec![" {\"tool\": \"calculator\"}\n".into()]));
        let out = b.call("p", ResponseFormat::Json).await.unwrap();
        assert_eq!(out, ModelOutput::Json(json!({"tool": "calculator"})));
    }

    #[tokio::test]
    async fn malformed_json_is_parse_error() {
        let b = bridge(MockModel::with_responses(vec!["Sure! Here you go: {".into()]));
        let err = b.call("p", ResponseFormat::Json).await.unwrap_err();
        assert!(matches!(err, QueryChainError::Parse { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn text_mode_passes_through() {
        let b = bridge(MockModel::with_responses(vec!["{not json".into()]));
        assert_eq!(b.call_text("p").await.unwrap(), "{not json");
    }

    #[tokio::test]
    async fn model_failure_is_not_parse_error() {
        let model = MockModel::new();
        model.fail_next("quota exhausted").await;
        let err = bridge(model).call("p", ResponseFormat::Json).await.unwrap_err();
        assert!(matches!(err, QueryChainError::Model { .. }));
        assert!(err.to_string().contains("quota exhausted"));
    }

    #[tokio::test]
    async fn wrong_shape_is_parse_error() {
        #[derive(Debug, serde::Deserialize)]
        #[allow(dead_code)]
        struct Shape {
            filter: serde_json::Map<String, serde_json::Value>,
        }
        let b = bridge(MockModel::with_responses(vec!["[1, 2, 3]".into()]));
        let err = b.call_json::<Shape>("p").await.unwrap_err();
        assert!(matches!(err, QueryChainError::Parse { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_model_times_out() {
        let model = MockModel::with_responses(vec!["late".into()]).with_delay(Duration::from_secs(60));
        let b = ModelBridge::new(Arc::new(model), Duration::from_secs(1));
        let err = b.call_text("p").await.unwrap_err();
        assert!(matches!(err, QueryChainError::Timeout { .. }));
    }
}
