// SPDX-FileCopyrightText: 2026 QueryChain Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock language model for deterministic testing.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use querychain_core::{
    AdapterType, HealthStatus, ModelAdapter, PluginAdapter, QueryChainError, ResponseFormat,
};
use tokio::sync::Mutex;

/// A mock model that returns pre-configured replies.
///
/// Replies are popped from a FIFO queue. When the queue is empty, the
/// default text "mock response" is returned. Every prompt is recorded.
pub struct MockModel {
    replies: Mutex<VecDeque<Result<String, String>>>,
    prompts: Mutex<Vec<String>>,
    delay: Option<Duration>,
}

impl MockModel {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            prompts: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    pub fn with_responses(responses: Vec<String>) -> Self {
        Self {
            replies: Mutex::new(responses.into_iter().map(Ok).collect()),
            ..Self::new()
        }
    }

    /// Sleep before every reply.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Append a reply to the end of the queue.
    pub async fn add_response(&self, text: impl Into<String>) {
        self.replies.lock().await.push_back(Ok(text.into()));
    }

    /// Append a model error to the end of the queue.
    pub async fn add_failure(&self, message: &str) {
        self.replies.lock().await.push_back(Err(message.to_string()));
    }

    /// Make the very next call fail with a model error.
    pub async fn fail_next(&self, message: &str) {
        self.replies.lock().await.push_front(Err(message.to_string()));
    }

    /// Every prompt received so far, in order.
    pub async fn prompts(&self) -> Vec<String> {
        self.prompts.lock().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.prompts.lock().await.len()
    }
}

impl Default for MockModel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockModel {
    fn name(&self) -> &str {
        "mock-model"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Model
    }

    async fn health_check(&self) -> Result<HealthStatus, QueryChainError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), QueryChainError> {
        Ok(())
    }
}

#[async_trait]
impl ModelAdapter for MockModel {
    async fn generate(
        &self,
        prompt: &str,
        _format: ResponseFormat,
    ) -> Result<String, QueryChainError> {
        self.prompts.lock().await.push(prompt.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match self.replies.lock().await.pop_front() {
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => Err(QueryChainError::model(message)),
            None => Ok("mock response".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replies_in_order_then_default() {
        let model = MockModel::with_responses(vec!["one".into(), "two".into()]);
        assert_eq!(model.generate("a", ResponseFormat::Text).await.unwrap(), "one");
        assert_eq!(model.generate("b", ResponseFormat::Json).await.unwrap(), "two");
        assert_eq!(
            model.generate("c", ResponseFormat::Text).await.unwrap(),
            "mock response"
        );
        assert_eq!(model.prompts().await, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn fail_next_jumps_the_queue() {
        let model = MockModel::with_responses(vec!["queued".into()]);
        model.fail_next("boom").await;
        let err = model.generate("p", ResponseFormat::Text).await.unwrap_err();
        assert!(matches!(err, QueryChainError::Model { .. }));
        assert_eq!(model.generate("p", ResponseFormat::Text).await.unwrap(), "queued");
    }
}
