// SPDX-FileCopyrightText: 2026 QueryChain Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deterministic embedding adapter.
//!
//! Texts are tokenized into lowercase alphanumeric words, each hashed into
//! one of a fixed number of buckets, and the counts normalized to unit
//! length. Equal texts embed equally; texts sharing words score closer.

use std::collections::VecDeque;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use querychain_core::{
    AdapterType, EmbeddingAdapter, HealthStatus, PluginAdapter, QueryChainError,
};
use tokio::sync::Mutex;

const DIMENSIONS: usize = 32;

pub struct MockEmbedder {
    failures: Mutex<VecDeque<String>>,
    calls: AtomicUsize,
}

impl MockEmbedder {
    pub fn new() -> Self {
        Self {
            failures: Mutex::new(VecDeque::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// The vector [`EmbeddingAdapter::embed`] returns for `text`, without
    /// counting as a call.
    pub fn vector_for(&self, text: &str) -> Vec<f32> {
        let mut buckets = vec![0f32; DIMENSIONS];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let mut hasher = DefaultHasher::new();
            word.to_lowercase().hash(&mut hasher);
            buckets[(hasher.finish() % DIMENSIONS as u64) as usize] += 1.0;
        }
        let norm = buckets.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm == 0.0 {
            buckets[0] = 1.0;
            return buckets;
        }
        buckets.iter().map(|v| v / norm).collect()
    }

    /// Make the next embed call fail with a model error.
    pub async fn fail_next(&self, message: &str) {
        self.failures.lock().await.push_back(message.to_string());
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockEmbedder {
    fn name(&self) -> &str {
        "mock-embedder"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Embedding
    }

    async fn health_check(&self) -> Result<HealthStatus, QueryChainError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), QueryChainError> {
        Ok(())
    }
}

#[async_trait]
impl EmbeddingAdapter for MockEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, QueryChainError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = self.failures.lock().await.pop_front() {
            return Err(QueryChainError::model(message));
        }
        Ok(self.vector_for(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn embedding_is_deterministic_and_unit_length() {
        let embedder = MockEmbedder::new();
        let a = embedder.embed("Name: John Doe").await.unwrap();
        assert_eq!(a, embedder.vector_for("name john doe"));
        let norm: f32 = a.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
        assert_eq!(embedder.call_count(), 1);
    }

    #[tokio::test]
    async fn empty_text_still_embeds() {
        let embedder = MockEmbedder::new();
        assert_eq!(embedder.vector_for("").len(), DIMENSIONS);
    }
}
