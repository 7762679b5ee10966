// SPDX-FileCopyrightText: 2026 QueryChain Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedding adapter trait for vector embedding generation.

use async_trait::async_trait;

use crate::error::QueryChainError;
use crate::traits::adapter::PluginAdapter;

/// Converts text into a dense vector for similarity search.
#[async_trait]
pub trait EmbeddingAdapter: PluginAdapter {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, QueryChainError>;
}
