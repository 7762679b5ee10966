// SPDX-FileCopyrightText: 2026 QueryChain Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Language model adapter trait.

use async_trait::async_trait;

use crate::error::QueryChainError;
use crate::traits::adapter::PluginAdapter;
use crate::types::ResponseFormat;

/// A request/response language model endpoint.
///
/// Implementations return the raw text of the first candidate. Parsing JSON
/// output is the caller's concern so that malformed output can be told apart
/// from an unreachable or refusing model.
#[async_trait]
pub trait ModelAdapter: PluginAdapter {
    /// Generate a completion for `prompt`, hinting the desired output format.
    ///
    /// Returns [`QueryChainError::Model`] when the endpoint yields no
    /// candidate, preserving the service's own error message.
    async fn generate(
        &self,
        prompt: &str,
        format: ResponseFormat,
    ) -> Result<String, QueryChainError>;
}
