// SPDX-FileCopyrightText: 2026 QueryChain Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Document store adapter trait.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::QueryChainError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{Document, FindOptions, UpdateCounts, VectorQuery};

/// A collection-oriented document store.
///
/// Filters, updates and pipelines are passed as JSON values that have
/// already been validated by the caller. Document identifiers are the JSON
/// form of the store's `_id` value and are passed back unchanged.
#[async_trait]
pub trait DocumentStore: PluginAdapter {
    /// Find documents matching `filter`.
    async fn find(
        &self,
        collection: &str,
        filter: &Value,
        options: FindOptions,
    ) -> Result<Vec<Document>, QueryChainError>;

    /// Apply `update` to every document matching `filter`.
    async fn update_many(
        &self,
        collection: &str,
        filter: &Value,
        update: &Value,
    ) -> Result<UpdateCounts, QueryChainError>;

    /// Set a single field on the document identified by `id`.
    async fn set_field(
        &self,
        collection: &str,
        id: &Value,
        field: &str,
        value: Value,
    ) -> Result<(), QueryChainError>;

    /// Approximate nearest-neighbour search.
    ///
    /// Returned documents carry a `score` field and never the embedding field.
    async fn vector_search(
        &self,
        collection: &str,
        query: VectorQuery,
    ) -> Result<Vec<Document>, QueryChainError>;

    /// Run an aggregation pipeline verbatim.
    async fn aggregate(
        &self,
        collection: &str,
        pipeline: &[Value],
    ) -> Result<Vec<Document>, QueryChainError>;
}
