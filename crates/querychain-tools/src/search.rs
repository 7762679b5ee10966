// SPDX-FileCopyrightText: 2026 QueryChain Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use querychain_core::{Document, QueryChainError, ToolResult, VectorQuery};
use tracing::{debug, warn};

use crate::Toolbox;

impl Toolbox {
    /// Similarity search: embed `query` and return the `limit` nearest documents.
    ///
    /// Each hit carries a `score`; the embedding field is never returned.
    pub async fn vector_search(&self, collection: &str, query: &str, limit: u32) -> ToolResult {
        match self.try_vector_search(collection, query, limit).await {
            Ok(docs) => ToolResult::with_documents(docs),
            Err(e) => {
                warn!(collection, error = %e, "vector search failed");
                ToolResult::failure(&e)
            }
        }
    }

    async fn try_vector_search(
        &self,
        collection: &str,
        query: &str,
        limit: u32,
    ) -> Result<Vec<Document>, QueryChainError> {
        let vector = self.embed(query).await?;
        let request = VectorQuery {
            index: self.settings.vector_index.clone(),
            path: self.settings.embedding_field.clone(),
            vector,
            num_candidates: self.settings.num_candidates.max(limit),
            limit,
        };
        let mut docs = self
            .with_deadline(self.store.vector_search(collection, request))
            .await?;
        for doc in &mut docs {
            doc.remove(&self.settings.embedding_field);
        }
        debug!(collection, hits = docs.len(), "vector search complete");
        Ok(docs)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use querychain_core::ErrorKind;
    use querychain_test_utils::{InMemoryDocumentStore, MockEmbedder, MockModel};
    use serde_json::json;

    use crate::testing::toolbox;

    async fn seeded() -> (Arc<MockEmbedder>, Arc<InMemoryDocumentStore>) {
        let embedder = Arc::new(MockEmbedder::new());
        let store = Arc::new(InMemoryDocumentStore::new());
        for (name, role) in [
            ("Asha Rao", "Backend engineer"),
            ("Ben Ortiz", "Data scientist"),
            ("Chen Li", "Engineering manager"),
        ] {
            let text = format!("Name: {name}, Role: {role}");
            store.insert(
                "managers",
                json!({"Name": name, "Role": role, "docEmbedding": embedder.vector_for(&text)}),
            );
        }
        (embedder, store)
    }

    #[tokio::test]
    async fn returns_scored_hits_without_embeddings() {
        let (embedder, store) = seeded().await;
        let tools = toolbox(MockModel::new(), embedder, store);

        let result = tools
            .vector_search("managers", "Name: Ben Ortiz, Role: Data scientist", 2)
            .await;

        assert!(result.success, "{result:?}");
        assert_eq!(result.count, Some(2));
        let hits = result.data.unwrap();
        let first = &hits[0];
        assert_eq!(first["Name"], "Ben Ortiz");
        assert!(first["score"].as_f64().unwrap() > 0.99);
        assert!(first.get("docEmbedding").is_none());
    }

    #[tokio::test]
    async fn candidate_pool_never_below_limit() {
        let (embedder, store) = seeded().await;
        let mut settings = crate::testing::settings();
        settings.num_candidates = 1;
        let tools = crate::Toolbox::new(Arc::new(MockModel::new()), embedder, store.clone(), settings);

        let result = tools.vector_search("managers", "engineer", 3).await;

        assert!(result.success);
        assert_eq!(store.last_vector_query().map(|q| q.num_candidates), Some(3));
    }

    #[tokio::test]
    async fn embedding_failure_is_reported() {
        let (embedder, store) = seeded().await;
        embedder.fail_next("embedding quota exhausted").await;
        let tools = toolbox(MockModel::new(), embedder, store);

        let result = tools.vector_search("managers", "anything", 5).await;

        assert!(!result.success);
        assert_eq!(result.error_kind, Some(ErrorKind::Model));
        assert!(result.error.unwrap().contains("embedding quota exhausted"));
    }
}
