// SPDX-FileCopyrightText: 2026 QueryChain Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use querychain_core::{FindOptions, QueryChainError, ToolResult};
use serde_json::Value;
use tracing::{debug, warn};

use crate::{prompts, validate, Toolbox};

impl Toolbox {
    /// Structured query: the model writes a filter, which is validated and run.
    ///
    /// The filter actually used is echoed back in `query`.
    pub async fn database_query(&self, collection: &str, query: &str, limit: u32) -> ToolResult {
        match self.try_database_query(collection, query, limit).await {
            Ok(result) => result,
            Err(e) => {
                warn!(collection, error = %e, "database query failed");
                ToolResult::failure(&e)
            }
        }
    }

    async fn try_database_query(
        &self,
        collection: &str,
        query: &str,
        limit: u32,
    ) -> Result<ToolResult, QueryChainError> {
        let prompt = prompts::query_prompt(&self.settings.hints, query);
        let filter: Value = self.bridge.call_json(&prompt).await?;
        validate::validate_filter(&filter)?;
        debug!(collection, %filter, "running model filter");

        let options = FindOptions {
            limit: Some(limit),
            exclude_fields: self.exclude_embedding(),
        };
        let docs = self
            .with_deadline(self.store.find(collection, &filter, options))
            .await?;
        Ok(ToolResult {
            query: Some(filter),
            ..ToolResult::with_documents(docs)
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use querychain_core::ErrorKind;
    use querychain_test_utils::{InMemoryDocumentStore, MockEmbedder, MockModel};
    use serde_json::json;

    use crate::testing::toolbox;

    fn store() -> Arc<InMemoryDocumentStore> {
        let store = Arc::new(InMemoryDocumentStore::new());
        for (name, ctc) in [("John Doe", 60), ("Jane Roe", 90), ("Johnny Bravo", 120)] {
            store.insert(
                "managers",
                json!({"Name": name, "CTC": ctc, "docEmbedding": [0.1, 0.2]}),
            );
        }
        store
    }

    #[tokio::test]
    async fn runs_validated_filter_and_echoes_it() {
        let model = MockModel::with_responses(vec![r#"{"CTC": {"$gt": 50}}"#.into()]);
        let tools = toolbox(model, Arc::new(MockEmbedder::new()), store());

        let result = tools.database_query("managers", "CTC greater than 50", 2).await;

        assert!(result.success, "{result:?}");
        assert_eq!(result.count, Some(2));
        assert_eq!(result.query, Some(json!({"CTC": {"$gt": 50}})));
        let data = result.data.unwrap();
        assert!(data[0].get("docEmbedding").is_none());
    }

    #[tokio::test]
    async fn case_insensitive_regex_matches() {
        let model = MockModel::with_responses(vec![
            r#"{"Name": {"$regex": "john", "$options": "i"}}"#.into(),
        ]);
        let tools = toolbox(model, Arc::new(MockEmbedder::new()), store());

        let result = tools.database_query("managers", "people named john", 10).await;

        assert_eq!(result.count, Some(2));
    }

    #[tokio::test]
    async fn disallowed_operator_never_reaches_store() {
        let model = MockModel::with_responses(vec![r#"{"$where": "this.CTC > 1"}"#.into()]);
        let store = store();
        let tools = toolbox(model, Arc::new(MockEmbedder::new()), store.clone());

        let result = tools.database_query("managers", "everything", 5).await;

        assert!(!result.success);
        assert_eq!(result.error_kind, Some(ErrorKind::Parse));
        assert_eq!(store.call_count(), 0);
    }

    #[tokio::test]
    async fn malformed_model_output_is_parse_failure() {
        let model = MockModel::with_responses(vec!["CTC > 50".into()]);
        let tools = toolbox(model, Arc::new(MockEmbedder::new()), store());

        let result = tools.database_query("managers", "CTC greater than 50", 5).await;

        assert!(!result.success);
        assert_eq!(result.error_kind, Some(ErrorKind::Parse));
    }

    #[tokio::test]
    async fn store_failure_is_reported() {
        let model = MockModel::with_responses(vec![r#"{"CTC": 60}"#.into()]);
        let store = store();
        store.fail_next("connection reset");
        let tools = toolbox(model, Arc::new(MockEmbedder::new()), store);

        let result = tools.database_query("managers", "CTC 60", 5).await;

        assert!(!result.success);
        assert_eq!(result.error_kind, Some(ErrorKind::Store));
    }
}
