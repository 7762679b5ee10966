// SPDX-FileCopyrightText: 2026 QueryChain Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Guarded update with re-embedding.
//!
//! Ordering per call: model output, guard, validation, snapshot of the
//! matched documents, bulk `$set`, then re-embedding of every snapshot
//! document whose descriptive text changed. Unusable model output degrades
//! to an empty operation, so it always ends at the guard.

use std::collections::HashMap;

use querychain_core::{Document, FindOptions, QueryChainError, ToolResult, UpdateOperation};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::{prompts, validate, Toolbox};

/// Message carried by every guard rejection.
pub const GUARD_MESSAGE: &str = "Update filter is too broad. Please be more specific.";

/// Render the text that is embedded for a document.
///
/// `"Name: Ada, Branch: CS, ..."` in field order; absent fields render empty.
pub fn descriptive_text(doc: &Document, fields: &[String]) -> String {
    fields
        .iter()
        .map(|field| format!("{field}: {}", render_value(doc.get(field))))
        .collect::<Vec<_>>()
        .join(", ")
}

fn render_value(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => match n.as_f64() {
            Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
            _ => n.to_string(),
        },
        Some(other) => other.to_string(),
    }
}

impl Toolbox {
    /// The update tool as the planner sees it: failures become a failed result.
    pub async fn update_database(&self, collection: &str, instruction: &str) -> ToolResult {
        match self.guarded_update(collection, instruction).await {
            Ok(result) => result,
            Err(e) => ToolResult::failure(&e),
        }
    }

    /// Translate `instruction` into a `$set` update and apply it.
    ///
    /// Returns [`QueryChainError::GuardRejected`] without touching the store
    /// when the filter is empty. Re-embedding failures are counted in
    /// `reembedFailures` and never undo the update.
    pub async fn guarded_update(
        &self,
        collection: &str,
        instruction: &str,
    ) -> Result<ToolResult, QueryChainError> {
        let prompt = prompts::update_prompt(&self.settings.hints, instruction);
        let op = match self.bridge.call_json::<UpdateOperation>(&prompt).await {
            Ok(op) => op,
            Err(QueryChainError::Parse { message }) => {
                warn!(collection, %message, "unusable update output, falling back to empty operation");
                UpdateOperation::empty()
            }
            Err(e) => return Err(e),
        };

        if !op.has_filter() {
            warn!(collection, "update rejected by guard");
            return Err(QueryChainError::GuardRejected {
                message: GUARD_MESSAGE.to_string(),
            });
        }
        validate::validate_filter(&op.filter)?;
        validate::validate_update(&op.update, &[self.settings.embedding_field.as_str()])?;

        let snapshot = self
            .with_deadline(self.store.find(
                collection,
                &op.filter,
                FindOptions {
                    limit: None,
                    exclude_fields: self.exclude_embedding(),
                },
            ))
            .await?;
        let counts = self
            .with_deadline(self.store.update_many(collection, &op.filter, &op.update))
            .await?;
        info!(
            collection,
            matched = counts.matched,
            modified = counts.modified,
            "update applied"
        );

        let (reembedded, failures) = if counts.modified > 0 {
            self.reembed_changed(collection, &snapshot).await
        } else {
            (0, 0)
        };

        Ok(ToolResult {
            success: true,
            query: Some(op.filter),
            modified_count: Some(counts.modified),
            matched: Some(counts.matched),
            reembedded: Some(reembedded),
            reembed_failures: Some(failures),
            ..ToolResult::default()
        })
    }

    /// Re-embed every snapshot document whose descriptive text changed.
    ///
    /// Returns `(reembedded, failures)`.
    async fn reembed_changed(&self, collection: &str, snapshot: &[Document]) -> (u64, u64) {
        let fields = &self.settings.descriptive_fields;
        let before: HashMap<String, String> = snapshot
            .iter()
            .filter_map(|doc| {
                let id = doc.get("_id")?;
                Some((id.to_string(), descriptive_text(doc, fields)))
            })
            .collect();
        if before.is_empty() {
            return (0, 0);
        }

        let ids: Vec<Value> = snapshot.iter().filter_map(|d| d.get("_id").cloned()).collect();
        let refreshed = match self
            .with_deadline(self.store.find(
                collection,
                &json!({"_id": {"$in": ids}}),
                FindOptions {
                    limit: None,
                    exclude_fields: self.exclude_embedding(),
                },
            ))
            .await
        {
            Ok(docs) => docs,
            Err(e) => {
                warn!(collection, error = %e, "could not reload updated documents");
                return (0, before.len() as u64);
            }
        };

        let mut reembedded = 0;
        let mut failures = 0;
        for doc in refreshed {
            let Some(id) = doc.get("_id") else { continue };
            let text = descriptive_text(&doc, fields);
            if before.get(&id.to_string()) == Some(&text) {
                continue;
            }
            match self.reembed_one(collection, id, &text).await {
                Ok(()) => reembedded += 1,
                Err(e) => {
                    warn!(collection, %id, error = %e, "re-embedding failed");
                    failures += 1;
                }
            }
        }
        debug!(collection, reembedded, failures, "re-embedding complete");
        (reembedded, failures)
    }

    async fn reembed_one(&self, collection: &str, id: &Value, text: &str) -> Result<(), QueryChainError> {
        let vector = self.embed(text).await?;
        self.with_deadline(self.store.set_field(
            collection,
            id,
            &self.settings.embedding_field,
            json!(vector),
        ))
        .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use querychain_core::ErrorKind;
    use querychain_test_utils::{InMemoryDocumentStore, MockEmbedder, MockModel};
    use serde_json::json;

    use super::*;
    use crate::testing::toolbox;

    const JOHN_TO_70: &str = r#"{"filter": {"Name": {"$regex": "John Doe", "$options": "i"}}, "update": {"$set": {"CTC": 70}}}"#;

    fn fields() -> Vec<String> {
        ["Name", "Branch", "Role", "Company", "CTC"]
            .into_iter()
            .map(String::from)
            .collect()
    }

    fn seeded(embedder: &MockEmbedder) -> Arc<InMemoryDocumentStore> {
        let store = Arc::new(InMemoryDocumentStore::new());
        for (name, ctc) in [("John Doe", 60), ("Jane Roe", 90)] {
            let mut doc = json!({
                "Name": name,
                "Branch": "Computer Science",
                "Role": "Manager",
                "Company": "Acme",
                "CTC": ctc,
            });
            let text = descriptive_text(doc.as_object().unwrap(), &fields());
            doc["docEmbedding"] = json!(embedder.vector_for(&text));
            store.insert("managers", doc);
        }
        store
    }

    #[test]
    fn descriptive_text_renders_in_field_order() {
        let doc = json!({"CTC": 70.0, "Name": "John Doe", "Branch": "CS", "Role": "Lead"});
        assert_eq!(
            descriptive_text(doc.as_object().unwrap(), &fields()),
            "Name: John Doe, Branch: CS, Role: Lead, Company: , CTC: 70"
        );
        let frac = json!({"CTC": 12.5});
        assert_eq!(
            descriptive_text(frac.as_object().unwrap(), &["CTC".to_string()]),
            "CTC: 12.5"
        );
    }

    #[tokio::test]
    async fn updates_and_reembeds_changed_document() {
        let embedder = Arc::new(MockEmbedder::new());
        let store = seeded(&embedder);
        let model = MockModel::with_responses(vec![JOHN_TO_70.into()]);
        let tools = toolbox(model, embedder.clone(), store.clone());

        let result = tools
            .guarded_update("managers", "Change the CTC for John Doe to 70")
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.modified_count, Some(1));
        assert_eq!(result.matched, Some(1));
        assert_eq!(result.reembedded, Some(1));
        assert_eq!(result.reembed_failures, Some(0));

        let john = store
            .documents("managers")
            .into_iter()
            .find(|d| d["Name"] == "John Doe")
            .unwrap();
        assert_eq!(john["CTC"], 70);
        let expected = embedder.vector_for(
            "Name: John Doe, Branch: Computer Science, Role: Manager, Company: Acme, CTC: 70",
        );
        assert_eq!(john["docEmbedding"], json!(expected));
    }

    #[tokio::test]
    async fn no_match_reports_zero() {
        let embedder = Arc::new(MockEmbedder::new());
        let store = seeded(&embedder);
        let model = MockModel::with_responses(vec![
            r#"{"filter": {"Name": "Nobody"}, "update": {"$set": {"CTC": 70}}}"#.into(),
        ]);
        let tools = toolbox(model, embedder.clone(), store);

        let result = tools.guarded_update("managers", "Change Nobody to 70").await.unwrap();

        assert_eq!(result.modified_count, Some(0));
        assert_eq!(result.matched, Some(0));
        assert_eq!(result.reembedded, Some(0));
        assert_eq!(embedder.call_count(), 0);
    }

    #[tokio::test]
    async fn filter_field_change_still_reembeds() {
        let embedder = Arc::new(MockEmbedder::new());
        let store = seeded(&embedder);
        let model = MockModel::with_responses(vec![
            r#"{"filter": {"CTC": 60}, "update": {"$set": {"CTC": 65}}}"#.into(),
        ]);
        let tools = toolbox(model, embedder, store);

        let result = tools.guarded_update("managers", "raise 60 to 65").await.unwrap();

        assert_eq!(result.modified_count, Some(1));
        assert_eq!(result.reembedded, Some(1));
    }

    #[tokio::test]
    async fn empty_filter_is_rejected_before_store() {
        let embedder = Arc::new(MockEmbedder::new());
        let store = seeded(&embedder);
        let model = MockModel::with_responses(vec![
            r#"{"filter": {}, "update": {"$set": {"CTC": 0}}}"#.into(),
        ]);
        let tools = toolbox(model, embedder, store.clone());

        let err = tools.guarded_update("managers", "set everyone to 0").await.unwrap_err();

        assert!(matches!(err, QueryChainError::GuardRejected { .. }));
        assert_eq!(err.to_string(), GUARD_MESSAGE);
        assert_eq!(store.call_count(), 0);
    }

    #[tokio::test]
    async fn logical_operator_over_empty_clause_is_rejected_before_store() {
        for filter in [json!({"$or": [{}]}), json!({"$and": [{}]})] {
            let embedder = Arc::new(MockEmbedder::new());
            let store = seeded(&embedder);
            let output = json!({"filter": filter, "update": {"$set": {"CTC": 0}}});
            let model = MockModel::with_responses(vec![output.to_string()]);
            let tools = toolbox(model, embedder, store.clone());

            let err = tools
                .guarded_update("managers", "set everyone's CTC to 0")
                .await
                .unwrap_err();

            assert!(matches!(err, QueryChainError::GuardRejected { .. }), "{filter}");
            assert_eq!(store.call_count(), 0);
            assert!(store.documents("managers").iter().all(|d| d["CTC"] != 0));
        }
    }

    #[tokio::test]
    async fn unparseable_output_ends_at_guard() {
        let embedder = Arc::new(MockEmbedder::new());
        let store = seeded(&embedder);
        let model = MockModel::with_responses(vec!["I will update John for you!".into()]);
        let tools = toolbox(model, embedder, store.clone());

        let result = tools.update_database("managers", "update John").await;

        assert!(!result.success);
        assert_eq!(result.error_kind, Some(ErrorKind::GuardRejected));
        assert_eq!(result.error.as_deref(), Some(GUARD_MESSAGE));
        assert_eq!(store.call_count(), 0);
    }

    #[tokio::test]
    async fn non_set_update_is_parse_failure() {
        let embedder = Arc::new(MockEmbedder::new());
        let store = seeded(&embedder);
        let model = MockModel::with_responses(vec![
            r#"{"filter": {"Name": "John Doe"}, "update": {"$unset": {"CTC": ""}}}"#.into(),
        ]);
        let tools = toolbox(model, embedder, store.clone());

        let err = tools.guarded_update("managers", "drop John's CTC").await.unwrap_err();

        assert!(matches!(err, QueryChainError::Parse { .. }));
        assert_eq!(store.call_count(), 0);
    }

    #[tokio::test]
    async fn model_failure_propagates() {
        let embedder = Arc::new(MockEmbedder::new());
        let store = seeded(&embedder);
        let model = MockModel::new();
        model.fail_next("service unavailable").await;
        let tools = toolbox(model, embedder, store);

        let err = tools.guarded_update("managers", "update John").await.unwrap_err();

        assert!(matches!(err, QueryChainError::Model { .. }));
    }

    #[tokio::test]
    async fn reembed_failure_keeps_update() {
        let embedder = Arc::new(MockEmbedder::new());
        let store = seeded(&embedder);
        embedder.fail_next("embedding service down").await;
        let model = MockModel::with_responses(vec![JOHN_TO_70.into()]);
        let tools = toolbox(model, embedder, store.clone());

        let result = tools.guarded_update("managers", "John to 70").await.unwrap();

        assert!(result.success);
        assert_eq!(result.modified_count, Some(1));
        assert_eq!(result.reembedded, Some(0));
        assert_eq!(result.reembed_failures, Some(1));
        let john = store
            .documents("managers")
            .into_iter()
            .find(|d| d["Name"] == "John Doe")
            .unwrap();
        assert_eq!(john["CTC"], 70);
    }
}
