// SPDX-FileCopyrightText: 2026 QueryChain Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared by adapters, tools and the planner.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumString};

use crate::error::{ErrorKind, QueryChainError};

/// A stored document as a JSON object.
pub type Document = serde_json::Map<String, Value>;

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter behind a trait object.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Model,
    Embedding,
    DocumentStore,
    SessionMemory,
}

/// Who authored a conversation turn.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One immutable entry in a session transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Turn {
    /// Store-assigned ordering key, strictly increasing across appends.
    pub seq: i64,
    pub session_id: String,
    pub user_id: String,
    pub role: Role,
    pub content: String,
    /// ISO 8601 timestamp assigned at append time.
    pub created_at: String,
}

/// Response format requested from the language model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum ResponseFormat {
    Text,
    Json,
}

/// Output of a bridge call, shaped by the requested [`ResponseFormat`].
#[derive(Debug, Clone, PartialEq)]
pub enum ModelOutput {
    Text(String),
    Json(Value),
}

impl ModelOutput {
    /// Take the free text, rendering JSON output compactly if present.
    pub fn into_text(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Json(value) => value.to_string(),
        }
    }

    /// Take the JSON value, failing with a parse error on text output.
    pub fn into_json(self) -> Result<Value, QueryChainError> {
        match self {
            Self::Json(value) => Ok(value),
            Self::Text(_) => Err(QueryChainError::parse("expected JSON output, got text")),
        }
    }
}

/// The closed set of capabilities the planner may dispatch to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    VectorSearch,
    DatabaseQuery,
    UpdateDatabase,
    Calculator,
    Aggregation,
}

impl ToolKind {
    pub const ALL: [ToolKind; 5] = [
        ToolKind::VectorSearch,
        ToolKind::DatabaseQuery,
        ToolKind::UpdateDatabase,
        ToolKind::Calculator,
        ToolKind::Aggregation,
    ];

    /// One-line description used in the classification prompt.
    pub fn description(self) -> &'static str {
        match self {
            Self::VectorSearch => {
                "semantic similarity search over documents, for fuzzy or descriptive requests"
            }
            Self::DatabaseQuery => {
                "structured filter query, for exact names, codes or numeric conditions"
            }
            Self::UpdateDatabase => "modify existing records, for change/set/update requests",
            Self::Calculator => "evaluate an arithmetic expression, for math questions",
            Self::Aggregation => {
                "grouping, counting, averages and other statistics across documents"
            }
        }
    }
}

/// A tool name as produced by classification: known, or unrecognized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolSelection {
    Known(ToolKind),
    Unrecognized(String),
}

impl ToolSelection {
    pub fn from_name(name: &str) -> Self {
        match name.trim().parse::<ToolKind>() {
            Ok(kind) => Self::Known(kind),
            Err(_) => Self::Unrecognized(name.to_string()),
        }
    }

    pub fn name(&self) -> String {
        match self {
            Self::Known(kind) => kind.to_string(),
            Self::Unrecognized(name) => name.clone(),
        }
    }
}

/// The planner's decision for one user turn.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolChoice {
    pub tool: ToolSelection,
    pub collection: String,
    pub limit: u32,
    /// Arithmetic expression, only meaningful for the calculator.
    pub expression: Option<String>,
}

/// Uniform envelope returned by every tool.
///
/// Tools never fail past their own boundary: failures are reported with
/// `success = false` and a human-readable `error`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipeline: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reembedded: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reembed_failures: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,
}

impl ToolResult {
    /// A successful result carrying `data` and its element count.
    pub fn with_documents(docs: Vec<Document>) -> Self {
        let count = docs.len();
        Self {
            success: true,
            data: Some(Value::Array(docs.into_iter().map(Value::Object).collect())),
            count: Some(count),
            ..Self::default()
        }
    }

    /// A failed result derived from an error.
    pub fn failure(err: &QueryChainError) -> Self {
        Self {
            success: false,
            error: Some(err.to_string()),
            error_kind: Some(err.kind()),
            ..Self::default()
        }
    }

    /// A failed result with a fixed message.
    pub fn failure_message(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(message.into()),
            error_kind: Some(kind),
            ..Self::default()
        }
    }
}

/// A model-produced mutation: which documents, and which fields to set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateOperation {
    #[serde(default = "empty_object")]
    pub filter: Value,
    #[serde(default = "empty_object")]
    pub update: Value,
}

fn empty_object() -> Value {
    Value::Object(Document::new())
}

impl UpdateOperation {
    /// The degraded operation used when model output is unusable.
    pub fn empty() -> Self {
        Self {
            filter: empty_object(),
            update: empty_object(),
        }
    }

    /// True when the filter restricts which documents match.
    ///
    /// Logical operators count only through their branches: `{"$and": [{}]}`
    /// and `{"$or": [{}, {...}]}` both match every document.
    pub fn has_filter(&self) -> bool {
        self.filter.as_object().is_some_and(restricts)
    }
}

fn restricts(filter: &Document) -> bool {
    filter.iter().any(|(key, value)| {
        let branches = || {
            value
                .as_array()
                .into_iter()
                .flatten()
                .map(|b| b.as_object().is_some_and(restricts))
        };
        match key.as_str() {
            "$and" | "$nor" => branches().any(|r| r),
            "$or" => value.as_array().is_some_and(|a| !a.is_empty()) && branches().all(|r| r),
            _ => true,
        }
    })
}

/// Match and modification counts reported by a bulk update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateCounts {
    pub matched: u64,
    pub modified: u64,
}

/// Options for a filtered find.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FindOptions {
    pub limit: Option<u32>,
    /// Fields removed from every returned document.
    pub exclude_fields: Vec<String>,
}

/// An approximate nearest-neighbour request against a vector index.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorQuery {
    pub index: String,
    /// Document field holding the embedding.
    pub path: String,
    pub vector: Vec<f32>,
    pub num_candidates: u32,
    pub limit: u32,
}

/// Final answer for one user turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentResponse {
    pub answer: String,
    pub tool_used: String,
    pub tool_result: ToolResult,
    pub confidence: f64,
}

/// Outcome of a direct guarded update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSummary {
    pub message: String,
    pub modified_count: u64,
    pub matched_count: u64,
    pub tool_result: ToolResult,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tool_kind_parses_wire_names() {
        for kind in ToolKind::ALL {
            let name = kind.to_string();
            assert_eq!(ToolSelection::from_name(&name), ToolSelection::Known(kind));
        }
        assert_eq!(ToolKind::UpdateDatabase.to_string(), "update_database");
    }

    #[test]
    fn unrecognized_tool_keeps_its_name() {
        let sel = ToolSelection::from_name("web_browse");
        assert_eq!(sel, ToolSelection::Unrecognized("web_browse".into()));
        assert_eq!(sel.name(), "web_browse");
    }

    #[test]
    fn tool_result_omits_absent_fields() {
        let result = ToolResult {
            success: true,
            result: Some(4.0),
            expression: Some("2+2".into()),
            ..ToolResult::default()
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json, json!({"success": true, "result": 4.0, "expression": "2+2"}));
    }

    #[test]
    fn failure_carries_kind_and_message() {
        let err = QueryChainError::parse("not json");
        let result = ToolResult::failure(&err);
        assert!(!result.success);
        assert_eq!(result.error_kind, Some(ErrorKind::Parse));
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["errorKind"], "parse");
    }

    #[test]
    fn with_documents_counts() {
        let mut doc = Document::new();
        doc.insert("Name".into(), json!("John Doe"));
        let result = ToolResult::with_documents(vec![doc.clone(), doc]);
        assert_eq!(result.count, Some(2));
        assert_eq!(result.data.unwrap().as_array().unwrap().len(), 2);
    }

    #[test]
    fn update_operation_filter_detection() {
        assert!(!UpdateOperation::empty().has_filter());
        let op: UpdateOperation = serde_json::from_value(json!({"update": {"$set": {"CTC": 70}}})).unwrap();
        assert!(!op.has_filter());
        let op = UpdateOperation {
            filter: json!({"Name": "John"}),
            update: json!({}),
        };
        assert!(op.has_filter());
        let op = UpdateOperation {
            filter: json!("Name"),
            update: json!({}),
        };
        assert!(!op.has_filter());
    }

    #[test]
    fn logical_operators_over_empty_branches_do_not_count_as_filters() {
        for filter in [
            json!({"$or": [{}]}),
            json!({"$and": [{}]}),
            json!({"$nor": [{}]}),
            json!({"$and": []}),
            json!({"$or": [{}, {"Name": "John"}]}),
            json!({"$and": [{"$or": [{}]}]}),
        ] {
            let op = UpdateOperation {
                filter: filter.clone(),
                update: json!({}),
            };
            assert!(!op.has_filter(), "{filter} treated as a filter");
        }
        for filter in [
            json!({"$and": [{}, {"Name": "John"}]}),
            json!({"$or": [{"Name": "John"}, {"CTC": {"$gt": 50}}]}),
            json!({"$or": [{}], "Name": "John"}),
        ] {
            let op = UpdateOperation {
                filter: filter.clone(),
                update: json!({}),
            };
            assert!(op.has_filter(), "{filter} not treated as a filter");
        }
    }

    #[test]
    fn model_output_conversions() {
        assert_eq!(ModelOutput::Text("hi".into()).into_text(), "hi");
        assert_eq!(
            ModelOutput::Json(json!({"a": 1})).into_json().unwrap(),
            json!({"a": 1})
        );
        assert!(ModelOutput::Text("hi".into()).into_json().is_err());
    }

    #[test]
    fn role_round_trips_lowercase() {
        assert_eq!(Role::Assistant.to_string(), "assistant");
        assert_eq!("user".parse::<Role>().unwrap(), Role::User);
    }
}
