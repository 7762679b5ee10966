// SPDX-FileCopyrightText: 2026 QueryChain Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turning the model's classification JSON into a [`ToolChoice`].

use querychain_core::{ToolChoice, ToolSelection};
use serde::Deserialize;
use serde_json::Value;

/// Classification output as the model writes it. Only `tool` is required.
#[derive(Debug, Deserialize)]
pub struct RawChoice {
    pub tool: String,
    #[serde(default)]
    pub collection: Option<String>,
    #[serde(default)]
    pub limit: Option<Value>,
    #[serde(default)]
    pub expression: Option<String>,
}

/// Defaults and bounds applied to every classification.
#[derive(Debug, Clone)]
pub struct ChoicePolicy {
    pub default_collection: String,
    pub default_limit: u32,
    pub max_limit: u32,
}

impl ChoicePolicy {
    /// Resolve defaults and clamp the limit into `[1, max_limit]`.
    pub fn resolve(&self, raw: RawChoice) -> ToolChoice {
        let collection = raw
            .collection
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| self.default_collection.clone());
        let limit = raw
            .limit
            .as_ref()
            .and_then(numeric_limit)
            .unwrap_or(i64::from(self.default_limit))
            .clamp(1, i64::from(self.max_limit.max(1)));
        ToolChoice {
            tool: ToolSelection::from_name(&raw.tool),
            collection,
            limit: u32::try_from(limit).unwrap_or(self.default_limit),
            expression: raw.expression.filter(|e| !e.trim().is_empty()),
        }
    }
}

/// Models write limits as numbers, floats or numeric strings.
fn numeric_limit(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.round() as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
