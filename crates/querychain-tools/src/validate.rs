// SPDX-FileCopyrightText: 2026 QueryChain Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Structural checks for model-produced filters, updates and pipelines.
//!
//! Nothing the model writes reaches the document store without passing one
//! of these. Failures are [`QueryChainError::Parse`]: the model produced
//! something we will not run.

use querychain_core::QueryChainError;
use serde_json::{Map, Value};

const LOGICAL_OPERATORS: &[&str] = &["$and", "$or", "$nor"];

const FIELD_OPERATORS: &[&str] = &[
    "$eq", "$ne", "$gt", "$gte", "$lt", "$lte", "$in", "$nin", "$regex", "$options", "$exists",
];

const PIPELINE_STAGES: &[&str] = &[
    "$match",
    "$group",
    "$sort",
    "$limit",
    "$skip",
    "$project",
    "$count",
    "$unwind",
    "$addFields",
];

fn reject(message: impl Into<String>) -> QueryChainError {
    QueryChainError::parse(message)
}

/// Validate a find/update filter.
///
/// An empty object is structurally valid; whether it may be used is the
/// caller's decision (the update guard refuses it).
pub fn validate_filter(filter: &Value) -> Result<(), QueryChainError> {
    let map = filter
        .as_object()
        .ok_or_else(|| reject("filter must be a JSON object"))?;
    validate_filter_map(map)
}

fn validate_filter_map(map: &Map<String, Value>) -> Result<(), QueryChainError> {
    for (key, value) in map {
        if key.starts_with('$') {
            if !LOGICAL_OPERATORS.contains(&key.as_str()) {
                return Err(reject(format!("operator `{key}` is not allowed at filter level")));
            }
            let clauses = value
                .as_array()
                .filter(|a| !a.is_empty())
                .ok_or_else(|| reject(format!("`{key}` requires a non-empty array of filters")))?;
            for clause in clauses {
                let clause = clause
                    .as_object()
                    .filter(|c| !c.is_empty())
                    .ok_or_else(|| reject(format!("`{key}` clauses must be non-empty objects")))?;
                validate_filter_map(clause)?;
            }
        } else {
            validate_condition(key, value)?;
        }
    }
    Ok(())
}

fn validate_condition(field: &str, condition: &Value) -> Result<(), QueryChainError> {
    let Some(ops) = condition.as_object() else {
        return Ok(());
    };
    let operator_keys = ops.keys().filter(|k| k.starts_with('$')).count();
    if operator_keys == 0 {
        return Ok(());
    }
    if operator_keys != ops.len() {
        return Err(reject(format!(
            "condition on `{field}` mixes operators and plain keys"
        )));
    }

    for (op, arg) in ops {
        if !FIELD_OPERATORS.contains(&op.as_str()) {
            return Err(reject(format!("operator `{op}` is not allowed on `{field}`")));
        }
        match op.as_str() {
            "$in" | "$nin" if !arg.is_array() => {
                return Err(reject(format!("`{op}` on `{field}` requires an array")));
            }
            "$regex" if !arg.is_string() => {
                return Err(reject(format!("`$regex` on `{field}` requires a string")));
            }
            "$options" if !arg.is_string() || !ops.contains_key("$regex") => {
                return Err(reject(format!(
                    "`$options` on `{field}` requires a string alongside `$regex`"
                )));
            }
            "$exists" if !arg.is_boolean() => {
                return Err(reject(format!("`$exists` on `{field}` requires a boolean")));
            }
            _ => {}
        }
    }
    Ok(())
}

/// Validate an update document: exactly `{"$set": {<field>: <value>, ...}}`.
///
/// `protected` fields (identifiers, the embedding field) may not be assigned.
pub fn validate_update(update: &Value, protected: &[&str]) -> Result<(), QueryChainError> {
    let map = update
        .as_object()
        .ok_or_else(|| reject("update must be a JSON object"))?;
    if map.len() != 1 || !map.contains_key("$set") {
        let keys: Vec<&str> = map.keys().map(String::as_str).collect();
        return Err(reject(format!(
            "update must contain only `$set`, got [{}]",
            keys.join(", ")
        )));
    }
    let set = map
        .get("$set")
        .and_then(Value::as_object)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| reject("`$set` must be a non-empty object"))?;
    for field in set.keys() {
        if field.is_empty() || field.starts_with('$') {
            return Err(reject(format!("`$set` field `{field}` is not a plain field name")));
        }
        if protected.contains(&field.as_str()) || field == "_id" {
            return Err(reject(format!("field `{field}` may not be updated")));
        }
    }
    Ok(())
}

/// Validate an aggregation pipeline and return its stages.
pub fn validate_pipeline(pipeline: &Value) -> Result<Vec<Value>, QueryChainError> {
    let stages = pipeline
        .as_array()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| reject("pipeline must be a non-empty JSON array"))?;

    for (i, stage) in stages.iter().enumerate() {
        let obj = stage
            .as_object()
            .filter(|o| o.len() == 1)
            .ok_or_else(|| reject(format!("pipeline stage {i} must be an object with one key")))?;
        let Some((name, body)) = obj.iter().next() else {
            continue;
        };
        if !PIPELINE_STAGES.contains(&name.as_str()) {
            return Err(reject(format!("pipeline stage `{name}` is not allowed")));
        }
        match name.as_str() {
            "$match" => validate_filter(body)?,
            "$limit" | "$skip" if !body.as_u64().is_some_and(|n| n > 0 || name == "$skip") => {
                return Err(reject(format!("`{name}` requires a positive integer")));
            }
            "$count" if !body.as_str().is_some_and(|s| !s.is_empty()) => {
                return Err(reject("`$count` requires a field name"));
            }
            _ => {}
        }
    }
    Ok(stages.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_typical_filters() {
        for filter in [
            json!({}),
            json!({"CTC": {"$gt": 50}}),
            json!({"Name": {"$regex": "John", "$options": "i"}}),
            json!({"Branch": "Computer Science", "CTC": {"$gte": 10, "$lt": 20}}),
            json!({"$or": [{"Company": "Acme"}, {"Company": {"$in": ["Globex", "Initech"]}}]}),
            json!({"Address": {"City": "Pune"}}),
        ] {
            assert!(validate_filter(&filter).is_ok(), "rejected {filter}");
        }
    }

    #[test]
    fn rejects_dangerous_or_malformed_filters() {
        for filter in [
            json!([{"CTC": 1}]),
            json!("Name"),
            json!({"$where": "this.CTC > 1"}),
            json!({"CTC": {"$expr": {}}}),
            json!({"$or": []}),
            json!({"$or": [{}]}),
            json!({"$and": [{"Name": "John"}, {}]}),
            json!({"$nor": ["Name"]}),
            json!({"$and": {"CTC": 1}}),
            json!({"Name": {"$regex": 5}}),
            json!({"Name": {"$options": "i"}}),
            json!({"CTC": {"$in": 5}}),
            json!({"CTC": {"$gt": 5, "plain": 1}}),
        ] {
            let err = validate_filter(&filter).unwrap_err();
            assert!(matches!(err, QueryChainError::Parse { .. }), "accepted {filter}");
        }
    }

    #[test]
    fn update_requires_set_only() {
        let protected = ["docEmbedding"];
        assert!(validate_update(&json!({"$set": {"CTC": 70}}), &protected).is_ok());

        for update in [
            json!({}),
            json!({"CTC": 70}),
            json!({"$set": {}}),
            json!({"$set": {"CTC": 70}, "$unset": {"Role": ""}}),
            json!({"$inc": {"CTC": 1}}),
            json!({"$set": {"_id": 1}}),
            json!({"$set": {"docEmbedding": [0.1]}}),
            json!({"$set": {"$where": 1}}),
        ] {
            assert!(validate_update(&update, &protected).is_err(), "accepted {update}");
        }
    }

    #[test]
    fn pipeline_allows_read_stages() {
        let pipeline = json!([
            {"$match": {"CTC": {"$gt": 10}}},
            {"$group": {"_id": "$Branch", "avgCTC": {"$avg": "$CTC"}}},
            {"$sort": {"avgCTC": -1}},
            {"$limit": 5}
        ]);
        assert_eq!(validate_pipeline(&pipeline).unwrap().len(), 4);
    }

    #[test]
    fn pipeline_rejects_writes_and_junk() {
        for pipeline in [
            json!([]),
            json!({"$group": {}}),
            json!([{"$out": "stolen"}]),
            json!([{"$merge": {"into": "x"}}]),
            json!([{"$match": {}, "$limit": 1}]),
            json!([{"$limit": 0}]),
            json!([{"$match": {"$where": "1"}}]),
        ] {
            assert!(validate_pipeline(&pipeline).is_err(), "accepted {pipeline}");
        }
    }
}
