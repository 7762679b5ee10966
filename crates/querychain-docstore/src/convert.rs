// SPDX-FileCopyrightText: 2026 QueryChain Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversions between JSON values and BSON.
//!
//! JSON objects map structurally onto BSON documents, so operator keys such as
//! `$regex` and `$gt` reach the server untouched. The single exception is the
//! `{"$oid": "<hex>"}` form produced when `_id` values are read back, which is
//! turned into an `ObjectId` so identifiers survive a round trip.

use mongodb::bson::oid::ObjectId;
use mongodb::bson::{Bson, Document as BsonDocument};
use querychain_core::{Document, QueryChainError};
use serde_json::Value;

pub fn json_to_bson(value: &Value) -> Bson {
    match value {
        Value::Null => Bson::Null,
        Value::Bool(b) => Bson::Boolean(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                if let Ok(small) = i32::try_from(i) {
                    Bson::Int32(small)
                } else {
                    Bson::Int64(i)
                }
            } else {
                Bson::Double(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        Value::String(s) => Bson::String(s.clone()),
        Value::Array(items) => Bson::Array(items.iter().map(json_to_bson).collect()),
        Value::Object(map) => {
            if map.len() == 1
                && let Some(Value::String(hex)) = map.get("$oid")
                && let Ok(oid) = ObjectId::parse_str(hex)
            {
                return Bson::ObjectId(oid);
            }
            Bson::Document(
                map.iter()
                    .map(|(k, v)| (k.clone(), json_to_bson(v)))
                    .collect(),
            )
        }
    }
}

/// Convert a JSON object into a BSON document, rejecting non-objects.
pub fn json_to_document(value: &Value) -> Result<BsonDocument, QueryChainError> {
    match json_to_bson(value) {
        Bson::Document(doc) => Ok(doc),
        other => Err(QueryChainError::store(format!(
            "expected a JSON object, got {:?}",
            other.element_type()
        ))),
    }
}

pub fn document_to_json(doc: BsonDocument) -> Document {
    match Bson::Document(doc).into_relaxed_extjson() {
        Value::Object(map) => map,
        _ => Document::new(),
    }
}
