// SPDX-FileCopyrightText: 2026 QueryChain Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory document store.
//!
//! Implements the subset of MongoDB semantics the tools rely on:
//! equality, comparison, `$in`/`$nin`, `$exists`, `$regex` with `$options`,
//! `$and`/`$or`/`$nor`, `$set` updates, cosine vector search and the
//! `$match $group $sort $skip $limit $project $count` pipeline stages.

use std::cmp::Ordering;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering as AtomicOrdering};
use std::sync::Mutex;

use async_trait::async_trait;
use querychain_core::{
    AdapterType, Document, DocumentStore, FindOptions, HealthStatus, PluginAdapter,
    QueryChainError, UpdateCounts, VectorQuery,
};
use serde_json::{json, Map, Number, Value};

#[derive(Default)]
pub struct InMemoryDocumentStore {
    collections: Mutex<HashMap<String, Vec<Document>>>,
    failures: Mutex<VecDeque<String>>,
    last_vector_query: Mutex<Option<VectorQuery>>,
    calls: AtomicUsize,
    next_id: AtomicU64,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a document, assigning an `{"$oid": ...}` `_id` when absent.
    ///
    /// Returns the document's `_id`. Not counted as a store call.
    pub fn insert(&self, collection: &str, doc: Value) -> Value {
        let mut doc = match doc {
            Value::Object(map) => map,
            other => {
                let mut map = Map::new();
                map.insert("value".into(), other);
                map
            }
        };
        let id = doc
            .entry("_id")
            .or_insert_with(|| {
                let n = self.next_id.fetch_add(1, AtomicOrdering::SeqCst) + 1;
                json!({"$oid": format!("{n:024x}")})
            })
            .clone();
        self.lock_collections()
            .entry(collection.to_string())
            .or_default()
            .push(doc);
        id
    }

    /// Snapshot of a collection, embeddings included.
    pub fn documents(&self, collection: &str) -> Vec<Document> {
        self.lock_collections()
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    /// Trait calls made so far. Seeding and inspection are not counted.
    pub fn call_count(&self) -> usize {
        self.calls.load(AtomicOrdering::SeqCst)
    }

    /// Make the next trait call fail with a store error.
    pub fn fail_next(&self, message: &str) {
        if let Ok(mut failures) = self.failures.lock() {
            failures.push_back(message.to_string());
        }
    }

    pub fn last_vector_query(&self) -> Option<VectorQuery> {
        self.last_vector_query.lock().ok().and_then(|q| q.clone())
    }

    fn lock_collections(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<Document>>> {
        self.collections
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn begin_call(&self) -> Result<(), QueryChainError> {
        self.calls.fetch_add(1, AtomicOrdering::SeqCst);
        let failure = self.failures.lock().ok().and_then(|mut f| f.pop_front());
        match failure {
            Some(message) => Err(QueryChainError::store(message)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl PluginAdapter for InMemoryDocumentStore {
    fn name(&self) -> &str {
        "memory-docstore"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::DocumentStore
    }

    async fn health_check(&self) -> Result<HealthStatus, QueryChainError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), QueryChainError> {
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn find(
        &self,
        collection: &str,
        filter: &Value,
        options: FindOptions,
    ) -> Result<Vec<Document>, QueryChainError> {
        self.begin_call()?;
        let docs = self.lock_collections();
        let limit = options.limit.map_or(usize::MAX, |l| l as usize);
        Ok(docs
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|d| matches_filter(d, filter))
                    .take(limit)
                    .map(|d| {
                        let mut d = d.clone();
                        for field in &options.exclude_fields {
                            d.remove(field);
                        }
                        d
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn update_many(
        &self,
        collection: &str,
        filter: &Value,
        update: &Value,
    ) -> Result<UpdateCounts, QueryChainError> {
        self.begin_call()?;
        let set = update
            .get("$set")
            .and_then(Value::as_object)
            .ok_or_else(|| QueryChainError::store("only $set updates are supported"))?;
        let mut counts = UpdateCounts::default();
        let mut collections = self.lock_collections();
        for doc in collections.get_mut(collection).into_iter().flatten() {
            if !matches_filter(doc, filter) {
                continue;
            }
            counts.matched += 1;
            let mut changed = false;
            for (field, value) in set {
                if doc.get(field) != Some(value) {
                    doc.insert(field.clone(), value.clone());
                    changed = true;
                }
            }
            if changed {
                counts.modified += 1;
            }
        }
        Ok(counts)
    }

    async fn set_field(
        &self,
        collection: &str,
        id: &Value,
        field: &str,
        value: Value,
    ) -> Result<(), QueryChainError> {
        self.begin_call()?;
        let mut collections = self.lock_collections();
        if let Some(doc) = collections
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|d| d.get("_id") == Some(id)))
        {
            doc.insert(field.to_string(), value);
        }
        Ok(())
    }

    async fn vector_search(
        &self,
        collection: &str,
        query: VectorQuery,
    ) -> Result<Vec<Document>, QueryChainError> {
        self.begin_call()?;
        if let Ok(mut last) = self.last_vector_query.lock() {
            *last = Some(query.clone());
        }
        let docs = self.lock_collections();
        let mut scored: Vec<(f64, Document)> = docs
            .get(collection)
            .into_iter()
            .flatten()
            .filter_map(|d| {
                let stored = d.get(&query.path)?.as_array()?;
                let vector: Vec<f64> = stored.iter().filter_map(Value::as_f64).collect();
                Some((cosine(&query.vector, &vector), d.clone()))
            })
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));
        Ok(scored
            .into_iter()
            .take(query.limit as usize)
            .map(|(score, mut d)| {
                d.remove(&query.path);
                d.insert("score".into(), json!(score));
                d
            })
            .collect())
    }

    async fn aggregate(
        &self,
        collection: &str,
        pipeline: &[Value],
    ) -> Result<Vec<Document>, QueryChainError> {
        self.begin_call()?;
        let mut docs = self.documents(collection);
        for stage in pipeline {
            let (name, body) = stage
                .as_object()
                .and_then(|s| s.iter().next())
                .ok_or_else(|| QueryChainError::store("empty pipeline stage"))?;
            docs = match name.as_str() {
                "$match" => docs.into_iter().filter(|d| matches_filter(d, body)).collect(),
                "$group" => group(docs, body)?,
                "$sort" => sort(docs, body),
                "$skip" => docs.into_iter().skip(body.as_u64().unwrap_or(0) as usize).collect(),
                "$limit" => docs.into_iter().take(body.as_u64().unwrap_or(0) as usize).collect(),
                "$project" => docs.into_iter().map(|d| project(d, body)).collect(),
                "$count" => {
                    let field = body.as_str().unwrap_or("count");
                    let mut out = Map::new();
                    out.insert(field.to_string(), json!(docs.len()));
                    vec![out]
                }
                other => {
                    return Err(QueryChainError::store(format!(
                        "stage {other} is not supported in memory"
                    )));
                }
            };
        }
        Ok(docs)
    }
}

fn cosine(a: &[f32], b: &[f64]) -> f64 {
    let dot: f64 = a.iter().zip(b).map(|(x, y)| f64::from(*x) * y).sum();
    let na = a.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();
    let nb = b.iter().map(|y| y.powi(2)).sum::<f64>().sqrt();
    if na == 0.0 || nb == 0.0 {
        0.0
    } else {
        dot / (na * nb)
    }
}

/// Field lookup with dotted paths.
fn lookup<'a>(doc: &'a Document, path: &str) -> Option<&'a Value> {
    let mut parts = path.split('.');
    let mut current = doc.get(parts.next()?)?;
    for part in parts {
        current = current.get(part)?;
    }
    Some(current)
}

/// Whether `doc` satisfies a MongoDB-style filter.
pub fn matches_filter(doc: &Document, filter: &Value) -> bool {
    let Some(filter) = filter.as_object() else {
        return false;
    };
    filter.iter().all(|(key, cond)| match key.as_str() {
        "$and" => clauses(cond).all(|c| matches_filter(doc, c)),
        "$or" => clauses(cond).any(|c| matches_filter(doc, c)),
        "$nor" => !clauses(cond).any(|c| matches_filter(doc, c)),
        field => matches_condition(lookup(doc, field), cond),
    })
}

fn clauses(value: &Value) -> impl Iterator<Item = &Value> {
    value.as_array().into_iter().flatten()
}

fn matches_condition(actual: Option<&Value>, cond: &Value) -> bool {
    let Some(ops) = cond
        .as_object()
        .filter(|o| !o.is_empty() && !o.contains_key("$oid") && o.keys().all(|k| k.starts_with('$')))
    else {
        return equals(actual, cond);
    };
    ops.iter().all(|(op, arg)| match op.as_str() {
        "$eq" => equals(actual, arg),
        "$ne" => !equals(actual, arg),
        "$gt" => compare(actual, arg).is_some_and(Ordering::is_gt),
        "$gte" => compare(actual, arg).is_some_and(Ordering::is_ge),
        "$lt" => compare(actual, arg).is_some_and(Ordering::is_lt),
        "$lte" => compare(actual, arg).is_some_and(Ordering::is_le),
        "$in" => clauses(arg).any(|candidate| equals(actual, candidate)),
        "$nin" => !clauses(arg).any(|candidate| equals(actual, candidate)),
        "$exists" => actual.is_some() == arg.as_bool().unwrap_or(true),
        "$regex" => regex_matches(actual, arg, ops.get("$options")),
        "$options" => true,
        _ => false,
    })
}

fn equals(actual: Option<&Value>, expected: &Value) -> bool {
    match actual {
        None => expected.is_null(),
        Some(Value::Array(items)) if !expected.is_array() => {
            items.iter().any(|item| same_value(item, expected))
        }
        Some(value) => same_value(value, expected),
    }
}

fn same_value(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) if a.is_number() && b.is_number() => x == y,
        _ => a == b,
    }
}

fn compare(actual: Option<&Value>, arg: &Value) -> Option<Ordering> {
    match (actual?, arg) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

fn regex_matches(actual: Option<&Value>, pattern: &Value, options: Option<&Value>) -> bool {
    let (Some(Value::String(text)), Some(pattern)) = (actual, pattern.as_str()) else {
        return false;
    };
    let insensitive = options
        .and_then(Value::as_str)
        .is_some_and(|o| o.contains('i'));
    regex::RegexBuilder::new(pattern)
        .case_insensitive(insensitive)
        .build()
        .is_ok_and(|re| re.is_match(text))
}

/// Resolve `"$field"` references against a document; other values are literals.
fn resolve(doc: &Document, expr: &Value) -> Value {
    match expr.as_str().and_then(|s| s.strip_prefix('$')) {
        Some(path) => lookup(doc, path).cloned().unwrap_or(Value::Null),
        None => expr.clone(),
    }
}

fn group(docs: Vec<Document>, spec: &Value) -> Result<Vec<Document>, QueryChainError> {
    let spec = spec
        .as_object()
        .ok_or_else(|| QueryChainError::store("$group requires an object"))?;
    let key_expr = spec.get("_id").cloned().unwrap_or(Value::Null);

    let mut order: Vec<Value> = Vec::new();
    let mut buckets: Vec<Vec<Document>> = Vec::new();
    for doc in docs {
        let key = resolve(&doc, &key_expr);
        match order.iter().position(|k| same_value(k, &key)) {
            Some(i) => buckets[i].push(doc),
            None => {
                order.push(key);
                buckets.push(vec![doc]);
            }
        }
    }

    let mut out = Vec::with_capacity(order.len());
    for (key, members) in order.into_iter().zip(buckets) {
        let mut row = Map::new();
        row.insert("_id".into(), key);
        for (name, acc) in spec.iter().filter(|(k, _)| k.as_str() != "_id") {
            let (op, arg) = acc
                .as_object()
                .and_then(|a| a.iter().next())
                .ok_or_else(|| QueryChainError::store(format!("accumulator {name} is malformed")))?;
            let values: Vec<f64> = members
                .iter()
                .filter_map(|d| resolve(d, arg).as_f64())
                .collect();
            let value = match op.as_str() {
                "$sum" => number(values.iter().sum()),
                "$avg" if values.is_empty() => Value::Null,
                "$avg" => Number::from_f64(values.iter().sum::<f64>() / values.len() as f64)
                    .map_or(Value::Null, Value::Number),
                "$min" => values.iter().copied().reduce(f64::min).map_or(Value::Null, number),
                "$max" => values.iter().copied().reduce(f64::max).map_or(Value::Null, number),
                "$count" => json!(members.len()),
                other => {
                    return Err(QueryChainError::store(format!(
                        "accumulator {other} is not supported in memory"
                    )));
                }
            };
            row.insert(name.clone(), value);
        }
        out.push(row);
    }
    Ok(out)
}

/// Integral results as integers, like the server does for integer input.
fn number(value: f64) -> Value {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        json!(value as i64)
    } else {
        Number::from_f64(value).map_or(Value::Null, Value::Number)
    }
}

fn sort(mut docs: Vec<Document>, spec: &Value) -> Vec<Document> {
    let keys: Vec<(String, bool)> = spec
        .as_object()
        .map(|s| {
            s.iter()
                .map(|(k, dir)| (k.clone(), dir.as_i64().unwrap_or(1) >= 0))
                .collect()
        })
        .unwrap_or_default();
    docs.sort_by(|a, b| {
        for (key, ascending) in &keys {
            let ord = order_values(lookup(a, key), lookup(b, key));
            let ord = if *ascending { ord } else { ord.reverse() };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });
    docs
}

fn order_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(v: Option<&Value>) -> u8 {
        match v {
            None | Some(Value::Null) => 0,
            Some(Value::Number(_)) => 1,
            Some(Value::String(_)) => 2,
            Some(_) => 3,
        }
    }
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

fn project(doc: Document, spec: &Value) -> Document {
    let Some(spec) = spec.as_object() else {
        return doc;
    };
    let excluding = spec
        .iter()
        .any(|(k, v)| k != "_id" && (v == &json!(0) || v == &json!(false)));
    if excluding {
        let mut doc = doc;
        for (k, v) in spec {
            if v == &json!(0) || v == &json!(false) {
                doc.remove(k);
            }
        }
        return doc;
    }

    let mut out = Map::new();
    if spec.get("_id").is_none_or(|v| v != &json!(0) && v != &json!(false))
        && let Some(id) = doc.get("_id")
    {
        out.insert("_id".into(), id.clone());
    }
    for (k, v) in spec.iter().filter(|(k, _)| k.as_str() != "_id") {
        let value = match v {
            Value::String(_) => resolve(&doc, v),
            _ => match lookup(&doc, k) {
                Some(value) => value.clone(),
                None => continue,
            },
        };
        out.insert(k.clone(), value);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn filter_operators() {
        let d = doc(json!({"Name": "John Doe", "CTC": 60, "Tags": ["a", "b"], "Address": {"City": "Pune"}}));
        assert!(matches_filter(&d, &json!({})));
        assert!(matches_filter(&d, &json!({"CTC": 60.0})));
        assert!(matches_filter(&d, &json!({"CTC": {"$gt": 50, "$lte": 60}})));
        assert!(!matches_filter(&d, &json!({"CTC": {"$lt": 60}})));
        assert!(matches_filter(&d, &json!({"Name": {"$regex": "john", "$options": "i"}})));
        assert!(!matches_filter(&d, &json!({"Name": {"$regex": "john"}})));
        assert!(matches_filter(&d, &json!({"Tags": "a"})));
        assert!(matches_filter(&d, &json!({"Address.City": "Pune"})));
        assert!(matches_filter(&d, &json!({"Role": {"$exists": false}})));
        assert!(matches_filter(&d, &json!({"$or": [{"CTC": 1}, {"Name": {"$in": ["John Doe"]}}]})));
        assert!(!matches_filter(&d, &json!({"$nor": [{"CTC": 60}]})));
    }

    #[tokio::test]
    async fn update_counts_only_real_changes() {
        let store = InMemoryDocumentStore::new();
        store.insert("c", json!({"Name": "A", "CTC": 1}));
        store.insert("c", json!({"Name": "B", "CTC": 2}));
        let counts = store
            .update_many("c", &json!({"CTC": {"$gte": 1}}), &json!({"$set": {"CTC": 2}}))
            .await
            .unwrap();
        assert_eq!(counts, UpdateCounts { matched: 2, modified: 1 });
        assert_eq!(store.call_count(), 1);
    }

    #[tokio::test]
    async fn count_and_group_stages() {
        let store = InMemoryDocumentStore::new();
        for (c, n) in [("X", 1), ("X", 3), ("Y", 5)] {
            store.insert("c", json!({"Company": c, "N": n}));
        }
        let rows = store
            .aggregate(
                "c",
                &[
                    json!({"$group": {"_id": "$Company", "total": {"$sum": "$N"}, "people": {"$sum": 1}}}),
                    json!({"$sort": {"total": -1}}),
                ],
            )
            .await
            .unwrap();
        assert_eq!(rows[0], doc(json!({"_id": "Y", "total": 5, "people": 1})));
        assert_eq!(rows[1], doc(json!({"_id": "X", "total": 4, "people": 2})));

        let counted = store
            .aggregate("c", &[json!({"$match": {"N": {"$gt": 1}}}), json!({"$count": "n"})])
            .await
            .unwrap();
        assert_eq!(counted, vec![doc(json!({"n": 2}))]);
    }

    #[tokio::test]
    async fn injected_failure_hits_next_call_only() {
        let store = InMemoryDocumentStore::new();
        store.fail_next("down");
        assert!(store.find("c", &json!({}), FindOptions::default()).await.is_err());
        assert!(store.find("c", &json!({}), FindOptions::default()).await.is_ok());
    }
}
