// SPDX-FileCopyrightText: 2026 QueryChain Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! MongoDB implementation of the [`DocumentStore`] trait.
//!
//! All collections live in one configured database. Similarity search uses
//! the Atlas `$vectorSearch` stage against the configured index.

pub mod convert;

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{doc, Bson, Document as BsonDocument};
use mongodb::{Client, Database};
use querychain_config::model::DocstoreConfig;
use querychain_core::{
    AdapterType, Document, DocumentStore, FindOptions, HealthStatus, PluginAdapter,
    QueryChainError, UpdateCounts, VectorQuery,
};
use serde_json::Value;
use tracing::{debug, info};

use crate::convert::{document_to_json, json_to_bson, json_to_document};

fn map_mongo_err(context: &str, e: mongodb::error::Error) -> QueryChainError {
    QueryChainError::Store {
        message: format!("{context}: {e}"),
        source: Some(Box::new(e)),
    }
}

/// MongoDB-backed document store.
pub struct MongoDocumentStore {
    client: Client,
    db: Database,
}

impl MongoDocumentStore {
    /// Connect using `docstore.uri`, falling back to `MONGODB_URI`.
    ///
    /// The driver connects lazily; call [`PluginAdapter::health_check`] to
    /// verify the server is reachable.
    pub async fn connect(config: &DocstoreConfig) -> Result<Self, QueryChainError> {
        let uri = resolve_uri(&config.uri)?;
        let client = Client::with_uri_str(&uri)
            .await
            .map_err(|e| map_mongo_err("failed to parse connection string", e))?;
        let db = client.database(&config.database);
        info!(database = %config.database, "MongoDB document store configured");
        Ok(Self { client, db })
    }

    fn collection(&self, name: &str) -> mongodb::Collection<BsonDocument> {
        self.db.collection::<BsonDocument>(name)
    }
}

#[async_trait]
impl PluginAdapter for MongoDocumentStore {
    fn name(&self) -> &str {
        "mongodb"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::DocumentStore
    }

    async fn health_check(&self) -> Result<HealthStatus, QueryChainError> {
        self.db
            .run_command(doc! {"ping": 1})
            .await
            .map_err(|e| map_mongo_err("ping failed", e))?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), QueryChainError> {
        self.client.clone().shutdown().await;
        debug!("MongoDB client shut down");
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MongoDocumentStore {
    async fn find(
        &self,
        collection: &str,
        filter: &Value,
        options: FindOptions,
    ) -> Result<Vec<Document>, QueryChainError> {
        let filter = json_to_document(filter)?;
        let coll = self.collection(collection);
        let mut action = coll.find(filter);
        if !options.exclude_fields.is_empty() {
            let projection: BsonDocument = options
                .exclude_fields
                .iter()
                .map(|f| (f.clone(), Bson::Int32(0)))
                .collect();
            action = action.projection(projection);
        }
        if let Some(limit) = options.limit {
            action = action.limit(i64::from(limit));
        }
        let cursor = action.await.map_err(|e| map_mongo_err("find failed", e))?;
        let docs: Vec<BsonDocument> = cursor
            .try_collect()
            .await
            .map_err(|e| map_mongo_err("find cursor failed", e))?;
        Ok(docs.into_iter().map(document_to_json).collect())
    }

    async fn update_many(
        &self,
        collection: &str,
        filter: &Value,
        update: &Value,
    ) -> Result<UpdateCounts, QueryChainError> {
        let filter = json_to_document(filter)?;
        let update = json_to_document(update)?;
        let result = self
            .collection(collection)
            .update_many(filter, update)
            .await
            .map_err(|e| map_mongo_err("update failed", e))?;
        Ok(UpdateCounts {
            matched: result.matched_count,
            modified: result.modified_count,
        })
    }

    async fn set_field(
        &self,
        collection: &str,
        id: &Value,
        field: &str,
        value: Value,
    ) -> Result<(), QueryChainError> {
        let mut set = BsonDocument::new();
        set.insert(field, json_to_bson(&value));
        self.collection(collection)
            .update_one(doc! {"_id": json_to_bson(id)}, doc! {"$set": set})
            .await
            .map_err(|e| map_mongo_err("field update failed", e))?;
        Ok(())
    }

    async fn vector_search(
        &self,
        collection: &str,
        query: VectorQuery,
    ) -> Result<Vec<Document>, QueryChainError> {
        let vector: Vec<Bson> = query
            .vector
            .iter()
            .map(|v| Bson::Double(f64::from(*v)))
            .collect();
        let mut project = BsonDocument::new();
        project.insert(query.path.as_str(), 0);
        project.insert("score", doc! {"$meta": "vectorSearchScore"});

        let pipeline = vec![
            doc! {
                "$vectorSearch": {
                    "index": query.index.as_str(),
                    "path": query.path.as_str(),
                    "queryVector": vector,
                    "numCandidates": i64::from(query.num_candidates),
                    "limit": i64::from(query.limit),
                }
            },
            doc! {"$project": project},
        ];
        self.run_pipeline(collection, pipeline).await
    }

    async fn aggregate(
        &self,
        collection: &str,
        pipeline: &[Value],
    ) -> Result<Vec<Document>, QueryChainError> {
        let stages = pipeline
            .iter()
            .map(json_to_document)
            .collect::<Result<Vec<_>, _>>()?;
        self.run_pipeline(collection, stages).await
    }
}

impl MongoDocumentStore {
    async fn run_pipeline(
        &self,
        collection: &str,
        pipeline: Vec<BsonDocument>,
    ) -> Result<Vec<Document>, QueryChainError> {
        let cursor = self
            .collection(collection)
            .aggregate(pipeline)
            .await
            .map_err(|e| map_mongo_err("aggregate failed", e))?;
        let docs: Vec<BsonDocument> = cursor
            .try_collect()
            .await
            .map_err(|e| map_mongo_err("aggregate cursor failed", e))?;
        Ok(docs.into_iter().map(document_to_json).collect())
    }
}

fn resolve_uri(config_uri: &Option<String>) -> Result<String, QueryChainError> {
    if let Some(uri) = config_uri
        && !uri.is_empty()
    {
        return Ok(uri.clone());
    }

    std::env::var("MONGODB_URI")
        .ok()
        .filter(|u| !u.is_empty())
        .ok_or_else(|| {
            QueryChainError::Config(
                "document store URI not found. Set docstore.uri in config or the MONGODB_URI environment variable.".into(),
            )
        })
}
