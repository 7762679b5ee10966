// SPDX-FileCopyrightText: 2026 QueryChain Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Component assembly shared by `serve` and `ask`.

use std::sync::Arc;

use querychain_agent::{Planner, PlannerSettings};
use querychain_config::model::QueryChainConfig;
use querychain_core::{PluginAdapter, QueryChainError, SessionMemory};
use querychain_docstore::MongoDocumentStore;
use querychain_gemini::{GeminiChat, GeminiEmbedder};
use querychain_storage::SqliteSessionMemory;
use querychain_tools::{ToolSettings, Toolbox};
use tracing::info;

/// Open and migrate the session memory database.
pub async fn open_memory(config: &QueryChainConfig) -> Result<Arc<SqliteSessionMemory>, QueryChainError> {
    let memory = SqliteSessionMemory::new(config.storage.clone());
    memory.initialize().await?;
    Ok(Arc::new(memory))
}

/// Connect every backend and build the planner.
///
/// The document store is pinged before anything else so a bad URI fails
/// startup instead of the first turn.
pub async fn assemble_planner(config: &QueryChainConfig) -> Result<Planner, QueryChainError> {
    let store = Arc::new(MongoDocumentStore::connect(&config.docstore).await?);
    store.health_check().await?;
    info!(database = %config.docstore.database, "document store reachable");

    let memory = open_memory(config).await?;

    let chat = Arc::new(GeminiChat::new(&config.gemini)?);
    let embedder = Arc::new(GeminiEmbedder::new(&config.gemini)?);

    let tools = Toolbox::new(
        chat.clone(),
        embedder.clone(),
        store.clone(),
        ToolSettings::from_config(config),
    );

    let adapters: Vec<Arc<dyn PluginAdapter>> = vec![
        store as Arc<dyn PluginAdapter>,
        memory.clone() as Arc<dyn PluginAdapter>,
        chat as Arc<dyn PluginAdapter>,
        embedder as Arc<dyn PluginAdapter>,
    ];

    Ok(Planner::new(memory, tools, PlannerSettings::from_config(config)).with_adapters(adapters))
}
