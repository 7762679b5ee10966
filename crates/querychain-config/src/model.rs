// SPDX-FileCopyrightText: 2026 QueryChain Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the QueryChain agent.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Top-level QueryChain configuration.
///
/// All sections are optional and default to sensible values. Secrets
/// (`gemini.api_key`, `docstore.uri`) have no compiled default.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct QueryChainConfig {
    /// Planner behavior.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Gemini chat and embedding endpoint.
    #[serde(default)]
    pub gemini: GeminiConfig,

    /// Document store connection and vector search settings.
    #[serde(default)]
    pub docstore: DocstoreConfig,

    /// SQLite file backing session memory.
    #[serde(default)]
    pub storage: StorageConfig,

    /// History windows.
    #[serde(default)]
    pub memory: MemoryConfig,

    /// HTTP gateway.
    #[serde(default)]
    pub gateway: GatewayConfig,

    #[serde(default)]
    pub prometheus: PrometheusConfig,
}

/// Planner behavior configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Display name of the agent, used in log output.
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error). `RUST_LOG` wins if set.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Upper bound for every model, embedding and store call.
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,

    /// Serialize turns that share a session id.
    #[serde(default = "default_serialize_session_turns")]
    pub serialize_session_turns: bool,

    /// Result limit when classification omits one.
    #[serde(default = "default_limit")]
    pub default_limit: u32,

    /// Largest limit classification may request.
    #[serde(default = "default_max_limit")]
    pub max_limit: u32,

    /// Collection used when classification or a request omits one.
    #[serde(default = "default_collection")]
    pub default_collection: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            log_level: default_log_level(),
            call_timeout_secs: default_call_timeout_secs(),
            serialize_session_turns: default_serialize_session_turns(),
            default_limit: default_limit(),
            max_limit: default_max_limit(),
            default_collection: default_collection(),
        }
    }
}

fn default_agent_name() -> String {
    "querychain".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_call_timeout_secs() -> u64 {
    30
}

fn default_serialize_session_turns() -> bool {
    true
}

fn default_limit() -> u32 {
    5
}

fn default_max_limit() -> u32 {
    50
}

fn default_collection() -> String {
    "managers".to_string()
}

/// Gemini API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GeminiConfig {
    /// API key. `None` falls back to the `GEMINI_API_KEY` environment variable.
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_chat_model")]
    pub chat_model: String,

    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// Base URL of the Generative Language API, without trailing slash.
    #[serde(default = "default_gemini_base_url")]
    pub base_url: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            chat_model: default_chat_model(),
            embedding_model: default_embedding_model(),
            base_url: default_gemini_base_url(),
        }
    }
}

fn default_chat_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-004".to_string()
}

fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

/// Document store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DocstoreConfig {
    /// Connection string. `None` falls back to the `MONGODB_URI` environment variable.
    #[serde(default)]
    pub uri: Option<String>,

    #[serde(default = "default_database")]
    pub database: String,

    /// Name of the vector search index over `embedding_field`.
    #[serde(default = "default_vector_index")]
    pub vector_index: String,

    /// Document field holding the precomputed embedding.
    #[serde(default = "default_embedding_field")]
    pub embedding_field: String,

    /// Candidate pool size for approximate nearest-neighbour search.
    #[serde(default = "default_num_candidates")]
    pub num_candidates: u32,

    /// Fields rendered, in order, into the text that is embedded per document.
    #[serde(default = "default_descriptive_fields")]
    pub descriptive_fields: Vec<String>,

    /// Fields holding numbers, described as such to the model.
    #[serde(default = "default_numeric_fields")]
    pub numeric_fields: Vec<String>,

    /// Short codes the model should expand when building filters.
    #[serde(default = "default_code_table")]
    pub code_table: BTreeMap<String, String>,
}

impl Default for DocstoreConfig {
    fn default() -> Self {
        Self {
            uri: None,
            database: default_database(),
            vector_index: default_vector_index(),
            embedding_field: default_embedding_field(),
            num_candidates: default_num_candidates(),
            descriptive_fields: default_descriptive_fields(),
            numeric_fields: default_numeric_fields(),
            code_table: default_code_table(),
        }
    }
}

fn default_database() -> String {
    "Employees".to_string()
}

fn default_vector_index() -> String {
    "vectorIndex".to_string()
}

fn default_embedding_field() -> String {
    "docEmbedding".to_string()
}

fn default_num_candidates() -> u32 {
    50
}

fn default_descriptive_fields() -> Vec<String> {
    ["Name", "Branch", "Role", "Company", "CTC"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_numeric_fields() -> Vec<String> {
    vec!["CTC".to_string()]
}

fn default_code_table() -> BTreeMap<String, String> {
    BTreeMap::from([
        ("CO".to_string(), "Computer Science".to_string()),
        ("IT".to_string(), "Information Technology".to_string()),
    ])
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("querychain").join("memory.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("querychain-memory.db"))
        .display()
        .to_string()
}

fn default_wal_mode() -> bool {
    true
}

/// History window configuration.
///
/// The planner recalls a short window while history listings default to a
/// longer page; the two are deliberately separate settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MemoryConfig {
    /// Turns recalled into the classification and narration prompts.
    #[serde(default = "default_recall_window")]
    pub recall_window: usize,

    /// Turns returned by a history request without an explicit limit.
    #[serde(default = "default_history_page_size")]
    pub history_page_size: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            recall_window: default_recall_window(),
            history_page_size: default_history_page_size(),
        }
    }
}

fn default_recall_window() -> usize {
    10
}

fn default_history_page_size() -> usize {
    50
}

/// HTTP gateway configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    #[serde(default = "default_gateway_host")]
    pub host: String,

    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Bearer token required on `/api/*` when set.
    #[serde(default)]
    pub bearer_token: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_gateway_host(),
            port: default_gateway_port(),
            bearer_token: None,
        }
    }
}

fn default_gateway_host() -> String {
    "127.0.0.1".to_string()
}

fn default_gateway_port() -> u16 {
    3002
}

/// Prometheus exporter configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PrometheusConfig {
    /// Serve `/metrics` from the gateway.
    #[serde(default = "default_prometheus_enabled")]
    pub enabled: bool,
}

impl Default for PrometheusConfig {
    fn default() -> Self {
        Self {
            enabled: default_prometheus_enabled(),
        }
    }
}

fn default_prometheus_enabled() -> bool {
    true
}
