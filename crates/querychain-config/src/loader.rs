// SPDX-FileCopyrightText: 2026 QueryChain Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./querychain.toml` > `~/.config/querychain/querychain.toml`
//! > `/etc/querychain/querychain.toml` with environment variable overrides via the
//! `QUERYCHAIN_` prefix. The conventional `GEMINI_API_KEY` and `MONGODB_URI`
//! variables fill in secrets left unset by every other layer.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use tracing::debug;

use crate::model::QueryChainConfig;

pub(crate) const LOCAL_CONFIG: &str = "querychain.toml";
pub(crate) const SYSTEM_CONFIG: &str = "/etc/querychain/querychain.toml";

/// Sections that `QUERYCHAIN_<SECTION>_<KEY>` variables map into.
const SECTIONS: &[&str] = &[
    "agent",
    "gemini",
    "docstore",
    "storage",
    "memory",
    "gateway",
    "prometheus",
];

pub(crate) fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("querychain").join(LOCAL_CONFIG))
}

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/querychain/querychain.toml`
/// 3. `~/.config/querychain/querychain.toml`
/// 4. `./querychain.toml`
/// 5. `QUERYCHAIN_*` environment variables
/// 6. `GEMINI_API_KEY` / `MONGODB_URI` for secrets still unset
pub fn load_config() -> Result<QueryChainConfig, figment::Error> {
    build_figment().extract().map(apply_secret_fallbacks)
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<QueryChainConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(QueryChainConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<QueryChainConfig, figment::Error> {
    debug!(path = %path.display(), "loading configuration file");
    Figment::new()
        .merge(Serialized::defaults(QueryChainConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
        .map(apply_secret_fallbacks)
}

/// Build the Figment used internally for config loading.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(QueryChainConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(LOCAL_CONFIG))
        .merge(env_provider())
}

/// Fill unset secrets from their conventional environment variables.
pub fn apply_secret_fallbacks(mut config: QueryChainConfig) -> QueryChainConfig {
    if config.gemini.api_key.is_none() {
        config.gemini.api_key = std::env::var("GEMINI_API_KEY").ok().filter(|k| !k.is_empty());
        if config.gemini.api_key.is_some() {
            debug!("gemini.api_key taken from GEMINI_API_KEY");
        }
    }
    if config.docstore.uri.is_none() {
        config.docstore.uri = std::env::var("MONGODB_URI").ok().filter(|u| !u.is_empty());
        if config.docstore.uri.is_some() {
            debug!("docstore.uri taken from MONGODB_URI");
        }
    }
    config
}

/// Environment provider mapping `QUERYCHAIN_SECTION_KEY` to `section.key`.
///
/// Only the first underscore after a known section name becomes a dot, so
/// `QUERYCHAIN_AGENT_CALL_TIMEOUT_SECS` maps to `agent.call_timeout_secs`.
fn env_provider() -> Env {
    Env::prefixed("QUERYCHAIN_").map(|key| map_env_key(key.as_str()).into())
}

fn map_env_key(key: &str) -> String {
    for section in SECTIONS {
        if let Some(rest) = key.strip_prefix(section).and_then(|r| r.strip_prefix('_')) {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_keys_map_to_sections() {
        assert_eq!(map_env_key("agent_call_timeout_secs"), "agent.call_timeout_secs");
        assert_eq!(map_env_key("gemini_api_key"), "gemini.api_key");
        assert_eq!(map_env_key("docstore_num_candidates"), "docstore.num_candidates");
        assert_eq!(map_env_key("memory_recall_window"), "memory.recall_window");
        assert_eq!(map_env_key("unrelated"), "unrelated");
    }

    #[test]
    fn env_override_applies() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("QUERYCHAIN_GATEWAY_PORT", "8088");
            jail.set_env("QUERYCHAIN_AGENT_DEFAULT_COLLECTION", "staff");
            let config: QueryChainConfig = Figment::new()
                .merge(Serialized::defaults(QueryChainConfig::default()))
                .merge(env_provider())
                .extract()?;
            assert_eq!(config.gateway.port, 8088);
            assert_eq!(config.agent.default_collection, "staff");
            Ok(())
        });
    }

    #[test]
    fn secret_fallbacks_fill_unset_values_only() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("GEMINI_API_KEY", "from-env");
            jail.set_env("MONGODB_URI", "mongodb://env:27017");

            let config = apply_secret_fallbacks(QueryChainConfig::default());
            assert_eq!(config.gemini.api_key.as_deref(), Some("from-env"));
            assert_eq!(config.docstore.uri.as_deref(), Some("mongodb://env:27017"));

            let mut explicit = QueryChainConfig::default();
            explicit.gemini.api_key = Some("from-file".into());
            let config = apply_secret_fallbacks(explicit);
            assert_eq!(config.gemini.api_key.as_deref(), Some("from-file"));
            Ok(())
        });
    }
}
