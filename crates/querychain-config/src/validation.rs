// SPDX-FileCopyrightText: 2026 QueryChain Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Checks semantic constraints serde cannot express. Secrets are not
//! required here because `check-config` and `history` run without them;
//! the adapters that need them report their absence at startup.

use crate::diagnostic::ConfigError;
use crate::model::QueryChainConfig;

/// Validate a deserialized configuration, collecting every error.
pub fn validate_config(config: &QueryChainConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut invalid = |message: String| errors.push(ConfigError::Validation { message });

    if config.agent.call_timeout_secs == 0 {
        invalid("agent.call_timeout_secs must be at least 1".to_string());
    }

    if config.agent.max_limit == 0 {
        invalid("agent.max_limit must be at least 1".to_string());
    }

    if config.agent.default_limit == 0 || config.agent.default_limit > config.agent.max_limit {
        invalid(format!(
            "agent.default_limit must be between 1 and agent.max_limit ({}), got {}",
            config.agent.max_limit, config.agent.default_limit
        ));
    }

    if config.agent.default_collection.trim().is_empty() {
        invalid("agent.default_collection must not be empty".to_string());
    }

    if config.docstore.database.trim().is_empty() {
        invalid("docstore.database must not be empty".to_string());
    }

    if config.docstore.embedding_field.trim().is_empty() {
        invalid("docstore.embedding_field must not be empty".to_string());
    }

    if config.docstore.num_candidates < config.agent.max_limit {
        invalid(format!(
            "docstore.num_candidates ({}) must be at least agent.max_limit ({})",
            config.docstore.num_candidates, config.agent.max_limit
        ));
    }

    if config.docstore.descriptive_fields.is_empty() {
        invalid("docstore.descriptive_fields must list at least one field".to_string());
    }

    if config
        .docstore
        .descriptive_fields
        .iter()
        .any(|f| f == &config.docstore.embedding_field || f == "_id")
    {
        invalid("docstore.descriptive_fields must not include `_id` or the embedding field".to_string());
    }

    if config.storage.database_path.trim().is_empty() {
        invalid("storage.database_path must not be empty".to_string());
    }

    if config.memory.recall_window == 0 {
        invalid("memory.recall_window must be at least 1".to_string());
    }

    if config.memory.history_page_size == 0 {
        invalid("memory.history_page_size must be at least 1".to_string());
    }

    let host = config.gateway.host.trim();
    if host.is_empty() {
        invalid("gateway.host must not be empty".to_string());
    } else {
        let is_valid_ip = host.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':');
        if !is_valid_ip && !is_valid_hostname {
            invalid(format!(
                "gateway.host `{host}` is not a valid IP address or hostname"
            ));
        }
    }

    if let Some(token) = &config.gateway.bearer_token
        && token.trim().is_empty()
    {
        invalid("gateway.bearer_token must not be blank when set".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn has_message(errors: &[ConfigError], needle: &str) -> bool {
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains(needle)))
    }

    #[test]
    fn default_config_validates() {
        let config = QueryChainConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn empty_database_path_fails_validation() {
        let mut config = QueryChainConfig::default();
        config.storage.database_path = "".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "database_path"));
    }

    #[test]
    fn default_limit_above_max_fails() {
        let mut config = QueryChainConfig::default();
        config.agent.default_limit = 80;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "agent.default_limit"));
    }

    #[test]
    fn candidate_pool_smaller_than_max_limit_fails() {
        let mut config = QueryChainConfig::default();
        config.docstore.num_candidates = 10;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "num_candidates"));
    }

    #[test]
    fn embedding_field_cannot_be_descriptive() {
        let mut config = QueryChainConfig::default();
        config.docstore.descriptive_fields.push("docEmbedding".into());
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "descriptive_fields"));
    }

    #[test]
    fn collects_all_errors() {
        let mut config = QueryChainConfig::default();
        config.agent.call_timeout_secs = 0;
        config.memory.recall_window = 0;
        config.gateway.host = "bad host!".into();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
    }
}
