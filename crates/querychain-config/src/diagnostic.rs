// SPDX-FileCopyrightText: 2026 QueryChain Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Config error reporting.
//!
//! Figment failures become [`ConfigError`] values that miette renders with
//! a pointer into the offending `querychain.toml` and, for misspelled keys,
//! the closest valid key by Jaro-Winkler similarity.

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use figment::error::Kind;
use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Below this Jaro-Winkler score a key is not offered as a correction.
const SUGGESTION_THRESHOLD: f64 = 0.75;

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("unknown configuration key `{key}`")]
    #[diagnostic(
        code(querychain::config::unknown_key),
        help("{}", unknown_key_help(suggestion.as_deref(), valid_keys))
    )]
    UnknownKey {
        key: String,
        /// Closest valid key, if any is similar enough.
        suggestion: Option<String>,
        /// Comma-separated keys accepted in the same table.
        valid_keys: String,
        #[label("not a recognized key")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("`{key}` has the wrong type: {detail}")]
    #[diagnostic(code(querychain::config::invalid_type), help("use a {expected}"))]
    InvalidType {
        /// Dotted path, e.g. `gateway.port`.
        key: String,
        detail: String,
        expected: String,
        #[label("expected {expected}")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("missing required key `{key}`")]
    #[diagnostic(
        code(querychain::config::missing_key),
        help("set `{key}` in querychain.toml or through a QUERYCHAIN_ environment variable")
    )]
    MissingKey { key: String },

    /// Raised after deserialization by [`crate::validation`].
    #[error("invalid configuration: {message}")]
    #[diagnostic(code(querychain::config::validation))]
    Validation { message: String },

    #[error("configuration error: {0}")]
    #[diagnostic(code(querychain::config::other))]
    Other(String),
}

fn unknown_key_help(suggestion: Option<&str>, valid_keys: &str) -> String {
    match suggestion {
        Some(s) => format!("did you mean `{s}`? Valid keys: {valid_keys}"),
        None => format!("valid keys: {valid_keys}"),
    }
}

/// TOML files that fed the figment, by path, for span lookup.
struct Sources<'a> {
    files: &'a [(String, String)],
}

impl<'a> Sources<'a> {
    /// The file an error came from, if figment recorded it and we read it.
    fn origin(&self, error: &figment::Error) -> Option<(&'a str, &'a str)> {
        let figment::Source::File(path) = error.metadata.as_ref()?.source.as_ref()? else {
            return None;
        };
        let path = path.display().to_string();
        self.files
            .iter()
            .find(|(p, _)| *p == path)
            .map(|(p, content)| (p.as_str(), content.as_str()))
    }

    /// Span of `key` inside the table named by `table`, ready for miette.
    fn locate(
        &self,
        error: &figment::Error,
        table: &[String],
        key: &str,
    ) -> (Option<SourceSpan>, Option<NamedSource<String>>) {
        self.origin(error)
            .and_then(|(path, content)| {
                let offset = find_key_offset(content, table, key)?;
                Some((
                    Some(SourceSpan::new(offset.into(), key.len())),
                    Some(NamedSource::new(path, content.to_string())),
                ))
            })
            .unwrap_or((None, None))
    }
}

/// Flatten a figment error (which may hold several) into diagnostics.
pub fn figment_to_config_errors(
    err: figment::Error,
    toml_sources: &[(String, String)],
) -> Vec<ConfigError> {
    let sources = Sources {
        files: toml_sources,
    };

    err.into_iter()
        .map(|error| {
            let path: Vec<String> = error.path.iter().map(ToString::to_string).collect();
            match &error.kind {
                Kind::UnknownField(field, expected) => {
                    let (span, src) = sources.locate(&error, &path, field);
                    ConfigError::UnknownKey {
                        key: field.clone(),
                        suggestion: suggest_key(field, expected),
                        valid_keys: expected.join(", "),
                        span,
                        src,
                    }
                }
                Kind::MissingField(field) => ConfigError::MissingKey {
                    key: field.to_string(),
                },
                Kind::InvalidType(actual, expected) => {
                    let (span, src) = match path.split_last() {
                        Some((key, table)) => sources.locate(&error, table, key),
                        None => (None, None),
                    };
                    ConfigError::InvalidType {
                        key: path.join("."),
                        detail: format!("found {actual}"),
                        expected: expected.to_string(),
                        span,
                        src,
                    }
                }
                _ => ConfigError::Other(error.to_string()),
            }
        })
        .collect()
}

/// Byte offset of `key` as the first token of a line inside `[table]`.
///
/// Top-level keys (empty `table`) are searched from the start of the file.
pub fn find_key_offset(content: &str, table: &[String], key: &str) -> Option<usize> {
    let start = match table.first() {
        Some(name) => {
            let header = format!("[{name}]");
            content.find(&header)? + header.len()
        }
        None => 0,
    };

    let mut offset = start;
    for line in content[start..].split_inclusive('\n') {
        let indent = line.len() - line.trim_start().len();
        let rest = &line[indent..];
        if rest.starts_with('[') && offset > start {
            return None;
        }
        if let Some(after) = rest.strip_prefix(key) {
            if after.trim_start().starts_with('=') {
                return Some(offset + indent);
            }
        }
        offset += line.len();
    }
    None
}

/// The valid key most similar to `unknown`, if above the threshold.
pub fn suggest_key(unknown: &str, valid_keys: &[&str]) -> Option<String> {
    valid_keys
        .iter()
        .map(|key| (strsim::jaro_winkler(unknown, key), *key))
        .filter(|(score, _)| *score > SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, key)| key.to_string())
}

/// Print every error to stderr through miette's graphical handler.
pub fn render_errors(errors: &[ConfigError]) {
    let handler = miette::GraphicalReportHandler::new();
    for error in errors {
        let mut rendered = String::new();
        match handler.render_report(&mut rendered, error as &dyn Diagnostic) {
            Ok(()) => eprint!("{rendered}"),
            Err(_) => eprintln!("Error: {error}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suggests_close_section_key() {
        let valid = &["chat_model", "embedding_model", "api_key", "base_url"];
        assert_eq!(suggest_key("chat_modle", valid), Some("chat_model".to_string()));
    }

    #[test]
    fn suggests_num_candidates() {
        let valid = &["uri", "database", "vector_index", "num_candidates"];
        assert_eq!(
            suggest_key("num_candidate", valid),
            Some("num_candidates".to_string())
        );
    }

    #[test]
    fn no_suggestion_for_distant_typo() {
        let valid = &["recall_window", "history_page_size"];
        assert_eq!(suggest_key("zzzzzz", valid), None);
    }

    #[test]
    fn key_offset_inside_table() {
        let content = "[gemini]\nchat_modle = \"x\"\n";
        let table = vec!["gemini".to_string()];
        let o = find_key_offset(content, &table, "chat_modle").unwrap();
        assert_eq!(&content[o..o + 10], "chat_modle");
    }

    #[test]
    fn key_offset_stops_at_next_table() {
        let content = "[agent]\nname = \"a\"\n[gateway]\nport = 1\n";
        let table = vec!["agent".to_string()];
        assert_eq!(find_key_offset(content, &table, "port"), None);
    }

    #[test]
    fn key_offset_ignores_prefix_matches() {
        let content = "[docstore]\nuri_extra = 1\nuri = \"mongodb://x\"\n";
        let table = vec!["docstore".to_string()];
        let o = find_key_offset(content, &table, "uri").unwrap();
        assert!(content[o..].starts_with("uri ="));
    }

    #[test]
    fn unknown_key_help_lists_suggestion() {
        let help = unknown_key_help(Some("port"), "host, port");
        assert!(help.starts_with("did you mean `port`?"));
        assert_eq!(unknown_key_help(None, "host"), "valid keys: host");
    }
}
