// SPDX-FileCopyrightText: 2026 QueryChain Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One-shot terminal commands: `ask`, `history`, `clear`, `check-config`.

use querychain_config::model::QueryChainConfig;
use querychain_core::{QueryChainError, SessionMemory, Turn};

use crate::serve::init_tracing;
use crate::startup;

pub async fn run_ask(
    config: QueryChainConfig,
    input: &str,
    session: &str,
    user: &str,
    json: bool,
) -> Result<(), QueryChainError> {
    init_tracing(&config.agent.log_level);
    let planner = startup::assemble_planner(&config).await?;
    let outcome = planner.run_turn(input, session, user).await;
    planner.shutdown().await;
    let response = outcome?;

    if json {
        let rendered = serde_json::to_string_pretty(&response)
            .map_err(|e| QueryChainError::Internal(format!("failed to render response: {e}")))?;
        println!("{rendered}");
    } else {
        println!("{}", response.answer);
        eprintln!(
            "[{} | confidence {:.1}]",
            response.tool_used, response.confidence
        );
    }
    Ok(())
}

pub async fn run_history(
    config: QueryChainConfig,
    session: &str,
    limit: Option<usize>,
) -> Result<(), QueryChainError> {
    let memory = startup::open_memory(&config).await?;
    let limit = limit
        .filter(|l| *l > 0)
        .unwrap_or(config.memory.history_page_size);
    let turns = memory.recent_history(session, limit).await?;
    if turns.is_empty() {
        println!("No history for session {session}.");
    }
    for turn in &turns {
        println!("{}", format_turn(turn));
    }
    Ok(())
}

pub async fn run_clear(config: QueryChainConfig, session: &str) -> Result<(), QueryChainError> {
    let memory = startup::open_memory(&config).await?;
    let removed = memory.clear(session).await?;
    println!("Session {session} cleared ({removed} turn(s) removed).");
    Ok(())
}

pub fn print_config_summary(config: &QueryChainConfig) {
    println!("configuration OK");
    println!("  agent.name            {}", config.agent.name);
    println!("  gemini.chat_model     {}", config.gemini.chat_model);
    println!("  gemini.api_key        {}", presence(config.gemini.api_key.is_some()));
    println!("  docstore.database     {}", config.docstore.database);
    println!("  docstore.uri          {}", presence(config.docstore.uri.is_some()));
    println!("  storage.database_path {}", config.storage.database_path);
    println!(
        "  gateway               {}:{}",
        config.gateway.host, config.gateway.port
    );
}

fn presence(set: bool) -> &'static str {
    if set { "set" } else { "missing" }
}

fn format_turn(turn: &Turn) -> String {
    format!("[{}] {}: {}", turn.created_at, turn.role, turn.content)
}
