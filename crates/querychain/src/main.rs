// SPDX-FileCopyrightText: 2026 QueryChain Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! QueryChain - a conversational agent over a MongoDB collection.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod commands;
mod serve;
mod startup;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use querychain_config::QueryChainConfig;

/// QueryChain - ask questions of, and make guarded edits to, a document collection.
#[derive(Parser, Debug)]
#[command(name = "querychain", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the HTTP gateway and the agent.
    Serve,
    /// Run a single turn from the terminal and print the answer.
    Ask {
        /// The question or instruction.
        input: String,
        /// Session to continue.
        #[arg(long, default_value = "cli")]
        session: String,
        #[arg(long, default_value = "anonymous")]
        user: String,
        /// Print the full response as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Print the transcript of a session.
    History {
        session: String,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Delete every turn of a session.
    Clear { session: String },
    /// Validate configuration and exit.
    CheckConfig,
}

fn load_config(path: Option<&PathBuf>) -> QueryChainConfig {
    let loaded = match path {
        Some(path) => querychain_config::load_and_validate_path(path),
        None => querychain_config::load_and_validate(),
    };
    match loaded {
        Ok(config) => config,
        Err(errors) => {
            querychain_config::render_errors(&errors);
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref());

    let result = match cli.command {
        Some(Commands::Serve) => serve::run_serve(config).await,
        Some(Commands::Ask {
            input,
            session,
            user,
            json,
        }) => commands::run_ask(config, &input, &session, &user, json).await,
        Some(Commands::History { session, limit }) => {
            commands::run_history(config, &session, limit).await
        }
        Some(Commands::Clear { session }) => commands::run_clear(config, &session).await,
        Some(Commands::CheckConfig) => {
            commands::print_config_summary(&config);
            Ok(())
        }
        None => {
            println!("querychain: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
