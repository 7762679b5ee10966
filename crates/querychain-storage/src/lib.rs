// SPDX-FileCopyrightText: 2026 QueryChain Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite session memory for the QueryChain agent.
//!
//! Turns are appended through `tokio-rusqlite`'s single background thread,
//! which gives every append a strictly increasing sequence number even when
//! two arrive within the same millisecond.

pub mod adapter;
pub mod database;
pub mod migrations;
pub mod queries;

pub use adapter::SqliteSessionMemory;
pub use database::Database;
