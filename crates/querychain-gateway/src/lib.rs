// SPDX-FileCopyrightText: 2026 QueryChain Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP gateway for the QueryChain agent.
//!
//! Exposes turns, direct updates, session history and health as JSON
//! endpoints over axum. The server binds before the runtime is ready;
//! agent endpoints answer 503 until startup completes.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod server;

pub use error::ApiError;
pub use server::{GatewayState, ServerConfig, build_router, start_server};
