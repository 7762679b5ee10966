// SPDX-FileCopyrightText: 2026 QueryChain Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Orchestration planner and runtime for the QueryChain agent.
//!
//! The [`Planner`] answers a user turn in five stages:
//! - recall the session's recent turns
//! - classify the request into one tool choice
//! - execute that tool
//! - narrate the tool result
//! - commit the user and assistant turns
//!
//! [`AgentRuntime`] wraps the planner in an explicit startup lifecycle, and
//! [`shutdown`] provides signal handling for the binary.

pub mod classify;
pub mod planner;
pub mod prompts;
pub mod runtime;
pub mod session;
pub mod shutdown;

pub use classify::ChoicePolicy;
pub use planner::{Planner, PlannerSettings};
pub use runtime::AgentRuntime;
pub use session::SessionLocks;
