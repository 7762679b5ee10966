// SPDX-FileCopyrightText: 2026 QueryChain Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for QueryChain integration tests.
//!
//! Provides mock adapters and test harness infrastructure for fast,
//! deterministic tests without Gemini or MongoDB.
//!
//! # Components
//!
//! - [`MockModel`] - language model with a FIFO queue of canned replies
//! - [`MockEmbedder`] - deterministic bag-of-words embeddings
//! - [`InMemoryDocumentStore`] - document store supporting the filter and
//!   pipeline subset the tools generate
//! - [`TestHarness`] - a ready [`querychain_agent::AgentRuntime`] over the mocks

pub mod harness;
pub mod memory_store;
pub mod mock_embedder;
pub mod mock_model;

pub use harness::TestHarness;
pub use memory_store::InMemoryDocumentStore;
pub use mock_embedder::MockEmbedder;
pub use mock_model::MockModel;
