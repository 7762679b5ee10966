// SPDX-FileCopyrightText: 2026 QueryChain Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions for the external collaborators.
//!
//! All adapters extend the [`PluginAdapter`] base trait and use
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod docstore;
pub mod embedding;
pub mod memory;
pub mod model;

pub use adapter::PluginAdapter;
pub use docstore::DocumentStore;
pub use embedding::EmbeddingAdapter;
pub use memory::SessionMemory;
pub use model::ModelAdapter;
