// SPDX-FileCopyrightText: 2026 Echo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions.
//!
//! All adapters extend the [`PluginAdapter`] base trait and use
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod agent;
pub mod embedding;
pub mod index;
pub mod storage;

pub use adapter::PluginAdapter;
pub use agent::{AgentEventStream, AgentRuntime};
pub use embedding::{DenseEmbedder, SparseEmbedder};
pub use index::VectorIndex;
pub use storage::StorageAdapter;
