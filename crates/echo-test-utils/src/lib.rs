// SPDX-FileCopyrightText: 2026 Echo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Echo.
//!
//! Provides instrumented in-memory adapters for fast, deterministic,
//! CI-runnable tests without model files, a vector server, or API keys.
//!
//! # Components
//!
//! - [`MockAgent`] - scripted agent that records sessions and peak concurrency
//! - [`MockVectorIndex`] - vector store that records every call in order
//! - [`MockDenseEmbedder`] / [`MockSparseEmbedder`] - deterministic encoders
//!   that can be told to misbehave
//! - [`MemoryStore`] - storage adapter with injectable write failures

pub mod mock_agent;
pub mod mock_embedders;
pub mod mock_index;
pub mod mock_store;

pub use mock_agent::{AgentBehavior, MockAgent};
pub use mock_embedders::{MockDenseEmbedder, MockSparseEmbedder};
pub use mock_index::{IndexCall, MockVectorIndex};
pub use mock_store::MemoryStore;

use echo_core::Message;

/// Build a message with a predictable id (`<conversation>-<n>`).
pub fn message(conversation_id: &str, n: usize, text: &str, is_from_me: bool) -> Message {
    Message {
        id: format!("{conversation_id}-{n}"),
        conversation_id: conversation_id.to_string(),
        text: text.to_string(),
        is_from_me,
        timestamp: n as f64 * 60.0,
        date_iso: format!("2024-05-01T00:{:02}:00+00:00", n % 60),
    }
}
