// SPDX-FileCopyrightText: 2026 Echo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedding adapter traits for dense and sparse encoders.

use async_trait::async_trait;

use crate::error::EchoError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{EmbeddingInput, EmbeddingOutput, SparseEmbeddingOutput};

/// Encoder producing fixed-length dense vectors.
///
/// Implementations must return exactly one vector per input text, in input
/// order. Callers verify this and treat a mismatch as an integrity failure.
#[async_trait]
pub trait DenseEmbedder: PluginAdapter {
    /// Length of every vector this encoder emits.
    fn dimensions(&self) -> usize;

    /// Encodes a batch of texts.
    async fn embed(&self, input: EmbeddingInput) -> Result<EmbeddingOutput, EchoError>;
}

/// Encoder producing sparse lexical vectors.
#[async_trait]
pub trait SparseEmbedder: PluginAdapter {
    /// Encodes a batch of texts into one sparse vector each, in input order.
    async fn embed_sparse(
        &self,
        input: EmbeddingInput,
    ) -> Result<SparseEmbeddingOutput, EchoError>;
}
