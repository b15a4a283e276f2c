// SPDX-FileCopyrightText: 2026 Echo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deterministic dense and sparse encoders.

use std::sync::Mutex;

use async_trait::async_trait;

use echo_core::{
    AdapterType, DenseEmbedder, EchoError, EmbeddingInput, EmbeddingOutput, HealthStatus,
    PluginAdapter, SparseEmbedder, SparseEmbeddingOutput, SparseVector,
};

fn text_seed(text: &str) -> u32 {
    text.bytes()
        .fold(17u32, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u32))
}

/// Dense encoder whose output depends only on the text.
///
/// `drop_last_on_call(n)` makes the `n`th call (1-based) return one vector
/// fewer than it was given.
pub struct MockDenseEmbedder {
    dimensions: usize,
    drop_last_on_call: Option<usize>,
    batch_sizes: Mutex<Vec<usize>>,
}

impl MockDenseEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            drop_last_on_call: None,
            batch_sizes: Mutex::new(Vec::new()),
        }
    }

    pub fn drop_last_on_call(mut self, call: usize) -> Self {
        self.drop_last_on_call = Some(call);
        self
    }

    /// Sizes of every batch received, in order.
    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batch_sizes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// The vector this encoder produces for `text`.
    pub fn vector_for(&self, text: &str) -> Vec<f32> {
        let seed = text_seed(text);
        (0..self.dimensions)
            .map(|i| ((seed.wrapping_add(i as u32 * 7919)) % 1000) as f32 / 1000.0)
            .collect()
    }
}

#[async_trait]
impl PluginAdapter for MockDenseEmbedder {
    fn name(&self) -> &str {
        "mock-dense"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Embedding
    }

    async fn health_check(&self) -> Result<HealthStatus, EchoError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), EchoError> {
        Ok(())
    }
}

#[async_trait]
impl DenseEmbedder for MockDenseEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, input: EmbeddingInput) -> Result<EmbeddingOutput, EchoError> {
        let call = {
            let mut sizes = self.batch_sizes.lock().unwrap_or_else(|e| e.into_inner());
            sizes.push(input.texts.len());
            sizes.len()
        };
        let mut embeddings: Vec<Vec<f32>> =
            input.texts.iter().map(|t| self.vector_for(t)).collect();
        if self.drop_last_on_call == Some(call) {
            embeddings.pop();
        }
        Ok(EmbeddingOutput {
            embeddings,
            dimensions: self.dimensions,
        })
    }
}

/// Sparse encoder mapping each byte of the text to a vocabulary slot.
pub struct MockSparseEmbedder {
    drop_last_on_call: Option<usize>,
    batch_sizes: Mutex<Vec<usize>>,
}

impl MockSparseEmbedder {
    pub fn new() -> Self {
        Self {
            drop_last_on_call: None,
            batch_sizes: Mutex::new(Vec::new()),
        }
    }

    pub fn drop_last_on_call(mut self, call: usize) -> Self {
        self.drop_last_on_call = Some(call);
        self
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batch_sizes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// The vector this encoder produces for `text`.
    pub fn vector_for(text: &str) -> SparseVector {
        let mut weights = std::collections::BTreeMap::new();
        for b in text.bytes() {
            *weights.entry(b as u32).or_insert(0.0f32) += 1.0;
        }
        SparseVector {
            indices: weights.keys().copied().collect(),
            values: weights.values().copied().collect(),
        }
    }
}

impl Default for MockSparseEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockSparseEmbedder {
    fn name(&self) -> &str {
        "mock-sparse"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Embedding
    }

    async fn health_check(&self) -> Result<HealthStatus, EchoError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), EchoError> {
        Ok(())
    }
}

#[async_trait]
impl SparseEmbedder for MockSparseEmbedder {
    async fn embed_sparse(
        &self,
        input: EmbeddingInput,
    ) -> Result<SparseEmbeddingOutput, EchoError> {
        let call = {
            let mut sizes = self.batch_sizes.lock().unwrap_or_else(|e| e.into_inner());
            sizes.push(input.texts.len());
            sizes.len()
        };
        let mut vectors: Vec<SparseVector> =
            input.texts.iter().map(|t| Self::vector_for(t)).collect();
        if self.drop_last_on_call == Some(call) {
            vectors.pop();
        }
        Ok(SparseEmbeddingOutput { vectors })
    }
}
