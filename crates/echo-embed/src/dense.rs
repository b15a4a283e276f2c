// SPDX-FileCopyrightText: 2026 Echo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Dense ONNX encoder (BGE by default: CLS pooling, L2-normalized).

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use echo_config::model::Pooling;
use echo_core::{
    AdapterType, DenseEmbedder, EchoError, EmbeddingInput, EmbeddingOutput, HealthStatus,
    PluginAdapter,
};

use crate::onnx::OnnxModel;
use crate::pooling::{cls_pool, l2_normalize, mean_pool};

/// Dense sentence encoder backed by ONNX Runtime.
pub struct OnnxDenseEmbedder {
    model: Arc<OnnxModel>,
    dimensions: usize,
    pooling: Pooling,
}

impl OnnxDenseEmbedder {
    /// Load the encoder. `dimensions` is checked against the model output on
    /// every batch.
    pub fn new(
        model_path: &Path,
        tokenizer_path: &Path,
        dimensions: usize,
        pooling: Pooling,
        max_tokens: usize,
        intra_threads: usize,
    ) -> Result<Self, EchoError> {
        Ok(Self {
            model: Arc::new(OnnxModel::load(
                model_path,
                tokenizer_path,
                max_tokens,
                intra_threads,
            )?),
            dimensions,
            pooling,
        })
    }
}

#[async_trait]
impl PluginAdapter for OnnxDenseEmbedder {
    fn name(&self) -> &str {
        "onnx-dense"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Embedding
    }

    async fn health_check(&self) -> Result<HealthStatus, EchoError> {
        if self.model.is_healthy() {
            Ok(HealthStatus::Healthy)
        } else {
            Ok(HealthStatus::Unhealthy("session lock poisoned".into()))
        }
    }

    async fn shutdown(&self) -> Result<(), EchoError> {
        Ok(())
    }
}

#[async_trait]
impl DenseEmbedder for OnnxDenseEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, input: EmbeddingInput) -> Result<EmbeddingOutput, EchoError> {
        let model = Arc::clone(&self.model);
        let pooling = self.pooling;
        let expected = self.dimensions;

        tokio::task::spawn_blocking(move || {
            let out = model.run(&input.texts)?;
            if out.batch > 0 && out.width != expected {
                return Err(EchoError::Integrity(format!(
                    "dense model emits {}-dim vectors, configured for {expected}",
                    out.width
                )));
            }
            let pooled = match pooling {
                Pooling::Cls => cls_pool(&out.data, out.batch, out.seq_len, out.width),
                Pooling::Mean => mean_pool(
                    &out.data,
                    &out.attention_mask,
                    out.batch,
                    out.seq_len,
                    out.width,
                ),
            };
            Ok(EmbeddingOutput {
                embeddings: pooled.iter().map(|v| l2_normalize(v)).collect(),
                dimensions: expected,
            })
        })
        .await
        .map_err(|e| EchoError::Internal(format!("dense encoder task failed: {e}")))?
    }
}
