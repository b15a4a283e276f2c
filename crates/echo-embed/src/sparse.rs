// SPDX-FileCopyrightText: 2026 Echo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SPLADE sparse encoder over a masked-language-model head.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use echo_core::{
    AdapterType, EchoError, EmbeddingInput, HealthStatus, PluginAdapter, SparseEmbedder,
    SparseEmbeddingOutput,
};

use crate::onnx::OnnxModel;
use crate::pooling::splade_pool;

/// Sparse lexical encoder producing vocabulary-indexed weights.
pub struct SpladeEmbedder {
    model: Arc<OnnxModel>,
}

impl SpladeEmbedder {
    pub fn new(
        model_path: &Path,
        tokenizer_path: &Path,
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
        })
    }
}

#[async_trait]
impl PluginAdapter for SpladeEmbedder {
    fn name(&self) -> &str {
        "onnx-splade"
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
impl SparseEmbedder for SpladeEmbedder {
    async fn embed_sparse(
        &self,
        input: EmbeddingInput,
    ) -> Result<SparseEmbeddingOutput, EchoError> {
        let model = Arc::clone(&self.model);
        tokio::task::spawn_blocking(move || {
            let out = model.run(&input.texts)?;
            Ok(SparseEmbeddingOutput {
                vectors: splade_pool(
                    &out.data,
                    &out.attention_mask,
                    out.batch,
                    out.seq_len,
                    out.width,
                ),
            })
        })
        .await
        .map_err(|e| EchoError::Internal(format!("sparse encoder task failed: {e}")))?
    }
}
