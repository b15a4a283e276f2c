// SPDX-FileCopyrightText: 2026 Echo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Batched dual-encoding of stored messages into the vector index.
//!
//! The run is a single flow:
//!
//! 1. Prepare the collection with graph indexing deferred (`m = 0`), creating
//!    or recreating it as configured.
//! 2. For each batch of `batch_size` messages: dense-encode the batch,
//!    sparse-encode it in sub-batches of `sparse_batch_size`, verify that both
//!    outputs align with the inputs, and upsert with `wait = true`.
//! 3. Restore standard graph indexing exactly once.
//!
//! Any failure aborts the run. Points from earlier batches stay in the
//! collection, which is left in deferred mode; re-running the pipeline
//! recovers because upserts are keyed by message id.

use std::sync::Arc;

use echo_config::model::{EmbeddingConfig, IndexConfig};
use echo_core::{
    CollectionSpec, DenseEmbedder, EchoError, EmbeddingInput, EmbeddingPoint, IndexBuild,
    Message, PointPayload, SparseEmbedder, SparseVector, VectorIndex,
};
use tracing::{debug, info};

/// Knobs for one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOptions {
    pub collection: String,
    pub batch_size: usize,
    pub sparse_batch_size: usize,
    pub recreate: bool,
    /// Build mode restored after the last upsert.
    pub standard_build: IndexBuild,
}

impl PipelineOptions {
    pub fn from_config(embedding: &EmbeddingConfig, index: &IndexConfig) -> Self {
        Self {
            collection: index.collection.clone(),
            batch_size: embedding.batch_size,
            sparse_batch_size: embedding.sparse_batch_size,
            recreate: index.recreate_collection,
            standard_build: IndexBuild::Standard {
                m: index.hnsw_m,
                ef_construct: index.hnsw_ef_construct,
            },
        }
    }
}

/// Outcome of a pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineReport {
    pub points_upserted: usize,
    pub batches: usize,
    pub collection_created: bool,
}

/// Progress after each upserted batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchProgress {
    pub batch: usize,
    pub total_batches: usize,
    pub points_done: usize,
    pub points_total: usize,
}

/// Encodes messages with both encoders and loads them into a collection.
pub struct EmbeddingPipeline {
    dense: Arc<dyn DenseEmbedder>,
    sparse: Arc<dyn SparseEmbedder>,
    index: Arc<dyn VectorIndex>,
    options: PipelineOptions,
}

impl EmbeddingPipeline {
    pub fn new(
        dense: Arc<dyn DenseEmbedder>,
        sparse: Arc<dyn SparseEmbedder>,
        index: Arc<dyn VectorIndex>,
        options: PipelineOptions,
    ) -> Result<Self, EchoError> {
        if options.batch_size == 0 || options.sparse_batch_size == 0 {
            return Err(EchoError::Config("batch sizes must be at least 1".into()));
        }
        if options.sparse_batch_size > options.batch_size {
            return Err(EchoError::Config(format!(
                "sparse batch size {} exceeds batch size {}",
                options.sparse_batch_size, options.batch_size
            )));
        }
        Ok(Self {
            dense,
            sparse,
            index,
            options,
        })
    }

    /// Run the pipeline over `messages` (already in the desired order).
    pub async fn run(&self, messages: &[Message]) -> Result<PipelineReport, EchoError> {
        self.run_with_progress(messages, |_| {}).await
    }

    /// Like [`run`](Self::run), reporting after every upserted batch.
    pub async fn run_with_progress(
        &self,
        messages: &[Message],
        mut on_batch: impl FnMut(BatchProgress) + Send,
    ) -> Result<PipelineReport, EchoError> {
        let name = self.options.collection.as_str();
        if messages.is_empty() {
            info!(collection = name, "no messages to index");
            return Ok(PipelineReport::default());
        }

        let mut report = PipelineReport {
            collection_created: self.prepare_collection().await?,
            ..Default::default()
        };

        let total_batches = messages.len().div_ceil(self.options.batch_size);
        for (batch, chunk) in messages.chunks(self.options.batch_size).enumerate() {
            let points = self.encode_batch(batch, chunk).await?;
            self.index.upsert(name, points, true).await?;

            report.batches += 1;
            report.points_upserted += chunk.len();
            debug!(
                batch = batch + 1,
                total_batches,
                points = chunk.len(),
                "upserted batch"
            );
            on_batch(BatchProgress {
                batch: batch + 1,
                total_batches,
                points_done: report.points_upserted,
                points_total: messages.len(),
            });
        }

        self.index
            .configure_indexing(name, self.options.standard_build)
            .await?;
        info!(
            collection = name,
            points = report.points_upserted,
            batches = report.batches,
            "indexing restored after bulk load"
        );
        Ok(report)
    }

    /// Returns whether the collection was (re)created.
    async fn prepare_collection(&self) -> Result<bool, EchoError> {
        let name = self.options.collection.as_str();
        let mut exists = self.index.collection_exists(name).await?;

        if exists && self.options.recreate {
            info!(collection = name, "deleting existing collection");
            self.index.delete_collection(name).await?;
            exists = false;
        }

        if exists {
            info!(collection = name, "appending to existing collection");
            self.index
                .configure_indexing(name, IndexBuild::Deferred)
                .await?;
            return Ok(false);
        }

        let spec = CollectionSpec {
            name: name.to_string(),
            dense_dim: self.dense.dimensions() as u64,
            build: IndexBuild::Deferred,
        };
        info!(collection = name, dim = spec.dense_dim, "creating collection");
        self.index.create_collection(&spec).await?;
        Ok(true)
    }

    async fn encode_batch(
        &self,
        batch: usize,
        chunk: &[Message],
    ) -> Result<Vec<EmbeddingPoint>, EchoError> {
        let texts: Vec<String> = chunk.iter().map(|m| m.text.clone()).collect();

        let dense = self
            .dense
            .embed(EmbeddingInput {
                texts: texts.clone(),
            })
            .await?
            .embeddings;

        let mut sparse = Vec::with_capacity(texts.len());
        for sub in texts.chunks(self.options.sparse_batch_size) {
            let out = self
                .sparse
                .embed_sparse(EmbeddingInput {
                    texts: sub.to_vec(),
                })
                .await?;
            if out.vectors.len() != sub.len() {
                return Err(EchoError::Integrity(format!(
                    "batch {batch}: sparse encoder returned {} vectors for a sub-batch of {}",
                    out.vectors.len(),
                    sub.len()
                )));
            }
            sparse.extend(out.vectors);
        }

        check_alignment(batch, texts.len(), &dense, &sparse, self.dense.dimensions())?;

        Ok(chunk
            .iter()
            .zip(dense)
            .zip(sparse)
            .map(|((msg, dense), sparse)| EmbeddingPoint {
                id: msg.id.clone(),
                dense,
                sparse,
                payload: PointPayload::from(msg),
            })
            .collect())
    }
}

/// Verify both encoder outputs line up with the batch inputs.
pub fn check_alignment(
    batch: usize,
    texts: usize,
    dense: &[Vec<f32>],
    sparse: &[SparseVector],
    dim: usize,
) -> Result<(), EchoError> {
    if dense.len() != texts || sparse.len() != texts {
        return Err(EchoError::Integrity(format!(
            "batch {batch}: {texts} texts but {} dense and {} sparse vectors",
            dense.len(),
            sparse.len()
        )));
    }
    if let Some((i, v)) = dense.iter().enumerate().find(|(_, v)| v.len() != dim) {
        return Err(EchoError::Integrity(format!(
            "batch {batch}: dense vector {i} has {} dimensions, expected {dim}",
            v.len()
        )));
    }
    if let Some(i) = sparse
        .iter()
        .position(|s| s.indices.len() != s.values.len())
    {
        return Err(EchoError::Integrity(format!(
            "batch {batch}: sparse vector {i} has mismatched indices and values"
        )));
    }
    Ok(())
}
