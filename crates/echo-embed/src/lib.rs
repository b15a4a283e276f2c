// SPDX-FileCopyrightText: 2026 Echo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Local ONNX encoders and the batched dual-vector indexing pipeline.
//!
//! The dense encoder (BGE by default) and the SPLADE sparse encoder run on
//! CPU through ONNX Runtime. [`EmbeddingPipeline`] drives both over the
//! message store and loads the vector index with graph building deferred
//! until the bulk load finishes.

pub mod dense;
pub mod model_manager;
pub mod onnx;
pub mod pipeline;
pub mod pooling;
pub mod search;
pub mod sparse;

pub use dense::OnnxDenseEmbedder;
pub use model_manager::{ModelFiles, ModelManager, ModelSpec};
pub use pipeline::{BatchProgress, EmbeddingPipeline, PipelineOptions, PipelineReport};
pub use search::HybridSearcher;
pub use sparse::SpladeEmbedder;
