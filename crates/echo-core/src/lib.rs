// SPDX-FileCopyrightText: 2026 Echo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Echo message archive pipeline.
//!
//! This crate provides the error taxonomy, the record types that flow between
//! pipeline stages, and the adapter traits the stages are written against.
//! Concrete embedders, vector stores, and agents live in their own crates.

pub mod error;
pub mod traits;
pub mod types;

pub use error::EchoError;
pub use types::{
    AdapterType, AgentEvent, AgentRequest, AgentSession, CollectionSpec, EmbeddingInput,
    EmbeddingOutput, EmbeddingPoint, Fact, FactSubject, HealthStatus, HybridQuery, IndexBuild,
    Message, NewFact, PointPayload, RawMessage, ScoredPoint, SparseEmbeddingOutput, SparseVector,
};

pub use traits::{
    AgentEventStream, AgentRuntime, DenseEmbedder, PluginAdapter, SparseEmbedder, StorageAdapter,
    VectorIndex,
};
