// SPDX-FileCopyrightText: 2026 Echo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Vector index adapter trait.

use async_trait::async_trait;

use crate::error::EchoError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{CollectionSpec, EmbeddingPoint, HybridQuery, IndexBuild, ScoredPoint};

/// A vector store holding named collections with a dense and a sparse space.
#[async_trait]
pub trait VectorIndex: PluginAdapter {
    /// Returns whether the named collection exists.
    async fn collection_exists(&self, name: &str) -> Result<bool, EchoError>;

    /// Creates a collection with the given layout and build mode.
    async fn create_collection(&self, spec: &CollectionSpec) -> Result<(), EchoError>;

    /// Deletes a collection and all of its points.
    async fn delete_collection(&self, name: &str) -> Result<(), EchoError>;

    /// Switches the dense space's graph build mode.
    async fn configure_indexing(&self, name: &str, build: IndexBuild) -> Result<(), EchoError>;

    /// Inserts or replaces points by id. With `wait`, returns only once the
    /// points are durably applied.
    async fn upsert(
        &self,
        name: &str,
        points: Vec<EmbeddingPoint>,
        wait: bool,
    ) -> Result<(), EchoError>;

    /// Exact number of points in the collection.
    async fn count(&self, name: &str) -> Result<u64, EchoError>;

    /// Prefetches from both spaces and fuses the candidates.
    async fn hybrid_query(
        &self,
        name: &str,
        query: HybridQuery,
    ) -> Result<Vec<ScoredPoint>, EchoError>;
}
