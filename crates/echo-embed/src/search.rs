// SPDX-FileCopyrightText: 2026 Echo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Hybrid retrieval over the dense and sparse spaces.

use std::sync::Arc;

use echo_core::{
    DenseEmbedder, EchoError, EmbeddingInput, HybridQuery, ScoredPoint, SparseEmbedder,
    VectorIndex,
};
use tracing::debug;

/// Encodes a query with both encoders and runs a fused query.
pub struct HybridSearcher {
    dense: Arc<dyn DenseEmbedder>,
    sparse: Arc<dyn SparseEmbedder>,
    index: Arc<dyn VectorIndex>,
    collection: String,
}

impl HybridSearcher {
    pub fn new(
        dense: Arc<dyn DenseEmbedder>,
        sparse: Arc<dyn SparseEmbedder>,
        index: Arc<dyn VectorIndex>,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            dense,
            sparse,
            index,
            collection: collection.into(),
        }
    }

    /// Top `limit` messages for `query`, best first.
    pub async fn search(&self, query: &str, limit: u64) -> Result<Vec<ScoredPoint>, EchoError> {
        let input = EmbeddingInput {
            texts: vec![query.to_string()],
        };
        let dense = self
            .dense
            .embed(input.clone())
            .await?
            .embeddings
            .into_iter()
            .next()
            .ok_or_else(|| EchoError::Integrity("dense encoder returned no vector".into()))?;
        let sparse = self
            .sparse
            .embed_sparse(input)
            .await?
            .vectors
            .into_iter()
            .next()
            .ok_or_else(|| EchoError::Integrity("sparse encoder returned no vector".into()))?;

        debug!(
            collection = %self.collection,
            sparse_terms = sparse.len(),
            limit,
            "running hybrid query"
        );
        self.index
            .hybrid_query(
                &self.collection,
                HybridQuery {
                    dense,
                    sparse,
                    limit,
                },
            )
            .await
    }
}
