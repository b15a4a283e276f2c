// SPDX-FileCopyrightText: 2026 Echo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Qdrant adapter implementing [`VectorIndex`].
//!
//! Collections hold two named vector spaces: `dense` (cosine distance) and
//! `sparse`. Hybrid queries prefetch from both and fuse the candidate lists
//! with reciprocal rank fusion.

pub mod convert;

use std::time::Duration;

use async_trait::async_trait;
use echo_config::model::IndexConfig;
use echo_core::{
    AdapterType, CollectionSpec, EchoError, EmbeddingPoint, HealthStatus, HybridQuery,
    IndexBuild, PluginAdapter, ScoredPoint, VectorIndex,
};
use qdrant_client::Qdrant;
use qdrant_client::qdrant::{
    CountPointsBuilder, CreateCollectionBuilder, Distance, Fusion, PrefetchQueryBuilder, Query,
    QueryPointsBuilder, SparseVectorParamsBuilder, SparseVectorsConfigBuilder,
    UpdateCollectionBuilder, UpsertPointsBuilder, VectorInput, VectorParamsBuilder,
    VectorsConfigBuilder,
};
use tracing::{debug, info};

use crate::convert::{DENSE_VECTOR, SPARSE_VECTOR, from_scored, hnsw_diff, to_point_struct};

/// Vector index backed by a Qdrant server over gRPC.
pub struct QdrantIndex {
    client: Qdrant,
    url: String,
}

fn qdrant_err(context: &str, e: qdrant_client::QdrantError) -> EchoError {
    EchoError::Index {
        message: format!("{context}: {e}"),
        source: Some(Box::new(e)),
    }
}

impl QdrantIndex {
    /// Connects to the server named in `config`.
    ///
    /// The gRPC channel is lazy; the first call surfaces connection errors.
    pub fn new(config: &IndexConfig) -> Result<Self, EchoError> {
        let client = Qdrant::from_url(&config.url)
            .api_key(config.api_key.clone())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| qdrant_err("failed to build Qdrant client", e))?;
        info!(url = %config.url, "Qdrant index adapter initialized");
        Ok(Self {
            client,
            url: config.url.clone(),
        })
    }
}

#[async_trait]
impl PluginAdapter for QdrantIndex {
    fn name(&self) -> &str {
        "qdrant"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::VectorIndex
    }

    async fn health_check(&self) -> Result<HealthStatus, EchoError> {
        match self.client.health_check().await {
            Ok(reply) => {
                debug!(url = %self.url, version = %reply.version, "Qdrant is reachable");
                Ok(HealthStatus::Healthy)
            }
            Err(e) => Ok(HealthStatus::Unhealthy(format!(
                "Qdrant at {} unreachable: {e}",
                self.url
            ))),
        }
    }

    async fn shutdown(&self) -> Result<(), EchoError> {
        debug!("Qdrant index adapter shutting down");
        Ok(())
    }
}

#[async_trait]
impl VectorIndex for QdrantIndex {
    async fn collection_exists(&self, name: &str) -> Result<bool, EchoError> {
        self.client
            .collection_exists(name)
            .await
            .map_err(|e| qdrant_err("failed to check collection", e))
    }

    async fn create_collection(&self, spec: &CollectionSpec) -> Result<(), EchoError> {
        let mut vectors = VectorsConfigBuilder::default();
        vectors.add_named_vector_params(
            DENSE_VECTOR,
            VectorParamsBuilder::new(spec.dense_dim, Distance::Cosine),
        );
        let mut sparse = SparseVectorsConfigBuilder::default();
        sparse.add_named_vector_params(SPARSE_VECTOR, SparseVectorParamsBuilder::default());

        self.client
            .create_collection(
                CreateCollectionBuilder::new(&spec.name)
                    .vectors_config(vectors)
                    .sparse_vectors_config(sparse)
                    .hnsw_config(hnsw_diff(spec.build)),
            )
            .await
            .map_err(|e| qdrant_err("failed to create collection", e))?;
        info!(
            collection = %spec.name,
            dim = spec.dense_dim,
            m = spec.build.m(),
            "collection created"
        );
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<(), EchoError> {
        self.client
            .delete_collection(name)
            .await
            .map_err(|e| qdrant_err("failed to delete collection", e))?;
        Ok(())
    }

    async fn configure_indexing(&self, name: &str, build: IndexBuild) -> Result<(), EchoError> {
        self.client
            .update_collection(UpdateCollectionBuilder::new(name).hnsw_config(hnsw_diff(build)))
            .await
            .map_err(|e| qdrant_err("failed to update indexing", e))?;
        debug!(collection = name, m = build.m(), "indexing reconfigured");
        Ok(())
    }

    async fn upsert(
        &self,
        name: &str,
        points: Vec<EmbeddingPoint>,
        wait: bool,
    ) -> Result<(), EchoError> {
        let points = points
            .into_iter()
            .map(to_point_struct)
            .collect::<Result<Vec<_>, _>>()?;
        self.client
            .upsert_points(UpsertPointsBuilder::new(name, points).wait(wait))
            .await
            .map_err(|e| qdrant_err("failed to upsert points", e))?;
        Ok(())
    }

    async fn count(&self, name: &str) -> Result<u64, EchoError> {
        let reply = self
            .client
            .count(CountPointsBuilder::new(name).exact(true))
            .await
            .map_err(|e| qdrant_err("failed to count points", e))?;
        Ok(reply.result.map(|r| r.count).unwrap_or(0))
    }

    async fn hybrid_query(
        &self,
        name: &str,
        query: HybridQuery,
    ) -> Result<Vec<ScoredPoint>, EchoError> {
        let dense = PrefetchQueryBuilder::default()
            .query(Query::new_nearest(query.dense))
            .using(DENSE_VECTOR)
            .limit(query.limit);
        let sparse = PrefetchQueryBuilder::default()
            .query(Query::new_nearest(VectorInput::new_sparse(
                query.sparse.indices,
                query.sparse.values,
            )))
            .using(SPARSE_VECTOR)
            .limit(query.limit);

        let request = QueryPointsBuilder::new(name)
            .add_prefetch(dense)
            .add_prefetch(sparse)
            .query(Fusion::Rrf)
            .with_payload(true)
            .limit(query.limit);

        let response = self
            .client
            .query(request)
            .await
            .map_err(|e| qdrant_err("hybrid query failed", e))?;
        Ok(response.result.into_iter().map(from_scored).collect())
    }
}
