// SPDX-FileCopyrightText: 2026 Echo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory vector index that records every call.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;

use echo_core::{
    AdapterType, CollectionSpec, EchoError, EmbeddingPoint, HealthStatus, HybridQuery,
    IndexBuild, PluginAdapter, ScoredPoint, SparseVector, VectorIndex,
};

/// One recorded index operation.
#[derive(Debug, Clone, PartialEq)]
pub enum IndexCall {
    Exists(String),
    Create { name: String, dim: u64, build: IndexBuild },
    Delete(String),
    Configure { name: String, build: IndexBuild },
    Upsert { name: String, ids: Vec<String>, wait: bool },
    Count(String),
    Query(String),
}

struct Collection {
    dim: u64,
    build: IndexBuild,
    points: BTreeMap<String, EmbeddingPoint>,
}

#[derive(Default)]
struct State {
    collections: HashMap<String, Collection>,
    calls: Vec<IndexCall>,
    upserts_seen: usize,
}

/// Vector index double with an ordered call log.
///
/// Points are keyed by id, so re-upserting replaces rather than duplicates.
/// `fail_upsert_on(n)` makes the `n`th upsert (1-based) fail.
#[derive(Default)]
pub struct MockVectorIndex {
    state: Mutex<State>,
    fail_upsert_on: Option<usize>,
}

impl MockVectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with an existing collection.
    pub fn with_collection(self, name: &str, dim: u64, build: IndexBuild) -> Self {
        self.lock().collections.insert(
            name.to_string(),
            Collection {
                dim,
                build,
                points: BTreeMap::new(),
            },
        );
        self
    }

    pub fn fail_upsert_on(mut self, n: usize) -> Self {
        self.fail_upsert_on = Some(n);
        self
    }

    pub fn calls(&self) -> Vec<IndexCall> {
        self.lock().calls.clone()
    }

    /// Recorded calls excluding read-only ones (exists, count, query).
    pub fn mutations(&self) -> Vec<IndexCall> {
        self.calls()
            .into_iter()
            .filter(|c| {
                !matches!(
                    c,
                    IndexCall::Exists(_) | IndexCall::Count(_) | IndexCall::Query(_)
                )
            })
            .collect()
    }

    pub fn build_mode(&self, name: &str) -> Option<IndexBuild> {
        self.lock().collections.get(name).map(|c| c.build)
    }

    pub fn point(&self, name: &str, id: &str) -> Option<EmbeddingPoint> {
        self.lock()
            .collections
            .get(name)
            .and_then(|c| c.points.get(id).cloned())
    }

    pub fn point_ids(&self, name: &str) -> Vec<String> {
        self.lock()
            .collections
            .get(name)
            .map(|c| c.points.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn missing(name: &str) -> EchoError {
    EchoError::index(format!("collection {name} does not exist"))
}

fn sparse_dot(a: &SparseVector, b: &SparseVector) -> f32 {
    let weights: HashMap<u32, f32> = a.indices.iter().copied().zip(a.values.iter().copied()).collect();
    b.indices
        .iter()
        .zip(&b.values)
        .filter_map(|(i, v)| weights.get(i).map(|w| w * v))
        .sum()
}

#[async_trait]
impl PluginAdapter for MockVectorIndex {
    fn name(&self) -> &str {
        "mock-index"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::VectorIndex
    }

    async fn health_check(&self) -> Result<HealthStatus, EchoError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), EchoError> {
        Ok(())
    }
}

#[async_trait]
impl VectorIndex for MockVectorIndex {
    async fn collection_exists(&self, name: &str) -> Result<bool, EchoError> {
        let mut state = self.lock();
        state.calls.push(IndexCall::Exists(name.to_string()));
        Ok(state.collections.contains_key(name))
    }

    async fn create_collection(&self, spec: &CollectionSpec) -> Result<(), EchoError> {
        let mut state = self.lock();
        state.calls.push(IndexCall::Create {
            name: spec.name.clone(),
            dim: spec.dense_dim,
            build: spec.build,
        });
        if state.collections.contains_key(&spec.name) {
            return Err(EchoError::index(format!(
                "collection {} already exists",
                spec.name
            )));
        }
        state.collections.insert(
            spec.name.clone(),
            Collection {
                dim: spec.dense_dim,
                build: spec.build,
                points: BTreeMap::new(),
            },
        );
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<(), EchoError> {
        let mut state = self.lock();
        state.calls.push(IndexCall::Delete(name.to_string()));
        state.collections.remove(name);
        Ok(())
    }

    async fn configure_indexing(&self, name: &str, build: IndexBuild) -> Result<(), EchoError> {
        let mut state = self.lock();
        state.calls.push(IndexCall::Configure {
            name: name.to_string(),
            build,
        });
        let collection = state.collections.get_mut(name).ok_or_else(|| missing(name))?;
        collection.build = build;
        Ok(())
    }

    async fn upsert(
        &self,
        name: &str,
        points: Vec<EmbeddingPoint>,
        wait: bool,
    ) -> Result<(), EchoError> {
        let mut state = self.lock();
        state.calls.push(IndexCall::Upsert {
            name: name.to_string(),
            ids: points.iter().map(|p| p.id.clone()).collect(),
            wait,
        });
        state.upserts_seen += 1;
        if self.fail_upsert_on == Some(state.upserts_seen) {
            return Err(EchoError::index("injected upsert failure"));
        }
        let collection = state.collections.get_mut(name).ok_or_else(|| missing(name))?;
        for point in points {
            if point.dense.len() as u64 != collection.dim {
                return Err(EchoError::index(format!(
                    "point {} has {} dims, collection expects {}",
                    point.id,
                    point.dense.len(),
                    collection.dim
                )));
            }
            collection.points.insert(point.id.clone(), point);
        }
        Ok(())
    }

    async fn count(&self, name: &str) -> Result<u64, EchoError> {
        let mut state = self.lock();
        state.calls.push(IndexCall::Count(name.to_string()));
        state
            .collections
            .get(name)
            .map(|c| c.points.len() as u64)
            .ok_or_else(|| missing(name))
    }

    async fn hybrid_query(
        &self,
        name: &str,
        query: HybridQuery,
    ) -> Result<Vec<ScoredPoint>, EchoError> {
        let mut state = self.lock();
        state.calls.push(IndexCall::Query(name.to_string()));
        let collection = state.collections.get(name).ok_or_else(|| missing(name))?;

        let mut hits: Vec<ScoredPoint> = collection
            .points
            .values()
            .map(|p| {
                let dense: f32 = p.dense.iter().zip(&query.dense).map(|(a, b)| a * b).sum();
                ScoredPoint {
                    id: p.id.clone(),
                    score: dense + sparse_dot(&p.sparse, &query.sparse),
                    payload: Some(p.payload.clone()),
                }
            })
            .collect();
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(query.limit as usize);
        Ok(hits)
    }
}
