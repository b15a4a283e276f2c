// SPDX-FileCopyrightText: 2026 Echo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversions between Echo records and Qdrant wire types.

use std::collections::HashMap;

use echo_core::{EchoError, EmbeddingPoint, IndexBuild, PointPayload, ScoredPoint};
use qdrant_client::Payload;
use qdrant_client::qdrant::point_id::PointIdOptions;
use qdrant_client::qdrant::{HnswConfigDiffBuilder, NamedVectors, PointId, PointStruct, Vector};

/// Name of the dense vector space.
pub const DENSE_VECTOR: &str = "dense";
/// Name of the sparse vector space.
pub const SPARSE_VECTOR: &str = "sparse";

/// HNSW diff for a build mode.
pub fn hnsw_diff(build: IndexBuild) -> HnswConfigDiffBuilder {
    match build {
        IndexBuild::Deferred => HnswConfigDiffBuilder::default().m(0),
        IndexBuild::Standard { m, ef_construct } => {
            HnswConfigDiffBuilder::default().m(m).ef_construct(ef_construct)
        }
    }
}

pub fn to_point_struct(point: EmbeddingPoint) -> Result<PointStruct, EchoError> {
    let payload_json = serde_json::to_value(&point.payload).map_err(|e| EchoError::Index {
        message: format!("failed to encode payload of point {}", point.id),
        source: Some(Box::new(e)),
    })?;
    let payload = Payload::try_from(payload_json).map_err(|e| EchoError::Index {
        message: format!("payload of point {} is not an object", point.id),
        source: Some(Box::new(e)),
    })?;

    let vectors = NamedVectors::default()
        .add_vector(DENSE_VECTOR, Vector::new_dense(point.dense))
        .add_vector(
            SPARSE_VECTOR,
            Vector::new_sparse(point.sparse.indices, point.sparse.values),
        );

    Ok(PointStruct::new(point.id, vectors, payload))
}

/// Render a point id the way it was written (UUID string or number).
pub fn point_id_string(id: Option<PointId>) -> String {
    match id.and_then(|id| id.point_id_options) {
        Some(PointIdOptions::Uuid(uuid)) => uuid,
        Some(PointIdOptions::Num(num)) => num.to_string(),
        None => String::new(),
    }
}

/// Decode a stored payload; `None` when it does not carry message fields.
pub fn payload_from_map(map: HashMap<String, qdrant_client::qdrant::Value>) -> Option<PointPayload> {
    if map.is_empty() {
        return None;
    }
    let json = serde_json::Value::from(Payload::from(map));
    serde_json::from_value(json).ok()
}

pub fn from_scored(point: qdrant_client::qdrant::ScoredPoint) -> ScoredPoint {
    ScoredPoint {
        id: point_id_string(point.id),
        score: point.score,
        payload: payload_from_map(point.payload),
    }
}
