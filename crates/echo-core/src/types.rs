// SPDX-FileCopyrightText: 2026 Echo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Record types shared by the store, the embedding pipeline, and the fact extractor.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter behind a trait object.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Storage,
    Embedding,
    VectorIndex,
    Agent,
}

// --- Messages ---

/// A message read from a source export, before conversation assignment.
#[derive(Debug, Clone, PartialEq)]
pub struct RawMessage {
    pub text: String,
    pub is_from_me: bool,
    /// Seconds since the Unix epoch.
    pub timestamp: f64,
    /// RFC 3339 rendering of `timestamp`.
    pub date_iso: String,
}

/// A stored message with its conversation assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub text: String,
    pub is_from_me: bool,
    pub timestamp: f64,
    pub date_iso: String,
}

impl Message {
    /// Label used for the sender in transcripts and payloads.
    pub fn sender_label(&self) -> &'static str {
        if self.is_from_me { "Me" } else { "Other" }
    }
}

// --- Facts ---

/// Who a fact is about.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum FactSubject {
    Me,
    Other,
    Relationship,
}

/// A validated fact ready to be persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewFact {
    pub subject: FactSubject,
    pub predicate: String,
    pub object: String,
    pub confidence: f64,
    pub source_text: String,
    /// Calendar date in `YYYY-MM-DD` form.
    pub date: String,
}

/// A persisted fact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fact {
    pub id: i64,
    pub conversation_id: String,
    pub subject: FactSubject,
    pub predicate: String,
    pub object: String,
    pub confidence: f64,
    pub source_text: String,
    pub date: String,
}

// --- Vector index ---

/// Sparse lexical vector as parallel index/weight arrays.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SparseVector {
    pub indices: Vec<u32>,
    pub values: Vec<f32>,
}

impl SparseVector {
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Denormalized message fields stored alongside each point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointPayload {
    pub text: String,
    pub conversation_id: String,
    pub is_from_me: bool,
    pub date_iso: String,
    pub timestamp_seconds: f64,
}

impl From<&Message> for PointPayload {
    fn from(msg: &Message) -> Self {
        Self {
            text: msg.text.clone(),
            conversation_id: msg.conversation_id.clone(),
            is_from_me: msg.is_from_me,
            date_iso: msg.date_iso.clone(),
            timestamp_seconds: msg.timestamp,
        }
    }
}

/// One indexed message: both vector representations plus payload.
///
/// The point id is the message id, so re-upserting the same message replaces
/// the earlier point.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingPoint {
    pub id: String,
    pub dense: Vec<f32>,
    pub sparse: SparseVector,
    pub payload: PointPayload,
}

/// Graph index build mode for the dense vector space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexBuild {
    /// Graph construction disabled (`m = 0`) for fast bulk ingestion.
    Deferred,
    /// Normal graph construction.
    Standard { m: u64, ef_construct: u64 },
}

impl IndexBuild {
    /// The HNSW `m` value this mode maps to.
    pub fn m(&self) -> u64 {
        match self {
            IndexBuild::Deferred => 0,
            IndexBuild::Standard { m, .. } => *m,
        }
    }
}

/// Collection layout: a cosine dense space plus a sparse space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionSpec {
    pub name: String,
    pub dense_dim: u64,
    pub build: IndexBuild,
}

/// A hybrid query against both vector spaces.
#[derive(Debug, Clone, PartialEq)]
pub struct HybridQuery {
    pub dense: Vec<f32>,
    pub sparse: SparseVector,
    pub limit: u64,
}

/// A query hit.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredPoint {
    pub id: String,
    pub score: f32,
    pub payload: Option<PointPayload>,
}

// --- Embedding ---

/// Input to an embedding adapter.
#[derive(Debug, Clone)]
pub struct EmbeddingInput {
    pub texts: Vec<String>,
}

/// Dense embedding output, one vector per input text.
#[derive(Debug, Clone)]
pub struct EmbeddingOutput {
    pub embeddings: Vec<Vec<f32>>,
    pub dimensions: usize,
}

/// Sparse embedding output, one vector per input text.
#[derive(Debug, Clone)]
pub struct SparseEmbeddingOutput {
    pub vectors: Vec<SparseVector>,
}

// --- Agent ---

/// Handle to an ephemeral agent session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AgentSession {
    pub app_name: String,
    pub user_id: String,
    pub session_id: String,
}

/// A single structured-output request to the generative agent.
#[derive(Debug, Clone)]
pub struct AgentRequest {
    /// System instruction describing the task.
    pub instruction: String,
    /// User content (transcript or serialized facts).
    pub prompt: String,
    /// JSON Schema the response must satisfy.
    pub response_schema: serde_json::Value,
}

/// An event emitted by an agent run.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentEvent {
    pub author: String,
    pub parts: Vec<String>,
}

impl AgentEvent {
    /// The text of the final content part, if any.
    pub fn last_text(&self) -> Option<&str> {
        self.parts.last().map(String::as_str)
    }
}
