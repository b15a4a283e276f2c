// SPDX-FileCopyrightText: 2026 Echo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Echo pipeline.

use thiserror::Error;

/// The primary error type used across all Echo adapter traits and pipeline stages.
///
/// Whether an error is fatal for a run or scoped to a single unit of work is
/// decided by the caller, not by the variant. The fact extraction orchestrator,
/// for example, isolates [`EchoError::Validation`] and [`EchoError::Agent`]
/// to one conversation but aborts on [`EchoError::Storage`].
#[derive(Debug, Error)]
pub enum EchoError {
    /// Configuration errors (invalid TOML, out-of-range values, missing credentials).
    #[error("configuration error: {0}")]
    Config(String),

    /// A required input (source export, model file, collection) does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Relational store errors (connection, query failure, migration).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Encoder outputs disagree with their inputs (count or dimension mismatch).
    #[error("integrity error: {0}")]
    Integrity(String),

    /// Generative output failed schema or semantic validation.
    #[error("validation error: {0}")]
    Validation(String),

    /// Generative agent transport or protocol errors.
    #[error("agent error: {message}")]
    Agent {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Vector index errors (collection management, upsert, query).
    #[error("vector index error: {message}")]
    Index {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Embedding model errors (model load, tokenization, inference).
    #[error("embedding error: {message}")]
    Embedding {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl EchoError {
    /// Shorthand for an [`EchoError::Agent`] without an underlying source.
    pub fn agent(message: impl Into<String>) -> Self {
        Self::Agent {
            message: message.into(),
            source: None,
        }
    }

    /// Shorthand for an [`EchoError::Index`] without an underlying source.
    pub fn index(message: impl Into<String>) -> Self {
        Self::Index {
            message: message.into(),
            source: None,
        }
    }

    /// Shorthand for an [`EchoError::Embedding`] without an underlying source.
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::Embedding {
            message: message.into(),
            source: None,
        }
    }
}
