// SPDX-FileCopyrightText: 2026 Echo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.

use crate::diagnostic::ConfigError;
use crate::model::EchoConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Collects every violation instead of stopping at the first one.
pub fn validate_config(config: &EchoConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    if config.storage.database_path.trim().is_empty() {
        fail("storage.database_path must not be empty".to_string());
    }

    let emb = &config.embedding;
    if emb.batch_size == 0 {
        fail("embedding.batch_size must be at least 1".to_string());
    }
    if emb.sparse_batch_size == 0 {
        fail("embedding.sparse_batch_size must be at least 1".to_string());
    }
    if emb.sparse_batch_size > emb.batch_size {
        fail(format!(
            "embedding.sparse_batch_size ({}) must not exceed embedding.batch_size ({})",
            emb.sparse_batch_size, emb.batch_size
        ));
    }
    if emb.dense_dimensions == 0 {
        fail("embedding.dense_dimensions must be at least 1".to_string());
    }
    if emb.intra_threads == 0 {
        fail("embedding.intra_threads must be at least 1".to_string());
    }

    if config.index.collection.trim().is_empty() {
        fail("index.collection must not be empty".to_string());
    }
    if config.index.hnsw_m == 0 {
        fail("index.hnsw_m must be at least 1 once indexing is restored".to_string());
    }
    if config.index.search_limit == 0 {
        fail("index.search_limit must be at least 1".to_string());
    }

    let ext = &config.extraction;
    if ext.max_concurrent == 0 {
        fail("extraction.max_concurrent must be at least 1".to_string());
    }
    if ext.batch_size == 0 {
        fail("extraction.batch_size must be at least 1".to_string());
    }
    if !ext.batch_delay_secs.is_finite() || ext.batch_delay_secs < 0.0 {
        fail(format!(
            "extraction.batch_delay_secs must be a non-negative number, got {}",
            ext.batch_delay_secs
        ));
    }
    if ext.call_timeout_secs == 0 {
        fail("extraction.call_timeout_secs must be at least 1".to_string());
    }
    if ext.max_calls_per_minute == Some(0) {
        fail("extraction.max_calls_per_minute must be at least 1 when set".to_string());
    }

    if !LOG_LEVELS.contains(&config.logging.level.as_str()) {
        fail(format!(
            "logging.level `{}` is not one of {}",
            config.logging.level,
            LOG_LEVELS.join(", ")
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
