// SPDX-FileCopyrightText: 2026 Echo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Echo configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EchoConfig {
    /// Relational store settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Source import and segmentation settings.
    #[serde(default)]
    pub import: ImportConfig,

    /// Dense and sparse encoder settings.
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Vector index connection and collection settings.
    #[serde(default)]
    pub index: IndexConfig,

    /// Generative agent settings.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Fact extraction scheduling settings.
    #[serde(default)]
    pub extraction: ExtractionConfig,

    /// Timeline synthesis output settings.
    #[serde(default)]
    pub timeline: TimelineConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Relational store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite message database.
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

fn default_database_path() -> String {
    "echo_messages.db".to_string()
}

/// Source import configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ImportConfig {
    /// Conversation gap threshold in minutes. A gap strictly greater than this
    /// between consecutive messages starts a new conversation.
    #[serde(default = "default_gap_minutes")]
    pub gap_minutes: u64,

    /// Delete the target database before importing.
    #[serde(default = "default_true")]
    pub recreate_db: bool,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            gap_minutes: default_gap_minutes(),
            recreate_db: true,
        }
    }
}

fn default_gap_minutes() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

/// Pooling strategy used to reduce token states to one dense vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Pooling {
    /// First token (`[CLS]`) hidden state, as BGE models expect.
    Cls,
    /// Attention-masked mean over all tokens.
    Mean,
}

/// Embedding model configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EmbeddingConfig {
    /// Directory holding downloaded models. Defaults to the platform data dir.
    #[serde(default)]
    pub model_dir: Option<String>,

    /// Dense model name (directory under `model_dir`).
    #[serde(default = "default_dense_model")]
    pub dense_model: String,

    /// Download URL for the dense ONNX model.
    #[serde(default = "default_dense_model_url")]
    pub dense_model_url: String,

    /// Download URL for the dense tokenizer.
    #[serde(default = "default_dense_tokenizer_url")]
    pub dense_tokenizer_url: String,

    /// Dense vector dimension.
    #[serde(default = "default_dense_dimensions")]
    pub dense_dimensions: usize,

    /// Dense pooling strategy.
    #[serde(default = "default_pooling")]
    pub pooling: Pooling,

    /// Sparse model name (directory under `model_dir`).
    #[serde(default = "default_sparse_model")]
    pub sparse_model: String,

    /// Download URL for the sparse ONNX model.
    #[serde(default = "default_sparse_model_url")]
    pub sparse_model_url: String,

    /// Download URL for the sparse tokenizer.
    #[serde(default = "default_sparse_tokenizer_url")]
    pub sparse_tokenizer_url: String,

    /// Messages per dense batch and per upsert.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Messages per sparse sub-batch. Must not exceed `batch_size`.
    #[serde(default = "default_sparse_batch_size")]
    pub sparse_batch_size: usize,

    /// Maximum tokens per text; longer inputs are truncated.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    /// ONNX Runtime intra-op threads per session.
    #[serde(default = "default_intra_threads")]
    pub intra_threads: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model_dir: None,
            dense_model: default_dense_model(),
            dense_model_url: default_dense_model_url(),
            dense_tokenizer_url: default_dense_tokenizer_url(),
            dense_dimensions: default_dense_dimensions(),
            pooling: default_pooling(),
            sparse_model: default_sparse_model(),
            sparse_model_url: default_sparse_model_url(),
            sparse_tokenizer_url: default_sparse_tokenizer_url(),
            batch_size: default_batch_size(),
            sparse_batch_size: default_sparse_batch_size(),
            max_tokens: default_max_tokens(),
            intra_threads: default_intra_threads(),
        }
    }
}

fn default_dense_model() -> String {
    "bge-large-en-v1.5".to_string()
}

fn default_dense_model_url() -> String {
    "https://huggingface.co/BAAI/bge-large-en-v1.5/resolve/main/onnx/model.onnx".to_string()
}

fn default_dense_tokenizer_url() -> String {
    "https://huggingface.co/BAAI/bge-large-en-v1.5/resolve/main/tokenizer.json".to_string()
}

fn default_dense_dimensions() -> usize {
    1024
}

fn default_pooling() -> Pooling {
    Pooling::Cls
}

fn default_sparse_model() -> String {
    "splade-pp-en-v1".to_string()
}

fn default_sparse_model_url() -> String {
    "https://huggingface.co/prithivida/Splade_PP_en_v1/resolve/main/onnx/model.onnx".to_string()
}

fn default_sparse_tokenizer_url() -> String {
    "https://huggingface.co/prithivida/Splade_PP_en_v1/resolve/main/tokenizer.json".to_string()
}

fn default_batch_size() -> usize {
    256
}

fn default_sparse_batch_size() -> usize {
    16
}

fn default_max_tokens() -> usize {
    512
}

fn default_intra_threads() -> usize {
    1
}

/// Vector index configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct IndexConfig {
    /// Qdrant gRPC endpoint.
    #[serde(default = "default_index_url")]
    pub url: String,

    /// Qdrant API key, if the server requires one.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Collection name.
    #[serde(default = "default_collection")]
    pub collection: String,

    /// Delete and recreate the collection before indexing.
    #[serde(default = "default_true")]
    pub recreate_collection: bool,

    /// HNSW graph degree restored after bulk load.
    #[serde(default = "default_hnsw_m")]
    pub hnsw_m: u64,

    /// HNSW construction beam width restored after bulk load.
    #[serde(default = "default_hnsw_ef_construct")]
    pub hnsw_ef_construct: u64,

    /// Default number of hits for hybrid search.
    #[serde(default = "default_search_limit")]
    pub search_limit: u64,

    /// Request timeout in seconds.
    #[serde(default = "default_index_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            url: default_index_url(),
            api_key: None,
            collection: default_collection(),
            recreate_collection: true,
            hnsw_m: default_hnsw_m(),
            hnsw_ef_construct: default_hnsw_ef_construct(),
            search_limit: default_search_limit(),
            timeout_secs: default_index_timeout_secs(),
        }
    }
}

fn default_index_url() -> String {
    "http://localhost:6334".to_string()
}

fn default_collection() -> String {
    "echo_chat".to_string()
}

fn default_hnsw_m() -> u64 {
    16
}

fn default_hnsw_ef_construct() -> u64 {
    100
}

fn default_search_limit() -> u64 {
    10
}

fn default_index_timeout_secs() -> u64 {
    60
}

/// Generative agent configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Gemini API key. `None` requires `GEMINI_API_KEY` in the environment.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Model used for extraction and timeline synthesis.
    #[serde(default = "default_agent_model")]
    pub model: String,

    /// API base URL.
    #[serde(default = "default_agent_base_url")]
    pub base_url: String,

    /// HTTP request timeout in seconds.
    #[serde(default = "default_agent_timeout_secs")]
    pub timeout_secs: u64,

    /// Application name used for sessions.
    #[serde(default = "default_app_name")]
    pub app_name: String,

    /// User id used for sessions.
    #[serde(default = "default_user_id")]
    pub user_id: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_agent_model(),
            base_url: default_agent_base_url(),
            timeout_secs: default_agent_timeout_secs(),
            app_name: default_app_name(),
            user_id: default_user_id(),
        }
    }
}

fn default_agent_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_agent_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_agent_timeout_secs() -> u64 {
    300
}

fn default_app_name() -> String {
    "fact_extraction".to_string()
}

fn default_user_id() -> String {
    "admin".to_string()
}

/// Fact extraction scheduling configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ExtractionConfig {
    /// Maximum agent calls in flight at once.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// Conversations launched per batch.
    #[serde(default = "default_extraction_batch_size")]
    pub batch_size: usize,

    /// Pause between batches in seconds. Not applied after the last batch.
    #[serde(default = "default_batch_delay_secs")]
    pub batch_delay_secs: f64,

    /// Upper bound on a single agent call in seconds.
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,

    /// Optional cap on agent calls issued per minute.
    #[serde(default)]
    pub max_calls_per_minute: Option<u32>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
            batch_size: default_extraction_batch_size(),
            batch_delay_secs: default_batch_delay_secs(),
            call_timeout_secs: default_call_timeout_secs(),
            max_calls_per_minute: None,
        }
    }
}

fn default_max_concurrent() -> usize {
    5
}

fn default_extraction_batch_size() -> usize {
    50
}

fn default_batch_delay_secs() -> f64 {
    5.0
}

fn default_call_timeout_secs() -> u64 {
    120
}

/// Timeline synthesis configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TimelineConfig {
    /// Directory for `timeline_YYYY-MM.json` files.
    #[serde(default = "default_timeline_dir")]
    pub output_dir: String,

    /// Path of the rendered master timeline.
    #[serde(default = "default_master_file")]
    pub master_file: String,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            output_dir: default_timeline_dir(),
            master_file: default_master_file(),
        }
    }
}

fn default_timeline_dir() -> String {
    "monthly_timelines".to_string()
}

fn default_master_file() -> String {
    "master_timeline.md".to_string()
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_pipeline_constants() {
        let config = EchoConfig::default();
        assert_eq!(config.import.gap_minutes, 30);
        assert_eq!(config.embedding.batch_size, 256);
        assert_eq!(config.embedding.sparse_batch_size, 16);
        assert_eq!(config.embedding.dense_dimensions, 1024);
        assert_eq!(config.index.collection, "echo_chat");
        assert_eq!(config.index.hnsw_m, 16);
        assert_eq!(config.index.hnsw_ef_construct, 100);
        assert_eq!(config.extraction.max_concurrent, 5);
        assert_eq!(config.extraction.batch_size, 50);
        assert_eq!(config.extraction.batch_delay_secs, 5.0);
        assert_eq!(config.agent.app_name, "fact_extraction");
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let toml_str = r#"
[extraction]
max_concurrent = 2
"#;
        let config: EchoConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.extraction.max_concurrent, 2);
        assert_eq!(config.extraction.batch_size, 50);
        assert!(config.extraction.max_calls_per_minute.is_none());
    }

    #[test]
    fn pooling_parses_lowercase() {
        let toml_str = r#"
[embedding]
pooling = "mean"
"#;
        let config: EchoConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.embedding.pooling, Pooling::Mean);
    }

    #[test]
    fn unknown_key_is_rejected() {
        let toml_str = r#"
[index]
colection = "typo"
"#;
        assert!(toml::from_str::<EchoConfig>(toml_str).is_err());
    }
}
