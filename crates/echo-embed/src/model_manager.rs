// SPDX-FileCopyrightText: 2026 Echo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Model download manager for first-run encoder setup.
//!
//! Each model lives in `<data_dir>/models/<name>/` as `model.onnx` plus
//! `tokenizer.json`. Missing files are fetched once and cached.

use std::path::{Path, PathBuf};

use echo_config::model::EmbeddingConfig;
use echo_core::EchoError;
use futures::StreamExt;
use tokio::io::AsyncWriteExt;
use tracing::info;

/// Where to find one encoder's files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSpec {
    pub name: String,
    pub model_url: String,
    pub tokenizer_url: String,
}

impl ModelSpec {
    /// The configured dense encoder.
    pub fn dense(config: &EmbeddingConfig) -> Self {
        Self {
            name: config.dense_model.clone(),
            model_url: config.dense_model_url.clone(),
            tokenizer_url: config.dense_tokenizer_url.clone(),
        }
    }

    /// The configured sparse encoder.
    pub fn sparse(config: &EmbeddingConfig) -> Self {
        Self {
            name: config.sparse_model.clone(),
            model_url: config.sparse_model_url.clone(),
            tokenizer_url: config.sparse_tokenizer_url.clone(),
        }
    }
}

/// Resolved on-disk locations of a model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelFiles {
    pub model: PathBuf,
    pub tokenizer: PathBuf,
}

/// Manages encoder download and path resolution.
pub struct ModelManager {
    data_dir: PathBuf,
}

impl ModelManager {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    /// Manager rooted at `config.model_dir`, or the platform data dir.
    pub fn from_config(config: &EmbeddingConfig) -> Self {
        let data_dir = config
            .model_dir
            .as_ref()
            .map(PathBuf::from)
            .or_else(|| dirs::data_dir().map(|d| d.join("echo")))
            .unwrap_or_else(|| PathBuf::from(".echo"));
        Self::new(data_dir)
    }

    pub fn model_dir(&self, spec: &ModelSpec) -> PathBuf {
        self.data_dir.join("models").join(&spec.name)
    }

    pub fn files(&self, spec: &ModelSpec) -> ModelFiles {
        let dir = self.model_dir(spec);
        ModelFiles {
            model: dir.join("model.onnx"),
            tokenizer: dir.join("tokenizer.json"),
        }
    }

    /// Returns true if both model and tokenizer files exist.
    pub fn is_available(&self, spec: &ModelSpec) -> bool {
        let files = self.files(spec);
        files.model.exists() && files.tokenizer.exists()
    }

    /// Download whatever is missing and return the file locations.
    pub async fn ensure(&self, spec: &ModelSpec) -> Result<ModelFiles, EchoError> {
        let files = self.files(spec);
        if self.is_available(spec) {
            return Ok(files);
        }

        let model_dir = self.model_dir(spec);
        tokio::fs::create_dir_all(&model_dir).await.map_err(|e| {
            EchoError::embedding(format!(
                "failed to create model directory {}: {e}",
                model_dir.display()
            ))
        })?;

        for (dest, url) in [
            (&files.model, &spec.model_url),
            (&files.tokenizer, &spec.tokenizer_url),
        ] {
            if dest.exists() {
                continue;
            }
            info!(model = %spec.name, url = %url, "downloading model file");
            let size = download_file(url, dest).await?;
            info!(path = %dest.display(), bytes = size, "downloaded model file");
        }

        Ok(files)
    }
}

/// Stream a URL into `dest`, writing to a `.part` file and renaming on success.
async fn download_file(url: &str, dest: &Path) -> Result<u64, EchoError> {
    let partial = dest.with_extension("part");
    let result = stream_to(url, &partial).await;
    match result {
        Ok(size) => {
            tokio::fs::rename(&partial, dest).await.map_err(|e| {
                EchoError::embedding(format!("failed to move {}: {e}", partial.display()))
            })?;
            Ok(size)
        }
        Err(e) => {
            let _ = tokio::fs::remove_file(&partial).await;
            Err(e)
        }
    }
}

async fn stream_to(url: &str, path: &Path) -> Result<u64, EchoError> {
    let response = reqwest::get(url)
        .await
        .map_err(|e| EchoError::embedding(format!("failed to download {url}: {e}")))?;
    if !response.status().is_success() {
        return Err(EchoError::embedding(format!(
            "download failed with status {}: {url}",
            response.status()
        )));
    }

    let mut file = tokio::fs::File::create(path)
        .await
        .map_err(|e| EchoError::embedding(format!("failed to create {}: {e}", path.display())))?;
    let mut stream = response.bytes_stream();
    let mut size = 0u64;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk
            .map_err(|e| EchoError::embedding(format!("failed reading body of {url}: {e}")))?;
        file.write_all(&chunk)
            .await
            .map_err(|e| EchoError::embedding(format!("failed to write {}: {e}", path.display())))?;
        size += chunk.len() as u64;
    }
    file.flush()
        .await
        .map_err(|e| EchoError::embedding(format!("failed to flush {}: {e}", path.display())))?;
    Ok(size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn spec(base: &str) -> ModelSpec {
        ModelSpec {
            name: "tiny".into(),
            model_url: format!("{base}/model.onnx"),
            tokenizer_url: format!("{base}/tokenizer.json"),
        }
    }

    #[test]
    fn files_live_under_models_dir() {
        let mgr = ModelManager::new(PathBuf::from("/data"));
        let files = mgr.files(&spec("http://x"));
        assert_eq!(files.model, PathBuf::from("/data/models/tiny/model.onnx"));
        assert_eq!(
            files.tokenizer,
            PathBuf::from("/data/models/tiny/tokenizer.json")
        );
        assert!(!mgr.is_available(&spec("http://x")));
    }

    #[test]
    fn specs_follow_config() {
        let config = EmbeddingConfig::default();
        assert_eq!(ModelSpec::dense(&config).name, "bge-large-en-v1.5");
        assert_eq!(ModelSpec::sparse(&config).name, "splade-pp-en-v1");
    }

    #[tokio::test]
    async fn ensure_downloads_missing_files_once() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/model.onnx"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![7u8; 64]))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/tokenizer.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let mgr = ModelManager::new(dir.path().to_path_buf());
        let spec = spec(&server.uri());

        let files = mgr.ensure(&spec).await.unwrap();
        assert_eq!(std::fs::read(&files.model).unwrap().len(), 64);
        assert!(mgr.is_available(&spec));

        // Second call is served from disk.
        mgr.ensure(&spec).await.unwrap();
    }

    #[tokio::test]
    async fn failed_download_leaves_no_partial_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let mgr = ModelManager::new(dir.path().to_path_buf());
        let spec = spec(&server.uri());

        let err = mgr.ensure(&spec).await.unwrap_err();
        assert!(matches!(err, EchoError::Embedding { .. }));
        let files = mgr.files(&spec);
        assert!(!files.model.exists());
        assert!(!files.model.with_extension("part").exists());
    }
}
