// SPDX-FileCopyrightText: 2026 Echo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared ONNX Runtime session plus tokenizer for BERT-style encoders.

use std::path::Path;
use std::sync::Mutex;

use echo_core::EchoError;
use ndarray::Array2;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::TensorRef;
use tokenizers::{PaddingParams, Tokenizer, TruncationParams};

/// Raw per-token output of one batch.
pub struct TokenOutput {
    /// Row-major `[batch, seq_len, width]`.
    pub data: Vec<f32>,
    /// Row-major `[batch, seq_len]`.
    pub attention_mask: Vec<i64>,
    pub batch: usize,
    pub seq_len: usize,
    pub width: usize,
}

/// An encoder model loaded from disk.
///
/// Inference is serialized on the session mutex; callers run it on the
/// blocking pool.
pub struct OnnxModel {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
}

// Safety: Session is accessed through Mutex which provides synchronization.
// The tokenizer is thread-safe for encoding operations.
unsafe impl Send for OnnxModel {}
unsafe impl Sync for OnnxModel {}

fn model_err(context: &str, e: impl std::fmt::Display) -> EchoError {
    EchoError::embedding(format!("{context}: {e}"))
}

impl OnnxModel {
    /// Load `model.onnx` and `tokenizer.json`, truncating inputs to `max_tokens`
    /// and padding each batch to its longest member.
    pub fn load(
        model_path: &Path,
        tokenizer_path: &Path,
        max_tokens: usize,
        intra_threads: usize,
    ) -> Result<Self, EchoError> {
        let mut tokenizer = Tokenizer::from_file(tokenizer_path).map_err(|e| {
            model_err(
                &format!("failed to load tokenizer from {}", tokenizer_path.display()),
                e,
            )
        })?;
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: max_tokens,
                ..Default::default()
            }))
            .map_err(|e| model_err("invalid truncation settings", e))?;
        tokenizer.with_padding(Some(PaddingParams::default()));

        let session = Session::builder()
            .map_err(|e| model_err("failed to create ONNX session builder", e))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| model_err("failed to set optimization level", e))?
            .with_intra_threads(intra_threads)
            .map_err(|e| model_err("failed to set thread count", e))?
            .commit_from_file(model_path)
            .map_err(|e| {
                model_err(
                    &format!("failed to load ONNX model from {}", model_path.display()),
                    e,
                )
            })?;

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
        })
    }

    /// Tokenize and run one batch, returning the first output tensor.
    pub fn run(&self, texts: &[String]) -> Result<TokenOutput, EchoError> {
        let batch = texts.len();
        if batch == 0 {
            return Ok(TokenOutput {
                data: Vec::new(),
                attention_mask: Vec::new(),
                batch: 0,
                seq_len: 0,
                width: 0,
            });
        }

        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| model_err("tokenization failed", e))?;
        let seq_len = encodings.first().map(|e| e.get_ids().len()).unwrap_or(0);

        let mut input_ids = Vec::with_capacity(batch * seq_len);
        let mut attention_mask = Vec::with_capacity(batch * seq_len);
        let mut token_type_ids = Vec::with_capacity(batch * seq_len);
        for encoding in &encodings {
            input_ids.extend(encoding.get_ids().iter().map(|&v| v as i64));
            attention_mask.extend(encoding.get_attention_mask().iter().map(|&v| v as i64));
            token_type_ids.extend(encoding.get_type_ids().iter().map(|&v| v as i64));
        }

        let shape = (batch, seq_len);
        let input_ids = Array2::from_shape_vec(shape, input_ids)
            .map_err(|e| model_err("ragged input_ids batch", e))?;
        let mask_array = Array2::from_shape_vec(shape, attention_mask.clone())
            .map_err(|e| model_err("ragged attention_mask batch", e))?;
        let token_type_ids = Array2::from_shape_vec(shape, token_type_ids)
            .map_err(|e| model_err("ragged token_type_ids batch", e))?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| model_err("ONNX session lock poisoned", e))?;

        let outputs = session
            .run(ort::inputs![
                "input_ids" => TensorRef::from_array_view(&input_ids)
                    .map_err(|e| model_err("input_ids tensor", e))?,
                "attention_mask" => TensorRef::from_array_view(&mask_array)
                    .map_err(|e| model_err("attention_mask tensor", e))?,
                "token_type_ids" => TensorRef::from_array_view(&token_type_ids)
                    .map_err(|e| model_err("token_type_ids tensor", e))?
            ])
            .map_err(|e| model_err("ONNX inference failed", e))?;

        let (out_shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| model_err("failed to extract output tensor", e))?;
        if out_shape.len() != 3 {
            return Err(EchoError::embedding(format!(
                "expected a rank-3 output, got rank {}",
                out_shape.len()
            )));
        }
        let width = out_shape[2] as usize;

        Ok(TokenOutput {
            data: data.to_vec(),
            attention_mask,
            batch,
            seq_len,
            width,
        })
    }

    /// Whether the session mutex is still usable.
    pub fn is_healthy(&self) -> bool {
        self.session.lock().is_ok()
    }
}
