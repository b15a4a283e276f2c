// SPDX-FileCopyrightText: 2026 Echo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reductions from per-token model outputs to one vector per text.
//!
//! All functions take a flat row-major `[batch, seq_len, width]` buffer and
//! the matching `[batch, seq_len]` attention mask.

use echo_core::SparseVector;

/// First-token (`[CLS]`) hidden state for every row.
pub fn cls_pool(hidden: &[f32], batch: usize, seq_len: usize, width: usize) -> Vec<Vec<f32>> {
    (0..batch)
        .map(|b| {
            let start = b * seq_len * width;
            hidden[start..start + width].to_vec()
        })
        .collect()
}

/// Attention-masked mean over tokens for every row.
pub fn mean_pool(
    hidden: &[f32],
    attention_mask: &[i64],
    batch: usize,
    seq_len: usize,
    width: usize,
) -> Vec<Vec<f32>> {
    (0..batch)
        .map(|b| {
            let mut sum = vec![0.0f32; width];
            let mut count = 0.0f32;
            for t in 0..seq_len {
                if attention_mask[b * seq_len + t] == 0 {
                    continue;
                }
                let row = &hidden[(b * seq_len + t) * width..][..width];
                for (acc, v) in sum.iter_mut().zip(row) {
                    *acc += v;
                }
                count += 1.0;
            }
            if count > 0.0 {
                sum.iter_mut().for_each(|v| *v /= count);
            }
            sum
        })
        .collect()
}

/// L2-normalize a vector. Zero vectors are returned unchanged.
pub fn l2_normalize(vec: &[f32]) -> Vec<f32> {
    let norm: f32 = vec.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        vec.iter().map(|v| v / norm).collect()
    } else {
        vec.to_vec()
    }
}

/// SPLADE max pooling: `w[v] = max_t ln(1 + relu(logit[t, v]))` over unmasked
/// tokens. Only non-zero weights are kept, in ascending vocabulary order.
pub fn splade_pool(
    logits: &[f32],
    attention_mask: &[i64],
    batch: usize,
    seq_len: usize,
    vocab: usize,
) -> Vec<SparseVector> {
    (0..batch)
        .map(|b| {
            let mut weights = vec![0.0f32; vocab];
            for t in 0..seq_len {
                if attention_mask[b * seq_len + t] == 0 {
                    continue;
                }
                let row = &logits[(b * seq_len + t) * vocab..][..vocab];
                for (w, &logit) in weights.iter_mut().zip(row) {
                    let activated = logit.max(0.0).ln_1p();
                    if activated > *w {
                        *w = activated;
                    }
                }
            }

            let mut sparse = SparseVector::default();
            for (index, weight) in weights.into_iter().enumerate() {
                if weight > 0.0 {
                    sparse.indices.push(index as u32);
                    sparse.values.push(weight);
                }
            }
            sparse
        })
        .collect()
}
