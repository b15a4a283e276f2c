// SPDX-FileCopyrightText: 2026 Echo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `echo index` and `echo search` command implementations.

use std::sync::Arc;

use echo_config::EchoConfig;
use echo_core::{DenseEmbedder, EchoError, ScoredPoint, SparseEmbedder, StorageAdapter};
use echo_embed::{
    BatchProgress, EmbeddingPipeline, HybridSearcher, ModelManager, ModelSpec, OnnxDenseEmbedder,
    PipelineOptions, SpladeEmbedder,
};
use echo_qdrant::QdrantIndex;
use echo_storage::SqliteStore;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

/// Download (if needed) and load both encoders.
async fn load_encoders(
    config: &EchoConfig,
) -> Result<(Arc<dyn DenseEmbedder>, Arc<dyn SparseEmbedder>), EchoError> {
    let embedding = &config.embedding;
    let manager = ModelManager::from_config(embedding);

    let dense_files = manager.ensure(&ModelSpec::dense(embedding)).await?;
    let sparse_files = manager.ensure(&ModelSpec::sparse(embedding)).await?;

    let dense = OnnxDenseEmbedder::new(
        &dense_files.model,
        &dense_files.tokenizer,
        embedding.dense_dimensions,
        embedding.pooling,
        embedding.max_tokens,
        embedding.intra_threads,
    )?;
    let sparse = SpladeEmbedder::new(
        &sparse_files.model,
        &sparse_files.tokenizer,
        embedding.max_tokens,
        embedding.intra_threads,
    )?;
    info!(
        dense = %embedding.dense_model,
        sparse = %embedding.sparse_model,
        "encoders loaded"
    );
    Ok((Arc::new(dense), Arc::new(sparse)))
}

fn progress_bar(total: u64) -> ProgressBar {
    let bar = ProgressBar::new(total);
    if let Ok(style) =
        ProgressStyle::with_template("{spinner} [{elapsed_precise}] {bar:40} {pos}/{len} {msg}")
    {
        bar.set_style(style.progress_chars("=> "));
    }
    bar
}

pub async fn run_index(config: &EchoConfig, recreate: bool) -> Result<(), EchoError> {
    let store = SqliteStore::open(&config.storage.database_path).await?;
    let messages = store.all_messages().await?;
    store.close().await?;
    if messages.is_empty() {
        println!("No messages in {}; run `echo import` first.", config.storage.database_path);
        return Ok(());
    }

    let (dense, sparse) = load_encoders(config).await?;
    let index = Arc::new(QdrantIndex::new(&config.index)?);

    let mut options = PipelineOptions::from_config(&config.embedding, &config.index);
    options.recreate |= recreate;
    let pipeline = EmbeddingPipeline::new(dense, sparse, index, options)?;

    let bar = progress_bar(messages.len() as u64);
    let report = pipeline
        .run_with_progress(&messages, |progress: BatchProgress| {
            bar.set_position(progress.points_done as u64);
            bar.set_message(format!("batch {}/{}", progress.batch, progress.total_batches));
        })
        .await;
    match &report {
        Ok(_) => bar.finish_with_message("done"),
        Err(_) => bar.abandon_with_message("failed"),
    }
    let report = report?;

    println!(
        "Indexed {} messages in {} batches into '{}'{}",
        report.points_upserted,
        report.batches,
        config.index.collection,
        if report.collection_created {
            " (new collection)"
        } else {
            ""
        }
    );
    Ok(())
}

fn render_hit(rank: usize, hit: &ScoredPoint) -> String {
    match &hit.payload {
        Some(payload) => format!(
            "{rank:>2}. [{:.4}] {} {}: {}",
            hit.score,
            payload.date_iso,
            if payload.is_from_me { "Me" } else { "Other" },
            payload.text
        ),
        None => format!("{rank:>2}. [{:.4}] {}", hit.score, hit.id),
    }
}

pub async fn run_search(
    config: &EchoConfig,
    query: &str,
    limit: Option<u64>,
) -> Result<(), EchoError> {
    let (dense, sparse) = load_encoders(config).await?;
    let index = Arc::new(QdrantIndex::new(&config.index)?);
    let searcher = HybridSearcher::new(dense, sparse, index, config.index.collection.clone());

    let hits = searcher
        .search(query, limit.unwrap_or(config.index.search_limit))
        .await?;
    if hits.is_empty() {
        println!("No matches.");
    }
    for (i, hit) in hits.iter().enumerate() {
        println!("{}", render_hit(i + 1, hit));
    }
    Ok(())
}
