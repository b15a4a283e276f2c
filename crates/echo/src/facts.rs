// SPDX-FileCopyrightText: 2026 Echo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `echo facts` and `echo timeline` command implementations.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use echo_config::EchoConfig;
use echo_core::{AgentRuntime, EchoError, StorageAdapter};
use echo_facts::{
    write_master_timeline, ExtractionOptions, FactExtractor, TimelineOptions, TimelineSynthesizer,
};
use echo_gemini::GeminiAgent;
use echo_storage::SqliteStore;

async fn open_adapters(
    config: &EchoConfig,
) -> Result<(Arc<dyn StorageAdapter>, Arc<dyn AgentRuntime>), EchoError> {
    let agent: Arc<dyn AgentRuntime> = Arc::new(GeminiAgent::new(&config.agent)?);
    let store: Arc<dyn StorageAdapter> =
        Arc::new(SqliteStore::open(&config.storage.database_path).await?);
    Ok((store, agent))
}

pub async fn run_facts(config: &EchoConfig, conversations: Vec<String>) -> Result<(), EchoError> {
    let (store, agent) = open_adapters(config).await?;
    let options = ExtractionOptions::from_config(&config.extraction, &config.agent);
    let extractor = FactExtractor::new(store, agent, options)?;

    let report = if conversations.is_empty() {
        extractor.run().await?
    } else {
        extractor.run_for(&conversations).await?
    };

    println!(
        "Processed {} conversations in {} batches: {} succeeded, {} empty, {} failed validation, {} agent errors; {} facts stored",
        report.conversations,
        report.batches,
        report.succeeded,
        report.empty,
        report.validation_failed,
        report.agent_errors,
        report.facts_inserted
    );
    Ok(())
}

/// The master timeline lands next to the monthly files unless it is given a directory.
fn master_path(config: &EchoConfig) -> PathBuf {
    let file = Path::new(&config.timeline.master_file);
    if file.parent().is_some_and(|p| !p.as_os_str().is_empty()) {
        file.to_path_buf()
    } else {
        Path::new(&config.timeline.output_dir).join(file)
    }
}

pub async fn run_timeline(
    config: &EchoConfig,
    month: Option<&str>,
    master_only: bool,
) -> Result<(), EchoError> {
    if !master_only {
        let (store, agent) = open_adapters(config).await?;
        let options =
            TimelineOptions::from_config(&config.timeline, &config.agent, &config.extraction);
        let synthesizer = TimelineSynthesizer::new(store, agent, options)?;
        let report = synthesizer.run(month).await?;
        println!(
            "Wrote {} monthly timelines ({} without facts, {} failed)",
            report.written.len(),
            report.no_facts.len(),
            report.failed.len()
        );
        for failed in &report.failed {
            println!("  failed: {failed}");
        }
    }

    let report =
        write_master_timeline(Path::new(&config.timeline.output_dir), &master_path(config)).await?;
    println!(
        "Master timeline: {} events from {} files -> {}",
        report.events,
        report.files_read,
        report.path.display()
    );
    Ok(())
}
