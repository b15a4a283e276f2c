// SPDX-FileCopyrightText: 2026 Echo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `echo doctor` command implementation.
//!
//! Runs diagnostic checks against the local database, the model cache, and
//! the external services each pipeline stage depends on.

use std::io::IsTerminal;
use std::time::{Duration, Instant};

use echo_config::EchoConfig;
use echo_core::{EchoError, HealthStatus, PluginAdapter};
use echo_embed::{ModelManager, ModelSpec};
use echo_qdrant::QdrantIndex;

/// Status of a diagnostic check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
}

/// Result of a single diagnostic check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub duration: Duration,
}

impl CheckResult {
    fn new(name: &str, status: CheckStatus, message: impl Into<String>, start: Instant) -> Self {
        Self {
            name: name.to_string(),
            status,
            message: message.into(),
            duration: start.elapsed(),
        }
    }
}

pub async fn run_doctor(config: &EchoConfig) -> Result<(), EchoError> {
    let use_color = std::io::stdout().is_terminal();
    let results = vec![
        check_database(&config.storage.database_path).await,
        check_models(config),
        check_vector_index(config).await,
        check_agent_key(config),
        check_memory_baseline(),
    ];

    println!();
    println!("  echo doctor");
    println!("  {}", "-".repeat(50));

    let mut issues = 0;
    for result in &results {
        if result.status != CheckStatus::Pass {
            issues += 1;
        }
        println!("{}", render_line(result, use_color));
    }
    println!();

    if issues > 0 {
        let issue_word = if issues == 1 { "issue" } else { "issues" };
        println!("  {issues} {issue_word} found.");
    } else {
        println!("  All checks passed.");
    }
    println!();
    Ok(())
}

fn render_line(result: &CheckResult, use_color: bool) -> String {
    let duration_ms = result.duration.as_millis();
    if use_color {
        use colored::Colorize;
        let (symbol, message) = match result.status {
            CheckStatus::Pass => ("✓".green().to_string(), result.message.normal()),
            CheckStatus::Warn => ("!".yellow().to_string(), result.message.yellow()),
            CheckStatus::Fail => ("✗".red().to_string(), result.message.red()),
        };
        format!(
            "    {symbol} {:<20} {message} ({duration_ms}ms)",
            result.name
        )
    } else {
        let tag = match result.status {
            CheckStatus::Pass => "[OK]  ",
            CheckStatus::Warn => "[WARN]",
            CheckStatus::Fail => "[FAIL]",
        };
        format!(
            "    {tag} {:<20} {} ({duration_ms}ms)",
            result.name, result.message
        )
    }
}

/// Database exists, opens, and holds messages.
async fn check_database(db_path: &str) -> CheckResult {
    let start = Instant::now();
    if !std::path::Path::new(db_path).exists() {
        return CheckResult::new(
            "Database",
            CheckStatus::Warn,
            format!("not found: {db_path} (run `echo import`)"),
            start,
        );
    }

    let conn = match tokio_rusqlite::Connection::open(db_path).await {
        Ok(conn) => conn,
        Err(e) => {
            return CheckResult::new("Database", CheckStatus::Fail, format!("open failed: {e}"), start);
        }
    };
    let counts = conn
        .call(|conn| {
            let messages: i64 = conn.query_row("SELECT COUNT(*) FROM messages", [], |r| r.get(0))?;
            let facts: i64 = conn.query_row("SELECT COUNT(*) FROM facts", [], |r| r.get(0))?;
            Ok::<_, rusqlite::Error>((messages, facts))
        })
        .await;

    match counts {
        Ok((messages, facts)) => CheckResult::new(
            "Database",
            CheckStatus::Pass,
            format!("{messages} messages, {facts} facts"),
            start,
        ),
        Err(e) => CheckResult::new("Database", CheckStatus::Fail, format!("query failed: {e}"), start),
    }
}

/// Both encoders are in the model cache.
fn check_models(config: &EchoConfig) -> CheckResult {
    let start = Instant::now();
    let manager = ModelManager::from_config(&config.embedding);
    let missing: Vec<String> = [
        ModelSpec::dense(&config.embedding),
        ModelSpec::sparse(&config.embedding),
    ]
    .into_iter()
    .filter(|spec| !manager.is_available(spec))
    .map(|spec| spec.name)
    .collect();

    if missing.is_empty() {
        CheckResult::new("Models", CheckStatus::Pass, "cached", start)
    } else {
        CheckResult::new(
            "Models",
            CheckStatus::Warn,
            format!("not downloaded: {} (fetched on first index)", missing.join(", ")),
            start,
        )
    }
}

async fn check_vector_index(config: &EchoConfig) -> CheckResult {
    let start = Instant::now();
    let index = match QdrantIndex::new(&config.index) {
        Ok(index) => index,
        Err(e) => return CheckResult::new("Vector index", CheckStatus::Fail, e.to_string(), start),
    };
    match index.health_check().await {
        Ok(HealthStatus::Healthy) => {
            CheckResult::new("Vector index", CheckStatus::Pass, "reachable", start)
        }
        Ok(HealthStatus::Degraded(msg)) => {
            CheckResult::new("Vector index", CheckStatus::Warn, msg, start)
        }
        Ok(HealthStatus::Unhealthy(msg)) => {
            CheckResult::new("Vector index", CheckStatus::Fail, msg, start)
        }
        Err(e) => CheckResult::new("Vector index", CheckStatus::Fail, e.to_string(), start),
    }
}

/// The agent has credentials. No request is sent, so no quota is spent.
fn check_agent_key(config: &EchoConfig) -> CheckResult {
    let start = Instant::now();
    let has_key = config.agent.api_key.as_ref().is_some_and(|k| !k.is_empty())
        || std::env::var("GEMINI_API_KEY").is_ok_and(|k| !k.is_empty());
    if has_key {
        CheckResult::new("Agent API key", CheckStatus::Pass, "configured", start)
    } else {
        CheckResult::new(
            "Agent API key",
            CheckStatus::Warn,
            "no API key configured (needed by `facts` and `timeline`)",
            start,
        )
    }
}

fn check_memory_baseline() -> CheckResult {
    let start = Instant::now();

    #[cfg(not(target_env = "msvc"))]
    {
        let _ = tikv_jemalloc_ctl::epoch::advance();
        let allocated = tikv_jemalloc_ctl::stats::allocated::read().unwrap_or(0);
        let resident = tikv_jemalloc_ctl::stats::resident::read().unwrap_or(0);
        let allocated_mb = allocated as f64 / (1024.0 * 1024.0);
        let resident_mb = resident as f64 / (1024.0 * 1024.0);
        CheckResult::new(
            "Memory baseline",
            CheckStatus::Pass,
            format!("heap: {allocated_mb:.1} MB, resident: {resident_mb:.1} MB"),
            start,
        )
    }

    #[cfg(target_env = "msvc")]
    {
        CheckResult::new(
            "Memory baseline",
            CheckStatus::Warn,
            "jemalloc not available on MSVC",
            start,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_database_warns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.db");
        let result = check_database(path.to_str().unwrap()).await;
        assert_eq!(result.status, CheckStatus::Warn);
        assert!(result.message.contains("not found"));
    }

    #[tokio::test]
    async fn database_without_schema_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.db");
        std::fs::write(&path, b"").unwrap();
        let result = check_database(path.to_str().unwrap()).await;
        assert_eq!(result.status, CheckStatus::Fail);
    }

    #[test]
    fn missing_models_warn_with_names() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = EchoConfig::default();
        config.embedding.model_dir = Some(dir.path().display().to_string());
        let result = check_models(&config);
        assert_eq!(result.status, CheckStatus::Warn);
        assert!(result.message.contains(&config.embedding.dense_model));
    }

    #[test]
    fn configured_key_passes() {
        let mut config = EchoConfig::default();
        config.agent.api_key = Some("key".into());
        assert_eq!(check_agent_key(&config).status, CheckStatus::Pass);
    }

    #[test]
    fn plain_lines_are_tagged() {
        let result = CheckResult {
            name: "Models".into(),
            status: CheckStatus::Warn,
            message: "not downloaded".into(),
            duration: Duration::from_millis(3),
        };
        let line = render_line(&result, false);
        assert!(line.starts_with("    [WARN] Models"));
        assert!(line.ends_with("not downloaded (3ms)"));
    }
}
