// SPDX-FileCopyrightText: 2026 Echo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Monthly timeline synthesis from stored facts.
//!
//! Months are processed one after another with the same session discipline
//! as fact extraction: one ephemeral session per month, always deleted.
//! A month whose synthesis fails is logged and skipped; a store failure
//! stops the run.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use echo_config::model::{AgentConfig, ExtractionConfig, TimelineConfig};
use echo_core::{AgentRequest, AgentRuntime, EchoError, Fact, FactSubject, StorageAdapter};
use futures::StreamExt;
use serde::Serialize;
use tracing::{info, warn};

use crate::schema::{MonthlyTimeline, OutputSchema};

/// Session namespace for timeline runs.
pub const TIMELINE_APP: &str = "timeline_app";

/// System instruction for the timeline agent.
pub const TIMELINE_INSTRUCTION: &str = "You are an expert biographer and data synthesizer. Your \
task is to analyze a list of dated facts extracted from a person's life and generate a coherent, \
narrative timeline for that month. The facts concern 'me' (the user), 'other' (another person), \
and their 'relationship'.\n\n\
From the list of facts, you must:\n\
1. Write a high-level **narrative summary** of the month.\n\
2. Identify and list specific, dateable **Key Events** that occurred, sorting them chronologically.\n\
3. Distill and list the most important **Key Learnings**: new insights or static facts revealed \
during the month, not tied to a single event.\n\n\
Your output must be a single JSON object that strictly adheres to the `MonthlyTimeline` schema.";

#[derive(Debug, Clone, PartialEq)]
pub struct TimelineOptions {
    pub output_dir: PathBuf,
    pub user_id: String,
    pub call_timeout: Duration,
}

impl TimelineOptions {
    pub fn from_config(
        timeline: &TimelineConfig,
        agent: &AgentConfig,
        extraction: &ExtractionConfig,
    ) -> Self {
        Self {
            output_dir: PathBuf::from(&timeline.output_dir),
            user_id: agent.user_id.clone(),
            call_timeout: Duration::from_secs(extraction.call_timeout_secs),
        }
    }
}

/// A fact as shown to the timeline agent.
#[derive(Debug, Serialize)]
struct TimelineFact<'a> {
    id: i64,
    date: &'a str,
    subject: FactSubject,
    predicate: &'a str,
    object: &'a str,
    confidence: f64,
}

#[derive(Debug, Serialize)]
struct MonthlyFactList<'a> {
    facts: Vec<TimelineFact<'a>>,
}

/// Pretty JSON prompt listing a month's facts.
pub fn facts_prompt(facts: &[Fact]) -> Result<String, EchoError> {
    let list = MonthlyFactList {
        facts: facts
            .iter()
            .map(|f| TimelineFact {
                id: f.id,
                date: &f.date,
                subject: f.subject,
                predicate: &f.predicate,
                object: &f.object,
                confidence: f.confidence,
            })
            .collect(),
    };
    serde_json::to_string_pretty(&list)
        .map_err(|e| EchoError::Internal(format!("failed to encode facts: {e}")))
}

/// Validates a `YYYY-MM` month key.
pub fn parse_month(month: &str) -> Result<NaiveDate, EchoError> {
    if month.len() != 7 {
        return Err(EchoError::Validation(format!(
            "month {month:?} is not in YYYY-MM form"
        )));
    }
    NaiveDate::parse_from_str(&format!("{month}-01"), "%Y-%m-%d")
        .map_err(|_| EchoError::Validation(format!("month {month:?} is not in YYYY-MM form")))
}

/// File name of a month's timeline.
pub fn timeline_file_name(month: &str) -> String {
    format!("timeline_{month}.json")
}

/// What happened to one month.
#[derive(Debug, Clone, PartialEq)]
pub enum MonthOutcome {
    Written(PathBuf),
    NoFacts,
    Failed(String),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimelineReport {
    pub written: Vec<PathBuf>,
    pub no_facts: Vec<String>,
    pub failed: Vec<String>,
}

/// Turns each month's facts into a [`MonthlyTimeline`] JSON file.
pub struct TimelineSynthesizer {
    store: Arc<dyn StorageAdapter>,
    agent: Arc<dyn AgentRuntime>,
    schema: OutputSchema<MonthlyTimeline>,
    options: TimelineOptions,
}

impl TimelineSynthesizer {
    pub fn new(
        store: Arc<dyn StorageAdapter>,
        agent: Arc<dyn AgentRuntime>,
        options: TimelineOptions,
    ) -> Result<Self, EchoError> {
        Ok(Self {
            store,
            agent,
            schema: OutputSchema::new()?,
            options,
        })
    }

    /// Synthesize one month, or every month that has facts.
    pub async fn run(&self, month: Option<&str>) -> Result<TimelineReport, EchoError> {
        let months = match month {
            Some(month) => {
                parse_month(month)?;
                vec![month.to_string()]
            }
            None => self.store.fact_months().await?,
        };
        info!(months = months.len(), "starting timeline synthesis");

        let mut report = TimelineReport::default();
        for month in months {
            match self.synthesize_month(&month).await? {
                MonthOutcome::Written(path) => report.written.push(path),
                MonthOutcome::NoFacts => report.no_facts.push(month),
                MonthOutcome::Failed(_) => report.failed.push(month),
            }
        }
        info!(
            written = report.written.len(),
            failed = report.failed.len(),
            "timeline synthesis finished"
        );
        Ok(report)
    }

    /// Store errors are returned; agent and validation failures become
    /// [`MonthOutcome::Failed`].
    pub async fn synthesize_month(&self, month: &str) -> Result<MonthOutcome, EchoError> {
        let facts = self.store.facts_for_month(month).await?;
        if facts.is_empty() {
            info!(month, "no facts for month");
            return Ok(MonthOutcome::NoFacts);
        }
        info!(month, facts = facts.len(), "synthesizing month");
        let prompt = facts_prompt(&facts)?;

        let session_id = format!("timeline_session_{}", month.replace('-', "_"));
        let session = match self
            .agent
            .create_session(TIMELINE_APP, &self.options.user_id, &session_id)
            .await
        {
            Ok(session) => session,
            Err(err) => {
                warn!(month, error = %err, "failed to create agent session");
                return Ok(MonthOutcome::Failed(err.to_string()));
            }
        };

        let request = AgentRequest {
            instruction: TIMELINE_INSTRUCTION.to_string(),
            prompt,
            response_schema: self.schema.json().clone(),
        };
        let call = async {
            let mut events = self.agent.run(&session, request).await?;
            let event = events
                .next()
                .await
                .unwrap_or_else(|| Err(EchoError::agent("agent returned no response event")))?;
            let text = event
                .last_text()
                .ok_or_else(|| EchoError::Validation("agent response carried no text".into()))?;
            self.schema.parse(text)
        };
        let result = tokio::time::timeout(self.options.call_timeout, call)
            .await
            .unwrap_or(Err(EchoError::Timeout {
                duration: self.options.call_timeout,
            }));

        if let Err(err) = self.agent.delete_session(&session).await {
            warn!(month, error = %err, "failed to delete agent session");
        }

        let timeline = match result {
            Ok(timeline) => timeline,
            Err(err) => {
                warn!(month, error = %err, "timeline synthesis failed");
                return Ok(MonthOutcome::Failed(err.to_string()));
            }
        };

        let path = self.options.output_dir.join(timeline_file_name(month));
        write_timeline(&path, &timeline).await?;
        info!(month, path = %path.display(), events = timeline.key_events.len(), "timeline saved");
        Ok(MonthOutcome::Written(path))
    }
}

async fn write_timeline(path: &Path, timeline: &MonthlyTimeline) -> Result<(), EchoError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(|e| {
            EchoError::Internal(format!("failed to create {}: {e}", parent.display()))
        })?;
    }
    let json = serde_json::to_string_pretty(timeline)
        .map_err(|e| EchoError::Internal(format!("failed to encode timeline: {e}")))?;
    tokio::fs::write(path, json)
        .await
        .map_err(|e| EchoError::Internal(format!("failed to write {}: {e}", path.display())))
}
