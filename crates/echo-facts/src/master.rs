// SPDX-FileCopyrightText: 2026 Echo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Master timeline: every month's key events merged into one markdown file.

use std::fmt::Write;
use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate};
use echo_core::EchoError;
use serde::Deserialize;
use tracing::{info, warn};

use crate::schema::TimelineEvent;

pub const NO_EVENTS_LINE: &str = "No key events found across all timelines.";

/// The part of a saved monthly timeline the master view needs.
#[derive(Debug, Deserialize)]
struct SavedTimeline {
    #[serde(default)]
    key_events: Vec<TimelineEvent>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MasterReport {
    pub files_read: usize,
    pub files_skipped: usize,
    pub events: usize,
    pub path: PathBuf,
}

/// Render events as markdown grouped by year and month, oldest first.
///
/// Events with dates that do not parse as `YYYY-MM-DD` are dropped. Events on
/// the same day keep their input order.
pub fn render_master_timeline(events: &[TimelineEvent]) -> String {
    let mut dated: Vec<(NaiveDate, &TimelineEvent)> = events
        .iter()
        .filter_map(|event| {
            match NaiveDate::parse_from_str(event.event_date.trim(), "%Y-%m-%d") {
                Ok(date) => Some((date, event)),
                Err(_) => {
                    warn!(event_date = %event.event_date, "skipping event with unparseable date");
                    None
                }
            }
        })
        .collect();
    dated.sort_by_key(|(date, _)| *date);

    let mut out = String::from("## Key Events\n\n");
    if dated.is_empty() {
        out.push_str(NO_EVENTS_LINE);
        out.push('\n');
        return out;
    }

    let mut current_year = None;
    let mut current_month = None;
    for (date, event) in dated {
        if current_year != Some(date.year()) {
            let _ = write!(out, "\n### {}\n", date.year());
            current_year = Some(date.year());
            current_month = None;
        }
        if current_month != Some(date.month()) {
            if current_month.is_some() {
                out.push('\n');
            }
            let _ = writeln!(out, "#### {}", date.format("%B"));
            current_month = Some(date.month());
        }
        let _ = writeln!(
            out,
            "- **{}:** {}",
            date.format("%Y-%m-%d"),
            event.description
        );
    }
    out
}

/// `timeline_*.json` files in `dir`, sorted by name. A missing directory has none.
async fn timeline_files(dir: &Path) -> Result<Vec<PathBuf>, EchoError> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(dir = %dir.display(), "timeline directory does not exist");
            return Ok(Vec::new());
        }
        Err(e) => {
            return Err(EchoError::Internal(format!(
                "failed to read {}: {e}",
                dir.display()
            )));
        }
    };

    let mut files = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| EchoError::Internal(format!("failed to read {}: {e}", dir.display())))?
    {
        let path = entry.path();
        let is_timeline = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with("timeline_") && n.ends_with(".json"));
        if is_timeline {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Merge every monthly timeline in `dir` into a markdown file at `output`.
pub async fn write_master_timeline(dir: &Path, output: &Path) -> Result<MasterReport, EchoError> {
    let mut report = MasterReport {
        path: output.to_path_buf(),
        ..Default::default()
    };
    let mut events = Vec::new();

    for path in timeline_files(dir).await? {
        let parsed = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| e.to_string())
            .and_then(|raw| {
                serde_json::from_str::<SavedTimeline>(&raw).map_err(|e| e.to_string())
            });
        match parsed {
            Ok(timeline) => {
                report.files_read += 1;
                events.extend(timeline.key_events);
            }
            Err(e) => {
                report.files_skipped += 1;
                warn!(path = %path.display(), error = %e, "skipping unreadable timeline");
            }
        }
    }

    let markdown = render_master_timeline(&events);
    report.events = markdown.lines().filter(|l| l.starts_with("- **")).count();

    if let Some(parent) = output.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent).await.map_err(|e| {
            EchoError::Internal(format!("failed to create {}: {e}", parent.display()))
        })?;
    }
    tokio::fs::write(output, markdown)
        .await
        .map_err(|e| EchoError::Internal(format!("failed to write {}: {e}", output.display())))?;

    info!(
        path = %output.display(),
        files = report.files_read,
        skipped = report.files_skipped,
        events = report.events,
        "master timeline saved"
    );
    Ok(report)
}
