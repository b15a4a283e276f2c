// SPDX-FileCopyrightText: 2026 Echo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end import: source export to segmented message store.

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use echo_core::{EchoError, StorageAdapter};
use echo_storage::SqliteStore;
use tracing::info;

use crate::segmenter::segment;
use crate::sms::read_sms_export;

/// Parameters for one import run.
#[derive(Debug, Clone)]
pub struct ImportOptions {
    /// Path to the `sms.db` export.
    pub source: PathBuf,
    /// Contact phone number to import.
    pub phone: String,
    /// Target message database.
    pub target: PathBuf,
    /// Conversation gap threshold.
    pub gap: Duration,
    /// Delete the target database first. Without it the target must hold no
    /// messages.
    pub recreate: bool,
}

/// Outcome of an import run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportReport {
    pub messages: usize,
    pub conversations: usize,
}

/// Import, segment, and store every message exchanged with one contact.
///
/// A missing source is [`EchoError::NotFound`]. A contact with no messages,
/// or a non-recreating import into a target that already holds messages, is
/// [`EchoError::Validation`]. All three leave the target untouched.
pub async fn import_sms(opts: &ImportOptions) -> Result<ImportReport, EchoError> {
    let target = opts
        .target
        .to_str()
        .ok_or_else(|| EchoError::Config(format!("target path {:?} is not UTF-8", opts.target)))?;

    let raw = read_sms_export(&opts.source, &opts.phone).await?;
    if raw.is_empty() {
        return Err(EchoError::Validation(format!(
            "no messages found for {} in {}",
            opts.phone,
            opts.source.display()
        )));
    }
    info!(count = raw.len(), "fetched messages from export");

    if opts.recreate {
        remove_database(&opts.target).await?;
    }

    let store = SqliteStore::open(target).await?;
    if !opts.recreate {
        let existing = store.conversation_ids().await?.len();
        if existing > 0 {
            store.close().await?;
            return Err(EchoError::Validation(format!(
                "{target} already holds {existing} conversations; \
                 conversation ids are assigned once, so re-import with recreate"
            )));
        }
    }

    let messages = segment(raw, opts.gap);
    let conversations = messages
        .iter()
        .map(|m| m.conversation_id.as_str())
        .collect::<HashSet<_>>()
        .len();

    let inserted = store.insert_messages(&messages).await?;
    store.close().await?;

    info!(messages = inserted, conversations, db = target, "import complete");
    Ok(ImportReport {
        messages: inserted,
        conversations,
    })
}

/// Remove a SQLite database together with its WAL sidecar files.
async fn remove_database(path: &std::path::Path) -> Result<(), EchoError> {
    let mut candidates = vec![path.to_path_buf()];
    for suffix in ["-wal", "-shm"] {
        let mut sidecar = path.as_os_str().to_owned();
        sidecar.push(suffix);
        candidates.push(PathBuf::from(sidecar));
    }

    for candidate in candidates {
        match tokio::fs::remove_file(&candidate).await {
            Ok(()) => info!(path = %candidate.display(), "removed existing database file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(EchoError::Storage {
                    source: Box::new(e),
                });
            }
        }
    }
    Ok(())
}
