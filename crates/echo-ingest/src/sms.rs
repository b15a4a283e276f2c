// SPDX-FileCopyrightText: 2026 Echo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reader for iOS `sms.db` message exports.
//!
//! The export stores `message.date` as nanoseconds since the CoreData
//! reference date (2001-01-01T00:00:00Z). Messages are matched to a contact
//! when the digits of the handle contain the digits of the phone number.

use std::path::Path;

use chrono::{DateTime, Utc};
use echo_core::{EchoError, RawMessage};
use rusqlite::OpenFlags;
use tokio_rusqlite::Connection;
use tracing::debug;

/// Seconds between the Unix epoch and the CoreData reference date.
pub const COREDATA_EPOCH_UNIX: i64 = 978_307_200;

const NANOS_PER_SEC: i64 = 1_000_000_000;

/// Keep only the digits of a phone number or handle id.
pub fn normalize_phone(phone: &str) -> String {
    phone.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Convert a CoreData nanosecond timestamp to Unix seconds and an RFC 3339 string.
pub fn coredata_to_unix(ns: i64) -> Result<(f64, String), EchoError> {
    let unix_nanos = ns
        .checked_add(COREDATA_EPOCH_UNIX * NANOS_PER_SEC)
        .ok_or_else(|| EchoError::Validation(format!("timestamp {ns} is out of range")))?;
    let wallclock: DateTime<Utc> = DateTime::from_timestamp_nanos(unix_nanos);
    let seconds = COREDATA_EPOCH_UNIX as f64 + ns as f64 / NANOS_PER_SEC as f64;
    Ok((seconds, wallclock.to_rfc3339()))
}

/// Read all messages exchanged with `phone`, oldest first.
pub async fn read_sms_export(path: &Path, phone: &str) -> Result<Vec<RawMessage>, EchoError> {
    if !path.exists() {
        return Err(EchoError::NotFound(format!(
            "source export {}",
            path.display()
        )));
    }

    let digits = normalize_phone(phone);
    if digits.is_empty() {
        return Err(EchoError::Validation(format!(
            "phone number {phone:?} contains no digits"
        )));
    }

    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .await
    .map_err(|e| EchoError::Storage {
        source: Box::new(e),
    })?;

    let rows = conn
        .call(|conn| -> Result<Vec<(Option<String>, Option<String>, bool, i64)>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT handle.id, message.text, message.is_from_me, message.date
                 FROM message
                 INNER JOIN handle ON message.handle_id = handle.ROWID
                 ORDER BY message.date ASC",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
            })?;
            rows.collect()
        })
        .await
        .map_err(|e| EchoError::Storage {
            source: Box::new(e),
        })?;
    let rows: Vec<_> = rows
        .into_iter()
        .filter(|(handle, ..)| {
            handle
                .as_deref()
                .is_some_and(|id| normalize_phone(id).contains(&digits))
        })
        .collect();
    debug!(rows = rows.len(), "read source export");

    rows.into_iter()
        .map(|(_, text, is_from_me, date)| {
            let (timestamp, date_iso) = coredata_to_unix(date)?;
            Ok(RawMessage {
                text: text.unwrap_or_default(),
                is_from_me,
                timestamp,
                date_iso,
            })
        })
        .collect()
}
