// SPDX-FileCopyrightText: 2026 Echo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Import against a synthetic `sms.db` export.

use std::path::Path;
use std::time::Duration;

use echo_core::{EchoError, StorageAdapter};
use echo_ingest::{import_sms, ImportOptions};
use echo_storage::SqliteStore;

const SEC: i64 = 1_000_000_000;

fn write_export(path: &Path, rows: &[(i64, Option<&str>, bool, i64)]) {
    let conn = rusqlite::Connection::open(path).unwrap();
    conn.execute_batch(
        "CREATE TABLE handle (ROWID INTEGER PRIMARY KEY, id TEXT);
         CREATE TABLE message (ROWID INTEGER PRIMARY KEY, text TEXT, is_from_me INTEGER, date INTEGER, handle_id INTEGER);
         INSERT INTO handle (ROWID, id) VALUES (1, '+1 555-010-0199'), (2, '+44 20 7946 0000');",
    )
    .unwrap();
    for (handle, text, from_me, date) in rows {
        conn.execute(
            "INSERT INTO message (text, is_from_me, date, handle_id) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![text, from_me, date, handle],
        )
        .unwrap();
    }
}

fn options(dir: &Path, phone: &str) -> ImportOptions {
    ImportOptions {
        source: dir.join("sms.db"),
        phone: phone.to_string(),
        target: dir.join("echo.db"),
        gap: Duration::from_secs(30 * 60),
        recreate: true,
    }
}

#[tokio::test]
async fn imports_and_segments_one_contact() {
    let dir = tempfile::tempdir().unwrap();
    write_export(
        &dir.path().join("sms.db"),
        &[
            (1, Some("later reply"), false, 3000 * SEC),
            (1, Some("hi"), true, 0),
            (2, Some("other contact"), false, 10 * SEC),
            (1, None, false, 60 * SEC),
        ],
    );

    let report = import_sms(&options(dir.path(), "15550100199")).await.unwrap();
    assert_eq!(report.messages, 3);
    assert_eq!(report.conversations, 2);

    let store = SqliteStore::open(dir.path().join("echo.db").to_str().unwrap())
        .await
        .unwrap();
    let messages = store.all_messages().await.unwrap();
    let labels: Vec<_> = messages.iter().map(|m| m.conversation_id.as_str()).collect();
    assert_eq!(labels, ["conv_0", "conv_0", "conv_1"]);
    assert_eq!(messages[0].text, "hi");
    assert!(messages[0].is_from_me);
    assert_eq!(messages[0].date_iso, "2001-01-01T00:00:00+00:00");
    assert_eq!(messages[1].text, "");
    assert_eq!(messages[2].timestamp, 978_307_200.0 + 3000.0);
    store.close().await.unwrap();
}

#[tokio::test]
async fn unknown_contact_is_a_validation_error() {
    let dir = tempfile::tempdir().unwrap();
    write_export(&dir.path().join("sms.db"), &[(1, Some("hi"), true, 0)]);

    let err = import_sms(&options(dir.path(), "999")).await.unwrap_err();
    assert!(matches!(err, EchoError::Validation(_)));
    assert!(!dir.path().join("echo.db").exists());
}

#[tokio::test]
async fn recreate_replaces_previous_import() {
    let dir = tempfile::tempdir().unwrap();
    write_export(
        &dir.path().join("sms.db"),
        &[(1, Some("a"), true, 0), (1, Some("b"), false, SEC)],
    );
    let opts = options(dir.path(), "+1-555-010-0199");

    import_sms(&opts).await.unwrap();
    let report = import_sms(&opts).await.unwrap();
    assert_eq!(report.messages, 2);

    let store = SqliteStore::open(opts.target.to_str().unwrap()).await.unwrap();
    assert_eq!(store.all_messages().await.unwrap().len(), 2);
    store.close().await.unwrap();
}

#[tokio::test]
async fn import_without_recreate_refuses_a_populated_target() {
    let dir = tempfile::tempdir().unwrap();
    write_export(
        &dir.path().join("sms.db"),
        &[(1, Some("a"), true, 0), (1, Some("b"), false, SEC)],
    );
    let mut opts = options(dir.path(), "15550100199");
    import_sms(&opts).await.unwrap();

    opts.recreate = false;
    let err = import_sms(&opts).await.unwrap_err();
    assert!(matches!(err, EchoError::Validation(_)));

    let store = SqliteStore::open(opts.target.to_str().unwrap()).await.unwrap();
    let conv_0 = store.messages_for_conversation("conv_0").await.unwrap();
    let texts: Vec<_> = conv_0.iter().map(|m| m.text.as_str()).collect();
    assert_eq!(texts, ["a", "b"]);
    assert_eq!(store.all_messages().await.unwrap().len(), 2);
    store.close().await.unwrap();
}

#[tokio::test]
async fn import_without_recreate_fills_an_empty_target() {
    let dir = tempfile::tempdir().unwrap();
    write_export(&dir.path().join("sms.db"), &[(1, Some("a"), true, 0)]);
    let mut opts = options(dir.path(), "15550100199");
    opts.recreate = false;

    let report = import_sms(&opts).await.unwrap();
    assert_eq!(report.messages, 1);
}

#[tokio::test]
async fn punctuated_phone_matches_its_handle() {
    let dir = tempfile::tempdir().unwrap();
    write_export(
        &dir.path().join("sms.db"),
        &[(1, Some("hi"), true, 0), (2, Some("other contact"), false, SEC)],
    );

    let report = import_sms(&options(dir.path(), "(555) 010-0199")).await.unwrap();
    assert_eq!(report.messages, 1);
}
