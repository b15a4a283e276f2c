// SPDX-FileCopyrightText: 2026 Echo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message queries.

use echo_core::{EchoError, Message};
use rusqlite::{params, Row};

use crate::database::{map_tr_err, Database};

const MESSAGE_COLUMNS: &str =
    "id, conversation_id, text, is_from_me, timestamp_seconds, date_iso";

fn row_to_message(row: &Row<'_>) -> rusqlite::Result<Message> {
    Ok(Message {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        text: row.get(2)?,
        is_from_me: row.get(3)?,
        timestamp: row.get(4)?,
        date_iso: row.get(5)?,
    })
}

/// Insert messages in one transaction. Returns the number of rows written.
pub async fn insert_messages(db: &Database, messages: &[Message]) -> Result<usize, EchoError> {
    let messages = messages.to_vec();
    db.connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            let tx = conn.transaction()?;
            let mut written = 0;
            {
                let mut stmt = tx.prepare_cached(
                    "INSERT INTO messages (id, conversation_id, text, is_from_me, timestamp_seconds, date_iso)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                )?;
                for msg in &messages {
                    written += stmt.execute(params![
                        msg.id,
                        msg.conversation_id,
                        msg.text,
                        msg.is_from_me,
                        msg.timestamp,
                        msg.date_iso,
                    ])?;
                }
            }
            tx.commit()?;
            Ok(written)
        })
        .await
        .map_err(map_tr_err)
}

/// Every message in timestamp order.
pub async fn all_messages(db: &Database) -> Result<Vec<Message>, EchoError> {
    db.connection()
        .call(|conn| -> Result<Vec<Message>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages ORDER BY timestamp_seconds ASC, rowid ASC"
            ))?;
            let rows = stmt.query_map([], row_to_message)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Messages of one conversation in timestamp order.
pub async fn messages_for_conversation(
    db: &Database,
    conversation_id: &str,
) -> Result<Vec<Message>, EchoError> {
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Vec<Message>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages WHERE conversation_id = ?1
                 ORDER BY timestamp_seconds ASC, rowid ASC"
            ))?;
            let rows = stmt.query_map(params![conversation_id], row_to_message)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Distinct conversation ids ordered by their earliest message.
pub async fn conversation_ids(db: &Database) -> Result<Vec<String>, EchoError> {
    db.connection()
        .call(|conn| -> Result<Vec<String>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT conversation_id FROM messages
                 GROUP BY conversation_id
                 ORDER BY MIN(timestamp_seconds) ASC",
            )?;
            let rows = stmt.query_map([], |row| row.get(0))?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Total number of stored messages.
pub async fn count_messages(db: &Database) -> Result<u64, EchoError> {
    db.connection()
        .call(|conn| -> Result<i64, rusqlite::Error> {
            conn.query_row("SELECT COUNT(*) FROM messages", [], |row| row.get(0))
        })
        .await
        .map(|n| n as u64)
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(id: &str, conv: &str, ts: f64) -> Message {
        Message {
            id: id.to_string(),
            conversation_id: conv.to_string(),
            text: format!("text {id}"),
            is_from_me: id.ends_with('0'),
            timestamp: ts,
            date_iso: format!("iso {ts}"),
        }
    }

    #[tokio::test]
    async fn insert_and_read_back_in_timestamp_order() {
        let db = Database::open_in_memory().await.unwrap();
        let written = insert_messages(
            &db,
            &[msg("m2", "conv_0", 20.0), msg("m0", "conv_0", 0.0), msg("m1", "conv_0", 10.0)],
        )
        .await
        .unwrap();
        assert_eq!(written, 3);

        let all = all_messages(&db).await.unwrap();
        let ids: Vec<_> = all.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["m0", "m1", "m2"]);
        assert!(all[0].is_from_me);
        assert!(!all[1].is_from_me);
        assert_eq!(count_messages(&db).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn conversation_lookup_filters_and_orders() {
        let db = Database::open_in_memory().await.unwrap();
        insert_messages(
            &db,
            &[
                msg("a", "conv_1", 5000.0),
                msg("b", "conv_0", 0.0),
                msg("c", "conv_1", 4000.0),
                msg("d", "conv_0", 60.0),
            ],
        )
        .await
        .unwrap();

        assert_eq!(conversation_ids(&db).await.unwrap(), ["conv_0", "conv_1"]);

        let conv1 = messages_for_conversation(&db, "conv_1").await.unwrap();
        let ids: Vec<_> = conv1.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["c", "a"]);

        assert!(messages_for_conversation(&db, "conv_9").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn duplicate_id_rolls_back_whole_batch() {
        let db = Database::open_in_memory().await.unwrap();
        let result = insert_messages(&db, &[msg("x", "conv_0", 0.0), msg("x", "conv_0", 1.0)]).await;
        assert!(matches!(result, Err(EchoError::Storage { .. })));
        assert_eq!(count_messages(&db).await.unwrap(), 0);
    }
}
