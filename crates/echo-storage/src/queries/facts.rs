// SPDX-FileCopyrightText: 2026 Echo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fact queries.

use std::str::FromStr;

use echo_core::{EchoError, Fact, FactSubject, NewFact};
use rusqlite::types::Type;
use rusqlite::{params, Row};

use crate::database::{map_tr_err, Database};

fn row_to_fact(row: &Row<'_>) -> rusqlite::Result<Fact> {
    let subject: String = row.get(2)?;
    let subject = FactSubject::from_str(&subject)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e)))?;
    Ok(Fact {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        subject,
        predicate: row.get(3)?,
        object: row.get(4)?,
        confidence: row.get(5)?,
        source_text: row.get(6)?,
        date: row.get(7)?,
    })
}

/// Insert all facts of one conversation, in order, inside one transaction.
pub async fn insert_facts(
    db: &Database,
    conversation_id: &str,
    facts: &[NewFact],
) -> Result<usize, EchoError> {
    if facts.is_empty() {
        return Ok(0);
    }
    let conversation_id = conversation_id.to_string();
    let facts = facts.to_vec();
    db.connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare_cached(
                    "INSERT INTO facts (conversation_id, subject, predicate, object, confidence, source_text, date)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                )?;
                for fact in &facts {
                    stmt.execute(params![
                        conversation_id,
                        fact.subject.to_string(),
                        fact.predicate,
                        fact.object,
                        fact.confidence,
                        fact.source_text,
                        fact.date,
                    ])?;
                }
            }
            tx.commit()?;
            Ok(facts.len())
        })
        .await
        .map_err(map_tr_err)
}

/// Facts dated within `month` (`YYYY-MM`), ordered by date then insertion.
pub async fn facts_for_month(db: &Database, month: &str) -> Result<Vec<Fact>, EchoError> {
    let month = month.to_string();
    db.connection()
        .call(move |conn| -> Result<Vec<Fact>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT id, conversation_id, subject, predicate, object, confidence, source_text, date
                 FROM facts WHERE strftime('%Y-%m', date) = ?1
                 ORDER BY date ASC, id ASC",
            )?;
            let rows = stmt.query_map(params![month], row_to_fact)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Facts extracted from one conversation, in insertion order.
pub async fn facts_for_conversation(
    db: &Database,
    conversation_id: &str,
) -> Result<Vec<Fact>, EchoError> {
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Vec<Fact>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT id, conversation_id, subject, predicate, object, confidence, source_text, date
                 FROM facts WHERE conversation_id = ?1 ORDER BY id ASC",
            )?;
            let rows = stmt.query_map(params![conversation_id], row_to_fact)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Distinct months that have at least one fact, ascending.
pub async fn fact_months(db: &Database) -> Result<Vec<String>, EchoError> {
    db.connection()
        .call(|conn| -> Result<Vec<String>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT DISTINCT strftime('%Y-%m', date) AS month FROM facts
                 WHERE strftime('%Y-%m', date) IS NOT NULL ORDER BY month ASC",
            )?;
            let rows = stmt.query_map([], |row| row.get(0))?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}
