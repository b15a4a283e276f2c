// SPDX-FileCopyrightText: 2026 Echo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background thread.
//! `Database` wraps exactly one `tokio_rusqlite::Connection`, and every query
//! module goes through [`Database::connection`]. Concurrent callers (for
//! example, fact extraction tasks persisting results) therefore never contend
//! for the write lock. Do NOT create additional Connection instances for writes.

use std::path::Path;

use echo_core::EchoError;
use tokio_rusqlite::Connection;
use tracing::debug;

/// Handle to the message and fact database.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (creating if needed) the database at `path` and apply migrations.
    pub async fn open(path: &str) -> Result<Self, EchoError> {
        if let Some(parent) = Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| EchoError::Storage {
                source: Box::new(e),
            })?;
        }

        let conn = Connection::open(path)
            .await
            .map_err(|e| EchoError::Storage {
                source: Box::new(e),
            })?;
        debug!(path, "opened database");
        Self::initialize(conn).await
    }

    /// Open a private in-memory database with the full schema.
    pub async fn open_in_memory() -> Result<Self, EchoError> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| EchoError::Storage {
                source: Box::new(e),
            })?;
        Self::initialize(conn).await
    }

    async fn initialize(conn: Connection) -> Result<Self, EchoError> {
        conn.call(|conn| -> Result<(), rusqlite::Error> {
            conn.pragma_update(None, "journal_mode", "WAL")?;
            conn.pragma_update(None, "synchronous", "NORMAL")?;
            conn.pragma_update(None, "busy_timeout", 5000)?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        conn.call(|conn| Ok::<_, rusqlite::Error>(crate::migrations::run_migrations(conn)))
            .await
            .map_err(map_tr_err)??;

        Ok(Self { conn })
    }

    /// The single serialized connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Checkpoint the WAL and close the connection.
    pub async fn close(self) -> Result<(), EchoError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        self.conn.close().await.map_err(|e| EchoError::Storage {
            source: Box::new(e),
        })
    }
}

/// Convert a tokio-rusqlite error into [`EchoError::Storage`].
pub(crate) fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> EchoError {
    EchoError::Storage {
        source: Box::new(e),
    }
}
