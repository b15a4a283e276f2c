// SPDX-FileCopyrightText: 2026 Echo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the StorageAdapter trait.

use async_trait::async_trait;
use tracing::debug;

use echo_core::{
    AdapterType, EchoError, Fact, HealthStatus, Message, NewFact, PluginAdapter, StorageAdapter,
};

use crate::database::{map_tr_err, Database};
use crate::queries;

/// SQLite-backed message and fact store.
///
/// Wraps a [`Database`] handle and delegates to the typed query modules.
pub struct SqliteStore {
    db: Database,
}

impl SqliteStore {
    /// Open the store at `path`, creating and migrating it if needed.
    pub async fn open(path: &str) -> Result<Self, EchoError> {
        Ok(Self {
            db: Database::open(path).await?,
        })
    }

    /// Wrap an already-open database.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Access the underlying database for queries outside the trait.
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Checkpoint and close the database.
    pub async fn close(self) -> Result<(), EchoError> {
        self.db.close().await
    }
}

#[async_trait]
impl PluginAdapter for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, EchoError> {
        self.db
            .connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), EchoError> {
        self.db
            .connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        debug!("sqlite store checkpointed");
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for SqliteStore {
    async fn insert_messages(&self, messages: &[Message]) -> Result<usize, EchoError> {
        queries::messages::insert_messages(&self.db, messages).await
    }

    async fn all_messages(&self) -> Result<Vec<Message>, EchoError> {
        queries::messages::all_messages(&self.db).await
    }

    async fn conversation_ids(&self) -> Result<Vec<String>, EchoError> {
        queries::messages::conversation_ids(&self.db).await
    }

    async fn messages_for_conversation(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<Message>, EchoError> {
        queries::messages::messages_for_conversation(&self.db, conversation_id).await
    }

    async fn insert_facts(
        &self,
        conversation_id: &str,
        facts: &[NewFact],
    ) -> Result<usize, EchoError> {
        queries::facts::insert_facts(&self.db, conversation_id, facts).await
    }

    async fn facts_for_month(&self, month: &str) -> Result<Vec<Fact>, EchoError> {
        queries::facts::facts_for_month(&self.db, month).await
    }

    async fn fact_months(&self) -> Result<Vec<String>, EchoError> {
        queries::facts::fact_months(&self.db).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use echo_core::FactSubject;

    #[tokio::test]
    async fn store_round_trips_through_trait_object() {
        let store: Box<dyn StorageAdapter> =
            Box::new(SqliteStore::new(Database::open_in_memory().await.unwrap()));
        assert_eq!(store.health_check().await.unwrap(), HealthStatus::Healthy);

        store
            .insert_messages(&[Message {
                id: "m".into(),
                conversation_id: "conv_0".into(),
                text: "hi".into(),
                is_from_me: false,
                timestamp: 1.0,
                date_iso: "1970-01-01T00:00:01+00:00".into(),
            }])
            .await
            .unwrap();
        assert_eq!(store.conversation_ids().await.unwrap(), ["conv_0"]);

        store
            .insert_facts(
                "conv_0",
                &[NewFact {
                    subject: FactSubject::Relationship,
                    predicate: "met at".into(),
                    object: "school".into(),
                    confidence: 0.5,
                    source_text: "hi".into(),
                    date: "1970-01-01".into(),
                }],
            )
            .await
            .unwrap();
        let facts = store.facts_for_month("1970-01").await.unwrap();
        assert_eq!(facts.len(), 1);
        assert_eq!(facts[0].conversation_id, "conv_0");
        store.shutdown().await.unwrap();
    }
}
