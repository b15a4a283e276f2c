// SPDX-FileCopyrightText: 2026 Echo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage adapter trait for the message and fact store.

use async_trait::async_trait;

use crate::error::EchoError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{Fact, Message, NewFact};

/// Persistent store for segmented messages and extracted facts.
///
/// Reads are point lookups in timestamp order. Writes are serialized by the
/// implementation; callers may issue them concurrently.
#[async_trait]
pub trait StorageAdapter: PluginAdapter {
    /// Inserts messages atomically. Returns the number inserted.
    async fn insert_messages(&self, messages: &[Message]) -> Result<usize, EchoError>;

    /// Every message, ordered by timestamp.
    async fn all_messages(&self) -> Result<Vec<Message>, EchoError>;

    /// Distinct conversation ids, ordered by first appearance in time.
    async fn conversation_ids(&self) -> Result<Vec<String>, EchoError>;

    /// Messages of one conversation, ordered by timestamp.
    async fn messages_for_conversation(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<Message>, EchoError>;

    /// Inserts all facts of one conversation in order, in one transaction.
    /// Either every fact is stored or none is.
    async fn insert_facts(
        &self,
        conversation_id: &str,
        facts: &[NewFact],
    ) -> Result<usize, EchoError>;

    /// Facts whose date falls in `month` (`YYYY-MM`), ordered by date then id.
    async fn facts_for_month(&self, month: &str) -> Result<Vec<Fact>, EchoError>;

    /// Distinct `YYYY-MM` months that have facts, ascending.
    async fn fact_months(&self) -> Result<Vec<String>, EchoError>;
}
