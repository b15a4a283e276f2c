// SPDX-FileCopyrightText: 2026 Echo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory storage adapter.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;

use echo_core::{
    AdapterType, EchoError, Fact, HealthStatus, Message, NewFact, PluginAdapter, StorageAdapter,
};

#[derive(Default)]
struct Tables {
    messages: Vec<Message>,
    facts: Vec<Fact>,
    next_fact_id: i64,
    fact_writes: Vec<String>,
}

/// Storage double with the same ordering guarantees as the SQLite store.
///
/// `fail_inserts_for(conversation)` makes fact inserts for that conversation
/// fail with a storage error, leaving nothing written.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    failing: HashSet<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-loaded with `messages`.
    pub fn with_messages(messages: Vec<Message>) -> Self {
        let store = Self::default();
        store.lock().messages = messages;
        store
    }

    pub fn fail_inserts_for(mut self, conversation_id: impl Into<String>) -> Self {
        self.failing.insert(conversation_id.into());
        self
    }

    /// Every stored fact in insertion order.
    pub fn facts(&self) -> Vec<Fact> {
        self.lock().facts.clone()
    }

    /// Conversations whose facts were written, in write order.
    pub fn fact_writes(&self) -> Vec<String> {
        self.lock().fact_writes.clone()
    }

    /// Add facts directly, bypassing failure injection.
    pub fn seed_facts(&self, conversation_id: &str, facts: &[NewFact]) {
        let mut tables = self.lock();
        for fact in facts {
            Self::push_fact(&mut tables, conversation_id, fact);
        }
    }

    fn push_fact(tables: &mut Tables, conversation_id: &str, fact: &NewFact) {
        tables.next_fact_id += 1;
        let id = tables.next_fact_id;
        tables.facts.push(Fact {
            id,
            conversation_id: conversation_id.to_string(),
            subject: fact.subject,
            predicate: fact.predicate.clone(),
            object: fact.object.clone(),
            confidence: fact.confidence,
            source_text: fact.source_text.clone(),
            date: fact.date.clone(),
        });
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn sorted_by_time(mut messages: Vec<Message>) -> Vec<Message> {
    messages.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
    messages
}

#[async_trait]
impl PluginAdapter for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, EchoError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), EchoError> {
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for MemoryStore {
    async fn insert_messages(&self, messages: &[Message]) -> Result<usize, EchoError> {
        self.lock().messages.extend_from_slice(messages);
        Ok(messages.len())
    }

    async fn all_messages(&self) -> Result<Vec<Message>, EchoError> {
        Ok(sorted_by_time(self.lock().messages.clone()))
    }

    async fn conversation_ids(&self) -> Result<Vec<String>, EchoError> {
        let mut seen = HashSet::new();
        Ok(self
            .all_messages()
            .await?
            .into_iter()
            .filter(|m| seen.insert(m.conversation_id.clone()))
            .map(|m| m.conversation_id)
            .collect())
    }

    async fn messages_for_conversation(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<Message>, EchoError> {
        let messages = self
            .lock()
            .messages
            .iter()
            .filter(|m| m.conversation_id == conversation_id)
            .cloned()
            .collect();
        Ok(sorted_by_time(messages))
    }

    async fn insert_facts(
        &self,
        conversation_id: &str,
        facts: &[NewFact],
    ) -> Result<usize, EchoError> {
        if self.failing.contains(conversation_id) {
            return Err(EchoError::Storage {
                source: format!("injected write failure for {conversation_id}").into(),
            });
        }
        let mut tables = self.lock();
        tables.fact_writes.push(conversation_id.to_string());
        for fact in facts {
            Self::push_fact(&mut tables, conversation_id, fact);
        }
        Ok(facts.len())
    }

    async fn facts_for_month(&self, month: &str) -> Result<Vec<Fact>, EchoError> {
        let mut facts: Vec<Fact> = self
            .lock()
            .facts
            .iter()
            .filter(|f| f.date.starts_with(month) && f.date.get(7..8) == Some("-"))
            .cloned()
            .collect();
        facts.sort_by(|a, b| a.date.cmp(&b.date).then(a.id.cmp(&b.id)));
        Ok(facts)
    }

    async fn fact_months(&self) -> Result<Vec<String>, EchoError> {
        let mut months: Vec<String> = self
            .lock()
            .facts
            .iter()
            .filter_map(|f| f.date.get(..7).map(str::to_string))
            .collect();
        months.sort();
        months.dedup();
        Ok(months)
    }
}
