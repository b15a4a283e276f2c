// SPDX-FileCopyrightText: 2026 Echo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Concurrency-bounded fact extraction over every stored conversation.
//!
//! Conversations are processed in batches. All units of a batch are launched
//! together and awaited as a group; a shared semaphore caps how many of them
//! hold an agent call at once. Between batches the run pauses, except after
//! the last one.
//!
//! Each unit walks a small state machine:
//!
//! ```text
//! PENDING -> ADMITTED -> EMPTY
//!                     -> RUNNING -> SUCCEEDED | VALIDATION_FAILED | AGENT_ERROR | STORE_FAILED
//!                                -> RELEASED
//! ```
//!
//! Validation and agent failures are isolated to their conversation. A store
//! failure lets the rest of the batch settle and then stops the run.

use std::sync::Arc;
use std::time::Duration;

use echo_config::model::{AgentConfig, ExtractionConfig};
use echo_core::{AgentRequest, AgentRuntime, AgentSession, EchoError, StorageAdapter};
use futures::StreamExt;
use futures::future::join_all;
use strum::Display;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use crate::rate::RateLimiter;
use crate::schema::{ExtractedFacts, OutputSchema};
use crate::transcript::build_transcript;

/// System instruction for the extraction agent.
pub const FACT_INSTRUCTION: &str = "You are an expert in analyzing text conversations to extract \
factual information. You pull information relevant to the sender and receiver's interests, \
hobbies, likes, dislikes, life events, etc. as well as specific details surrounding their \
relationship.\n\n\
These facts must be overarching truths and not specific to the given conversation. For example, \
if a fact is true, it should stay true and not change in a future conversation. If a fact may \
change at ALL during the lifetime and relationship of these individuals, the confidence level \
must drop.\n\
**NOTE**: Text conversations are complex. Sarcasm, inside jokes, and out of context information \
will be present.";

/// Scheduling knobs for one extraction run.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionOptions {
    pub max_concurrent: usize,
    pub batch_size: usize,
    pub batch_delay: Duration,
    pub call_timeout: Duration,
    pub max_calls_per_minute: Option<u32>,
    pub app_name: String,
    pub user_id: String,
}

impl ExtractionOptions {
    pub fn from_config(extraction: &ExtractionConfig, agent: &AgentConfig) -> Self {
        Self {
            max_concurrent: extraction.max_concurrent,
            batch_size: extraction.batch_size,
            batch_delay: Duration::from_secs_f64(extraction.batch_delay_secs.max(0.0)),
            call_timeout: Duration::from_secs(extraction.call_timeout_secs),
            max_calls_per_minute: extraction.max_calls_per_minute,
            app_name: agent.app_name.clone(),
            user_id: agent.user_id.clone(),
        }
    }
}

impl Default for ExtractionOptions {
    fn default() -> Self {
        Self::from_config(&ExtractionConfig::default(), &AgentConfig::default())
    }
}

/// Lifecycle of one conversation's extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum UnitState {
    Pending,
    Admitted,
    Running,
    Empty,
    Succeeded,
    ValidationFailed,
    AgentError,
    StoreFailed,
    Released,
}

impl UnitState {
    fn can_move_to(self, next: UnitState) -> bool {
        use UnitState::*;
        matches!(
            (self, next),
            (Pending, Admitted)
                | (Admitted, Empty)
                | (Admitted, Running)
                | (Admitted, AgentError)
                | (Admitted, StoreFailed)
                | (Running, Succeeded)
                | (Running, ValidationFailed)
                | (Running, AgentError)
                | (Running, StoreFailed)
                | (Succeeded, Released)
                | (ValidationFailed, Released)
                | (AgentError, Released)
                | (StoreFailed, Released)
        )
    }

    /// Terminal outcome states (before release).
    pub fn is_outcome(self) -> bool {
        matches!(
            self,
            UnitState::Empty
                | UnitState::Succeeded
                | UnitState::ValidationFailed
                | UnitState::AgentError
                | UnitState::StoreFailed
        )
    }
}

/// How one conversation ended.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitOutcome {
    pub conversation_id: String,
    pub state: UnitState,
    pub facts: usize,
    pub detail: Option<String>,
}

/// Tally of one extraction run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractionReport {
    pub conversations: usize,
    pub batches: usize,
    pub succeeded: usize,
    pub empty: usize,
    pub validation_failed: usize,
    pub agent_errors: usize,
    pub store_failed: usize,
    pub facts_inserted: usize,
    /// Per-conversation outcomes in launch order.
    pub outcomes: Vec<UnitOutcome>,
}

impl ExtractionReport {
    fn record(&mut self, outcome: UnitOutcome) {
        self.conversations += 1;
        match outcome.state {
            UnitState::Succeeded => self.succeeded += 1,
            UnitState::Empty => self.empty += 1,
            UnitState::ValidationFailed => self.validation_failed += 1,
            UnitState::AgentError => self.agent_errors += 1,
            UnitState::StoreFailed => self.store_failed += 1,
            _ => {}
        }
        self.facts_inserted += outcome.facts;
        self.outcomes.push(outcome);
    }
}

/// Tracks and logs one unit's state transitions.
struct Unit<'a> {
    conversation_id: &'a str,
    state: UnitState,
}

impl<'a> Unit<'a> {
    fn new(conversation_id: &'a str) -> Self {
        Self {
            conversation_id,
            state: UnitState::Pending,
        }
    }

    fn advance(&mut self, next: UnitState) {
        debug_assert!(
            self.state.can_move_to(next),
            "illegal transition {} -> {next}",
            self.state
        );
        debug!(
            conversation_id = self.conversation_id,
            from = %self.state,
            to = %next,
            "unit transition"
        );
        self.state = next;
    }
}

/// Runs the extraction agent over conversations and stores what it finds.
pub struct FactExtractor {
    store: Arc<dyn StorageAdapter>,
    agent: Arc<dyn AgentRuntime>,
    options: ExtractionOptions,
    schema: OutputSchema<ExtractedFacts>,
    gate: Semaphore,
    limiter: Option<RateLimiter>,
}

impl FactExtractor {
    pub fn new(
        store: Arc<dyn StorageAdapter>,
        agent: Arc<dyn AgentRuntime>,
        options: ExtractionOptions,
    ) -> Result<Self, EchoError> {
        if options.max_concurrent == 0 || options.batch_size == 0 {
            return Err(EchoError::Config(
                "max_concurrent and batch_size must be at least 1".into(),
            ));
        }
        Ok(Self {
            store,
            agent,
            schema: OutputSchema::new()?,
            gate: Semaphore::new(options.max_concurrent),
            limiter: options.max_calls_per_minute.map(RateLimiter::per_minute),
            options,
        })
    }

    /// Extract facts from every stored conversation.
    pub async fn run(&self) -> Result<ExtractionReport, EchoError> {
        let ids = self.store.conversation_ids().await?;
        if ids.is_empty() {
            info!("no conversations to process");
            return Ok(ExtractionReport::default());
        }
        self.run_for(&ids).await
    }

    /// Extract facts from the given conversations, in order.
    ///
    /// Returns the storage error if any unit failed to persist; the batch
    /// containing it is allowed to finish first.
    pub async fn run_for(&self, conversation_ids: &[String]) -> Result<ExtractionReport, EchoError> {
        let total_batches = conversation_ids.len().div_ceil(self.options.batch_size);
        info!(
            conversations = conversation_ids.len(),
            total_batches,
            max_concurrent = self.options.max_concurrent,
            "starting fact extraction"
        );

        let mut report = ExtractionReport::default();
        for (index, batch) in conversation_ids.chunks(self.options.batch_size).enumerate() {
            let batch_num = index + 1;
            info!(batch = batch_num, total_batches, size = batch.len(), "processing batch");

            let results = join_all(batch.iter().map(|id| self.process(id))).await;
            report.batches += 1;

            let mut store_error = None;
            for (outcome, err) in results {
                report.record(outcome);
                if let Some(err) = err {
                    store_error.get_or_insert(err);
                }
            }

            info!(
                batch = batch_num,
                processed = report.conversations,
                total = conversation_ids.len(),
                facts = report.facts_inserted,
                "batch complete"
            );

            if let Some(err) = store_error {
                error!(batch = batch_num, error = %err, "fact store failed, stopping run");
                return Err(err);
            }

            if batch_num < total_batches && !self.options.batch_delay.is_zero() {
                tokio::time::sleep(self.options.batch_delay).await;
            }
        }

        info!(
            succeeded = report.succeeded,
            empty = report.empty,
            validation_failed = report.validation_failed,
            agent_errors = report.agent_errors,
            facts = report.facts_inserted,
            "fact extraction finished"
        );
        Ok(report)
    }

    /// One unit of work. The error slot carries a run-fatal storage error.
    async fn process(&self, conversation_id: &str) -> (UnitOutcome, Option<EchoError>) {
        let mut unit = Unit::new(conversation_id);
        let outcome = |state, facts, detail| UnitOutcome {
            conversation_id: conversation_id.to_string(),
            state,
            facts,
            detail,
        };

        let _permit = match self.gate.acquire().await {
            Ok(permit) => permit,
            Err(_) => {
                let err = EchoError::Internal("admission gate closed".into());
                return (outcome(UnitState::AgentError, 0, Some(err.to_string())), None);
            }
        };
        unit.advance(UnitState::Admitted);

        let messages = match self.store.messages_for_conversation(conversation_id).await {
            Ok(messages) => messages,
            Err(err) => {
                unit.advance(UnitState::StoreFailed);
                error!(conversation_id, error = %err, "failed to load messages");
                unit.advance(UnitState::Released);
                return (
                    outcome(UnitState::StoreFailed, 0, Some(err.to_string())),
                    Some(err),
                );
            }
        };
        if messages.is_empty() {
            unit.advance(UnitState::Empty);
            info!(conversation_id, "skipping conversation with no messages");
            return (outcome(UnitState::Empty, 0, None), None);
        }
        let transcript = build_transcript(&messages);

        if let Some(limiter) = &self.limiter {
            limiter.acquire().await;
        }

        let session_id = format!("session_{conversation_id}");
        let session = match self
            .agent
            .create_session(&self.options.app_name, &self.options.user_id, &session_id)
            .await
        {
            Ok(session) => session,
            Err(err) => {
                unit.advance(UnitState::AgentError);
                warn!(conversation_id, error = %err, "failed to create agent session");
                unit.advance(UnitState::Released);
                return (outcome(UnitState::AgentError, 0, Some(err.to_string())), None);
            }
        };
        unit.advance(UnitState::Running);

        let (result, fatal) = self.extract_and_store(conversation_id, &session, transcript).await;
        unit.advance(result.state);

        if let Err(err) = self.agent.delete_session(&session).await {
            warn!(conversation_id, error = %err, "failed to delete agent session");
        }
        unit.advance(UnitState::Released);

        (result, fatal)
    }

    async fn extract_and_store(
        &self,
        conversation_id: &str,
        session: &AgentSession,
        transcript: String,
    ) -> (UnitOutcome, Option<EchoError>) {
        let outcome = |state, facts, detail| UnitOutcome {
            conversation_id: conversation_id.to_string(),
            state,
            facts,
            detail,
        };

        let facts = match self.invoke(session, transcript).await.and_then(|text| {
            self.schema
                .parse(&text)
                .and_then(ExtractedFacts::into_new_facts)
        }) {
            Ok(facts) => facts,
            Err(err @ EchoError::Validation(_)) => {
                warn!(conversation_id, error = %err, "agent output failed validation");
                return (
                    outcome(UnitState::ValidationFailed, 0, Some(err.to_string())),
                    None,
                );
            }
            Err(err) => {
                warn!(conversation_id, error = %err, "agent call failed");
                return (outcome(UnitState::AgentError, 0, Some(err.to_string())), None);
            }
        };

        match self.store.insert_facts(conversation_id, &facts).await {
            Ok(inserted) => {
                info!(conversation_id, facts = inserted, "facts stored");
                (outcome(UnitState::Succeeded, inserted, None), None)
            }
            Err(err) => {
                error!(conversation_id, error = %err, "failed to store facts");
                (
                    outcome(UnitState::StoreFailed, 0, Some(err.to_string())),
                    Some(err),
                )
            }
        }
    }

    /// Run the agent and return the text of its first response event.
    async fn invoke(&self, session: &AgentSession, transcript: String) -> Result<String, EchoError> {
        let request = AgentRequest {
            instruction: FACT_INSTRUCTION.to_string(),
            prompt: transcript,
            response_schema: self.schema.json().clone(),
        };

        let call = async {
            let mut events = self.agent.run(session, request).await?;
            match events.next().await {
                Some(event) => event,
                None => Err(EchoError::agent("agent returned no response event")),
            }
        };
        let event = tokio::time::timeout(self.options.call_timeout, call)
            .await
            .map_err(|_| EchoError::Timeout {
                duration: self.options.call_timeout,
            })??;

        match event.last_text() {
            Some(text) if !text.trim().is_empty() => Ok(text.to_string()),
            _ => Err(EchoError::Validation(
                "agent response carried no text".into(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_machine_accepts_documented_paths() {
        use UnitState::*;
        for path in [
            vec![Pending, Admitted, Empty],
            vec![Pending, Admitted, Running, Succeeded, Released],
            vec![Pending, Admitted, Running, ValidationFailed, Released],
            vec![Pending, Admitted, Running, AgentError, Released],
            vec![Pending, Admitted, Running, StoreFailed, Released],
            vec![Pending, Admitted, AgentError, Released],
        ] {
            for pair in path.windows(2) {
                assert!(pair[0].can_move_to(pair[1]), "{} -> {}", pair[0], pair[1]);
            }
        }
        assert!(!Pending.can_move_to(Running));
        assert!(!Succeeded.can_move_to(Running));
        assert!(!Empty.can_move_to(Released));
    }

    #[test]
    fn states_render_screaming_snake() {
        assert_eq!(UnitState::ValidationFailed.to_string(), "VALIDATION_FAILED");
        assert_eq!(UnitState::AgentError.to_string(), "AGENT_ERROR");
        assert!(UnitState::StoreFailed.is_outcome());
        assert!(!UnitState::Released.is_outcome());
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn rejected_output_is_logged_against_its_conversation() {
        use echo_test_utils::{message, AgentBehavior, MemoryStore, MockAgent};

        let store = Arc::new(MemoryStore::with_messages(vec![message("conv_0", 0, "hi", true)]));
        let agent = Arc::new(MockAgent::with_default(AgentBehavior::Respond(
            r#"{"facts": "none"}"#.into(),
        )));
        let extractor = FactExtractor::new(store, agent, ExtractionOptions::default()).unwrap();

        let report = extractor.run().await.unwrap();

        assert_eq!(report.validation_failed, 1);
        assert!(logs_contain("agent output failed validation"));
        assert!(logs_contain("conv_0"));
        assert!(logs_contain("VALIDATION_FAILED"));
    }

    #[test]
    fn options_follow_config() {
        let opts = ExtractionOptions::default();
        assert_eq!(opts.max_concurrent, 5);
        assert_eq!(opts.batch_size, 50);
        assert_eq!(opts.batch_delay, Duration::from_secs(5));
        assert_eq!(opts.call_timeout, Duration::from_secs(120));
        assert_eq!(opts.app_name, "fact_extraction");
    }
}
