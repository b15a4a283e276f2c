// SPDX-FileCopyrightText: 2026 Echo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scripted agent runtime.
//!
//! Each session id can be given its own behavior; everything else gets the
//! default (an empty fact list). The mock counts calls that are in flight at
//! once, remembers the peak, and records created and deleted sessions so
//! tests can assert on concurrency bounds and session cleanup.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::stream;

use echo_core::{
    AdapterType, AgentEvent, AgentEventStream, AgentRequest, AgentRuntime, AgentSession,
    EchoError, HealthStatus, PluginAdapter,
};

/// How the mock answers one run.
#[derive(Debug, Clone)]
pub enum AgentBehavior {
    /// Emit one event whose last part is this text.
    Respond(String),
    /// Sleep, then respond.
    DelayedRespond(Duration, String),
    /// Fail the run with an agent transport error.
    Fail(String),
    /// Return a stream that ends without any event.
    NoEvents,
    /// Never answer.
    Hang,
}

#[derive(Default)]
struct Log {
    created: Vec<String>,
    deleted: Vec<String>,
    started: Vec<String>,
    prompts: HashMap<String, String>,
}

/// Agent runtime double with per-session scripting.
pub struct MockAgent {
    default: AgentBehavior,
    scripted: HashMap<String, AgentBehavior>,
    in_flight: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
    log: Mutex<Log>,
}

/// Decrements the in-flight counter even when the run future is dropped.
struct InFlight(Arc<AtomicUsize>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl MockAgent {
    /// A mock that answers every session with `{"facts": []}`.
    pub fn new() -> Self {
        Self::with_default(AgentBehavior::Respond(r#"{"facts": []}"#.to_string()))
    }

    pub fn with_default(default: AgentBehavior) -> Self {
        Self {
            default,
            scripted: HashMap::new(),
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
            log: Mutex::new(Log::default()),
        }
    }

    /// Script the behavior for one session id.
    pub fn script(mut self, session_id: impl Into<String>, behavior: AgentBehavior) -> Self {
        self.scripted.insert(session_id.into(), behavior);
        self
    }

    /// Highest number of runs observed in flight at once.
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// Runs currently in flight.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Session ids in the order their runs started.
    pub fn run_order(&self) -> Vec<String> {
        self.lock().started.clone()
    }

    pub fn created_sessions(&self) -> Vec<String> {
        self.lock().created.clone()
    }

    pub fn deleted_sessions(&self) -> Vec<String> {
        self.lock().deleted.clone()
    }

    /// Sessions created but never deleted.
    pub fn leaked_sessions(&self) -> Vec<String> {
        let log = self.lock();
        log.created
            .iter()
            .filter(|id| !log.deleted.contains(id))
            .cloned()
            .collect()
    }

    /// The prompt sent in a session's run, if any.
    pub fn prompt_for(&self, session_id: &str) -> Option<String> {
        self.lock().prompts.get(session_id).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Log> {
        self.log.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for MockAgent {
    fn default() -> Self {
        Self::new()
    }
}

fn single_event(text: String) -> AgentEventStream {
    Box::pin(stream::iter(vec![Ok(AgentEvent {
        author: "mock".to_string(),
        parts: vec![text],
    })]))
}

#[async_trait]
impl PluginAdapter for MockAgent {
    fn name(&self) -> &str {
        "mock-agent"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Agent
    }

    async fn health_check(&self) -> Result<HealthStatus, EchoError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), EchoError> {
        Ok(())
    }
}

#[async_trait]
impl AgentRuntime for MockAgent {
    async fn create_session(
        &self,
        app_name: &str,
        user_id: &str,
        session_id: &str,
    ) -> Result<AgentSession, EchoError> {
        self.lock().created.push(session_id.to_string());
        Ok(AgentSession {
            app_name: app_name.to_string(),
            user_id: user_id.to_string(),
            session_id: session_id.to_string(),
        })
    }

    async fn run(
        &self,
        session: &AgentSession,
        request: AgentRequest,
    ) -> Result<AgentEventStream, EchoError> {
        {
            let mut log = self.lock();
            log.started.push(session.session_id.clone());
            log.prompts
                .insert(session.session_id.clone(), request.prompt.clone());
        }

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlight(Arc::clone(&self.in_flight));

        let behavior = self
            .scripted
            .get(&session.session_id)
            .unwrap_or(&self.default)
            .clone();

        // Yield so sibling tasks get a chance to start while this one is in flight.
        tokio::task::yield_now().await;

        match behavior {
            AgentBehavior::Respond(text) => Ok(single_event(text)),
            AgentBehavior::DelayedRespond(delay, text) => {
                tokio::time::sleep(delay).await;
                Ok(single_event(text))
            }
            AgentBehavior::Fail(message) => Err(EchoError::agent(message)),
            AgentBehavior::NoEvents => Ok(Box::pin(stream::empty())),
            AgentBehavior::Hang => {
                std::future::pending::<()>().await;
                Err(EchoError::Internal("unreachable".into()))
            }
        }
    }

    async fn delete_session(&self, session: &AgentSession) -> Result<(), EchoError> {
        self.lock().deleted.push(session.session_id.clone());
        Ok(())
    }
}
