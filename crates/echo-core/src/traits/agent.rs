// SPDX-FileCopyrightText: 2026 Echo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Generative agent runtime trait.

use std::pin::Pin;

use async_trait::async_trait;
use futures_core::Stream;

use crate::error::EchoError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{AgentEvent, AgentRequest, AgentSession};

/// Stream of events produced by one agent run.
pub type AgentEventStream = Pin<Box<dyn Stream<Item = Result<AgentEvent, EchoError>> + Send>>;

/// Session-scoped access to a generative model with structured output.
///
/// Sessions are ephemeral: callers create one per unit of work and must
/// delete it on every exit path.
#[async_trait]
pub trait AgentRuntime: PluginAdapter {
    /// Creates a new session.
    async fn create_session(
        &self,
        app_name: &str,
        user_id: &str,
        session_id: &str,
    ) -> Result<AgentSession, EchoError>;

    /// Runs one request in the session and returns its event stream.
    async fn run(
        &self,
        session: &AgentSession,
        request: AgentRequest,
    ) -> Result<AgentEventStream, EchoError>;

    /// Deletes a session. Deleting an unknown session is not an error.
    async fn delete_session(&self, session: &AgentSession) -> Result<(), EchoError>;
}
