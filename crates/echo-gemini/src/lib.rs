// SPDX-FileCopyrightText: 2026 Echo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Google Gemini adapter implementing [`AgentRuntime`].
//!
//! Sessions live in memory only. Each session keeps its turn history, so a
//! second run in the same session sees the first exchange. A run sends the
//! request's instruction as the system instruction and asks for JSON output
//! constrained by the request's schema.

pub mod client;
pub mod schema;
pub mod types;

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use echo_config::model::AgentConfig;
use echo_core::{
    AdapterType, AgentEvent, AgentEventStream, AgentRequest, AgentRuntime, AgentSession,
    EchoError, HealthStatus, PluginAdapter,
};
use futures::stream;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::client::GeminiClient;
use crate::types::{Content, GenerateContentRequest, GenerationConfig};

/// Gemini-backed agent runtime with in-memory sessions.
///
/// API key resolution order: config -> `GEMINI_API_KEY` env var -> error.
pub struct GeminiAgent {
    client: GeminiClient,
    sessions: Mutex<HashMap<String, Vec<Content>>>,
}

impl GeminiAgent {
    pub fn new(config: &AgentConfig) -> Result<Self, EchoError> {
        let api_key = resolve_api_key(&config.api_key)?;
        let client = GeminiClient::new(
            &api_key,
            config.model.clone(),
            config.base_url.clone(),
            Duration::from_secs(config.timeout_secs),
        )?;
        info!(model = %config.model, "Gemini agent initialized");
        Ok(Self::with_client(client))
    }

    pub fn with_client(client: GeminiClient) -> Self {
        Self {
            client,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Number of live sessions.
    pub async fn session_count(&self) -> usize {
        self.sessions.lock().await.len()
    }
}

fn session_key(session: &AgentSession) -> String {
    format!(
        "{}/{}/{}",
        session.app_name, session.user_id, session.session_id
    )
}

#[async_trait]
impl PluginAdapter for GeminiAgent {
    fn name(&self) -> &str {
        "gemini"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Agent
    }

    async fn health_check(&self) -> Result<HealthStatus, EchoError> {
        // Avoid spending quota on health checks.
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), EchoError> {
        let open = self.sessions.lock().await.len();
        if open > 0 {
            warn!(open, "Gemini agent shutting down with open sessions");
        }
        Ok(())
    }
}

#[async_trait]
impl AgentRuntime for GeminiAgent {
    async fn create_session(
        &self,
        app_name: &str,
        user_id: &str,
        session_id: &str,
    ) -> Result<AgentSession, EchoError> {
        let session = AgentSession {
            app_name: app_name.to_string(),
            user_id: user_id.to_string(),
            session_id: session_id.to_string(),
        };
        let mut sessions = self.sessions.lock().await;
        let key = session_key(&session);
        if sessions.contains_key(&key) {
            return Err(EchoError::agent(format!(
                "session {session_id} already exists"
            )));
        }
        sessions.insert(key, Vec::new());
        debug!(session_id, "session created");
        Ok(session)
    }

    async fn run(
        &self,
        session: &AgentSession,
        request: AgentRequest,
    ) -> Result<AgentEventStream, EchoError> {
        let key = session_key(session);
        let mut contents = self
            .sessions
            .lock()
            .await
            .get(&key)
            .cloned()
            .ok_or_else(|| {
                EchoError::agent(format!("unknown session {}", session.session_id))
            })?;
        contents.push(Content::user(request.prompt));

        let body = GenerateContentRequest {
            contents: contents.clone(),
            system_instruction: Some(Content::system(request.instruction)),
            generation_config: GenerationConfig {
                response_mime_type: "application/json".into(),
                response_schema: schema::to_response_schema(&request.response_schema),
            },
        };

        // The session lock is not held across the HTTP call.
        let response = self.client.generate(&body).await?;

        if let Some(usage) = &response.usage_metadata {
            debug!(
                session_id = %session.session_id,
                prompt_tokens = usage.prompt_token_count,
                output_tokens = usage.candidates_token_count,
                "generateContent usage"
            );
        }

        let Some(candidate) = response.candidates.into_iter().next() else {
            if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
                return Err(EchoError::agent(format!("prompt blocked: {reason}")));
            }
            return Ok(Box::pin(stream::empty()));
        };

        let content = candidate.content.unwrap_or(Content {
            role: Some("model".into()),
            parts: Vec::new(),
        });
        let event = AgentEvent {
            author: self.client.model().to_string(),
            parts: content.texts(),
        };

        contents.push(content);
        if let Some(history) = self.sessions.lock().await.get_mut(&key) {
            *history = contents;
        }

        if let Some(reason) = candidate.finish_reason.as_deref()
            && reason != "STOP"
        {
            warn!(session_id = %session.session_id, reason, "generation finished early");
        }

        Ok(Box::pin(stream::iter(vec![Ok(event)])))
    }

    async fn delete_session(&self, session: &AgentSession) -> Result<(), EchoError> {
        self.sessions.lock().await.remove(&session_key(session));
        debug!(session_id = %session.session_id, "session deleted");
        Ok(())
    }
}

/// Resolves the API key from config or environment.
fn resolve_api_key(config_key: &Option<String>) -> Result<String, EchoError> {
    if let Some(key) = config_key
        && !key.is_empty()
    {
        return Ok(key.clone());
    }

    std::env::var("GEMINI_API_KEY").map_err(|_| {
        EchoError::Config(
            "Gemini API key not found. Set agent.api_key in config or GEMINI_API_KEY environment variable.".into(),
        )
    })
}
