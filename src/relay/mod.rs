// Relay dispatcher
//
// Reads a session's context and history, forwards the new user message to the
// generative backend under a token budget and a timeout, and records the
// exchange only once a usable reply is in hand.

use std::sync::Arc;
use std::time::Instant;

use crate::config::{PersonaPolicy, RelayConfig};
use crate::context::ConversationContext;
use crate::conversation::{SessionStore, Turn};
use crate::error::{RelayError, Result};
use crate::providers::{LlmProvider, ProviderRequest};

pub struct RelayDispatcher {
    store: Arc<SessionStore>,
    provider: Arc<dyn LlmProvider>,
    config: RelayConfig,
    /// Persona-only context for sessions that never received player data
    fallback_context: ConversationContext,
}

impl RelayDispatcher {
    pub fn new(
        store: Arc<SessionStore>,
        provider: Arc<dyn LlmProvider>,
        persona: &PersonaPolicy,
        config: RelayConfig,
    ) -> Self {
        Self {
            store,
            provider,
            config,
            fallback_context: ConversationContext::persona_only(persona),
        }
    }

    /// Answer `user_message` with the configured token budget
    pub async fn reply(&self, session_id: &str, user_message: &str) -> Result<String> {
        self.respond(session_id, user_message, self.config.max_output_tokens)
            .await
    }

    /// Answer `user_message` for `session_id`, bounding the reply to
    /// `max_output_tokens`.
    ///
    /// A session without context is answered with the persona-only context
    /// and nothing is recorded for it. On any failure the history is left
    /// exactly as it was. Dropping the returned future cancels the backend
    /// call, with the same guarantee.
    pub async fn respond(
        &self,
        session_id: &str,
        user_message: &str,
        max_output_tokens: u32,
    ) -> Result<String> {
        let message = user_message.trim();
        if message.is_empty() {
            return Err(RelayError::Validation("prompt must not be empty".to_string()));
        }

        // Pinned for the whole turn: the reply is recorded in this session or
        // nowhere, even if the id is evicted and reused meanwhile
        let session = self.store.session(session_id);

        // One chat turn at a time per session; context updates don't wait on this
        let _turn = match &session {
            Some(session) => Some(session.begin_turn().await),
            None => None,
        };

        let (context, mut contents) = match &session {
            Some(session) => {
                let snapshot = session.snapshot();
                (snapshot.context, snapshot.history)
            }
            None => {
                tracing::debug!(session_id, "no context set, using persona-only context");
                (self.fallback_context.clone(), Vec::new())
            }
        };
        let prior_turns = contents.len();
        contents.push(Turn::user(message));

        let request = ProviderRequest::new(contents)
            .with_model(self.config.model.clone())
            .with_max_tokens(max_output_tokens)
            .with_system(context.as_str());

        let started = Instant::now();
        let response =
            match tokio::time::timeout(self.config.timeout, self.provider.send_message(&request))
                .await
            {
                Ok(Ok(response)) => response,
                Ok(Err(e)) => return Err(RelayError::Upstream(format!("{e:#}"))),
                Err(_) => {
                    return Err(RelayError::Upstream(format!(
                        "no response within {}s",
                        self.config.timeout.as_secs_f64()
                    )))
                }
            };

        let reply = match response.first_text() {
            Some(text) => text.trim().to_string(),
            None => {
                let first = response.candidates.first();
                tracing::warn!(
                    session_id,
                    candidates = response.candidates.len(),
                    finish_reason = ?first.and_then(|c| c.finish_reason.as_deref()),
                    "backend returned no usable text"
                );
                return Err(RelayError::UpstreamEmptyResponse);
            }
        };

        let persisted = match &session {
            Some(session) => {
                let recorded = self.store.record_exchange(
                    session,
                    Turn::user(message),
                    Turn::model(reply.clone()),
                );
                if !recorded {
                    // evicted while we waited; the reply still stands
                    tracing::debug!(session_id, "session evicted mid-turn, exchange not recorded");
                }
                recorded
            }
            None => false,
        };

        tracing::info!(
            session_id,
            provider = self.provider.name(),
            prior_turns,
            persisted,
            reply_chars = reply.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "chat turn answered"
        );

        Ok(reply)
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }
}
