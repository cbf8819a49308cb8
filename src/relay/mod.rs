//! The conversation relay: seed, append, call upstream, append the reply.
//!
//! Transcript semantics: the user entry is appended before the upstream call
//! and is kept even when the call fails, so a retried question appears twice
//! in context. The assistant entry is only appended on a confirmed reply.

use crate::characters::CharacterBook;
use crate::providers::{Provider, ProviderError};
use crate::transcripts::{TranscriptEntry, TranscriptKey, TranscriptStore};
use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Reply for empty or whitespace-only input. Served without touching the
/// transcript or the upstream API.
pub const EMPTY_MESSAGE_REPLY: &str = "Empty message, please type something.";

/// Generic reply when the upstream API answers with a non-success status.
pub const UPSTREAM_FAILED_REPLY: &str =
    "The model did not respond, please try again later.";

/// Deterministic sampling: the relay always asks for temperature 0.
const TEMPERATURE: f64 = 0.0;

/// Outcome of one relay exchange, mapped to HTTP by the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayOutcome {
    /// Input was empty; fixed friendly reply, HTTP 200.
    EmptyMessage,
    /// Upstream replied; HTTP 200.
    Reply(String),
    /// Upstream returned a non-success status; fixed generic reply, HTTP 500.
    UpstreamFailed,
    /// Transport or decode failure; reply embeds the error text, HTTP 500.
    Failed(String),
}

impl RelayOutcome {
    /// The user-visible message for this outcome.
    pub fn message(&self) -> String {
        match self {
            RelayOutcome::EmptyMessage => EMPTY_MESSAGE_REPLY.to_string(),
            RelayOutcome::Reply(text) => text.clone(),
            RelayOutcome::UpstreamFailed => UPSTREAM_FAILED_REPLY.to_string(),
            RelayOutcome::Failed(text) => format!("Something went wrong: {text}"),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, RelayOutcome::UpstreamFailed | RelayOutcome::Failed(_))
    }
}

/// Relays one user message through the per-session transcript to the upstream
/// chat-completion API.
pub struct ConversationRelay {
    provider: Arc<dyn Provider>,
    store: Arc<dyn TranscriptStore>,
    characters: CharacterBook,
    model: String,
}

impl ConversationRelay {
    pub fn new(
        provider: Arc<dyn Provider>,
        store: Arc<dyn TranscriptStore>,
        characters: CharacterBook,
        model: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            store,
            characters,
            model: model.into(),
        }
    }

    pub fn characters(&self) -> &CharacterBook {
        &self.characters
    }

    /// Handle one exchange for the resolved client identity.
    pub async fn handle(
        &self,
        identity: &str,
        character: &str,
        message: &str,
    ) -> Result<RelayOutcome> {
        if message.trim().is_empty() {
            warn!(identity, character, "empty message, skipping upstream call");
            return Ok(RelayOutcome::EmptyMessage);
        }

        let key = TranscriptKey::new(identity, character);
        let existing = self
            .store
            .get_or_create(&key, self.characters.system_prompt(character))
            .await?;
        if existing.len() == 1 {
            info!(%key, "created transcript");
        }

        self.store
            .append(&key, TranscriptEntry::user(message))
            .await?;
        let transcript = self.store.read(&key).await?;

        debug!(%key, entries = transcript.len(), model = %self.model, "dispatching to upstream");

        match self
            .provider
            .chat(&transcript, &self.model, TEMPERATURE)
            .await
        {
            Ok(reply) => {
                self.store
                    .append(&key, TranscriptEntry::assistant(reply.clone()))
                    .await?;
                info!(%key, chars = reply.len(), "upstream reply recorded");
                Ok(RelayOutcome::Reply(reply))
            }
            Err(ProviderError::Status { status, body }) => {
                error!(%key, %status, %body, "upstream returned failure status");
                Ok(RelayOutcome::UpstreamFailed)
            }
            Err(err) => {
                error!(%key, error = %err, "upstream call failed");
                Ok(RelayOutcome::Failed(err.to_string()))
            }
        }
    }
}
