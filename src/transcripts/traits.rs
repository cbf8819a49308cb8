//! Transcript storage traits and types.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Composite key identifying one conversation: client identity + character.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct TranscriptKey {
    pub identity: String,
    pub character: String,
}

impl TranscriptKey {
    pub fn new(identity: impl Into<String>, character: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            character: character.into(),
        }
    }
}

impl std::fmt::Display for TranscriptKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.identity, self.character)
    }
}

/// Message role as sent to the chat-completion API.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// A single entry in a conversation transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl TranscriptEntry {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Keyed conversation store with create-if-absent semantics.
///
/// A new transcript is seeded with exactly one system entry; the seed happens
/// once, under the store's lock, so concurrent first requests cannot double it.
#[async_trait]
pub trait TranscriptStore: Send + Sync {
    /// Return a snapshot of the transcript for `key`, creating it seeded with
    /// a single system entry (content `system_prompt`) if absent.
    async fn get_or_create(
        &self,
        key: &TranscriptKey,
        system_prompt: &str,
    ) -> Result<Vec<TranscriptEntry>>;

    /// Append one entry to the transcript. A no-op transcript is created if
    /// the key is unknown (no implicit system seed).
    async fn append(&self, key: &TranscriptKey, entry: TranscriptEntry) -> Result<()>;

    /// Snapshot of the transcript; empty for unknown keys.
    async fn read(&self, key: &TranscriptKey) -> Result<Vec<TranscriptEntry>>;

    /// Number of entries stored for `key`.
    async fn len(&self, key: &TranscriptKey) -> Result<usize>;

    /// The name of this store implementation.
    fn name(&self) -> &str;
}
