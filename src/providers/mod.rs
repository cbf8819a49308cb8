//! Upstream chat-completion providers.
//!
//! One implementation is enough here: every target API speaks the
//! OpenAI-compatible `/chat/completions` shape with bearer auth.

pub mod compatible;

pub use compatible::OpenAiCompatibleProvider;

use crate::transcripts::TranscriptEntry;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

const MAX_API_ERROR_CHARS: usize = 200;

/// Failure modes of an upstream chat call. The relay maps `Status` to its
/// fixed generic failure text and everything else to an error-bearing reply.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("upstream returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("upstream request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("upstream response malformed: {0}")]
    Malformed(String),
}

/// A chat-completion backend.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Send the full transcript and return the first choice's message content.
    async fn chat(
        &self,
        messages: &[TranscriptEntry],
        model: &str,
        temperature: f64,
    ) -> Result<String, ProviderError>;

    fn name(&self) -> &str;
}

/// Create the default upstream provider.
pub fn create_provider(base_url: &str, api_key: &str) -> Arc<dyn Provider> {
    Arc::new(OpenAiCompatibleProvider::new(base_url, api_key))
}

fn is_secret_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':')
}

fn token_end(input: &str, from: usize) -> usize {
    let mut end = from;
    for (i, c) in input[from..].char_indices() {
        if is_secret_char(c) {
            end = from + i + c.len_utf8();
        } else {
            break;
        }
    }
    end
}

/// Scrub known secret-like token prefixes from upstream error strings.
pub fn scrub_secret_patterns(input: &str) -> String {
    const PREFIXES: [&str; 3] = ["sk-", "xai-", "Bearer "];

    let mut scrubbed = input.to_string();

    for prefix in PREFIXES {
        let mut search_from = 0;
        loop {
            let Some(rel) = scrubbed[search_from..].find(prefix) else {
                break;
            };

            let start = search_from + rel;
            let content_start = start + prefix.len();
            let end = token_end(&scrubbed, content_start);

            if end == content_start {
                search_from = content_start;
                continue;
            }

            scrubbed.replace_range(start..end, "[REDACTED]");
            search_from = start + "[REDACTED]".len();
        }
    }

    scrubbed
}

/// Sanitize upstream error text: scrub secrets, then truncate.
pub fn sanitize_api_error(input: &str) -> String {
    let scrubbed = scrub_secret_patterns(input);

    if scrubbed.chars().count() <= MAX_API_ERROR_CHARS {
        return scrubbed;
    }

    let mut end = MAX_API_ERROR_CHARS;
    while end > 0 && !scrubbed.is_char_boundary(end) {
        end -= 1;
    }

    format!("{}...", &scrubbed[..end])
}
