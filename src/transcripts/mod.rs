//! Transcript management — per-session, per-character conversation history.

pub mod in_memory;
pub mod traits;

pub use in_memory::InMemoryTranscriptStore;
pub use traits::{Role, TranscriptEntry, TranscriptKey, TranscriptStore};

use std::sync::Arc;

/// Create the default in-memory transcript store.
pub fn create_transcript_store(max_entries: Option<usize>) -> Arc<dyn TranscriptStore> {
    Arc::new(InMemoryTranscriptStore::new(max_entries))
}
