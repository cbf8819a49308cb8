//! In-memory transcript store backed by a mutex-protected hash map.

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;

use super::traits::{Role, TranscriptEntry, TranscriptKey, TranscriptStore};

/// Process-lifetime transcript storage. Nothing is persisted or pruned unless
/// a `max_entries` cap is configured.
pub struct InMemoryTranscriptStore {
    transcripts: Mutex<HashMap<TranscriptKey, Vec<TranscriptEntry>>>,
    max_entries: Option<usize>,
}

impl InMemoryTranscriptStore {
    pub fn new(max_entries: Option<usize>) -> Self {
        Self {
            transcripts: Mutex::new(HashMap::new()),
            max_entries,
        }
    }

    /// Evict oldest non-system entries until the transcript fits the cap.
    /// The system seed at index 0 is never evicted.
    fn enforce_cap(entries: &mut Vec<TranscriptEntry>, cap: usize) {
        while entries.len() > cap {
            let Some(first_evictable) = entries.iter().position(|e| e.role != Role::System) else {
                break;
            };
            entries.remove(first_evictable);
        }
    }
}

impl Default for InMemoryTranscriptStore {
    fn default() -> Self {
        Self::new(None)
    }
}

#[async_trait]
impl TranscriptStore for InMemoryTranscriptStore {
    async fn get_or_create(
        &self,
        key: &TranscriptKey,
        system_prompt: &str,
    ) -> Result<Vec<TranscriptEntry>> {
        let mut transcripts = self.transcripts.lock();
        let entries = transcripts
            .entry(key.clone())
            .or_insert_with(|| vec![TranscriptEntry::system(system_prompt)]);
        Ok(entries.clone())
    }

    async fn append(&self, key: &TranscriptKey, entry: TranscriptEntry) -> Result<()> {
        let mut transcripts = self.transcripts.lock();
        let entries = transcripts.entry(key.clone()).or_default();
        entries.push(entry);
        if let Some(cap) = self.max_entries {
            Self::enforce_cap(entries, cap);
        }
        Ok(())
    }

    async fn read(&self, key: &TranscriptKey) -> Result<Vec<TranscriptEntry>> {
        let transcripts = self.transcripts.lock();
        Ok(transcripts.get(key).cloned().unwrap_or_default())
    }

    async fn len(&self, key: &TranscriptKey) -> Result<usize> {
        let transcripts = self.transcripts.lock();
        Ok(transcripts.get(key).map_or(0, Vec::len))
    }

    fn name(&self) -> &str {
        "in_memory"
    }
}
