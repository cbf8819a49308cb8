//! The character book: an immutable name -> system-prompt table.
//!
//! Fixed at process start. Unknown names resolve to the empty prompt rather
//! than an error, so the relay degrades to a plain un-primed chat.

use std::collections::BTreeMap;

/// Immutable mapping from character name to system prompt.
#[derive(Debug, Clone)]
pub struct CharacterBook {
    prompts: BTreeMap<String, String>,
}

impl CharacterBook {
    /// The built-in character table used when the config file supplies none.
    pub fn builtin() -> Self {
        let mut prompts = BTreeMap::new();
        prompts.insert(
            "oracle".to_string(),
            "You are a mysterious oracle with the power to turn the careless to stone. \
             Answer every question with calm, unsettling composure."
                .to_string(),
        );
        prompts.insert(
            "granny-witch".to_string(),
            "You are a wise and kindly old witch. Answer with warmth, patience, and \
             the occasional knowing chuckle."
                .to_string(),
        );
        Self { prompts }
    }

    /// Build from a custom table, replacing the built-ins entirely.
    pub fn from_table(table: BTreeMap<String, String>) -> Self {
        Self { prompts: table }
    }

    /// System prompt for a character; empty string for unknown names.
    pub fn system_prompt(&self, name: &str) -> &str {
        self.prompts.get(name).map_or("", String::as_str)
    }

    /// Character names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.prompts.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.prompts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prompts.is_empty()
    }
}
