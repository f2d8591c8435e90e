//! Rolling conversation history: the bounded window of prior exchanges
//! prepended to every backend request.
//!
//! The history holds user/assistant pairs only; the system prompt is fixed
//! configuration and never stored here. Pairs are added atomically after a
//! successful exchange and evicted whole from the front when the cap is
//! exceeded, so the length is always even and recency is preserved.

use std::collections::VecDeque;

use crate::backend::ChatMessage;

/// Default cap: 20 entries = 10 user/assistant exchange pairs.
pub const DEFAULT_MAX_ENTRIES: usize = 20;

#[derive(Debug)]
pub struct ConversationHistory {
    entries: VecDeque<ChatMessage>,
    max_entries: usize,
}

impl ConversationHistory {
    /// Create a history capped at `max_entries` messages. Odd caps are
    /// rounded down; entries only ever exist in pairs.
    pub fn new(max_entries: usize) -> Self {
        let max_entries = max_entries & !1;
        Self {
            entries: VecDeque::with_capacity(max_entries),
            max_entries,
        }
    }

    /// Assemble the ordered request: system entry first, then the rolling
    /// history, then the new user message.
    pub fn build_request(&self, system_prompt: &str, user_message: &str) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(self.entries.len() + 2);
        messages.push(ChatMessage::system(system_prompt));
        messages.extend(self.entries.iter().cloned());
        messages.push(ChatMessage::user(user_message));
        messages
    }

    /// Record one successful exchange. Callers must not record failed
    /// exchanges; a failed call leaves the context for future requests
    /// untouched.
    pub fn record_exchange(&mut self, user_message: &str, assistant_message: &str) {
        self.entries.push_back(ChatMessage::user(user_message));
        self.entries.push_back(ChatMessage::assistant(assistant_message));
        while self.entries.len() > self.max_entries {
            // Evict whole pairs from the front, oldest first.
            self.entries.pop_front();
            self.entries.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &ChatMessage> {
        self.entries.iter()
    }
}

impl Default for ConversationHistory {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES)
    }
}
