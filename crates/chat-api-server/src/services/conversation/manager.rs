use std::time::Duration;
use tracing::debug;

use super::cache::{CacheStats, ConversationCache};
use super::types::Turn;

/// Bounded per-conversation memory shared by every request of one chat mode.
#[derive(Clone)]
pub struct ConversationManager {
    cache: ConversationCache,
}

impl ConversationManager {
    pub fn new(window_capacity: usize) -> Self {
        Self::with_limits(window_capacity, None, None)
    }

    pub fn with_limits(
        window_capacity: usize,
        idle_ttl: Option<Duration>,
        max_conversations: Option<usize>,
    ) -> Self {
        Self {
            cache: ConversationCache::new(window_capacity, idle_ttl, max_conversations),
        }
    }

    /// Append a turn, evicting the oldest turns past the window capacity.
    pub fn append_turn(&self, conversation_id: &str, turn: Turn) {
        let evicted = self.cache.update(conversation_id, |entry| entry.window.push(turn));
        if evicted > 0 {
            debug!("Conversation {}: evicted {} turn(s)", conversation_id, evicted);
        }
    }

    /// Ordered turns of the conversation; empty for an unseen id.
    pub fn get_context(&self, conversation_id: &str) -> Vec<Turn> {
        self.cache
            .read(conversation_id, |entry| entry.window.snapshot())
            .unwrap_or_default()
    }

    /// Snapshot the prior context and record the user turn in one step.
    pub fn begin_exchange(&self, conversation_id: &str, user_turn: Turn) -> Vec<Turn> {
        self.cache.update(conversation_id, |entry| {
            let prior = entry.window.snapshot();
            entry.window.push(user_turn);
            prior
        })
    }

    /// Forget the conversation. Returns whether anything was stored.
    pub fn reset(&self, conversation_id: &str) -> bool {
        self.cache.remove(conversation_id)
    }

    pub fn cleanup_idle(&self) -> usize {
        self.cache.cleanup_idle()
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }
}
