use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::models::chat::ConversationId;
use super::types::ConversationEntry;

/// Thread-safe in-memory conversation store.
///
/// Every closure passed to [`ConversationCache::update`] or
/// [`ConversationCache::read`] runs while the key's shard lock is held, so a
/// read never observes a half-applied append.
#[derive(Clone)]
pub struct ConversationCache {
    storage: Arc<DashMap<ConversationId, ConversationEntry>>,
    window_capacity: usize,
    idle_ttl: Option<Duration>,
    max_conversations: Option<usize>,
}

impl ConversationCache {
    pub fn new(
        window_capacity: usize,
        idle_ttl: Option<Duration>,
        max_conversations: Option<usize>,
    ) -> Self {
        info!(
            "Initializing conversation cache: window={}, idle_ttl={:?}, max_conversations={:?}",
            window_capacity, idle_ttl, max_conversations
        );
        Self {
            storage: Arc::new(DashMap::new()),
            window_capacity,
            idle_ttl,
            max_conversations,
        }
    }

    /// Run `f` against the conversation's entry, creating it on first use.
    pub fn update<R>(
        &self,
        conversation_id: &str,
        f: impl FnOnce(&mut ConversationEntry) -> R,
    ) -> R {
        if !self.storage.contains_key(conversation_id) {
            self.make_room();
        }

        let mut entry = self
            .storage
            .entry(conversation_id.to_string())
            .or_insert_with(|| ConversationEntry::new(self.window_capacity));

        if entry.is_idle(self.idle_ttl) {
            debug!("Conversation {} idle past ttl, starting fresh", conversation_id);
            entry.window.clear();
        }
        entry.touch();

        f(entry.value_mut())
    }

    /// Run `f` against an existing, non-expired entry.
    pub fn read<R>(
        &self,
        conversation_id: &str,
        f: impl FnOnce(&ConversationEntry) -> R,
    ) -> Option<R> {
        let entry = self.storage.get(conversation_id)?;

        if entry.is_idle(self.idle_ttl) {
            drop(entry); // Release read lock
            let ttl = self.idle_ttl;
            self.storage.remove_if(conversation_id, |_, e| e.is_idle(ttl));
            debug!("Conversation {} expired, removed from cache", conversation_id);
            return None;
        }

        Some(f(entry.value()))
    }

    pub fn remove(&self, conversation_id: &str) -> bool {
        self.storage.remove(conversation_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// Drop conversations idle longer than the ttl. Returns how many were removed.
    pub fn cleanup_idle(&self) -> usize {
        let Some(ttl) = self.idle_ttl else {
            return 0;
        };

        let start_len = self.storage.len();
        self.storage.retain(|_, entry| !entry.is_idle(Some(ttl)));
        let count = start_len.saturating_sub(self.storage.len());

        if count > 0 {
            info!("Cleaned up {} idle conversations", count);
        }

        count
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            active_conversations: self.len(),
            window_capacity: self.window_capacity,
            max_conversations: self.max_conversations,
        }
    }

    /// Evict the least recently active conversation when at the limit.
    fn make_room(&self) {
        let Some(max) = self.max_conversations else {
            return;
        };
        if self.storage.len() < max.max(1) {
            return;
        }

        let oldest = self
            .storage
            .iter()
            .min_by_key(|entry| entry.value().last_activity)
            .map(|entry| entry.key().clone());

        if let Some(key) = oldest {
            self.storage.remove(&key);
            debug!("Conversation limit {} reached, evicted {}", max, key);
        }
    }
}

#[derive(Debug, Clone)]
pub struct CacheStats {
    pub active_conversations: usize,
    pub window_capacity: usize,
    pub max_conversations: Option<usize>,
}
