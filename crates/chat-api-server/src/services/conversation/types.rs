use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crate::models::chat::{ChatMessage, Role};

static NEXT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

/// One exchange unit stored in a conversation window. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    role: Role,
    content: String,
    /// Process-wide logical timestamp, strictly increasing in creation order
    sequence: u64,
    created_at: DateTime<Utc>,
}

impl Turn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            sequence: NEXT_SEQUENCE.fetch_add(1, Ordering::Relaxed),
            created_at: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn to_message(&self) -> ChatMessage {
        ChatMessage::new(self.role, self.content.clone())
    }
}

/// Bounded FIFO of the most recent turns of one conversation.
#[derive(Debug, Clone)]
pub struct ConversationWindow {
    turns: VecDeque<Turn>,
    capacity: usize,
}

impl ConversationWindow {
    /// A capacity of 0 is clamped to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            turns: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Append, evicting from the front until the bound holds again.
    /// Returns how many turns were evicted.
    pub fn push(&mut self, turn: Turn) -> usize {
        self.turns.push_back(turn);

        let mut evicted = 0;
        while self.turns.len() > self.capacity {
            self.turns.pop_front();
            evicted += 1;
        }
        evicted
    }

    pub fn snapshot(&self) -> Vec<Turn> {
        self.turns.iter().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Window plus bookkeeping used for cross-conversation eviction.
#[derive(Debug, Clone)]
pub struct ConversationEntry {
    pub window: ConversationWindow,
    pub created_at: Instant,
    pub last_activity: Instant,
}

impl ConversationEntry {
    pub fn new(capacity: usize) -> Self {
        let now = Instant::now();
        Self {
            window: ConversationWindow::new(capacity),
            created_at: now,
            last_activity: now,
        }
    }

    pub fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    pub fn is_idle(&self, ttl: Option<std::time::Duration>) -> bool {
        match ttl {
            Some(ttl) => self.last_activity.elapsed() > ttl,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_keeps_last_n_in_order() {
        let mut window = ConversationWindow::new(2);
        let first = Turn::user("one");
        let second = Turn::assistant("two");
        let third = Turn::user("three");

        assert_eq!(window.push(first), 0);
        assert_eq!(window.push(second.clone()), 0);
        assert_eq!(window.push(third.clone()), 1);

        assert_eq!(window.snapshot(), vec![second, third]);
        assert_eq!(window.len(), 2);
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let mut window = ConversationWindow::new(0);
        window.push(Turn::user("a"));
        window.push(Turn::user("b"));
        assert_eq!(window.capacity(), 1);
        assert_eq!(window.snapshot()[0].content(), "b");
    }

    #[test]
    fn test_sequence_is_monotonic() {
        let a = Turn::user("a");
        let b = Turn::user("b");
        assert!(b.sequence() > a.sequence());
        assert!(b.created_at() >= a.created_at());
    }

    #[test]
    fn test_turn_to_message() {
        let msg = Turn::assistant("hi").to_message();
        assert_eq!(msg.role, Role::Assistant);
        assert_eq!(msg.content, "hi");
    }

    #[test]
    fn test_idle_without_ttl_never_expires() {
        let entry = ConversationEntry::new(4);
        assert!(!entry.is_idle(None));
        assert!(!entry.is_idle(Some(std::time::Duration::from_secs(3600))));
    }
}
