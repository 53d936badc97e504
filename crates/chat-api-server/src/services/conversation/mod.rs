//! Conversation memory management module
//!
//! Provides bounded, in-memory conversation windows with:
//! - Thread-safe storage (DashMap)
//! - FIFO eviction inside a window
//! - Optional idle expiry and conversation-count limit across windows

mod cache;
pub mod manager;
pub mod types;

pub use cache::{CacheStats, ConversationCache};
pub use manager::ConversationManager;
pub use types::{ConversationEntry, ConversationWindow, Turn};

pub use crate::models::chat::ConversationId;
