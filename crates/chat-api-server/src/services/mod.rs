pub mod chat_service;
pub mod conversation;
pub mod llm;
pub mod tools;

pub use chat_service::{ChatService, ChunkStream};
pub use conversation::ConversationManager;
pub use llm::{ChatBackend, HuggingFaceService, OpenAiChatBackend};
pub use tools::{InformationDesk, ToolRegistry};
