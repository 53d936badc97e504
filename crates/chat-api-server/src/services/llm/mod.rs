//! Completion backend adapters.
//!
//! [`ChatBackend`] is the seam between chat orchestration and a hosted model:
//! call mode waits for the whole answer, stream mode yields fragments as the
//! backend produces them. [`HuggingFaceService`] is the separate direct-HTTP
//! path with its own degraded parsing contract.

mod huggingface;
mod openai;

use futures::stream::Stream;
use std::pin::Pin;

use crate::models::chat::{ChatMessage, ToolCall};
use crate::services::tools::ToolDeclaration;
use crate::utils::error::ApiError;

pub use huggingface::{HuggingFaceService, PARSE_ERROR_SENTINEL};
pub use openai::OpenAiChatBackend;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    pub tools: Vec<ToolDeclaration>,
}

impl CompletionRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            tools: Vec::new(),
        }
    }

    pub fn with_tools(mut self, tools: Vec<ToolDeclaration>) -> Self {
        self.tools = tools;
        self
    }
}

/// Call-mode result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Completion {
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
}

impl Completion {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Next non-empty text fragment
    Delta(String),
    /// Tool calls requested in this round, reported once the round ends
    ToolCalls(Vec<ToolCall>),
}

pub type BackendStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, ApiError>> + Send>>;

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ChatBackend: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, ApiError>;

    /// Opens the stream; a transport or status failure is returned before
    /// any fragment is produced.
    async fn complete_stream(&self, request: &CompletionRequest) -> Result<BackendStream, ApiError>;
}
