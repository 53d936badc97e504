use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Activity type categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    RequestReceived,
    MessageSent,
    StreamCompleted,
    StreamCancelled,
    ToolInvoked,
    ToolRoundsExhausted,
    LlmError,
    ConversationReset,
}

impl ActivityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RequestReceived => "request_received",
            Self::MessageSent => "message_sent",
            Self::StreamCompleted => "stream_completed",
            Self::StreamCancelled => "stream_cancelled",
            Self::ToolInvoked => "tool_invoked",
            Self::ToolRoundsExhausted => "tool_rounds_exhausted",
            Self::LlmError => "llm_error",
            Self::ConversationReset => "conversation_reset",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityStatus {
    Success,
    Error,
    Warning,
    Info,
}

impl ActivityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }
}

/// One record per notable step of an exchange.
#[derive(Debug, Clone)]
pub struct ActivityLog {
    pub mode: &'static str,
    pub conversation_id: Option<String>,

    pub activity_type: ActivityType,
    pub activity_status: ActivityStatus,

    // Sizes only; message text is never logged
    pub prompt_chars: Option<usize>,
    pub response_chars: Option<usize>,
    pub context_turns: Option<usize>,
    pub tool_name: Option<String>,
    pub tool_calls: Option<usize>,

    pub processing_time_ms: Option<u64>,

    pub error_message: Option<String>,
    pub error_type: Option<String>,

    pub created_at: DateTime<Utc>,
}

impl ActivityLog {
    pub fn builder(mode: &'static str, activity_type: ActivityType) -> ActivityLogBuilder {
        ActivityLogBuilder::new(mode, activity_type)
    }
}

/// Builder pattern for ActivityLog
pub struct ActivityLogBuilder {
    log: ActivityLog,
}

impl ActivityLogBuilder {
    pub fn new(mode: &'static str, activity_type: ActivityType) -> Self {
        let activity_status = match activity_type {
            ActivityType::RequestReceived => ActivityStatus::Info,
            ActivityType::StreamCancelled | ActivityType::ToolRoundsExhausted => {
                ActivityStatus::Warning
            }
            ActivityType::LlmError => ActivityStatus::Error,
            _ => ActivityStatus::Success,
        };

        Self {
            log: ActivityLog {
                mode,
                conversation_id: None,
                activity_type,
                activity_status,
                prompt_chars: None,
                response_chars: None,
                context_turns: None,
                tool_name: None,
                tool_calls: None,
                processing_time_ms: None,
                error_message: None,
                error_type: None,
                created_at: Utc::now(),
            },
        }
    }

    pub fn conversation(mut self, id: Option<&str>) -> Self {
        self.log.conversation_id = id.map(str::to_string);
        self
    }

    pub fn prompt_chars(mut self, chars: usize) -> Self {
        self.log.prompt_chars = Some(chars);
        self
    }

    pub fn response_chars(mut self, chars: usize) -> Self {
        self.log.response_chars = Some(chars);
        self
    }

    pub fn context_turns(mut self, turns: usize) -> Self {
        self.log.context_turns = Some(turns);
        self
    }

    pub fn tool(mut self, name: impl Into<String>) -> Self {
        self.log.tool_name = Some(name.into());
        self
    }

    pub fn tool_calls(mut self, count: usize) -> Self {
        self.log.tool_calls = Some(count);
        self
    }

    pub fn processing_time(mut self, ms: u64) -> Self {
        self.log.processing_time_ms = Some(ms);
        self
    }

    pub fn error(mut self, message: impl Into<String>, error_type: impl Into<String>) -> Self {
        self.log.error_message = Some(message.into());
        self.log.error_type = Some(error_type.into());
        self.log.activity_status = ActivityStatus::Error;
        self
    }

    pub fn build(self) -> ActivityLog {
        self.log
    }
}
