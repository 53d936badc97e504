use serde::{Deserialize, Serialize};

/// Caller-supplied key of one logical conversation.
pub type ConversationId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
    }
}

/// A function invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    /// Raw JSON arguments exactly as the model produced them
    pub arguments: String,
}

/// One message of a completion request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn assistant_with_tool_calls(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls,
            ..Self::new(Role::Assistant, content)
        }
    }

    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: Some(tool_call_id.into()),
            ..Self::new(Role::Tool, content)
        }
    }
}

// ===== REQUEST MODELS =====

#[derive(Debug, Deserialize, Default)]
pub struct QueryParams {
    #[serde(default, alias = "query")]
    pub message: Option<String>,
    #[serde(default)]
    pub conversation_id: Option<ConversationId>,
}

#[derive(Debug, Deserialize, Default)]
pub struct ConversationParams {
    #[serde(default)]
    pub conversation_id: Option<ConversationId>,
}

#[derive(Debug, Deserialize)]
pub struct GenerateParams {
    #[serde(default = "default_ask")]
    pub ask: String,
}

fn default_ask() -> String {
    "Tell me a joke".to_string()
}

// ===== RESPONSE MODELS =====

#[derive(Debug, Serialize, Deserialize)]
pub struct GenerationResponse {
    pub generation: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_alias() {
        let params: QueryParams = serde_json::from_str(r#"{"query":"hi"}"#).unwrap();
        assert_eq!(params.message.as_deref(), Some("hi"));
        assert!(params.conversation_id.is_none());
    }

    #[test]
    fn test_generate_default_prompt() {
        let params: GenerateParams = serde_json::from_str("{}").unwrap();
        assert_eq!(params.ask, "Tell me a joke");
    }

    #[test]
    fn test_tool_result_message() {
        let msg = ChatMessage::tool_result("call_1", "\"I am Kavitha\"");
        assert_eq!(msg.role, Role::Tool);
        assert_eq!(msg.tool_call_id.as_deref(), Some("call_1"));
        assert!(msg.tool_calls.is_empty());
    }
}
