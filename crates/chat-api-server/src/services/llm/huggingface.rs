use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::HuggingFaceConfig;
use crate::utils::error::ApiError;

/// Returned in place of text when a response body has no usable content.
pub const PARSE_ERROR_SENTINEL: &str = "Error parsing response";

#[derive(Serialize)]
struct HfChatRequest<'a> {
    messages: [HfMessage<'a>; 1],
    model: &'a str,
    stream: bool,
}

#[derive(Serialize)]
struct HfMessage<'a> {
    role: &'static str,
    content: &'a str,
}

/// Single-shot text generation against a HuggingFace inference endpoint.
#[derive(Clone)]
pub struct HuggingFaceService {
    client: Client,
    config: HuggingFaceConfig,
}

impl HuggingFaceService {
    pub fn new(config: HuggingFaceConfig) -> Self {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }

        Self {
            client: builder.build().unwrap_or_else(|_| Client::new()),
            config,
        }
    }

    /// One POST, no retry. Transport and status failures are errors; a body
    /// that cannot be parsed yields [`PARSE_ERROR_SENTINEL`] instead.
    pub async fn generate_text_from_prompt(&self, message: &str) -> Result<String, ApiError> {
        let request = HfChatRequest {
            messages: [HfMessage {
                role: "user",
                content: message,
            }],
            model: &self.config.model,
            stream: false,
        };

        debug!("HuggingFace generation, prompt {} chars", message.len());

        let response = self
            .client
            .post(&self.config.url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| ApiError::LlmError(format!("HuggingFace Network Error: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ApiError::LlmError(format!(
                "HuggingFace API Error ({}): {}",
                status, text
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ApiError::LlmError(format!("Failed to read HuggingFace response: {}", e)))?;

        Ok(parse_response(&body))
    }
}

/// First string-valued `content` field, depth first.
pub fn parse_response(body: &str) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(value) => match find_content(&value) {
            Some(content) => content.to_string(),
            None => {
                warn!("HuggingFace response has no content field");
                PARSE_ERROR_SENTINEL.to_string()
            }
        },
        Err(e) => {
            warn!("HuggingFace response is not JSON: {}", e);
            PARSE_ERROR_SENTINEL.to_string()
        }
    }
}

fn find_content(value: &Value) -> Option<&str> {
    match value {
        Value::Object(map) => {
            if let Some(Value::String(content)) = map.get("content") {
                return Some(content);
            }
            map.values().find_map(find_content)
        }
        Value::Array(items) => items.iter().find_map(find_content),
        _ => None,
    }
}
