use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use super::{BackendStream, ChatBackend, Completion, CompletionRequest, StreamEvent};
use crate::config::LlmConfig;
use crate::models::chat::{ChatMessage, ToolCall};
use crate::services::tools::ToolDeclaration;
use crate::utils::error::ApiError;
use crate::utils::sse::{SseLineDecoder, SsePayload};

// ===== Wire request =====

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool<'a>>,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: Option<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<WireToolCall<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<&'a str>,
}

impl<'a> From<&'a ChatMessage> for WireMessage<'a> {
    fn from(msg: &'a ChatMessage) -> Self {
        // assistant tool-call turns carry null content when the model said nothing
        let content = if msg.content.is_empty() && !msg.tool_calls.is_empty() {
            None
        } else {
            Some(msg.content.as_str())
        };

        Self {
            role: msg.role.as_str(),
            content,
            tool_calls: msg
                .tool_calls
                .iter()
                .map(|call| WireToolCall {
                    id: &call.id,
                    kind: "function",
                    function: WireFunctionCall {
                        name: &call.name,
                        arguments: &call.arguments,
                    },
                })
                .collect(),
            tool_call_id: msg.tool_call_id.as_deref(),
        }
    }
}

#[derive(Debug, Serialize)]
struct WireToolCall<'a> {
    id: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    function: WireFunctionCall<'a>,
}

#[derive(Debug, Serialize)]
struct WireFunctionCall<'a> {
    name: &'a str,
    arguments: &'a str,
}

#[derive(Debug, Serialize)]
struct WireTool<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    function: &'a ToolDeclaration,
}

// ===== Wire responses =====

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ResponseToolCall>>,
}

#[derive(Debug, Deserialize)]
struct ResponseToolCall {
    id: String,
    function: ResponseFunction,
}

#[derive(Debug, Deserialize)]
struct ResponseFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChunk {
    #[serde(default)]
    choices: Vec<ChoiceChunk>,
}

#[derive(Debug, Deserialize)]
struct ChoiceChunk {
    #[serde(default)]
    delta: Option<Delta>,
}

#[derive(Debug, Deserialize)]
struct Delta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<DeltaToolCall>>,
}

#[derive(Debug, Deserialize)]
struct DeltaToolCall {
    #[serde(default)]
    index: usize,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    function: Option<DeltaFunction>,
}

#[derive(Debug, Deserialize)]
struct DeltaFunction {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<String>,
}

/// Streamed tool calls arrive as fragments keyed by index.
#[derive(Debug, Default)]
struct ToolCallAccumulator {
    calls: BTreeMap<usize, ToolCall>,
}

impl ToolCallAccumulator {
    fn apply(&mut self, deltas: Vec<DeltaToolCall>) {
        for delta in deltas {
            let call = self.calls.entry(delta.index).or_insert_with(|| ToolCall {
                id: String::new(),
                name: String::new(),
                arguments: String::new(),
            });

            if let Some(id) = delta.id {
                call.id = id;
            }
            if let Some(function) = delta.function {
                if let Some(name) = function.name {
                    call.name.push_str(&name);
                }
                if let Some(arguments) = function.arguments {
                    call.arguments.push_str(&arguments);
                }
            }
        }
    }

    fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    fn finish(self) -> Vec<ToolCall> {
        self.calls.into_values().collect()
    }
}

/// Handle one upstream `data:` payload; returns the text fragment, if any.
fn apply_chunk(json: &str, tool_calls: &mut ToolCallAccumulator) -> Option<String> {
    let chunk = match serde_json::from_str::<ChatCompletionChunk>(json) {
        Ok(chunk) => chunk,
        Err(e) => {
            debug!("Skipping unparseable stream chunk: {}", e);
            return None;
        }
    };

    let delta = chunk.choices.into_iter().next()?.delta?;
    if let Some(deltas) = delta.tool_calls {
        tool_calls.apply(deltas);
    }
    delta.content.filter(|content| !content.is_empty())
}

/// Backend for any OpenAI-compatible `/chat/completions` endpoint.
#[derive(Clone)]
pub struct OpenAiChatBackend {
    client: Client,
    config: LlmConfig,
}

impl OpenAiChatBackend {
    pub fn new(config: LlmConfig) -> Self {
        let mut builder = Client::builder();
        // Per read, not per response: a stream that keeps delivering is never cut off.
        if let Some(timeout) = config.timeout() {
            builder = builder.connect_timeout(timeout).read_timeout(timeout);
        }

        Self {
            client: builder.build().unwrap_or_else(|_| Client::new()),
            config,
        }
    }

    fn url(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    async fn send(
        &self,
        request: &CompletionRequest,
        stream: bool,
    ) -> Result<reqwest::Response, ApiError> {
        let body = ChatCompletionRequest {
            model: &self.config.model,
            messages: request.messages.iter().map(WireMessage::from).collect(),
            stream,
            temperature: self.config.temperature,
            tools: request
                .tools
                .iter()
                .map(|function| WireTool {
                    kind: "function",
                    function,
                })
                .collect(),
        };

        let mut builder = self.client.post(self.url()).json(&body);
        if !self.config.api_key.is_empty() {
            builder = builder.bearer_auth(&self.config.api_key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ApiError::LlmError(format!("Failed to call LLM API: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::LlmError(format!(
                "LLM API error: {} - {}",
                status, body
            )));
        }

        Ok(response)
    }
}

#[async_trait::async_trait]
impl ChatBackend for OpenAiChatBackend {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, ApiError> {
        debug!(
            "Starting chat completion with {} messages, {} tools",
            request.messages.len(),
            request.tools.len()
        );

        let response = self.send(request, false).await?;
        let chat_response: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| ApiError::LlmError(format!("Failed to parse LLM response: {}", e)))?;

        let message = chat_response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message)
            .ok_or_else(|| ApiError::LlmError("No choices returned from LLM".to_string()))?;

        Ok(Completion {
            content: message.content.unwrap_or_default(),
            tool_calls: message
                .tool_calls
                .unwrap_or_default()
                .into_iter()
                .map(|call| ToolCall {
                    id: call.id,
                    name: call.function.name,
                    arguments: call.function.arguments,
                })
                .collect(),
        })
    }

    async fn complete_stream(&self, request: &CompletionRequest) -> Result<BackendStream, ApiError> {
        debug!("Starting chat stream with {} messages", request.messages.len());

        let mut bytes = self.send(request, true).await?.bytes_stream();

        let stream = async_stream::try_stream! {
            let mut decoder = SseLineDecoder::new();
            let mut tool_calls = ToolCallAccumulator::default();
            let mut done = false;

            while !done {
                let Some(chunk) = bytes.next().await else {
                    break;
                };
                let chunk = chunk.map_err(|e| ApiError::LlmError(format!("Stream error: {}", e)))?;

                for payload in decoder.push(&chunk) {
                    match payload {
                        SsePayload::Done => {
                            done = true;
                            break;
                        }
                        SsePayload::Data(json) => {
                            if let Some(content) = apply_chunk(&json, &mut tool_calls) {
                                yield StreamEvent::Delta(content);
                            }
                        }
                    }
                }
            }

            if !done {
                if let Some(SsePayload::Data(json)) = decoder.finish() {
                    if let Some(content) = apply_chunk(&json, &mut tool_calls) {
                        yield StreamEvent::Delta(content);
                    }
                }
            }

            if !tool_calls.is_empty() {
                let calls = tool_calls.finish();
                if calls.iter().any(|call| call.name.is_empty()) {
                    warn!("Stream reported a tool call without a name");
                }
                yield StreamEvent::ToolCalls(calls);
            }
        };

        Ok(Box::pin(stream))
    }
}
