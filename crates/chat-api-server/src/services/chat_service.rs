use futures::stream::Stream;
use futures::StreamExt;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::logging::{ActivityLog, ActivityLogger, ActivityType};
use crate::models::chat::{ChatMessage, ToolCall};
use crate::services::conversation::{ConversationManager, Turn};
use crate::services::llm::{ChatBackend, CompletionRequest, StreamEvent};
use crate::services::tools::{ToolError, ToolRegistry};
use crate::utils::error::ApiError;

/// Text fragments relayed to the client, in backend order.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<String, ApiError>> + Send>>;

/// One session/backend pair serving a chat mode.
///
/// Memory, tools and the system prompt are optional and fixed at
/// construction; the same service answers both call and stream requests.
#[derive(Clone)]
pub struct ChatService {
    mode: &'static str,
    backend: Arc<dyn ChatBackend>,
    memory: Option<ConversationManager>,
    tools: Option<Arc<ToolRegistry>>,
    system_prompt: Option<String>,
    max_tool_rounds: usize,
    logger: ActivityLogger,
}

impl ChatService {
    pub fn new(mode: &'static str, backend: Arc<dyn ChatBackend>, logger: ActivityLogger) -> Self {
        Self {
            mode,
            backend,
            memory: None,
            tools: None,
            system_prompt: None,
            max_tool_rounds: 5,
            logger,
        }
    }

    pub fn with_memory(mut self, memory: ConversationManager) -> Self {
        self.memory = Some(memory);
        self
    }

    pub fn with_tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = Some(Arc::new(tools));
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_max_tool_rounds(mut self, rounds: usize) -> Self {
        self.max_tool_rounds = rounds;
        self
    }

    pub fn memory(&self) -> Option<&ConversationManager> {
        self.memory.as_ref()
    }

    pub fn is_stateful(&self) -> bool {
        self.memory.is_some()
    }

    /// Answer the prompt in one piece.
    pub async fn call(&self, prompt: &str, conversation_id: Option<&str>) -> Result<String, ApiError> {
        let start = Instant::now();
        let (mut messages, key) = self.prepare(prompt, conversation_id)?;

        let mut rounds = 0;
        let mut tool_calls = 0;
        let answer = loop {
            let completion = match self.backend.complete(&self.request(&messages)).await {
                Ok(completion) => completion,
                Err(e) => {
                    self.log_failure(key, &e, start);
                    return Err(e);
                }
            };

            if completion.tool_calls.is_empty() {
                break completion.content;
            }
            if rounds >= self.max_tool_rounds {
                self.log_rounds_exhausted(key);
                break completion.content;
            }

            rounds += 1;
            tool_calls += completion.tool_calls.len();
            self.run_tools(&mut messages, completion.content, completion.tool_calls, key);
        };

        self.remember(key, &answer);

        self.logger.log(
            ActivityLog::builder(self.mode, ActivityType::MessageSent)
                .conversation(key)
                .response_chars(answer.chars().count())
                .tool_calls(tool_calls)
                .processing_time(start.elapsed().as_millis() as u64)
                .build(),
        );

        Ok(answer)
    }

    /// Answer the prompt as a fragment stream.
    ///
    /// The first backend stream is opened before returning so that a
    /// transport failure is reported as an error, not as a broken stream.
    /// The assistant turn is remembered only once the stream completes;
    /// dropping it early records nothing.
    pub async fn stream(
        &self,
        prompt: &str,
        conversation_id: Option<&str>,
    ) -> Result<ChunkStream, ApiError> {
        let start = Instant::now();
        let (messages, key) = self.prepare(prompt, conversation_id)?;

        let first = match self.backend.complete_stream(&self.request(&messages)).await {
            Ok(stream) => stream,
            Err(e) => {
                self.log_failure(key, &e, start);
                return Err(e);
            }
        };

        let service = self.clone();
        let key = key.map(str::to_string);

        let stream = async_stream::try_stream! {
            let mut guard = StreamGuard::new(service.logger.clone(), service.mode, key.clone(), start);
            let mut messages = messages;
            let mut upstream = first;
            let mut answer = String::new();
            let mut rounds = 0;

            loop {
                let mut round_text = String::new();
                let mut calls: Vec<ToolCall> = Vec::new();

                while let Some(event) = upstream.next().await {
                    match event? {
                        StreamEvent::Delta(text) => {
                            round_text.push_str(&text);
                            yield text;
                        }
                        StreamEvent::ToolCalls(requested) => calls.extend(requested),
                    }
                }
                answer.push_str(&round_text);

                if calls.is_empty() {
                    break;
                }
                if rounds >= service.max_tool_rounds {
                    service.log_rounds_exhausted(key.as_deref());
                    break;
                }

                rounds += 1;
                guard.tool_calls += calls.len();
                service.run_tools(&mut messages, round_text, calls, key.as_deref());
                upstream = service.backend.complete_stream(&service.request(&messages)).await?;
            }

            service.remember(key.as_deref(), &answer);
            guard.complete(answer.chars().count());
        };

        Ok(Box::pin(stream))
    }

    /// Forget a conversation. Returns whether anything was stored.
    pub fn reset(&self, conversation_id: &str) -> bool {
        let Some(memory) = &self.memory else {
            return false;
        };

        let existed = memory.reset(conversation_id);
        if existed {
            self.logger.log(
                ActivityLog::builder(self.mode, ActivityType::ConversationReset)
                    .conversation(Some(conversation_id))
                    .build(),
            );
        }
        existed
    }

    /// Build the outgoing messages and record the user turn.
    fn prepare<'a>(
        &self,
        prompt: &str,
        conversation_id: Option<&'a str>,
    ) -> Result<(Vec<ChatMessage>, Option<&'a str>), ApiError> {
        let key = match (&self.memory, conversation_id) {
            (None, _) => None,
            (Some(_), Some(id)) if !id.trim().is_empty() => Some(id),
            (Some(_), _) => {
                return Err(ApiError::BadRequest(format!(
                    "conversation_id is required for {} queries",
                    self.mode
                )))
            }
        };

        let context = match (&self.memory, key) {
            (Some(memory), Some(id)) => memory.begin_exchange(id, Turn::user(prompt)),
            _ => Vec::new(),
        };

        let mut messages = Vec::with_capacity(context.len() + 2);
        if let Some(system) = &self.system_prompt {
            messages.push(ChatMessage::system(system.as_str()));
        }
        messages.extend(context.iter().map(Turn::to_message));
        messages.push(ChatMessage::user(prompt));

        debug!(
            "[{}] prepared {} messages ({} from memory)",
            self.mode,
            messages.len(),
            context.len()
        );

        self.logger.log(
            ActivityLog::builder(self.mode, ActivityType::RequestReceived)
                .conversation(key)
                .prompt_chars(prompt.chars().count())
                .context_turns(context.len())
                .build(),
        );

        Ok((messages, key))
    }

    fn request(&self, messages: &[ChatMessage]) -> CompletionRequest {
        let request = CompletionRequest::new(messages.to_vec());
        match &self.tools {
            Some(tools) => request.with_tools(tools.declarations()),
            None => request,
        }
    }

    fn run_tools(
        &self,
        messages: &mut Vec<ChatMessage>,
        content: String,
        calls: Vec<ToolCall>,
        key: Option<&str>,
    ) {
        info!("[{}] model requested {} tool call(s)", self.mode, calls.len());

        messages.push(ChatMessage::assistant_with_tool_calls(content, calls.clone()));
        for call in calls {
            let result = match &self.tools {
                Some(tools) => tools.invoke(&call.name, &call.arguments),
                None => format!("Error: {}", ToolError::UnknownTool(call.name.clone())),
            };

            self.logger.log(
                ActivityLog::builder(self.mode, ActivityType::ToolInvoked)
                    .conversation(key)
                    .tool(call.name.as_str())
                    .build(),
            );
            messages.push(ChatMessage::tool_result(call.id, result));
        }
    }

    fn remember(&self, key: Option<&str>, answer: &str) {
        if let (Some(memory), Some(id)) = (&self.memory, key) {
            memory.append_turn(id, Turn::assistant(answer));
        }
    }

    fn log_failure(&self, key: Option<&str>, error: &ApiError, start: Instant) {
        self.logger.log(
            ActivityLog::builder(self.mode, ActivityType::LlmError)
                .conversation(key)
                .error(error.to_string(), "LlmError")
                .processing_time(start.elapsed().as_millis() as u64)
                .build(),
        );
    }

    fn log_rounds_exhausted(&self, key: Option<&str>) {
        warn!(
            "[{}] tool round limit ({}) reached, returning last answer",
            self.mode, self.max_tool_rounds
        );
        self.logger.log(
            ActivityLog::builder(self.mode, ActivityType::ToolRoundsExhausted)
                .conversation(key)
                .build(),
        );
    }
}

/// Reports how a stream ended, including when the client went away.
struct StreamGuard {
    logger: ActivityLogger,
    mode: &'static str,
    conversation_id: Option<String>,
    start: Instant,
    tool_calls: usize,
    response_chars: Option<usize>,
}

impl StreamGuard {
    fn new(
        logger: ActivityLogger,
        mode: &'static str,
        conversation_id: Option<String>,
        start: Instant,
    ) -> Self {
        Self {
            logger,
            mode,
            conversation_id,
            start,
            tool_calls: 0,
            response_chars: None,
        }
    }

    fn complete(&mut self, response_chars: usize) {
        self.response_chars = Some(response_chars);
    }
}

impl Drop for StreamGuard {
    fn drop(&mut self) {
        let activity_type = match self.response_chars {
            Some(_) => ActivityType::StreamCompleted,
            None => ActivityType::StreamCancelled,
        };

        let mut builder = ActivityLog::builder(self.mode, activity_type)
            .conversation(self.conversation_id.as_deref())
            .tool_calls(self.tool_calls)
            .processing_time(self.start.elapsed().as_millis() as u64);
        if let Some(chars) = self.response_chars {
            builder = builder.response_chars(chars);
        }

        self.logger.log(builder.build());
    }
}
