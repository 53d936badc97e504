use axum::extract::FromRef;
use std::sync::Arc;

use crate::config::Settings;
use crate::logging::{ActivityLogger, LoggerConfig};
use crate::services::{
    ChatBackend, ChatService, ConversationManager, HuggingFaceService, InformationDesk,
    OpenAiChatBackend,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub stateless: ChatService,
    pub context: ChatService,
    pub smart: ChatService,
    pub huggingface: Arc<HuggingFaceService>,
    pub activity_logger: ActivityLogger,
    pub settings: Arc<Settings>,
}

impl AppState {
    /// Wire every chat mode against the configured completion endpoint.
    pub fn new(settings: Settings) -> Self {
        let backend = Arc::new(OpenAiChatBackend::new(settings.llm.clone()));
        Self::with_backend(settings, backend)
    }

    /// Same wiring with a caller-supplied backend.
    pub fn with_backend(settings: Settings, backend: Arc<dyn ChatBackend>) -> Self {
        let activity_logger = ActivityLogger::new(LoggerConfig {
            queue_capacity: settings.logging.activity_queue_capacity,
            ..LoggerConfig::default()
        });

        let memory = &settings.memory;
        let context_memory = ConversationManager::with_limits(
            memory.context_window,
            memory.idle_ttl(),
            memory.max_conversations,
        );
        let smart_memory = ConversationManager::with_limits(
            memory.smart_window,
            memory.idle_ttl(),
            memory.max_conversations,
        );

        let stateless = ChatService::new("stateless", backend.clone(), activity_logger.clone());

        let context = ChatService::new("context", backend.clone(), activity_logger.clone())
            .with_memory(context_memory);

        let smart = ChatService::new("smart", backend, activity_logger.clone())
            .with_memory(smart_memory)
            .with_tools(InformationDesk::registry())
            .with_system_prompt(settings.prompts.smart_system_prompt.clone())
            .with_max_tool_rounds(settings.llm.max_tool_rounds);

        let huggingface = Arc::new(HuggingFaceService::new(settings.huggingface.clone()));

        Self {
            stateless,
            context,
            smart,
            huggingface,
            activity_logger,
            settings: Arc::new(settings),
        }
    }

    pub fn stateful_services(&self) -> [&ChatService; 2] {
        [&self.context, &self.smart]
    }

    /// Drop idle conversations in every memory store.
    pub fn cleanup_idle(&self) -> usize {
        self.stateful_services()
            .iter()
            .filter_map(|service| service.memory())
            .map(ConversationManager::cleanup_idle)
            .sum()
    }
}

impl FromRef<AppState> for Arc<HuggingFaceService> {
    fn from_ref(state: &AppState) -> Self {
        state.huggingface.clone()
    }
}

impl FromRef<AppState> for Arc<Settings> {
    fn from_ref(state: &AppState) -> Self {
        state.settings.clone()
    }
}
