pub mod settings;

pub use settings::{
    HuggingFaceConfig, LlmConfig, LoggingConfig, MemoryConfig, PromptsConfig, ServerConfig,
    Settings,
};
