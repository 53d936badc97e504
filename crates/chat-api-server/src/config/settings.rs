use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub huggingface: HuggingFaceConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
    #[serde(default)]
    pub prompts: PromptsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// OpenAI-compatible chat completion endpoint used by the query endpoints.
#[derive(Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct LlmConfig {
    /// Base URL without the `/chat/completions` suffix, e.g. `https://api.openai.com/v1`
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub temperature: Option<f32>,
    /// Connect timeout, and the longest wait for the next bytes of a
    /// response. A stream that keeps producing is never cut off. No client
    /// timeout when unset.
    pub timeout_seconds: Option<u64>,
    pub max_tool_rounds: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            model: "gpt-4o-mini".to_string(),
            temperature: None,
            timeout_seconds: None,
            max_tool_rounds: 5,
        }
    }
}

impl LlmConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_seconds.map(Duration::from_secs)
    }
}

impl fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &redact(&self.api_key))
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("timeout_seconds", &self.timeout_seconds)
            .field("max_tool_rounds", &self.max_tool_rounds)
            .finish()
    }
}

/// Direct HuggingFace inference router endpoint behind `/ai/generate`.
#[derive(Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct HuggingFaceConfig {
    /// Full completion URL (the request is POSTed here verbatim)
    pub url: String,
    pub api_key: String,
    pub model: String,
    /// Whole-request timeout; none when unset.
    pub timeout_seconds: Option<u64>,
}

impl Default for HuggingFaceConfig {
    fn default() -> Self {
        Self {
            url: "https://router.huggingface.co/v1/chat/completions".to_string(),
            api_key: String::new(),
            model: "HuggingFaceTB/SmolLM3-3B:hf-inference".to_string(),
            timeout_seconds: None,
        }
    }
}

impl HuggingFaceConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_seconds.map(Duration::from_secs)
    }
}

impl fmt::Debug for HuggingFaceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HuggingFaceConfig")
            .field("url", &self.url)
            .field("api_key", &redact(&self.api_key))
            .field("model", &self.model)
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct MemoryConfig {
    /// Turns kept per conversation by the context-aware endpoints
    pub context_window: usize,
    /// Turns kept per conversation by the smart (tool-enabled) endpoints
    pub smart_window: usize,
    /// Used when a request carries no conversation id; requests are rejected when unset.
    pub default_conversation_id: Option<String>,
    pub idle_ttl_seconds: Option<u64>,
    pub max_conversations: Option<usize>,
    pub sweep_interval_seconds: u64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            context_window: 4,
            smart_window: 2,
            default_conversation_id: None,
            idle_ttl_seconds: None,
            max_conversations: None,
            sweep_interval_seconds: 60,
        }
    }
}

impl MemoryConfig {
    pub fn idle_ttl(&self) -> Option<Duration> {
        self.idle_ttl_seconds.map(Duration::from_secs)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct PromptsConfig {
    pub smart_system_prompt: String,
}

impl Default for PromptsConfig {
    fn default() -> Self {
        Self {
            smart_system_prompt: "Use all tools available when you can't figure out answer and provide approximate answer if you don't know the answer".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    /// Daily-rolling log files are written here when set
    pub directory: Option<String>,
    pub activity_queue_capacity: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: None,
            activity_queue_capacity: 10_000,
        }
    }
}

fn redact(secret: &str) -> &'static str {
    if secret.is_empty() {
        "<unset>"
    } else {
        "<redacted>"
    }
}

impl Settings {
    /// `config/settings.toml` when present, overlaid by `APP__SECTION__KEY`
    /// environment variables.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Config::builder()
            .add_source(File::with_name("config/settings").required(false))
            .add_source(env_source("APP"))
            .build()?;

        let settings: Settings = config.try_deserialize()?;
        Ok(settings)
    }
}

fn env_source(prefix: &str) -> Environment {
    Environment::with_prefix(prefix)
        .separator("__")
        .try_parsing(true)
}
