// src/config/summarizer.rs
use serde::Deserialize;
use std::env;

pub const ENV_HUGGINGFACE_API_KEY: &str = "HUGGINGFACE_API_KEY";
pub const ENV_OPENAI_API_KEY: &str = "OPENAI_API_KEY";

pub const DEFAULT_HUGGINGFACE_ENDPOINT: &str =
    "https://api-inference.huggingface.co/models/facebook/bart-large-cnn";
pub const DEFAULT_OPENAI_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

fn default_max_sentences() -> usize {
    2
}
fn default_max_retries() -> u32 {
    3
}
fn default_retry_delay_secs() -> u64 {
    10
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_max_input_chars() -> usize {
    3000
}

/// Which summarizer backend to build. Chosen once at startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummarizerKind {
    /// First sentences of the description; no network.
    #[default]
    Extractive,
    /// Hosted summarization model (Hugging Face inference API shape).
    Huggingface,
    /// Chat-completion LLM (OpenAI API shape).
    Openai,
}

impl SummarizerKind {
    pub fn api_key_env(self) -> Option<&'static str> {
        match self {
            Self::Extractive => None,
            Self::Huggingface => Some(ENV_HUGGINGFACE_API_KEY),
            Self::Openai => Some(ENV_OPENAI_API_KEY),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SummarizerConfig {
    #[serde(default)]
    pub kind: SummarizerKind,
    /// Overrides the backend's default URL.
    pub endpoint: Option<String>,
    pub model: Option<String>,
    #[serde(default = "default_max_sentences")]
    pub max_sentences: usize,
    /// Retries after the first attempt on transient failures.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_input_chars")]
    pub max_input_chars: usize,
    /// Resolved from the environment, never from the file.
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            kind: SummarizerKind::default(),
            endpoint: None,
            model: None,
            max_sentences: default_max_sentences(),
            max_retries: default_max_retries(),
            retry_delay_secs: default_retry_delay_secs(),
            timeout_secs: default_timeout_secs(),
            max_input_chars: default_max_input_chars(),
            api_key: None,
        }
    }
}

impl SummarizerConfig {
    /// Read the API key for the selected backend. A missing key is not an error here:
    /// the remote adapter degrades every call instead.
    pub fn resolve_api_key(&mut self) {
        self.api_key = self
            .kind
            .api_key_env()
            .and_then(|name| env::var(name).ok())
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());
    }

    pub fn endpoint_or_default(&self) -> &str {
        match (self.endpoint.as_deref(), self.kind) {
            (Some(url), _) => url,
            (None, SummarizerKind::Openai) => DEFAULT_OPENAI_ENDPOINT,
            (None, _) => DEFAULT_HUGGINGFACE_ENDPOINT,
        }
    }

    pub fn model_or_default(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_OPENAI_MODEL)
    }
}
