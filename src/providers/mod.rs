// Embedding and generation providers
// Each backend is an explicit client object built from configuration and shared by
// reference; nothing here holds global credentials.

pub mod gemini;
mod http;
pub mod ollama;


use std::time::Duration;

use thiserror::Error;

use crate::config::{ConfigError, ProviderConfig, ProviderKind};

pub use gemini::GeminiClient;
pub use ollama::OllamaClient;

/// Failure of a single call to an external provider
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("rate limited by provider (HTTP 429)")]
    RateLimited,
    #[error("authentication rejected (HTTP {0})")]
    Auth(u16),
    #[error("provider returned HTTP {0}")]
    Status(u16),
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl ProviderError {
    /// Short label describing the failure kind
    #[inline]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Timeout(_) => "timeout",
            Self::Transport(_) => "transport",
            Self::RateLimited => "rate-limit",
            Self::Auth(_) => "auth",
            Self::Status(_) => "status",
            Self::MalformedResponse(_) => "malformed-response",
        }
    }
}

/// What an embedding will be compared against. Providers may encode documents and
/// queries differently while staying in one vector space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskType {
    Document,
    Query,
}

/// Maps text to a fixed-length vector
pub trait EmbeddingProvider: Send + Sync {
    /// Provider-defined model identifier
    fn model(&self) -> &str;

    fn embed_with_task(&self, text: &str, task: TaskType) -> Result<Vec<f32>, ProviderError>;

    /// Embed a corpus chunk
    #[inline]
    fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        self.embed_with_task(text, TaskType::Document)
    }

    /// Embed a user question
    #[inline]
    fn embed_query(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        self.embed_with_task(text, TaskType::Query)
    }
}

/// Produces one completion for one prompt
pub trait GenerationProvider: Send + Sync {
    fn generate(&self, prompt: &str) -> Result<String, ProviderError>;
}

/// Provider backend selected by configuration
#[derive(Debug, Clone)]
pub enum ProviderClient {
    Ollama(OllamaClient),
    Gemini(GeminiClient),
}

impl ProviderClient {
    #[inline]
    pub fn from_config(config: &ProviderConfig) -> Result<Self, ConfigError> {
        Ok(match config.kind {
            ProviderKind::Ollama => Self::Ollama(OllamaClient::new(config)?),
            ProviderKind::Gemini => Self::Gemini(GeminiClient::new(config)?),
        })
    }
}

impl EmbeddingProvider for ProviderClient {
    #[inline]
    fn model(&self) -> &str {
        match self {
            Self::Ollama(client) => client.model(),
            Self::Gemini(client) => client.model(),
        }
    }

    #[inline]
    fn embed_with_task(&self, text: &str, task: TaskType) -> Result<Vec<f32>, ProviderError> {
        match self {
            Self::Ollama(client) => client.embed_with_task(text, task),
            Self::Gemini(client) => client.embed_with_task(text, task),
        }
    }
}

impl GenerationProvider for ProviderClient {
    #[inline]
    fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        match self {
            Self::Ollama(client) => client.generate(prompt),
            Self::Gemini(client) => client.generate(prompt),
        }
    }
}
