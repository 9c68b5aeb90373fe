
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use super::http::{build_agent, get_json, post_json};
use super::{EmbeddingProvider, GenerationProvider, ProviderError, TaskType};
use crate::config::{ConfigError, ProviderConfig};

const DOCUMENT_PREFIX: &str = "search_document: ";
const QUERY_PREFIX: &str = "search_query: ";

/// Client for a local or remote Ollama server
#[derive(Debug, Clone)]
pub struct OllamaClient {
    base_url: Url,
    embedding_model: String,
    generation_model: String,
    agent: ureq::Agent,
    timeout: Duration,
    task_prefixes: bool,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: String,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Debug, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    pub size: Option<u64>,
    pub digest: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ModelsResponse {
    models: Vec<ModelInfo>,
}

impl OllamaClient {
    #[inline]
    pub fn new(config: &ProviderConfig) -> Result<Self, ConfigError> {
        let base_url = config.endpoint()?;
        let timeout = config.timeout();

        Ok(Self {
            base_url,
            embedding_model: config.embedding_model().to_string(),
            generation_model: config.generation_model().to_string(),
            agent: build_agent(timeout),
            timeout,
            task_prefixes: config.task_prefixes,
        })
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = build_agent(timeout);
        self.timeout = timeout;
        self
    }

    #[inline]
    pub fn with_task_prefixes(mut self, enabled: bool) -> Self {
        self.task_prefixes = enabled;
        self
    }

    #[inline]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    #[inline]
    pub fn generation_model(&self) -> &str {
        &self.generation_model
    }

    /// Test connection to the Ollama server and verify both models are pulled
    #[inline]
    pub fn health_check(&self) -> Result<()> {
        debug!("Performing health check for Ollama at {}", self.base_url);

        self.ping().context("Server ping failed")?;
        self.validate_model(&self.embedding_model)
            .context("Embedding model validation failed")?;
        self.validate_model(&self.generation_model)
            .context("Generation model validation failed")?;

        info!(
            "Health check passed for Ollama server at {} with models {} and {}",
            self.base_url, self.embedding_model, self.generation_model
        );
        Ok(())
    }

    /// Ping the Ollama server to check if it's responsive
    #[inline]
    pub fn ping(&self) -> Result<(), ProviderError> {
        debug!("Pinging Ollama server at {}", self.base_url);
        self.list_models()?;
        debug!("Server ping successful");
        Ok(())
    }

    #[inline]
    pub fn validate_model(&self, model: &str) -> Result<()> {
        debug!("Validating model: {}", model);

        let models = self.list_models().context("Failed to list models")?;

        if models.iter().any(|m| m.name == model) {
            debug!("Model {} is available", model);
            Ok(())
        } else {
            let available_models: Vec<&str> = models.iter().map(|m| m.name.as_str()).collect();
            warn!(
                "Model {} not found. Available models: {:?}",
                model, available_models
            );
            Err(anyhow::anyhow!(
                "Model '{}' is not available. Available models: {:?}",
                model,
                available_models
            ))
        }
    }

    #[inline]
    pub fn list_models(&self) -> Result<Vec<ModelInfo>, ProviderError> {
        let url = self.endpoint("/api/tags")?;
        let models_response: ModelsResponse = get_json(&self.agent, url.as_str(), self.timeout)?;

        debug!("Found {} models", models_response.models.len());
        Ok(models_response.models)
    }

    fn endpoint(&self, path: &str) -> Result<Url, ProviderError> {
        self.base_url
            .join(path)
            .map_err(|e| ProviderError::Transport(format!("invalid endpoint {}: {}", path, e)))
    }

    fn prefixed(&self, text: &str, task: TaskType) -> String {
        if !self.task_prefixes {
            return text.to_string();
        }
        let prefix = match task {
            TaskType::Document => DOCUMENT_PREFIX,
            TaskType::Query => QUERY_PREFIX,
        };
        format!("{}{}", prefix, text)
    }
}

impl EmbeddingProvider for OllamaClient {
    #[inline]
    fn model(&self) -> &str {
        &self.embedding_model
    }

    #[inline]
    fn embed_with_task(&self, text: &str, task: TaskType) -> Result<Vec<f32>, ProviderError> {
        debug!("Embedding {} chars as {:?}", text.chars().count(), task);

        let url = self.endpoint("/api/embed")?;
        let request = EmbedRequest {
            model: &self.embedding_model,
            input: self.prefixed(text, task),
        };

        let response: EmbedResponse =
            post_json(&self.agent, url.as_str(), &[], &request, self.timeout)?;

        let mut embeddings = response.embeddings.into_iter();
        match (embeddings.next(), embeddings.next()) {
            (Some(embedding), None) if !embedding.is_empty() => Ok(embedding),
            (Some(_), None) => Err(ProviderError::MalformedResponse(
                "empty embedding vector".to_string(),
            )),
            _ => Err(ProviderError::MalformedResponse(
                "expected exactly one embedding".to_string(),
            )),
        }
    }
}

impl GenerationProvider for OllamaClient {
    #[inline]
    fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        debug!(
            "Generating with {} (prompt: {} chars)",
            self.generation_model,
            prompt.chars().count()
        );

        let url = self.endpoint("/api/generate")?;
        let request = GenerateRequest {
            model: &self.generation_model,
            prompt,
            stream: false,
        };

        let response: GenerateResponse =
            post_json(&self.agent, url.as_str(), &[], &request, self.timeout)?;
        Ok(response.response)
    }
}
