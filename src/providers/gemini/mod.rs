
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::http::{build_agent, post_json};
use super::{EmbeddingProvider, GenerationProvider, ProviderError, TaskType};
use crate::config::{ConfigError, ProviderConfig};

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Client for the Gemini REST API
#[derive(Clone)]
pub struct GeminiClient {
    base_url: Url,
    embedding_model: String,
    generation_model: String,
    api_key: String,
    agent: ureq::Agent,
    timeout: Duration,
}

impl std::fmt::Debug for GeminiClient {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("base_url", &self.base_url.as_str())
            .field("embedding_model", &self.embedding_model)
            .field("generation_model", &self.generation_model)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedContentRequest<'a> {
    content: Content<'a>,
    task_type: &'static str,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: [Content<'a>; 1],
}

#[derive(Debug, Deserialize)]
struct EmbedContentResponse {
    embedding: ContentEmbedding,
}

#[derive(Debug, Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GeminiClient {
    /// Requires an API key, from the config file or `GEMINI_API_KEY`
    #[inline]
    pub fn new(config: &ProviderConfig) -> Result<Self, ConfigError> {
        let api_key = config
            .api_key()
            .ok_or(ConfigError::MissingApiKey(config.kind))?;
        let timeout = config.timeout();

        Ok(Self {
            base_url: config.endpoint()?,
            embedding_model: model_name(config.embedding_model()).to_string(),
            generation_model: model_name(config.generation_model()).to_string(),
            api_key,
            agent: build_agent(timeout),
            timeout,
        })
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = build_agent(timeout);
        self.timeout = timeout;
        self
    }

    #[inline]
    pub fn generation_model(&self) -> &str {
        &self.generation_model
    }

    fn method_url(&self, model: &str, method: &str) -> Result<Url, ProviderError> {
        let path = format!("/v1beta/models/{}:{}", model, method);
        self.base_url
            .join(&path)
            .map_err(|e| ProviderError::Transport(format!("invalid endpoint {}: {}", path, e)))
    }

    fn post<B: Serialize, R: serde::de::DeserializeOwned>(
        &self,
        url: &Url,
        body: &B,
    ) -> Result<R, ProviderError> {
        post_json(
            &self.agent,
            url.as_str(),
            &[(API_KEY_HEADER, self.api_key.as_str())],
            body,
            self.timeout,
        )
    }
}

/// Accepts both `text-embedding-004` and `models/text-embedding-004`
fn model_name(model: &str) -> &str {
    model.strip_prefix("models/").unwrap_or(model)
}

fn task_type(task: TaskType) -> &'static str {
    match task {
        TaskType::Document => "RETRIEVAL_DOCUMENT",
        TaskType::Query => "RETRIEVAL_QUERY",
    }
}

impl EmbeddingProvider for GeminiClient {
    #[inline]
    fn model(&self) -> &str {
        &self.embedding_model
    }

    #[inline]
    fn embed_with_task(&self, text: &str, task: TaskType) -> Result<Vec<f32>, ProviderError> {
        debug!("Embedding {} chars as {:?}", text.chars().count(), task);

        let url = self.method_url(&self.embedding_model, "embedContent")?;
        let request = EmbedContentRequest {
            content: Content {
                parts: [Part { text }],
            },
            task_type: task_type(task),
        };

        let response: EmbedContentResponse = self.post(&url, &request)?;
        if response.embedding.values.is_empty() {
            return Err(ProviderError::MalformedResponse(
                "empty embedding vector".to_string(),
            ));
        }
        Ok(response.embedding.values)
    }
}

impl GenerationProvider for GeminiClient {
    #[inline]
    fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        debug!(
            "Generating with {} (prompt: {} chars)",
            self.generation_model,
            prompt.chars().count()
        );

        let url = self.method_url(&self.generation_model, "generateContent")?;
        let request = GenerateContentRequest {
            contents: [Content {
                parts: [Part { text: prompt }],
            }],
        };

        let response: GenerateContentResponse = self.post(&url, &request)?;
        first_candidate_text(response)
    }
}

fn first_candidate_text(response: GenerateContentResponse) -> Result<String, ProviderError> {
    let parts = response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| content.parts)
        .ok_or_else(|| ProviderError::MalformedResponse("no candidates returned".to_string()))?;

    let text: String = parts.into_iter().filter_map(|part| part.text).collect();
    if text.is_empty() {
        return Err(ProviderError::MalformedResponse(
            "candidate contained no text".to_string(),
        ));
    }
    Ok(text)
}
