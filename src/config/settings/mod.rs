
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::chunking::ChunkingConfig;

pub const API_KEY_ENV_VAR: &str = "GEMINI_API_KEY";

const OLLAMA_DEFAULT_URL: &str = "http://localhost:11434";
const OLLAMA_DEFAULT_EMBEDDING_MODEL: &str = "nomic-embed-text:latest";
const OLLAMA_DEFAULT_GENERATION_MODEL: &str = "llama3.2:latest";
const GEMINI_DEFAULT_URL: &str = "https://generativelanguage.googleapis.com";
const GEMINI_DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-004";
const GEMINI_DEFAULT_GENERATION_MODEL: &str = "gemini-2.5-flash";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub indexing: IndexingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(skip)]
    pub base_dir: PathBuf,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Ollama,
    Gemini,
}

impl std::fmt::Display for ProviderKind {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ollama => write!(f, "ollama"),
            Self::Gemini => write!(f, "gemini"),
        }
    }
}

/// Connection settings for the embedding and generation backend.
/// Unset URLs and model names fall back to defaults for the selected `kind`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    pub base_url: Option<String>,
    pub embedding_model: Option<String>,
    pub generation_model: Option<String>,
    pub api_key: Option<String>,
    pub timeout_seconds: u64,
    /// Prefix Ollama inputs with `search_document: ` / `search_query: `
    pub task_prefixes: bool,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: ProviderKind::Ollama,
            base_url: None,
            embedding_model: None,
            generation_model: None,
            api_key: None,
            timeout_seconds: 30,
            task_prefixes: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct IndexingConfig {
    /// Maximum number of embedding calls in flight
    pub concurrency: usize,
    /// Minimum spacing between the starts of two embedding calls
    pub request_interval_ms: u64,
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            request_interval_ms: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k: usize,
    /// Characters of chunk text shown in previews
    pub preview_chars: usize,
    /// How the corpus is described to the generation model
    pub corpus_description: String,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 3,
            preview_chars: 200,
            corpus_description: "the provided document".to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration directory not found or could not be created")]
    DirectoryError,
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("Invalid model name: {0:?} (cannot be empty)")]
    InvalidModel(String),
    #[error("Invalid timeout: {0} (must be between 1 and 600 seconds)")]
    InvalidTimeout(u64),
    #[error("Missing API key for {0} (set it in config.toml or GEMINI_API_KEY)")]
    MissingApiKey(ProviderKind),
    #[error("Invalid chunk size: {0} (must be greater than 0)")]
    InvalidChunkSize(usize),
    #[error("Overlap ({0}) must be smaller than chunk size ({1})")]
    OverlapTooLarge(usize, usize),
    #[error("Invalid concurrency: {0} (must be between 1 and 64)")]
    InvalidConcurrency(usize),
    #[error("Invalid request interval: {0}ms (must be at most 60000)")]
    InvalidRequestInterval(u64),
    #[error("Invalid top_k: {0} (must be between 1 and 100)")]
    InvalidTopK(usize),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl Config {
    /// Default configuration directory, `~/.textbook-rag`
    #[inline]
    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        dirs::home_dir()
            .map(|home| home.join(".textbook-rag"))
            .or_else(|| dirs::data_dir().map(|data| data.join("textbook-rag")))
            .ok_or(ConfigError::DirectoryError)
    }

    /// Load `config.toml` from the default configuration directory
    #[inline]
    pub fn load_default() -> Result<Self> {
        Self::load(Self::config_dir()?)
    }

    #[inline]
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join("config.toml");

        if !config_path.exists() {
            return Ok(Self {
                base_dir: config_dir.as_ref().to_path_buf(),
                ..Self::default()
            });
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;
        config.base_dir = config_dir.as_ref().to_path_buf();

        config
            .validate()
            .with_context(|| "Configuration validation failed")?;

        Ok(config)
    }

    #[inline]
    pub fn save(&self) -> Result<()> {
        self.validate()
            .context("Configuration validation failed before saving")?;

        let config_dir = self.get_base_dir();

        fs::create_dir_all(config_dir).with_context(|| {
            format!(
                "Failed to create config directory: {}",
                config_dir.display()
            )
        })?;

        let config_path = self.config_file_path();
        let content = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

        Ok(())
    }

    #[inline]
    pub fn get_base_dir(&self) -> &Path {
        &self.base_dir
    }

    #[inline]
    pub fn config_file_path(&self) -> PathBuf {
        self.get_base_dir().join("config.toml")
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.provider.validate()?;
        self.chunking.validate()?;
        self.indexing.validate()?;
        self.retrieval.validate()?;
        Ok(())
    }
}

impl ProviderConfig {
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.endpoint()?;

        if !(1..=600).contains(&self.timeout_seconds) {
            return Err(ConfigError::InvalidTimeout(self.timeout_seconds));
        }

        for model in [&self.embedding_model, &self.generation_model]
            .into_iter()
            .flatten()
        {
            if model.trim().is_empty() {
                return Err(ConfigError::InvalidModel(model.clone()));
            }
        }

        Ok(())
    }

    /// Base URL of the provider API
    #[inline]
    pub fn endpoint(&self) -> Result<Url, ConfigError> {
        let raw = self.base_url.as_deref().unwrap_or(match self.kind {
            ProviderKind::Ollama => OLLAMA_DEFAULT_URL,
            ProviderKind::Gemini => GEMINI_DEFAULT_URL,
        });

        let url = Url::parse(raw).map_err(|_| ConfigError::InvalidUrl(raw.to_string()))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::InvalidUrl(raw.to_string()));
        }
        Ok(url)
    }

    #[inline]
    pub fn embedding_model(&self) -> &str {
        self.embedding_model
            .as_deref()
            .unwrap_or(match self.kind {
                ProviderKind::Ollama => OLLAMA_DEFAULT_EMBEDDING_MODEL,
                ProviderKind::Gemini => GEMINI_DEFAULT_EMBEDDING_MODEL,
            })
    }

    #[inline]
    pub fn generation_model(&self) -> &str {
        self.generation_model
            .as_deref()
            .unwrap_or(match self.kind {
                ProviderKind::Ollama => OLLAMA_DEFAULT_GENERATION_MODEL,
                ProviderKind::Gemini => GEMINI_DEFAULT_GENERATION_MODEL,
            })
    }

    /// API key from the config file, falling back to the environment
    #[inline]
    pub fn api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var(API_KEY_ENV_VAR).ok())
            .filter(|key| !key.trim().is_empty())
    }

    #[inline]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    #[inline]
    pub fn set_base_url(&mut self, base_url: Option<String>) -> Result<(), ConfigError> {
        let temp_config = ProviderConfig {
            base_url: base_url.clone(),
            ..self.clone()
        };
        temp_config.endpoint()?;
        self.base_url = base_url;
        Ok(())
    }

    #[inline]
    pub fn set_embedding_model(&mut self, model: String) -> Result<(), ConfigError> {
        if model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(model));
        }
        self.embedding_model = Some(model);
        Ok(())
    }

    #[inline]
    pub fn set_generation_model(&mut self, model: String) -> Result<(), ConfigError> {
        if model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(model));
        }
        self.generation_model = Some(model);
        Ok(())
    }

    #[inline]
    pub fn set_timeout_seconds(&mut self, timeout_seconds: u64) -> Result<(), ConfigError> {
        if !(1..=600).contains(&timeout_seconds) {
            return Err(ConfigError::InvalidTimeout(timeout_seconds));
        }
        self.timeout_seconds = timeout_seconds;
        Ok(())
    }
}

impl IndexingConfig {
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=64).contains(&self.concurrency) {
            return Err(ConfigError::InvalidConcurrency(self.concurrency));
        }
        if self.request_interval_ms > 60_000 {
            return Err(ConfigError::InvalidRequestInterval(
                self.request_interval_ms,
            ));
        }
        Ok(())
    }

    #[inline]
    pub fn request_interval(&self) -> Duration {
        Duration::from_millis(self.request_interval_ms)
    }
}

impl RetrievalConfig {
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.top_k) {
            return Err(ConfigError::InvalidTopK(self.top_k));
        }
        Ok(())
    }
}
