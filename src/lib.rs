use thiserror::Error;

use crate::config::ConfigError;
use crate::providers::ProviderError;

pub type Result<T> = std::result::Result<T, RagError>;

#[derive(Error, Debug)]
pub enum RagError {
    #[error("Format error: {0}")]
    Format(String),

    #[error("Dimension mismatch in {context}: expected {expected}, found {found}")]
    DimensionMismatch {
        context: String,
        expected: usize,
        found: usize,
    },

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl RagError {
    /// Short category label used when reporting failures to the user
    #[inline]
    pub fn category(&self) -> &'static str {
        match self {
            Self::Format(_) => "format",
            Self::DimensionMismatch { .. } => "dimension",
            Self::InvalidRecord(_) | Self::InvalidArgument(_) => "input",
            Self::Provider(_) => "provider",
            Self::Config(_) => "config",
            Self::Io(_) => "io",
            Self::Other(_) => "other",
        }
    }
}

pub mod answer;
pub mod chunking;
pub mod commands;
pub mod config;
pub mod index;
pub mod indexer;
pub mod providers;
pub mod retriever;
pub mod store;
