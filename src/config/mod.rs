// Configuration management module
// TOML settings for the provider backend, chunking, indexing and retrieval

pub mod interactive;
pub mod settings;

#[cfg(test)]
mod tests;

pub use interactive::{run_interactive_config, show_config};
pub use settings::{
    API_KEY_ENV_VAR, Config, ConfigError, IndexingConfig, ProviderConfig, ProviderKind,
    RetrievalConfig,
};

