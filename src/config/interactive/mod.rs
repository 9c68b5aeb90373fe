
use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input, Password, Select};

use super::{
    Config, ConfigError, IndexingConfig, ProviderConfig, ProviderKind, RetrievalConfig,
};
use crate::chunking::ChunkingConfig;
use crate::providers::OllamaClient;

const PROVIDER_KINDS: [ProviderKind; 2] = [ProviderKind::Ollama, ProviderKind::Gemini];

#[inline]
pub fn run_interactive_config() -> Result<()> {
    eprintln!("{}", style("🔧 Textbook RAG Configuration Setup").bold().cyan());
    eprintln!();

    let mut config = load_existing_config()?;

    eprintln!("{}", style("Provider Configuration").bold().yellow());
    eprintln!("Choose the backend used for embeddings and answer generation.");
    eprintln!();

    configure_provider(&mut config.provider)?;

    eprintln!();
    eprintln!("{}", style("Chunking Configuration").bold().yellow());
    configure_chunking(&mut config.chunking)?;

    eprintln!();
    eprintln!("{}", style("Indexing Configuration").bold().yellow());
    configure_indexing(&mut config.indexing)?;

    eprintln!();
    eprintln!("{}", style("Retrieval Configuration").bold().yellow());
    configure_retrieval(&mut config.retrieval)?;

    eprintln!();
    eprintln!("{}", style("Testing configuration...").yellow());
    report_connection(&config.provider);

    eprintln!();
    if Confirm::new()
        .with_prompt("Save configuration?")
        .default(true)
        .interact()?
    {
        config.save().context("Failed to save configuration")?;
        eprintln!("{}", style("✓ Configuration saved successfully!").green());
        eprintln!(
            "Configuration saved to: {}",
            style(config.config_file_path().display()).cyan()
        );
    } else {
        eprintln!("Configuration not saved.");
    }

    Ok(())
}

#[inline]
pub fn show_config() -> Result<()> {
    let config = Config::load_default().context("Failed to load configuration")?;

    eprintln!("{}", style("📋 Current Configuration").bold().cyan());
    eprintln!();

    let provider = &config.provider;
    eprintln!("{}", style("Provider Settings:").bold().yellow());
    eprintln!("  Kind: {}", style(provider.kind).cyan());
    match provider.endpoint() {
        Ok(url) => eprintln!("  URL: {}", style(url).cyan()),
        Err(e) => eprintln!("  URL: {} ({})", style("Invalid").red(), e),
    }
    eprintln!("  Embedding model: {}", style(provider.embedding_model()).cyan());
    eprintln!(
        "  Generation model: {}",
        style(provider.generation_model()).cyan()
    );
    eprintln!("  Timeout: {}s", style(provider.timeout_seconds).cyan());
    if provider.kind == ProviderKind::Gemini {
        let key_state = if provider.api_key().is_some() {
            style("set").green()
        } else {
            style("missing").red()
        };
        eprintln!("  API key: {}", key_state);
    }

    eprintln!();
    eprintln!("{}", style("Chunking:").bold().yellow());
    eprintln!("  Chunk size: {}", style(config.chunking.chunk_size).cyan());
    eprintln!("  Overlap: {}", style(config.chunking.overlap).cyan());

    eprintln!();
    eprintln!("{}", style("Indexing:").bold().yellow());
    eprintln!("  Concurrency: {}", style(config.indexing.concurrency).cyan());
    eprintln!(
        "  Request interval: {}ms",
        style(config.indexing.request_interval_ms).cyan()
    );

    eprintln!();
    eprintln!("{}", style("Retrieval:").bold().yellow());
    eprintln!("  Top k: {}", style(config.retrieval.top_k).cyan());
    eprintln!(
        "  Preview length: {}",
        style(config.retrieval.preview_chars).cyan()
    );

    eprintln!();
    eprintln!(
        "Config file: {}",
        style(config.config_file_path().display()).dim()
    );

    Ok(())
}

fn load_existing_config() -> Result<Config> {
    match Config::load_default() {
        Ok(config) if config.config_file_path().exists() => {
            eprintln!("{}", style("Found existing configuration.").green());
            Ok(config)
        }
        Ok(config) => {
            eprintln!(
                "{}",
                style("No existing configuration found. Using defaults.").yellow()
            );
            Ok(config)
        }
        Err(e) => {
            eprintln!(
                "{} ({:#})",
                style("Existing configuration is unreadable. Using defaults.").yellow(),
                e
            );
            Ok(Config {
                base_dir: Config::config_dir()?,
                ..Config::default()
            })
        }
    }
}

fn configure_provider(provider: &mut ProviderConfig) -> Result<()> {
    let default_index = PROVIDER_KINDS
        .iter()
        .position(|&kind| kind == provider.kind)
        .unwrap_or(0);

    let kind_index = Select::new()
        .with_prompt("Provider")
        .default(default_index)
        .items(&PROVIDER_KINDS)
        .interact()?;

    let kind = PROVIDER_KINDS[kind_index];
    if kind != provider.kind {
        // Model names and URLs are provider specific
        *provider = ProviderConfig {
            kind,
            api_key: provider.api_key.clone(),
            ..ProviderConfig::default()
        };
    }

    let default_url = provider.endpoint()?.to_string();
    let base_url: String = Input::new()
        .with_prompt("Base URL")
        .default(default_url.clone())
        .validate_with(|input: &String| -> Result<(), String> {
            let temp_config = ProviderConfig {
                base_url: Some(input.clone()),
                ..provider.clone()
            };
            temp_config.endpoint().map(|_| ()).map_err(|e| e.to_string())
        })
        .interact_text()?;

    let embedding_model: String = Input::new()
        .with_prompt("Embedding model")
        .default(provider.embedding_model().to_string())
        .validate_with(|input: &String| non_empty(input))
        .interact_text()?;

    let generation_model: String = Input::new()
        .with_prompt("Generation model")
        .default(provider.generation_model().to_string())
        .validate_with(|input: &String| non_empty(input))
        .interact_text()?;

    let timeout_seconds: u64 = Input::new()
        .with_prompt("Request timeout (seconds)")
        .default(provider.timeout_seconds)
        .validate_with(|input: &u64| -> Result<(), &str> {
            if (1..=600).contains(input) {
                Ok(())
            } else {
                Err("Timeout must be between 1 and 600 seconds")
            }
        })
        .interact_text()?;

    if base_url != default_url {
        provider.set_base_url(Some(base_url))?;
    }
    provider.set_embedding_model(embedding_model)?;
    provider.set_generation_model(generation_model)?;
    provider.set_timeout_seconds(timeout_seconds)?;

    if kind == ProviderKind::Gemini && provider.api_key().is_none() {
        let api_key = Password::new()
            .with_prompt("Gemini API key (leave empty to use GEMINI_API_KEY)")
            .allow_empty_password(true)
            .interact()?;
        if !api_key.trim().is_empty() {
            provider.api_key = Some(api_key.trim().to_string());
        }
    }

    Ok(())
}

fn configure_chunking(chunking: &mut ChunkingConfig) -> Result<()> {
    let chunk_size: usize = Input::new()
        .with_prompt("Chunk size (characters)")
        .default(chunking.chunk_size)
        .validate_with(|input: &usize| -> Result<(), &str> {
            if *input == 0 {
                Err("Chunk size must be greater than 0")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let overlap: usize = Input::new()
        .with_prompt("Overlap (characters)")
        .default(chunking.overlap.min(chunk_size.saturating_sub(1)))
        .validate_with(|input: &usize| -> Result<(), String> {
            ChunkingConfig::new(chunk_size, *input)
                .map(|_| ())
                .map_err(|e| e.to_string())
        })
        .interact_text()?;

    *chunking = ChunkingConfig::new(chunk_size, overlap)?;
    Ok(())
}

fn configure_indexing(indexing: &mut IndexingConfig) -> Result<()> {
    let concurrency: usize = Input::new()
        .with_prompt("Concurrent embedding calls")
        .default(indexing.concurrency)
        .validate_with(|input: &usize| -> Result<(), String> {
            indexing_config(*input, indexing.request_interval_ms)
                .map(|_| ())
                .map_err(|e| e.to_string())
        })
        .interact_text()?;

    let request_interval_ms: u64 = Input::new()
        .with_prompt("Interval between embedding calls (ms)")
        .default(indexing.request_interval_ms)
        .validate_with(|input: &u64| -> Result<(), String> {
            indexing_config(concurrency, *input)
                .map(|_| ())
                .map_err(|e| e.to_string())
        })
        .interact_text()?;

    *indexing = indexing_config(concurrency, request_interval_ms)?;
    Ok(())
}

fn configure_retrieval(retrieval: &mut RetrievalConfig) -> Result<()> {
    let top_k: usize = Input::new()
        .with_prompt("Chunks retrieved per question (top k)")
        .default(retrieval.top_k)
        .validate_with(|input: &usize| -> Result<(), String> {
            retrieval_config(retrieval, *input, retrieval.preview_chars)
                .map(|_| ())
                .map_err(|e| e.to_string())
        })
        .interact_text()?;

    let preview_chars: usize = Input::new()
        .with_prompt("Preview length (characters)")
        .default(retrieval.preview_chars)
        .interact_text()?;

    let corpus_description: String = Input::new()
        .with_prompt("Corpus description used in prompts")
        .default(retrieval.corpus_description.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Corpus description cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let mut updated = retrieval_config(retrieval, top_k, preview_chars)?;
    updated.corpus_description = corpus_description.trim().to_string();
    *retrieval = updated;
    Ok(())
}

fn indexing_config(
    concurrency: usize,
    request_interval_ms: u64,
) -> Result<IndexingConfig, ConfigError> {
    let indexing = IndexingConfig {
        concurrency,
        request_interval_ms,
    };
    indexing.validate()?;
    Ok(indexing)
}

fn retrieval_config(
    current: &RetrievalConfig,
    top_k: usize,
    preview_chars: usize,
) -> Result<RetrievalConfig, ConfigError> {
    let retrieval = RetrievalConfig {
        top_k,
        preview_chars,
        ..current.clone()
    };
    retrieval.validate()?;
    Ok(retrieval)
}

fn non_empty(input: &str) -> Result<(), &'static str> {
    if input.trim().is_empty() {
        Err("Model name cannot be empty")
    } else {
        Ok(())
    }
}

fn report_connection(provider: &ProviderConfig) {
    match provider.kind {
        ProviderKind::Ollama => match test_ollama_connection(provider) {
            Ok(()) => eprintln!("{}", style("✓ Ollama connection successful!").green()),
            Err(e) => {
                eprintln!(
                    "{}",
                    style(format!("⚠ Warning: {:#}", e)).yellow()
                );
                eprintln!("You can continue, but make sure Ollama is running before indexing.");
            }
        },
        ProviderKind::Gemini => {
            if provider.api_key().is_some() {
                eprintln!("{}", style("✓ Gemini API key found.").green());
            } else {
                eprintln!(
                    "{}",
                    style("⚠ Warning: no Gemini API key configured").yellow()
                );
                eprintln!("Set GEMINI_API_KEY before indexing.");
            }
        }
    }
}

fn test_ollama_connection(provider: &ProviderConfig) -> Result<()> {
    let client = OllamaClient::new(provider)?.with_timeout(std::time::Duration::from_secs(5));
    client.health_check()
}
