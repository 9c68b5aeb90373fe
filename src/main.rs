use std::path::PathBuf;

use clap::{Parser, Subcommand};
use textbook_rag::Result;
use textbook_rag::commands::{ask, build_index, chat, chunk_document, embed_chunks, search};
use textbook_rag::config::{Config, run_interactive_config, show_config};

#[derive(Parser)]
#[command(name = "textbook-rag")]
#[command(about = "Answer questions about a document with retrieval-augmented generation")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure the provider, chunking and retrieval settings
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Split a text document into overlapping chunks
    Chunk {
        /// Plain text document
        input: PathBuf,
        /// Where to write the chunk file
        #[arg(short, long, default_value = "chunks.json")]
        output: PathBuf,
    },
    /// Embed every chunk of a chunk file
    Embed {
        /// Chunk file produced by `chunk`
        chunks: PathBuf,
        /// Where to write the embedding file
        #[arg(short, long, default_value = "embeddings.json")]
        output: PathBuf,
    },
    /// Chunk and embed a document in one step
    Build {
        /// Plain text document
        input: PathBuf,
        #[arg(long, default_value = "chunks.json")]
        chunks: PathBuf,
        #[arg(long, default_value = "embeddings.json")]
        embeddings: PathBuf,
    },
    /// Show the chunks most similar to a query
    Search {
        /// Embedding file produced by `embed` or `build`
        embeddings: PathBuf,
        query: String,
        /// Number of chunks to return (defaults to the configured top_k)
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },
    /// Answer a single question
    Ask {
        embeddings: PathBuf,
        question: String,
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
        /// Print the retrieved chunks before the answer
        #[arg(long)]
        show_chunks: bool,
    },
    /// Ask questions interactively
    Chat { embeddings: PathBuf },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Commands::Config { show } = cli.command {
        if show {
            show_config()?;
        } else {
            run_interactive_config()?;
        }
        return Ok(());
    }

    let config = Config::load_default()?;
    let top_k = |requested: Option<usize>| requested.unwrap_or(config.retrieval.top_k);

    match cli.command {
        Commands::Config { .. } => {}
        Commands::Chunk { input, output } => {
            chunk_document(&input, &output, &config)?;
        }
        Commands::Embed { chunks, output } => {
            embed_chunks(&chunks, &output, &config).await?;
        }
        Commands::Build {
            input,
            chunks,
            embeddings,
        } => {
            build_index(&input, &chunks, &embeddings, &config).await?;
        }
        Commands::Search {
            embeddings,
            query,
            top_k: requested,
        } => {
            search(&embeddings, &query, top_k(requested), &config)?;
        }
        Commands::Ask {
            embeddings,
            question,
            top_k: requested,
            show_chunks,
        } => {
            ask(&embeddings, &question, top_k(requested), show_chunks, &config)?;
        }
        Commands::Chat { embeddings } => {
            chat(&embeddings, &config)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn chunk_command_defaults() {
        let cli = Cli::try_parse_from(["textbook-rag", "chunk", "chapter10.txt"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Chunk { input, output } = parsed.command {
                assert_eq!(input, PathBuf::from("chapter10.txt"));
                assert_eq!(output, PathBuf::from("chunks.json"));
            } else {
                panic!("expected chunk command");
            }
        }
    }

    #[test]
    fn build_command_paths() {
        let cli = Cli::try_parse_from([
            "textbook-rag",
            "build",
            "chapter9.txt",
            "--chunks",
            "data/ch9_chunks.json",
            "--embeddings",
            "data/ch9_embeddings.json",
        ]);

        if let Ok(Cli {
            command:
                Commands::Build {
                    chunks, embeddings, ..
                },
        }) = cli
        {
            assert_eq!(chunks, PathBuf::from("data/ch9_chunks.json"));
            assert_eq!(embeddings, PathBuf::from("data/ch9_embeddings.json"));
        } else {
            panic!("expected build command");
        }
    }

    #[test]
    fn ask_command_flags() {
        let cli = Cli::try_parse_from([
            "textbook-rag",
            "ask",
            "embeddings.json",
            "What is a support vector?",
            "-k",
            "5",
            "--show-chunks",
        ]);

        if let Ok(Cli {
            command:
                Commands::Ask {
                    question,
                    top_k,
                    show_chunks,
                    ..
                },
        }) = cli
        {
            assert_eq!(question, "What is a support vector?");
            assert_eq!(top_k, Some(5));
            assert!(show_chunks);
        } else {
            panic!("expected ask command");
        }
    }

    #[test]
    fn search_top_k_is_optional() {
        let cli = Cli::try_parse_from(["textbook-rag", "search", "e.json", "margin"]);

        if let Ok(Cli {
            command: Commands::Search { top_k, .. },
        }) = cli
        {
            assert_eq!(top_k, None);
        } else {
            panic!("expected search command");
        }
    }

    #[test]
    fn config_show_flag() {
        let cli = Cli::try_parse_from(["textbook-rag", "config", "--show"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Config { show } = parsed.command {
                assert!(show);
            }
        }
    }

    #[test]
    fn chat_requires_embeddings() {
        let cli = Cli::try_parse_from(["textbook-rag", "chat"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
        }
    }

    #[test]
    fn invalid_command() {
        let cli = Cli::try_parse_from(["textbook-rag", "invalid"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::InvalidSubcommand);
        }
    }

    #[test]
    fn help_message() {
        let cli = Cli::try_parse_from(["textbook-rag", "--help"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::DisplayHelp);
        }
    }
}
