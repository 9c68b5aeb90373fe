
use std::fs;
use std::io::{BufRead, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use console::style;
use tracing::{info, warn};

use crate::answer::{Answer, Answerer};
use crate::chunking::{ChunkStats, chunk_text};
use crate::config::Config;
use crate::index::{FlatIndex, RetrievalResult, VectorIndex};
use crate::indexer::{BuildReport, IndexBuilder};
use crate::providers::{EmbeddingProvider, GenerationProvider, ProviderClient};
use crate::retriever::Retriever;
use crate::store::{Chunk, load_chunks, materialize, persist_chunks, persist_records};

/// One line typed into the chat prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand<'a> {
    Quit,
    ToggleChunks,
    Empty,
    Question(&'a str),
}

impl<'a> ChatCommand<'a> {
    #[inline]
    pub fn parse(line: &'a str) -> Self {
        let line = line.trim();
        match line.to_lowercase().as_str() {
            "quit" | "exit" | "q" => Self::Quit,
            "chunks" => Self::ToggleChunks,
            "" => Self::Empty,
            _ => Self::Question(line),
        }
    }
}

/// First `max_chars` characters of `text`, with `...` appended when cut
#[inline]
pub fn preview(text: &str, max_chars: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

/// Split a document into chunks and write the chunk file
#[inline]
pub fn chunk_document(input: &Path, output: &Path, config: &Config) -> Result<Vec<Chunk>> {
    info!("Chunking {}", input.display());

    let text = fs::read_to_string(input)
        .with_context(|| format!("Failed to read document: {}", input.display()))?;
    let pieces = chunk_text(&text, &config.chunking)?;
    let chunks = materialize(pieces)?;

    persist_chunks(&chunks, output)
        .with_context(|| format!("Failed to write chunks: {}", output.display()))?;

    println!(
        "{} Created {} chunks from {}",
        style("✓").green(),
        chunks.len(),
        input.display()
    );
    if let Some(stats) = ChunkStats::from_lengths(chunks.iter().map(Chunk::char_count)) {
        print_chunk_stats(&stats);
    }
    println!("Saved to: {}", style(output.display()).cyan());

    Ok(chunks)
}

/// Embed every chunk of a chunk file and write the embedding file
#[inline]
pub async fn embed_chunks(chunks_path: &Path, output: &Path, config: &Config) -> Result<()> {
    let chunks = load_chunks(chunks_path)
        .with_context(|| format!("Failed to load chunks: {}", chunks_path.display()))?;
    embed_and_persist(&chunks, output, config).await
}

/// Chunk a document, embed the chunks and write both files
#[inline]
pub async fn build_index(
    input: &Path,
    chunks_path: &Path,
    embeddings_path: &Path,
    config: &Config,
) -> Result<()> {
    let chunks = chunk_document(input, chunks_path, config)?;
    embed_and_persist(&chunks, embeddings_path, config).await
}

async fn embed_and_persist(chunks: &[Chunk], output: &Path, config: &Config) -> Result<()> {
    let provider = Arc::new(
        ProviderClient::from_config(&config.provider)
            .context("Failed to initialize embedding provider")?,
    );

    let builder = IndexBuilder::new(provider, &config.indexing, config.provider.timeout())
        .with_progress(console::user_attended_stderr());
    let report = builder
        .build(chunks)
        .await
        .context("Embedding build failed")?;

    persist_records(&report.records, output)
        .with_context(|| format!("Failed to write embeddings: {}", output.display()))?;

    print_build_report(&report);
    println!("Saved to: {}", style(output.display()).cyan());
    Ok(())
}

/// Print the chunks closest to `query`
#[inline]
pub fn search(embeddings: &Path, query: &str, top_k: usize, config: &Config) -> Result<()> {
    let retriever = open_retriever(embeddings, config)?;
    let results = retriever
        .retrieve(query, top_k)
        .with_context(|| format!("Search failed for query: {}", query))?;

    if results.is_empty() {
        println!("No chunks indexed.");
        return Ok(());
    }

    print_results(&mut std::io::stdout(), &results, config.retrieval.preview_chars)?;
    Ok(())
}

/// Answer one question from an embedding file
#[inline]
pub fn ask(
    embeddings: &Path,
    question: &str,
    top_k: usize,
    show_chunks: bool,
    config: &Config,
) -> Result<Answer> {
    let answerer = open_answerer(embeddings, config)?;
    let answer = answerer.ask(question, top_k)?;

    print_answer(
        &mut std::io::stdout(),
        &answer,
        show_chunks.then_some(config.retrieval.preview_chars),
    )?;
    Ok(answer)
}

/// Interactive question loop on stdin
#[inline]
pub fn chat(embeddings: &Path, config: &Config) -> Result<()> {
    let answerer = open_answerer(embeddings, config)?;

    println!("{}", style("RAG Q&A").bold().cyan());
    println!(
        "Indexed chunks: {}. Type a question, 'chunks' to toggle previews, 'quit' to exit.",
        answerer.retriever().index().len()
    );

    let stdin = std::io::stdin();
    run_chat(
        &answerer,
        stdin.lock(),
        &mut std::io::stdout(),
        config.retrieval.top_k,
        config.retrieval.preview_chars,
    )
}

/// Read commands from `input` until it ends or the user quits.
///
/// A failed question is reported and the loop continues.
#[inline]
pub fn run_chat<P, G, I, R, W>(
    answerer: &Answerer<P, G, I>,
    input: R,
    output: &mut W,
    top_k: usize,
    preview_chars: usize,
) -> Result<()>
where
    P: EmbeddingProvider,
    G: GenerationProvider,
    I: VectorIndex,
    R: BufRead,
    W: Write,
{
    let mut show_chunks = false;
    let mut lines = input.lines();

    loop {
        write!(output, "\n{} ", style("Question:").bold())?;
        output.flush()?;

        let Some(line) = lines.next() else {
            writeln!(output)?;
            break;
        };
        let line = line.context("Failed to read input")?;

        match ChatCommand::parse(&line) {
            ChatCommand::Quit => break,
            ChatCommand::Empty => {}
            ChatCommand::ToggleChunks => {
                show_chunks = !show_chunks;
                writeln!(
                    output,
                    "Chunk previews {}",
                    if show_chunks { "on" } else { "off" }
                )?;
            }
            ChatCommand::Question(question) => match answerer.ask(question, top_k) {
                Ok(answer) => {
                    print_answer(output, &answer, show_chunks.then_some(preview_chars))?;
                }
                Err(e) => {
                    warn!("Question failed: {}", e);
                    writeln!(
                        output,
                        "{} [{}] {}",
                        style("Error:").red(),
                        e.category(),
                        e
                    )?;
                }
            },
        }
    }

    writeln!(output, "Goodbye!")?;
    Ok(())
}

fn open_retriever(embeddings: &Path, config: &Config) -> Result<Retriever<ProviderClient>> {
    let index = FlatIndex::open(embeddings)
        .with_context(|| format!("Failed to load embeddings: {}", embeddings.display()))?;
    let provider = ProviderClient::from_config(&config.provider)
        .context("Failed to initialize embedding provider")?;

    Ok(Retriever::new(Arc::new(provider), index))
}

fn open_answerer(
    embeddings: &Path,
    config: &Config,
) -> Result<Answerer<ProviderClient, ProviderClient>> {
    let retriever = open_retriever(embeddings, config)?;
    let generator = ProviderClient::from_config(&config.provider)
        .context("Failed to initialize generation provider")?;

    Ok(Answerer::new(retriever, Arc::new(generator))
        .with_corpus_description(config.retrieval.corpus_description.clone()))
}

fn print_chunk_stats(stats: &ChunkStats) {
    println!("  Chunks: {}", stats.count);
    println!("  Shortest: {} chars", stats.min_chars);
    println!("  Longest: {} chars", stats.max_chars);
    println!("  Average: {:.0} chars", stats.average_chars);
}

fn print_build_report(report: &BuildReport) {
    println!(
        "{} Embedded {} chunks",
        style("✓").green(),
        report.embedded_count()
    );

    if report.skipped_count() > 0 {
        println!(
            "{} Skipped {} chunks: {}",
            style("⚠").yellow(),
            report.skipped_count(),
            report.skipped_ids().join(", ")
        );
        for skipped in &report.skipped {
            println!("   {} [{}] {}", skipped.chunk_id, skipped.reason.kind(), skipped.reason);
        }
    }
}

fn print_results<W: Write>(
    output: &mut W,
    results: &[RetrievalResult],
    preview_chars: usize,
) -> std::io::Result<()> {
    for (rank, result) in results.iter().enumerate() {
        writeln!(
            output,
            "\nChunk {} ({}, similarity: {:.3}):",
            rank + 1,
            result.chunk_id,
            result.similarity
        )?;
        writeln!(output, "{}", preview(&result.text, preview_chars))?;
    }
    Ok(())
}

fn print_answer<W: Write>(
    output: &mut W,
    answer: &Answer,
    preview_chars: Option<usize>,
) -> std::io::Result<()> {
    if let Some(preview_chars) = preview_chars {
        writeln!(output, "\n{}", style("[RETRIEVED CHUNKS]").dim())?;
        print_results(output, &answer.chunks_used, preview_chars)?;
    }

    writeln!(output, "\n{}\n{}", style("ANSWER:").bold().green(), answer.answer)?;
    Ok(())
}
