// Build pipeline
// Embeds every chunk once, at most `concurrency` calls in flight and call starts spaced by
// the configured interval. A failed chunk becomes a skip and the rest of the build proceeds.
// Embeddings of differing lengths abort the build.


use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep_until, timeout};
use tracing::{debug, info, warn};

use crate::{RagError, Result};
use crate::config::IndexingConfig;
use crate::index::{EmbeddingRecord, FlatIndex};
use crate::providers::{EmbeddingProvider, ProviderError};
use crate::store::Chunk;

/// Result of embedding one chunk
#[derive(Debug, Clone, PartialEq)]
pub enum EmbedOutcome {
    Embedded(EmbeddingRecord),
    Skipped(SkippedChunk),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedChunk {
    pub chunk_id: String,
    pub reason: ProviderError,
}

/// Records in chunk order plus every chunk that could not be embedded
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildReport {
    pub records: Vec<EmbeddingRecord>,
    pub skipped: Vec<SkippedChunk>,
}

impl BuildReport {
    /// Every embedded record must share the first record's length
    fn from_outcomes(outcomes: Vec<EmbedOutcome>) -> Result<Self> {
        let mut report = Self::default();

        for outcome in outcomes {
            match outcome {
                EmbedOutcome::Embedded(record) => {
                    if let Some(first) = report
                        .records
                        .first()
                        .filter(|first| first.dimension() != record.dimension())
                    {
                        return Err(RagError::DimensionMismatch {
                            context: format!(
                                "embedding build ({} vs {})",
                                record.chunk_id(),
                                first.chunk_id()
                            ),
                            expected: first.dimension(),
                            found: record.dimension(),
                        });
                    }
                    report.records.push(record);
                }
                EmbedOutcome::Skipped(skipped) => report.skip(skipped),
            }
        }

        Ok(report)
    }

    fn skip(&mut self, skipped: SkippedChunk) {
        warn!(
            "Skipping {} ({}): {}",
            skipped.chunk_id,
            skipped.reason.kind(),
            skipped.reason
        );
        self.skipped.push(skipped);
    }

    #[inline]
    pub fn embedded_count(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }

    #[inline]
    pub fn skipped_ids(&self) -> Vec<&str> {
        self.skipped
            .iter()
            .map(|skipped| skipped.chunk_id.as_str())
            .collect()
    }

    #[inline]
    pub fn into_index(self) -> Result<FlatIndex> {
        FlatIndex::build(self.records)
    }
}

/// Spaces call starts at least `interval` apart across all concurrent callers
#[derive(Debug)]
struct RequestPacer {
    interval: Duration,
    next_slot: Mutex<Instant>,
}

impl RequestPacer {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_slot: Mutex::new(Instant::now()),
        }
    }

    async fn wait(&self) {
        if self.interval.is_zero() {
            return;
        }

        let slot = {
            let mut next_slot = self.next_slot.lock().await;
            let slot = (*next_slot).max(Instant::now());
            *next_slot = slot + self.interval;
            slot
        };

        sleep_until(slot).await;
    }
}

/// Turns chunks into embedding records through an [`EmbeddingProvider`]
pub struct IndexBuilder<P> {
    provider: Arc<P>,
    concurrency: usize,
    call_timeout: Duration,
    pacer: RequestPacer,
    show_progress: bool,
}

impl<P> IndexBuilder<P>
where
    P: EmbeddingProvider + 'static,
{
    #[inline]
    pub fn new(provider: Arc<P>, config: &IndexingConfig, call_timeout: Duration) -> Self {
        Self {
            provider,
            concurrency: config.concurrency.max(1),
            call_timeout,
            pacer: RequestPacer::new(config.request_interval()),
            show_progress: false,
        }
    }

    /// Draw a progress bar on stderr when a user is watching
    #[inline]
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Embed every chunk exactly once. Output records keep chunk order.
    ///
    /// Provider failures become skips. Embeddings of differing lengths fail the whole build
    /// with [`RagError::DimensionMismatch`].
    #[inline]
    pub async fn build(&self, chunks: &[Chunk]) -> Result<BuildReport> {
        info!(
            "Embedding {} chunks with {} (concurrency {})",
            chunks.len(),
            self.provider.model(),
            self.concurrency
        );

        let bar = self.progress_bar(chunks.len());

        let outcomes: Vec<EmbedOutcome> = stream::iter(chunks)
            .map(|chunk| self.embed_chunk(chunk))
            .buffered(self.concurrency)
            .inspect(|_| bar.inc(1))
            .collect()
            .await;

        bar.finish_and_clear();

        let report = BuildReport::from_outcomes(outcomes)?;
        info!(
            "Embedded {} chunks, skipped {}",
            report.embedded_count(),
            report.skipped_count()
        );
        Ok(report)
    }

    async fn embed_chunk(&self, chunk: &Chunk) -> EmbedOutcome {
        self.pacer.wait().await;
        debug!("Embedding {}", chunk.id());

        let provider = Arc::clone(&self.provider);
        let text = chunk.text().to_string();
        // A blocking call that outlives the timeout keeps running but its result is dropped
        let call = tokio::task::spawn_blocking(move || provider.embed(&text));

        let result = match timeout(self.call_timeout, call).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => Err(ProviderError::Transport(format!(
                "embedding task failed: {}",
                join_error
            ))),
            Err(_) => Err(ProviderError::Timeout(self.call_timeout)),
        };

        let embedding = match result {
            Ok(embedding) => embedding,
            Err(reason) => {
                return EmbedOutcome::Skipped(SkippedChunk {
                    chunk_id: chunk.id().to_string(),
                    reason,
                });
            }
        };

        match EmbeddingRecord::new(chunk.id(), chunk.text(), embedding) {
            Ok(record) => EmbedOutcome::Embedded(record),
            Err(e) => EmbedOutcome::Skipped(SkippedChunk {
                chunk_id: chunk.id().to_string(),
                reason: ProviderError::MalformedResponse(e.to_string()),
            }),
        }
    }

    fn progress_bar(&self, len: usize) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }

        let bar = ProgressBar::new(len as u64);
        if let Ok(style) =
            ProgressStyle::with_template("{spinner} [{bar:30}] {pos}/{len} chunks ({eta})")
        {
            bar.set_style(style.progress_chars("=> "));
        }
        bar
    }
}
