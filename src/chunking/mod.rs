
use itertools::{Itertools, MinMaxResult};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ConfigError;

/// Blank-line separator between paragraphs, both when splitting and when joining
pub const PARAGRAPH_SEPARATOR: &str = "\n\n";

/// Configuration for paragraph chunking. Sizes are measured in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Soft upper bound on chunk length
    pub chunk_size: usize,
    /// Number of trailing characters carried from a closed chunk into the next one
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            chunk_size: 900,
            overlap: 200,
        }
    }
}

impl ChunkingConfig {
    #[inline]
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self, ConfigError> {
        let config = Self {
            chunk_size,
            overlap,
        };
        config.validate()?;
        Ok(config)
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::InvalidChunkSize(self.chunk_size));
        }
        if self.overlap >= self.chunk_size {
            return Err(ConfigError::OverlapTooLarge(self.overlap, self.chunk_size));
        }
        Ok(())
    }
}

/// Split `text` into overlapping chunks along paragraph boundaries.
///
/// Paragraphs are accumulated into a buffer until adding the next one would push the
/// buffer past `chunk_size`. The closed buffer is emitted (trimmed) and the next buffer
/// starts with its last `overlap` characters. That suffix is a raw character slice and
/// may begin in the middle of a word.
///
/// A paragraph longer than `chunk_size` is never split: the size check only fires when
/// a paragraph is about to be appended to a non-empty buffer.
#[inline]
pub fn chunk_text(text: &str, config: &ChunkingConfig) -> Result<Vec<String>, ConfigError> {
    config.validate()?;

    let mut chunks = Vec::new();
    let mut buffer = String::new();
    let mut buffer_len = 0;

    for paragraph in paragraphs(text) {
        let paragraph_len = paragraph.chars().count();

        if buffer_len > 0 && buffer_len + paragraph_len > config.chunk_size {
            chunks.push(buffer.trim().to_string());
            buffer = overlap_suffix(&buffer, buffer_len, config.overlap);
            buffer_len = buffer.chars().count();
        }

        buffer.push_str(paragraph);
        buffer.push_str(PARAGRAPH_SEPARATOR);
        buffer_len += paragraph_len + PARAGRAPH_SEPARATOR.len();
    }

    let tail = buffer.trim();
    if !tail.is_empty() {
        chunks.push(tail.to_string());
    }

    debug!(
        "Chunked {} characters into {} chunks (size {}, overlap {})",
        text.chars().count(),
        chunks.len(),
        config.chunk_size,
        config.overlap
    );

    Ok(chunks)
}

/// Non-empty, trimmed paragraphs of `text` in document order
#[inline]
pub fn paragraphs(text: &str) -> impl Iterator<Item = &str> {
    text.split(PARAGRAPH_SEPARATOR)
        .map(str::trim)
        .filter(|paragraph| !paragraph.is_empty())
}

/// Last `overlap` characters of `buffer`, or the whole buffer if it is not longer
fn overlap_suffix(buffer: &str, buffer_len: usize, overlap: usize) -> String {
    if buffer_len > overlap {
        buffer.chars().skip(buffer_len - overlap).collect()
    } else {
        buffer.to_string()
    }
}

/// Size distribution of a chunk sequence
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChunkStats {
    pub count: usize,
    pub min_chars: usize,
    pub max_chars: usize,
    pub average_chars: f64,
}

impl ChunkStats {
    #[inline]
    pub fn from_lengths<I>(lengths: I) -> Option<Self>
    where
        I: IntoIterator<Item = usize>,
    {
        let lengths: Vec<usize> = lengths.into_iter().collect();
        let (min_chars, max_chars) = match lengths.iter().copied().minmax() {
            MinMaxResult::NoElements => return None,
            MinMaxResult::OneElement(length) => (length, length),
            MinMaxResult::MinMax(min, max) => (min, max),
        };
        let total: usize = lengths.iter().sum();

        Some(Self {
            count: lengths.len(),
            min_chars,
            max_chars,
            average_chars: total as f64 / lengths.len() as f64,
        })
    }
}
