
use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::index::EmbeddingRecord;
use crate::{RagError, Result};

const CHUNK_ID_PREFIX: &str = "chunk_";

/// A bounded slice of the source document, the unit of retrieval
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    id: String,
    text: String,
    char_count: usize,
    word_count: usize,
}

impl Chunk {
    /// Create the chunk at position `index` of a document's chunk sequence
    #[inline]
    pub fn new(index: usize, text: &str) -> Result<Self> {
        let text = text.trim();
        if text.is_empty() {
            return Err(RagError::InvalidRecord(format!(
                "chunk {index} has no text"
            )));
        }

        Ok(Self {
            id: chunk_id(index),
            text: text.to_string(),
            char_count: text.chars().count(),
            word_count: text.split_whitespace().count(),
        })
    }

    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[inline]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[inline]
    pub fn char_count(&self) -> usize {
        self.char_count
    }

    #[inline]
    pub fn word_count(&self) -> usize {
        self.word_count
    }

    /// Check a decoded chunk against the invariants `Chunk::new` establishes
    fn check_loaded(&self, index: usize) -> std::result::Result<(), String> {
        let expected = chunk_id(index);
        if self.id != expected {
            return Err(format!(
                "record {index} has id '{}', expected '{expected}'",
                self.id
            ));
        }
        if self.text.is_empty() || self.text.trim() != self.text {
            return Err(format!("{} has empty or untrimmed text", self.id));
        }
        if self.char_count != self.text.chars().count() {
            return Err(format!(
                "{} declares char_count {} but text has {} characters",
                self.id,
                self.char_count,
                self.text.chars().count()
            ));
        }
        if self.word_count != self.text.split_whitespace().count() {
            return Err(format!(
                "{} declares word_count {} but text has {} words",
                self.id,
                self.word_count,
                self.text.split_whitespace().count()
            ));
        }
        Ok(())
    }
}

/// Identifier of the chunk at `index`
#[inline]
pub fn chunk_id(index: usize) -> String {
    format!("{CHUNK_ID_PREFIX}{index}")
}

/// Turn chunk texts into chunk records with ids assigned in input order
#[inline]
pub fn materialize<I, S>(texts: I) -> Result<Vec<Chunk>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    texts
        .into_iter()
        .enumerate()
        .map(|(index, text)| Chunk::new(index, text.as_ref()))
        .collect()
}

/// Write chunk records as a pretty-printed JSON array
#[inline]
pub fn persist_chunks(chunks: &[Chunk], path: &Path) -> Result<()> {
    write_json(chunks, path, true)?;
    info!("Saved {} chunks to {}", chunks.len(), path.display());
    Ok(())
}

/// Load chunk records, failing with a format error on malformed or inconsistent data
#[inline]
pub fn load_chunks(path: &Path) -> Result<Vec<Chunk>> {
    let chunks: Vec<Chunk> = read_json(path)?;

    for (index, chunk) in chunks.iter().enumerate() {
        chunk.check_loaded(index).map_err(|reason| {
            RagError::Format(format!("{}: {}", path.display(), reason))
        })?;
    }

    debug!("Loaded {} chunks from {}", chunks.len(), path.display());
    Ok(chunks)
}

/// Write embedding records in index row order
#[inline]
pub fn persist_records(records: &[EmbeddingRecord], path: &Path) -> Result<()> {
    write_json(records, path, false)?;
    info!(
        "Saved {} embedding records to {}",
        records.len(),
        path.display()
    );
    Ok(())
}

/// Load embedding records, preserving file order exactly
#[inline]
pub fn load_records(path: &Path) -> Result<Vec<EmbeddingRecord>> {
    let records: Vec<EmbeddingRecord> = read_json(path)?;

    for (row, record) in records.iter().enumerate() {
        record.validate().map_err(|e| {
            RagError::Format(format!("{}: row {}: {}", path.display(), row, e))
        })?;
    }

    debug!(
        "Loaded {} embedding records from {}",
        records.len(),
        path.display()
    );
    Ok(records)
}

fn write_json<T: Serialize + ?Sized>(value: &T, path: &Path, pretty: bool) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let content = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .map_err(|e| RagError::Format(format!("Failed to encode {}: {}", path.display(), e)))?;

    fs::write(path, content)?;
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path)?;
    serde_json::from_str(&content)
        .map_err(|e| RagError::Format(format!("Failed to parse {}: {}", path.display(), e)))
}
