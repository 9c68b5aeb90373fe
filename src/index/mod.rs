#[cfg(test)]
mod tests;

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::store::load_records;
use crate::{RagError, Result};

/// Embedding of one chunk, stored as one row of a vector index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    chunk_id: String,
    text: String,
    embedding: Vec<f32>,
}

impl EmbeddingRecord {
    #[inline]
    pub fn new(chunk_id: &str, text: &str, embedding: Vec<f32>) -> Result<Self> {
        let record = Self {
            chunk_id: chunk_id.to_string(),
            text: text.to_string(),
            embedding,
        };
        record.validate()?;
        Ok(record)
    }

    #[inline]
    pub fn chunk_id(&self) -> &str {
        &self.chunk_id
    }

    #[inline]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[inline]
    pub fn embedding(&self) -> &[f32] {
        &self.embedding
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.embedding.len()
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.chunk_id.trim().is_empty() {
            return Err(RagError::InvalidRecord(
                "embedding record has an empty chunk id".to_string(),
            ));
        }
        if self.embedding.is_empty() {
            return Err(RagError::InvalidRecord(format!(
                "{} has an empty embedding",
                self.chunk_id
            )));
        }
        if let Some(position) = self.embedding.iter().position(|v| !v.is_finite()) {
            return Err(RagError::InvalidRecord(format!(
                "{} has a non-finite value at position {}",
                self.chunk_id, position
            )));
        }
        Ok(())
    }
}

/// One ranked hit returned by a vector index query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub chunk_id: String,
    pub text: String,
    pub similarity: f32,
}

/// Nearest-neighbour lookup over chunk embeddings.
///
/// Implementations must return at most `top_k` results sorted by similarity, highest
/// first, with ties kept in storage order.
pub trait VectorIndex: Send + Sync {
    /// Length every stored embedding shares, `None` for an empty index
    fn dimension(&self) -> Option<usize>;

    fn len(&self) -> usize;

    #[inline]
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<RetrievalResult>>;
}

/// Exact brute-force index over a flat list of records
#[derive(Debug, Clone)]
pub struct FlatIndex {
    records: Vec<EmbeddingRecord>,
    squared_norms: Vec<f64>,
    dimension: Option<usize>,
}

impl FlatIndex {
    /// Build an index over `records`, keeping their order as the row order
    #[inline]
    pub fn build(records: Vec<EmbeddingRecord>) -> Result<Self> {
        let dimension = records.first().map(EmbeddingRecord::dimension);

        if let Some(expected) = dimension {
            if let Some(record) = records.iter().find(|r| r.dimension() != expected) {
                return Err(RagError::DimensionMismatch {
                    context: format!("index build ({})", record.chunk_id),
                    expected,
                    found: record.dimension(),
                });
            }
        }

        let squared_norms = records
            .iter()
            .map(|record| dot(record.embedding(), record.embedding()))
            .collect();

        debug!(
            "Built flat index with {} records of dimension {:?}",
            records.len(),
            dimension
        );

        Ok(Self {
            records,
            squared_norms,
            dimension,
        })
    }

    /// Load a persisted embedding file and build an index over it
    #[inline]
    pub fn open(path: &Path) -> Result<Self> {
        let index = Self::build(load_records(path)?)?;
        info!(
            "Loaded index from {} ({} records, dimension {})",
            path.display(),
            index.len(),
            index.dimension.unwrap_or_default()
        );
        Ok(index)
    }

    /// Stored records in row order
    #[inline]
    pub fn records(&self) -> &[EmbeddingRecord] {
        &self.records
    }
}

impl VectorIndex for FlatIndex {
    #[inline]
    fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    #[inline]
    fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<RetrievalResult>> {
        if top_k == 0 {
            return Err(RagError::InvalidArgument(
                "top_k must be at least 1".to_string(),
            ));
        }

        let Some(dimension) = self.dimension else {
            return Ok(Vec::new());
        };

        if vector.len() != dimension {
            return Err(RagError::DimensionMismatch {
                context: "query vector".to_string(),
                expected: dimension,
                found: vector.len(),
            });
        }

        let query_norm = dot(vector, vector);
        let mut ranked: Vec<(usize, f32)> = self
            .records
            .iter()
            .zip(&self.squared_norms)
            .enumerate()
            .map(|(row, (record, &norm))| {
                let similarity = similarity_from_parts(
                    dot(vector, record.embedding()),
                    query_norm,
                    norm,
                );
                (row, similarity)
            })
            .collect();

        // Stable sort keeps storage order among equal scores.
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked.truncate(top_k);

        Ok(ranked
            .into_iter()
            .map(|(row, similarity)| {
                let record = &self.records[row];
                RetrievalResult {
                    chunk_id: record.chunk_id.clone(),
                    text: record.text.clone(),
                    similarity,
                }
            })
            .collect())
    }
}

/// Cosine of the angle between `a` and `b`; 0 when either has zero norm
///
/// Vectors of different lengths are a [`RagError::DimensionMismatch`].
#[inline]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(RagError::DimensionMismatch {
            context: "cosine similarity".to_string(),
            expected: a.len(),
            found: b.len(),
        });
    }
    Ok(similarity_from_parts(dot(a, b), dot(a, a), dot(b, b)))
}

fn similarity_from_parts(dot_product: f64, squared_norm_a: f64, squared_norm_b: f64) -> f32 {
    if squared_norm_a == 0.0 || squared_norm_b == 0.0 {
        return 0.0;
    }
    let similarity = dot_product / (squared_norm_a * squared_norm_b).sqrt();
    similarity.clamp(-1.0, 1.0) as f32
}

fn dot(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(&x, &y)| f64::from(x) * f64::from(y))
        .sum()
}
