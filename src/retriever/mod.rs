
use std::sync::Arc;

use tracing::debug;

use crate::Result;
use crate::index::{FlatIndex, RetrievalResult, VectorIndex};
use crate::providers::EmbeddingProvider;

/// Embeds a question and looks up the closest chunks in an index
#[derive(Debug)]
pub struct Retriever<P, I = FlatIndex> {
    provider: Arc<P>,
    index: I,
}

impl<P, I> Retriever<P, I>
where
    P: EmbeddingProvider,
    I: VectorIndex,
{
    #[inline]
    pub fn new(provider: Arc<P>, index: I) -> Self {
        Self { provider, index }
    }

    #[inline]
    pub fn index(&self) -> &I {
        &self.index
    }

    #[inline]
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Top `top_k` chunks for `query`, most similar first.
    ///
    /// Provider and dimension errors are returned as they occurred.
    #[inline]
    pub fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<RetrievalResult>> {
        let vector = self.provider.embed_query(query)?;
        debug!(
            "Query embedded with {} ({} dimensions)",
            self.provider.model(),
            vector.len()
        );

        let results = self.index.query(&vector, top_k)?;
        debug!("Retrieved {} of {} chunks", results.len(), self.index.len());
        Ok(results)
    }
}
