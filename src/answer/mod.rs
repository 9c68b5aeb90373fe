// Answer composition
// Joins retrieved chunks into a context block and asks a generation model to answer from
// that context alone.


use std::sync::Arc;

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::index::{FlatIndex, RetrievalResult, VectorIndex};
use crate::providers::{EmbeddingProvider, GenerationProvider, ProviderError};
use crate::retriever::Retriever;
use crate::{RagError, Result};

pub const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

const DEFAULT_CORPUS: &str = "the provided document";

/// A question, the generated answer and the chunks it was conditioned on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub question: String,
    pub answer: String,
    pub chunks_used: Vec<RetrievalResult>,
}

/// Chunk texts in ranked order, separated by [`CONTEXT_SEPARATOR`]
#[inline]
pub fn compose_context(results: &[RetrievalResult]) -> String {
    results
        .iter()
        .map(|result| result.text.as_str())
        .join(CONTEXT_SEPARATOR)
}

#[inline]
pub fn build_prompt(question: &str, context: &str, corpus_description: &str) -> String {
    format!(
        "You are a helpful assistant answering questions about {corpus_description}.\n\
         \n\
         CONTEXT:\n\
         {context}\n\
         \n\
         QUESTION: {question}\n\
         \n\
         INSTRUCTIONS:\n\
         - Answer the question using ONLY the information provided in the context above\n\
         - If the context doesn't contain enough information to answer, say so explicitly\n\
         - Be concise and clear\n\
         - Cite specific concepts from the context when relevant\n\
         \n\
         ANSWER:"
    )
}

/// One generation call for one question. No retries.
#[inline]
pub fn answer<G>(
    question: &str,
    context: &str,
    generator: &G,
) -> std::result::Result<String, ProviderError>
where
    G: GenerationProvider + ?Sized,
{
    generator.generate(&build_prompt(question, context, DEFAULT_CORPUS))
}

/// Retrieval plus generation over one index
pub struct Answerer<P, G, I = FlatIndex> {
    retriever: Retriever<P, I>,
    generator: Arc<G>,
    corpus_description: String,
}

impl<P, G, I> Answerer<P, G, I>
where
    P: EmbeddingProvider,
    G: GenerationProvider,
    I: VectorIndex,
{
    #[inline]
    pub fn new(retriever: Retriever<P, I>, generator: Arc<G>) -> Self {
        Self {
            retriever,
            generator,
            corpus_description: DEFAULT_CORPUS.to_string(),
        }
    }

    /// How the prompt refers to the indexed material
    #[inline]
    pub fn with_corpus_description(mut self, description: impl Into<String>) -> Self {
        self.corpus_description = description.into();
        self
    }

    #[inline]
    pub fn retriever(&self) -> &Retriever<P, I> {
        &self.retriever
    }

    #[inline]
    pub fn ask(&self, question: &str, top_k: usize) -> Result<Answer> {
        let question = question.trim();
        if question.is_empty() {
            return Err(RagError::InvalidArgument(
                "question must not be empty".to_string(),
            ));
        }

        let chunks_used = self.retriever.retrieve(question, top_k)?;
        let context = compose_context(&chunks_used);
        debug!(
            "Answering from {} chunks ({} context chars)",
            chunks_used.len(),
            context.chars().count()
        );

        let prompt = build_prompt(question, &context, &self.corpus_description);
        let answer = self.generator.generate(&prompt)?;
        info!("Answered question using {} chunks", chunks_used.len());

        Ok(Answer {
            question: question.to_string(),
            answer,
            chunks_used,
        })
    }
}
