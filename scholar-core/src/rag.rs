//! Retrieval-augmented answering
//!
//! Builds a transient index for the query, retrieves the closest chunks and
//! "stuffs" them into a single chat completion.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{Result, ScholarError};
use crate::llm::{LLMProvider, LLMRequest};
use crate::retrieval::{IndexBuilder, ScoredChunk};

const SYSTEM_PROMPT: &str = "You are a research assistant. Use the following pieces of \
context to answer the question at the end. If you don't know the answer, just say that \
you don't know, don't try to make up an answer.";

/// A chunk that fed the answer prompt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRef {
    pub title: String,
    pub entry_id: String,
    pub score: f32,
}

impl From<&ScoredChunk> for SourceRef {
    fn from(hit: &ScoredChunk) -> Self {
        Self {
            title: hit.chunk.metadata.title.clone(),
            entry_id: hit.chunk.metadata.entry_id.clone(),
            score: hit.score,
        }
    }
}

/// Answer plus the chunks it was grounded on
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagAnswer {
    pub answer: String,
    pub sources: Vec<SourceRef>,
}

/// Numbered context blocks followed by the question
pub fn build_prompt(question: &str, hits: &[ScoredChunk]) -> String {
    let context = hits
        .iter()
        .enumerate()
        .map(|(i, hit)| {
            format!(
                "[{}] {}\n{}",
                i + 1,
                hit.chunk.metadata.title,
                hit.chunk.content
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!("Context:\n{}\n\nQuestion: {}\nHelpful Answer:", context, question)
}

/// Answers a query from papers retrieved for that query alone
pub struct RagAnswerer {
    builder: Arc<IndexBuilder>,
    llm: Arc<dyn LLMProvider>,
}

impl RagAnswerer {
    pub fn new(builder: Arc<IndexBuilder>, llm: Arc<dyn LLMProvider>) -> Self {
        Self { builder, llm }
    }

    pub fn builder(&self) -> &Arc<IndexBuilder> {
        &self.builder
    }

    /// Build the index, retrieve top-k and ask the model once.
    ///
    /// # Errors
    ///
    /// `RetrievalError` / `EmbeddingError` from the index build,
    /// `ModelInvocationError` when the model call fails or returns nothing.
    pub async fn answer(&self, query: &str) -> Result<RagAnswer> {
        let retriever = self.builder.retriever(query).await?;
        let hits = retriever.retrieve(query).await?;

        let request = LLMRequest::with_system_prompt(SYSTEM_PROMPT, build_prompt(query.trim(), &hits));
        let response = self.llm.generate_request(&request).await?;

        let answer = response.content.trim().to_string();
        if answer.is_empty() {
            return Err(ScholarError::ModelInvocation(
                "model returned an empty answer".to_string(),
            ));
        }

        tracing::info!(
            sources = hits.len(),
            answer_chars = answer.len(),
            "Retrieval answer complete"
        );

        Ok(RagAnswer {
            answer,
            sources: hits.iter().map(SourceRef::from).collect(),
        })
    }
}
