//! Top-k retrieval over a transient index

use std::sync::Arc;

use crate::embeddings::EmbeddingProvider;
use crate::error::Result;
use crate::retrieval::{ScoredChunk, TransientIndex};

/// Returns the chunks most similar to a query
#[derive(Clone)]
pub struct Retriever {
    index: Arc<TransientIndex>,
    embedder: Arc<dyn EmbeddingProvider>,
    top_k: usize,
}

impl Retriever {
    pub fn new(index: Arc<TransientIndex>, embedder: Arc<dyn EmbeddingProvider>, top_k: usize) -> Self {
        Self {
            index,
            embedder,
            top_k: top_k.max(1),
        }
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Embed `query` and return up to `top_k` chunks, best first
    pub async fn retrieve(&self, query: &str) -> Result<Vec<ScoredChunk>> {
        let query_embedding = self.embedder.embed(query).await?;
        let hits = self.index.search(&query_embedding, self.top_k)?;
        tracing::debug!(hits = hits.len(), top_k = self.top_k, "Retrieved chunks");
        Ok(hits)
    }
}
