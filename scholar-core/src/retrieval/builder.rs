//! Builds the per-query transient index from paper search results

use std::sync::Arc;

use crate::config::RetrievalConfig;
use crate::embeddings::EmbeddingProvider;
use crate::error::{Result, ScholarError};
use crate::retrieval::{IndexCache, Retriever, TextSplitter, TransientIndex};
use crate::sources::PaperSource;

/// Fetch, chunk, embed, index
pub struct IndexBuilder {
    source: Arc<dyn PaperSource>,
    embedder: Arc<dyn EmbeddingProvider>,
    splitter: TextSplitter,
    max_documents: usize,
    top_k: usize,
    cache: Option<IndexCache>,
}

impl IndexBuilder {
    pub fn new(
        source: Arc<dyn PaperSource>,
        embedder: Arc<dyn EmbeddingProvider>,
        config: &RetrievalConfig,
    ) -> Result<Self> {
        let cache = IndexCache::from_config(&config.cache);
        if cache.is_some() {
            tracing::info!(
                ttl_secs = config.cache.ttl.as_secs(),
                capacity = config.cache.capacity,
                "Index cache enabled"
            );
        }

        Ok(Self {
            source,
            embedder,
            splitter: TextSplitter::new(config.chunk_size, config.chunk_overlap)?,
            max_documents: config.max_documents,
            top_k: config.top_k,
            cache,
        })
    }

    /// Build (or reuse, when caching is on) the index for `query`.
    pub async fn build(&self, query: &str) -> Result<Arc<TransientIndex>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ScholarError::InvalidQuery("query must not be empty".to_string()));
        }

        if let Some(cache) = &self.cache {
            if let Some(index) = cache.get(query).await {
                tracing::debug!(query = %query, "Index cache hit");
                return Ok(index);
            }
        }

        let documents = self.source.load(query, self.max_documents).await?;
        if documents.is_empty() {
            return Err(ScholarError::Retrieval(format!(
                "no documents found for query '{}'",
                query
            )));
        }

        let chunks = self.splitter.split_documents(&documents);
        if chunks.is_empty() {
            return Err(ScholarError::Retrieval(format!(
                "retrieved {} documents for query '{}' but none had text",
                documents.len(),
                query
            )));
        }

        let texts: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;
        if embeddings.len() != chunks.len() {
            return Err(ScholarError::Embedding(format!(
                "expected {} embeddings, got {}",
                chunks.len(),
                embeddings.len()
            )));
        }

        let mut index = TransientIndex::new();
        for (embedding, chunk) in embeddings.into_iter().zip(chunks) {
            index.insert(embedding, chunk)?;
        }

        tracing::info!(
            source = self.source.name(),
            documents = documents.len(),
            chunks = index.len(),
            "Built transient index"
        );

        let index = Arc::new(index);
        if let Some(cache) = &self.cache {
            cache.insert(query, index.clone()).await;
        }
        Ok(index)
    }

    /// Build the index and wrap it in a retriever returning the configured top-k
    pub async fn retriever(&self, query: &str) -> Result<Retriever> {
        let index = self.build(query).await?;
        Ok(Retriever::new(index, self.embedder.clone(), self.top_k))
    }
}
