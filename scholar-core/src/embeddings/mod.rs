//! Embedding provider implementations for generating text embeddings.

use async_trait::async_trait;

use crate::error::Result;

pub mod openai;

pub use openai::OpenAIEmbeddings;

/// Trait for embedding provider implementations.
///
/// Embedding providers generate vector embeddings from text for semantic search.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate embedding for a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for a batch of texts.
    ///
    /// Returns one vector per input text, in input order.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        // Default implementation: embed each text sequentially
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed(text).await?);
        }
        Ok(embeddings)
    }

    /// Get the dimension of embeddings produced by this provider.
    fn dimension(&self) -> usize;

    /// Model identifier
    fn model_name(&self) -> &str;
}
