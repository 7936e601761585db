//! In-memory nearest-neighbour index over chunk embeddings

use serde::Serialize;

use crate::error::{Result, ScholarError};
use crate::retrieval::Chunk;

/// Cosine similarity of two equal-length vectors; zero vectors score 0.0
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot_product: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// A chunk with its similarity to the query
#[derive(Debug, Clone, Serialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

/// Index built for a single query and dropped with the request
#[derive(Debug, Default)]
pub struct TransientIndex {
    entries: Vec<(Vec<f32>, Chunk)>,
    dimension: Option<usize>,
}

impl TransientIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a chunk. All embeddings must share one dimension.
    pub fn insert(&mut self, embedding: Vec<f32>, chunk: Chunk) -> Result<()> {
        match self.dimension {
            Some(dim) if dim != embedding.len() => {
                return Err(ScholarError::Embedding(format!(
                    "embedding dimension mismatch: expected {}, got {}",
                    dim,
                    embedding.len()
                )));
            }
            None if embedding.is_empty() => {
                return Err(ScholarError::Embedding("empty embedding vector".to_string()));
            }
            None => self.dimension = Some(embedding.len()),
            _ => {}
        }
        self.entries.push((embedding, chunk));
        Ok(())
    }

    /// Top `k` chunks by cosine similarity, best first.
    ///
    /// Equal scores keep insertion order.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredChunk>> {
        if let Some(dim) = self.dimension {
            if dim != query.len() {
                return Err(ScholarError::Embedding(format!(
                    "query embedding dimension mismatch: expected {}, got {}",
                    dim,
                    query.len()
                )));
            }
        }

        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, (embedding, _))| (i, cosine_similarity(embedding, query)))
            .collect();

        // Stable sort keeps insertion order on ties
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(i, score)| ScoredChunk {
                chunk: self.entries[i].1.clone(),
                score,
            })
            .collect())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }
}
