//! Query-time retrieval
//!
//! Every request builds a [`TransientIndex`] from the papers found for its
//! query ([`IndexBuilder`]), and a [`Retriever`] pulls the chunks closest to
//! the query out of it. Nothing outlives the request unless the opt-in
//! [`IndexCache`] is enabled.

mod builder;
mod cache;
mod index;
mod retriever;
mod splitter;

pub use builder::IndexBuilder;
pub use cache::{query_fingerprint, IndexCache};
pub use index::{cosine_similarity, ScoredChunk, TransientIndex};
pub use retriever::Retriever;
pub use splitter::{Chunk, TextSplitter};
