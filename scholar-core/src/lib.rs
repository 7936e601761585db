//! # Scholar - query-time research assistant
//!
//! Scholar answers a research question two ways at once:
//! - **Retrieval answer**: papers found for the query are chunked, embedded
//!   into a transient index and the closest chunks are stuffed into one chat
//!   completion
//! - **Agent answer**: a ReAct agent reasons over paper search and web search
//!   tools until it reaches a final answer or its iteration bound
//!
//! Both run concurrently and are composed into one response by
//! [`ResearchAssistant`](composer::ResearchAssistant).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scholar_core::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = ScholarConfig::load()?;
//!     let assistant = ResearchAssistant::from_config(&config)?;
//!
//!     let outcome = assistant.ask("transformer attention mechanisms", None).await?;
//!     println!("{}", outcome.response.rag);
//!     println!("{}", outcome.response.agent);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - **Sources**: arXiv Atom API and DuckDuckGo HTML search
//! - **Retrieval**: chunking, embeddings, cosine top-k over a per-query index
//! - **Agent**: pluggable [`ReasoningPolicy`](agent::ReasoningPolicy), bounded executor
//! - **Resilience**: every external call runs under a timeout and a single retry

pub mod agent;
pub mod composer;
pub mod config;
pub mod conversation;
pub mod embeddings;
pub mod error;
pub mod llm;
pub mod parsing;
pub mod rag;
pub mod retrieval;
pub mod retry;
pub mod sources;
pub mod tools;

/// Current library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use error::{Result, ScholarError};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::agent::{
        AgentDecision, AgentExecutor, AgentOutcome, AgentStep, ReActPolicy, ReasoningContext,
        ReasoningPolicy, ToolCall,
    };
    pub use crate::composer::{
        ComposedOutcome, OutcomeStatus, ResearchAssistant, ResearchResponse, Subflow,
        SubflowError,
    };
    pub use crate::config::{
        AgentConfig, ComposerConfig, ConversationConfig, EmbeddingsConfig, FailurePolicy,
        LLMProviderConfig, ResilienceConfig, RetrievalConfig, ScholarConfig, SourcesConfig,
    };
    pub use crate::conversation::{ConversationMemory, SessionStore, Turn};
    pub use crate::embeddings::{EmbeddingProvider, OpenAIEmbeddings};
    pub use crate::error::{ErrorKind, Result, ScholarError};
    pub use crate::llm::{LLMProvider, LLMRequest, LLMResponse, Message, MessageRole, OpenAIProvider};
    pub use crate::parsing::{ReActOutput, ReActParser};
    pub use crate::rag::{RagAnswer, RagAnswerer, SourceRef};
    pub use crate::retrieval::{Chunk, IndexBuilder, IndexCache, Retriever, TextSplitter, TransientIndex};
    pub use crate::retry::{CallPolicy, RetryConfig};
    pub use crate::sources::{
        ArxivClient, Document, DocumentMetadata, DuckDuckGoClient, PaperSource, SearchResult,
        WebSearch,
    };
    pub use crate::tools::{
        ArxivSearchTool, BoxedTool, Tool, ToolError, ToolErrorKind, ToolMetadata, ToolRegistry,
        WebSearchTool,
    };
}
