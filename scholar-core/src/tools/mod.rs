//! Tool system for the research agent
//!
//! The agent sees every registered tool as a name plus a natural-language
//! description, and calls it with free text. Two tools ship built in:
//! paper search over arXiv and general web search.
//!
//! # Example
//!
//! ```rust,ignore
//! use scholar_core::tools::{ArxivSearchTool, ToolRegistry, WebSearchTool};
//!
//! let mut registry = ToolRegistry::new();
//! registry.register(Arc::new(ArxivSearchTool::new(papers, &config.sources)))?;
//! registry.register(Arc::new(WebSearchTool::new(web, &config.sources)))?;
//!
//! let observation = registry.get("ArxivSearch").unwrap().call("rotary embeddings").await?;
//! ```

mod builtin;
mod error;
mod registry;
mod tool;

pub use builtin::{ArxivSearchTool, WebSearchTool, ARXIV_TOOL_NAME, WEB_TOOL_NAME};
pub use error::{ToolError, ToolErrorKind};
pub use registry::{RegistryError, ToolRegistry};
pub use tool::{BoxedTool, Tool, ToolMetadata};

#[cfg(test)]
mod tests;
