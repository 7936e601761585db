//! Paper search and web search tools

use async_trait::async_trait;
use std::sync::Arc;

use super::error::ToolError;
use super::tool::{Tool, ToolMetadata};
use crate::config::SourcesConfig;
use crate::sources::arxiv::format_documents;
use crate::sources::web::format_results;
use crate::sources::{truncate_chars, PaperSource, WebSearch};

pub const ARXIV_TOOL_NAME: &str = "ArxivSearch";
pub const WEB_TOOL_NAME: &str = "WebSearch";

fn require_input(input: &str) -> Result<&str, ToolError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(ToolError::validation("search query must not be empty"));
    }
    Ok(input)
}

/// Searches arXiv and reports the top papers as text
pub struct ArxivSearchTool {
    metadata: ToolMetadata,
    source: Arc<dyn PaperSource>,
    top_k_results: usize,
    max_content_chars: usize,
}

impl ArxivSearchTool {
    pub fn new(source: Arc<dyn PaperSource>, config: &SourcesConfig) -> Self {
        Self {
            metadata: ToolMetadata::new(
                ARXIV_TOOL_NAME,
                "Search for academic papers on arXiv related to a topic.",
            ),
            source,
            top_k_results: config.arxiv.top_k_results,
            max_content_chars: config.arxiv.max_content_chars,
        }
    }
}

#[async_trait]
impl Tool for ArxivSearchTool {
    fn metadata(&self) -> &ToolMetadata {
        &self.metadata
    }

    async fn call(&self, input: &str) -> Result<String, ToolError> {
        let query = require_input(input)?;
        let docs = self.source.search(query, self.top_k_results).await?;
        Ok(format_documents(&docs, self.max_content_chars))
    }
}

/// Searches the web and reports result snippets
pub struct WebSearchTool {
    metadata: ToolMetadata,
    search: Arc<dyn WebSearch>,
    max_results: usize,
    max_content_chars: usize,
}

impl WebSearchTool {
    pub fn new(search: Arc<dyn WebSearch>, config: &SourcesConfig) -> Self {
        Self {
            metadata: ToolMetadata::new(WEB_TOOL_NAME, "Search for relevant information online."),
            search,
            max_results: config.web.max_results,
            max_content_chars: config.arxiv.max_content_chars,
        }
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn metadata(&self) -> &ToolMetadata {
        &self.metadata
    }

    async fn call(&self, input: &str) -> Result<String, ToolError> {
        let query = require_input(input)?;
        let results = self.search.search(query, self.max_results).await?;
        Ok(truncate_chars(&format_results(&results), self.max_content_chars))
    }
}
