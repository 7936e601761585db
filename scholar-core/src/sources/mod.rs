//! External knowledge sources
//!
//! Paper search ([`PaperSource`]) feeds the retrieval index and the agent's
//! paper tool; web search ([`WebSearch`]) feeds the agent's web tool.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use crate::error::Result;

pub mod arxiv;
pub mod web;

pub use arxiv::ArxivClient;
pub use web::DuckDuckGoClient;

/// Metadata describing where a document came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Stable identifier of the paper (arXiv abstract URL)
    pub entry_id: String,
    pub title: String,
    pub authors: Vec<String>,
    pub published: Option<NaiveDate>,
    /// Abstract text as returned by the repository
    pub summary: String,
    /// Link to the full text, when the repository offers one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf_url: Option<String>,
}

/// A retrieved paper
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Text that gets chunked and embedded
    pub content: String,
    pub metadata: DocumentMetadata,
}

impl Document {
    /// Build a document whose content is the title followed by the abstract
    pub fn from_metadata(metadata: DocumentMetadata) -> Self {
        let content = if metadata.summary.is_empty() {
            metadata.title.clone()
        } else {
            format!("{}\n\n{}", metadata.title, metadata.summary)
        };
        Self { content, metadata }
    }

    /// Replace the abstract-based content with the paper's full text
    pub fn with_full_text(mut self, text: &str) -> Self {
        self.content = format!("{}\n\n{}", self.metadata.title, text.trim());
        self
    }
}

/// A single web search hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

/// Academic paper repository
#[async_trait]
pub trait PaperSource: Send + Sync {
    /// Search for papers related to `query`, returning at most `max_results`.
    ///
    /// An empty result is not an error at this layer.
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<Document>>;

    /// Load documents for indexing.
    ///
    /// Sources that can fetch full papers override this; the default indexes
    /// what [`search`](PaperSource::search) returns.
    async fn load(&self, query: &str, max_results: usize) -> Result<Vec<Document>> {
        self.search(query, max_results).await
    }

    /// Source name for logs
    fn name(&self) -> &str;
}

/// General web search engine
#[async_trait]
pub trait WebSearch: Send + Sync {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchResult>>;

    fn name(&self) -> &str;
}

static WHITESPACE_RE: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"\s+").expect("Invalid whitespace regex")
});

static TAG_RE: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"<[^>]+>").expect("Invalid tag regex"));

/// Collapse runs of whitespace into single spaces and trim
pub(crate) fn collapse_whitespace(text: &str) -> String {
    WHITESPACE_RE.replace_all(text, " ").trim().to_string()
}

/// Remove markup tags
pub(crate) fn strip_tags(html: &str) -> String {
    TAG_RE.replace_all(html, "").into_owned()
}

/// Decode character references and entities in search result markup.
///
/// Text with a stray `&` that does not start a reference is returned as is.
pub(crate) fn decode_entities(text: &str) -> String {
    quick_xml::escape::unescape_with(text, |entity| match entity {
        "nbsp" => Some(" "),
        _ => quick_xml::escape::resolve_predefined_entity(entity),
    })
    .map(|decoded| decoded.into_owned())
    .unwrap_or_else(|_| text.to_string())
}

/// Truncate to at most `max_chars` characters on a char boundary
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_content_joins_title_and_summary() {
        let doc = Document::from_metadata(DocumentMetadata {
            entry_id: "http://arxiv.org/abs/1706.03762v7".to_string(),
            title: "Attention Is All You Need".to_string(),
            authors: vec!["Ashish Vaswani".to_string()],
            published: NaiveDate::from_ymd_opt(2017, 6, 12),
            summary: "The dominant sequence transduction models...".to_string(),
            pdf_url: None,
        });
        assert!(doc.content.starts_with("Attention Is All You Need\n\n"));

        let doc = doc.with_full_text("  1 Introduction\nRecurrent neural networks...\n");
        assert_eq!(
            doc.content,
            "Attention Is All You Need\n\n1 Introduction\nRecurrent neural networks..."
        );
    }

    #[test]
    fn test_text_helpers() {
        assert_eq!(collapse_whitespace("  a\n\t b  "), "a b");
        assert_eq!(strip_tags("<b>bold</b> text"), "bold text");
        assert_eq!(decode_entities("A &amp; B &lt;3 &#x27;x&#x27;"), "A & B <3 'x'");
        assert_eq!(decode_entities("&amp;lt;"), "&lt;");
        assert_eq!(decode_entities("Schr&#246;dinger&nbsp;bridge"), "Schr\u{f6}dinger bridge");
        assert_eq!(decode_entities("AT&T"), "AT&T");
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("hi", 10), "hi");
    }
}
