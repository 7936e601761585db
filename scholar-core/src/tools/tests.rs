//! Integration tests for the tools module

use super::*;
use crate::config::SourcesConfig;
use crate::error::{Result, ScholarError};
use crate::sources::{Document, DocumentMetadata, PaperSource, SearchResult, WebSearch};
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::Mutex;

struct StaticPapers {
    docs: Vec<Document>,
    queries: Mutex<Vec<(String, usize)>>,
}

#[async_trait]
impl PaperSource for StaticPapers {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<Document>> {
        self.queries
            .lock()
            .unwrap()
            .push((query.to_string(), max_results));
        Ok(self.docs.iter().take(max_results).cloned().collect())
    }

    fn name(&self) -> &str {
        "static"
    }
}

struct FailingWeb;

#[async_trait]
impl WebSearch for FailingWeb {
    async fn search(&self, _query: &str, _max_results: usize) -> Result<Vec<SearchResult>> {
        Err(ScholarError::Retrieval("web search returned status 503".to_string()))
    }

    fn name(&self) -> &str {
        "failing"
    }
}

struct StaticWeb;

#[async_trait]
impl WebSearch for StaticWeb {
    async fn search(&self, _query: &str, max_results: usize) -> Result<Vec<SearchResult>> {
        Ok(vec![
            SearchResult {
                title: "Attention (machine learning)".to_string(),
                url: "https://en.wikipedia.org/wiki/Attention_(machine_learning)".to_string(),
                snippet: "Attention is a technique that mimics cognitive attention.".to_string(),
            },
            SearchResult {
                title: "The Illustrated Transformer".to_string(),
                url: "https://jalammar.github.io/illustrated-transformer/".to_string(),
                snippet: "A visual walkthrough.".to_string(),
            },
        ]
        .into_iter()
        .take(max_results)
        .collect())
    }

    fn name(&self) -> &str {
        "static"
    }
}

fn paper(n: usize) -> Document {
    Document::from_metadata(DocumentMetadata {
        entry_id: format!("http://arxiv.org/abs/{}", n),
        title: format!("Paper {}", n),
        authors: vec!["A. Author".to_string()],
        published: None,
        summary: "About attention.".to_string(),
        pdf_url: None,
    })
}

fn registry_with(papers: Arc<StaticPapers>, web: Arc<dyn WebSearch>) -> ToolRegistry {
    let config = SourcesConfig::default();
    let mut registry = ToolRegistry::new();
    registry
        .register_all(vec![
            Arc::new(ArxivSearchTool::new(papers, &config)) as BoxedTool,
            Arc::new(WebSearchTool::new(web, &config)) as BoxedTool,
        ])
        .unwrap();
    registry
}

#[test]
fn test_registration_order_and_duplicates() {
    let papers = Arc::new(StaticPapers {
        docs: vec![],
        queries: Mutex::new(vec![]),
    });
    let mut registry = registry_with(papers.clone(), Arc::new(StaticWeb));

    assert_eq!(registry.names(), vec!["ArxivSearch", "WebSearch"]);
    assert_eq!(registry.len(), 2);

    let duplicate = registry.register(Arc::new(WebSearchTool::new(
        Arc::new(StaticWeb),
        &SourcesConfig::default(),
    )));
    assert_eq!(
        duplicate,
        Err(RegistryError::DuplicateTool("WebSearch".to_string()))
    );
    assert!(matches!(registry.require("Calculator"), Err(RegistryError::NotFound(_))));
}

#[test]
fn test_describe_lists_tools() {
    let papers = Arc::new(StaticPapers {
        docs: vec![],
        queries: Mutex::new(vec![]),
    });
    let registry = registry_with(papers, Arc::new(StaticWeb));

    assert_eq!(
        registry.describe(),
        "ArxivSearch: Search for academic papers on arXiv related to a topic.\n\
         WebSearch: Search for relevant information online."
    );
    assert_eq!(registry.names(), vec!["ArxivSearch", "WebSearch"]);
}

#[tokio::test]
async fn test_arxiv_tool_uses_top_k() {
    let papers = Arc::new(StaticPapers {
        docs: (0..5).map(paper).collect(),
        queries: Mutex::new(vec![]),
    });
    let registry = registry_with(papers.clone(), Arc::new(StaticWeb));

    let observation = registry
        .get(ARXIV_TOOL_NAME)
        .unwrap()
        .call("  attention  ")
        .await
        .unwrap();

    assert_eq!(observation.matches("Title: Paper").count(), 3);
    assert_eq!(
        papers.queries.lock().unwrap().as_slice(),
        &[("attention".to_string(), 3)]
    );
}

#[tokio::test]
async fn test_arxiv_tool_reports_no_results() {
    let papers = Arc::new(StaticPapers {
        docs: vec![],
        queries: Mutex::new(vec![]),
    });
    let registry = registry_with(papers, Arc::new(StaticWeb));

    let observation = registry.get(ARXIV_TOOL_NAME).unwrap().call("nothing").await.unwrap();
    assert_eq!(observation, "No good Arxiv Result was found");
}

#[tokio::test]
async fn test_web_tool_joins_snippets() {
    let papers = Arc::new(StaticPapers {
        docs: vec![],
        queries: Mutex::new(vec![]),
    });
    let registry = registry_with(papers, Arc::new(StaticWeb));

    let observation = registry.get(WEB_TOOL_NAME).unwrap().call("attention").await.unwrap();
    assert_eq!(
        observation,
        "Attention is a technique that mimics cognitive attention. A visual walkthrough."
    );
}

#[tokio::test]
async fn test_tool_failures_are_structured() {
    let papers = Arc::new(StaticPapers {
        docs: vec![],
        queries: Mutex::new(vec![]),
    });
    let registry = registry_with(papers, Arc::new(FailingWeb));
    let tool = registry.get(WEB_TOOL_NAME).unwrap();

    let err = tool.call("attention").await.unwrap_err();
    assert_eq!(err.kind, ToolErrorKind::Transient);

    let err = tool.call("   ").await.unwrap_err();
    assert_eq!(err.kind, ToolErrorKind::Validation);
}
