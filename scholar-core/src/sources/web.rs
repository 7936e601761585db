//! DuckDuckGo HTML search client

use async_trait::async_trait;
use std::sync::LazyLock;

use crate::config::WebSearchConfig;
use crate::error::{ErrorKind, Result, ScholarError};
use crate::retry::CallPolicy;
use crate::sources::{collapse_whitespace, decode_entities, strip_tags, SearchResult, WebSearch};

static RESULT_LINK_RE: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r#"(?s)<a([^>]*class="result__a"[^>]*)>(.*?)</a>"#)
        .expect("Invalid result link regex")
});

static SNIPPET_RE: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r#"(?s)<(?:a|div|td)[^>]*class="result__snippet"[^>]*>(.*?)</(?:a|div|td)>"#)
        .expect("Invalid snippet regex")
});

static HREF_RE: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r#"href="([^"]*)""#).expect("Invalid href regex"));

fn clean_fragment(fragment: &str) -> String {
    collapse_whitespace(&decode_entities(&strip_tags(fragment)))
}

/// Resolve a result href to the target URL.
///
/// DuckDuckGo wraps targets in `/l/?kh=...&uddg=<encoded>` redirects. Internal
/// links and anything that is not http(s) resolve to `None`.
pub fn resolve_result_url(href: &str) -> Option<String> {
    let href = decode_entities(href);

    if href.contains("/l/?") || href.starts_with("/l/") {
        let start = href.find("uddg=")? + "uddg=".len();
        let encoded = match href[start..].find('&') {
            Some(end) => &href[start..start + end],
            None => &href[start..],
        };
        return urlencoding::decode(encoded).ok().map(|d| d.into_owned());
    }

    if (href.starts_with("http://") || href.starts_with("https://"))
        && !href.contains("duckduckgo.com")
    {
        return Some(href);
    }

    None
}

/// Extract search hits from a DuckDuckGo HTML results page.
///
/// Each result block runs from its title link to the next one; a snippet is
/// only taken from inside its own block.
pub fn parse_results(html: &str, max_results: usize) -> Vec<SearchResult> {
    let links: Vec<regex::Captures<'_>> = RESULT_LINK_RE.captures_iter(html).collect();

    links
        .iter()
        .enumerate()
        .filter_map(|(position, link)| {
            let block_start = link.get(0)?.end();
            let block_end = links
                .get(position + 1)
                .and_then(|next| next.get(0))
                .map_or(html.len(), |m| m.start());
            let snippet = SNIPPET_RE
                .captures(&html[block_start..block_end])
                .and_then(|c| c.get(1))
                .map(|m| clean_fragment(m.as_str()))
                .unwrap_or_default();

            let attrs = link.get(1)?.as_str();
            let href = HREF_RE.captures(attrs)?.get(1)?.as_str();
            let url = resolve_result_url(href)?;
            let title = clean_fragment(link.get(2)?.as_str());
            if title.is_empty() {
                return None;
            }
            Some(SearchResult {
                title,
                url,
                snippet,
            })
        })
        .take(max_results)
        .collect()
}

/// Render hits as the text the web tool hands to the agent
pub fn format_results(results: &[SearchResult]) -> String {
    if results.is_empty() {
        return "No good DuckDuckGo Search Result was found".to_string();
    }
    results
        .iter()
        .map(|r| {
            if r.snippet.is_empty() {
                r.title.clone()
            } else {
                r.snippet.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Client for the DuckDuckGo HTML endpoint
pub struct DuckDuckGoClient {
    client: reqwest::Client,
    base_url: String,
    user_agent: String,
    max_results: usize,
    policy: CallPolicy,
}

impl DuckDuckGoClient {
    pub fn new(config: &WebSearchConfig, policy: CallPolicy) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.clone(),
            user_agent: config.user_agent.clone(),
            max_results: config.max_results,
            policy,
        }
    }

    /// Configured number of hits per search
    pub fn max_results(&self) -> usize {
        self.max_results
    }

    async fn fetch_once(&self, query: &str) -> Result<String> {
        let response = self
            .client
            .get(&self.base_url)
            .header("User-Agent", &self.user_agent)
            .query(&[("q", query)])
            .send()
            .await
            .map_err(|e| ScholarError::Retrieval(format!("web search request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScholarError::Retrieval(format!(
                "web search returned status {}",
                status
            )));
        }

        response
            .text()
            .await
            .map_err(|e| ScholarError::Retrieval(format!("failed to read search results: {}", e)))
    }
}

#[async_trait]
impl WebSearch for DuckDuckGoClient {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchResult>> {
        let html = self
            .policy
            .run(ErrorKind::RetrievalError, move || self.fetch_once(query))
            .await?;

        let results = parse_results(&html, max_results);
        tracing::info!(
            source = "duckduckgo",
            query = %query,
            results = results.len(),
            "Web search complete"
        );
        Ok(results)
    }

    fn name(&self) -> &str {
        "duckduckgo"
    }
}
