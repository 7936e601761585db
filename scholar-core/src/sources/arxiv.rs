//! arXiv Atom API client

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::config::ArxivConfig;
use crate::error::{ErrorKind, Result, ScholarError};
use crate::retry::CallPolicy;
use crate::sources::{collapse_whitespace, truncate_chars, Document, DocumentMetadata, PaperSource};

/// arXiv rejects very long search queries
const MAX_QUERY_CHARS: usize = 300;

/// Rendered in place of results when nothing matched
pub const NO_RESULTS: &str = "No good Arxiv Result was found";

fn parse_published(raw: &str) -> Option<NaiveDate> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.date_naive())
        .ok()
        .or_else(|| NaiveDate::parse_from_str(raw.get(..10)?, "%Y-%m-%d").ok())
}

/// Entry element whose text is being collected
#[derive(Clone, Copy)]
enum Field {
    Id,
    Title,
    Summary,
    Published,
    AuthorName,
}

#[derive(Default)]
struct EntryFields {
    id: String,
    title: String,
    summary: String,
    published: String,
    authors: Vec<String>,
    pdf_url: Option<String>,
}

impl EntryFields {
    fn push_text(&mut self, field: Field, text: &str) {
        match field {
            Field::Id => self.id.push_str(text),
            Field::Title => self.title.push_str(text),
            Field::Summary => self.summary.push_str(text),
            Field::Published => self.published.push_str(text),
            Field::AuthorName => {
                if let Some(name) = self.authors.last_mut() {
                    name.push_str(text);
                }
            }
        }
    }

    /// `<link title="pdf" href=".." type="application/pdf"/>`
    fn read_link(&mut self, link: &BytesStart<'_>) {
        let mut href = None;
        let mut is_pdf = false;
        for attr in link.attributes().flatten() {
            let Ok(value) = attr.unescape_value() else {
                continue;
            };
            match attr.key.local_name().as_ref() {
                b"href" => href = Some(value.into_owned()),
                b"title" if value == "pdf" => is_pdf = true,
                b"type" if value == "application/pdf" => is_pdf = true,
                _ => {}
            }
        }
        if is_pdf && self.pdf_url.is_none() {
            self.pdf_url = href;
        }
    }

    fn into_document(self) -> Option<Document> {
        let entry_id = collapse_whitespace(&self.id);
        let title = collapse_whitespace(&self.title);
        if entry_id.is_empty() || title.is_empty() {
            return None;
        }
        if title == "Error" && entry_id.contains("api/errors") {
            return None;
        }

        Some(Document::from_metadata(DocumentMetadata {
            entry_id,
            title,
            authors: self
                .authors
                .iter()
                .map(|name| collapse_whitespace(name))
                .filter(|name| !name.is_empty())
                .collect(),
            published: parse_published(self.published.trim()),
            summary: collapse_whitespace(&self.summary),
            pdf_url: self.pdf_url,
        }))
    }
}

/// Parse an Atom feed into documents.
///
/// Entries without an id or title are skipped. The arXiv error feed (a single
/// entry titled "Error") yields nothing.
///
/// # Errors
///
/// Returns a retrieval error when the feed is not well-formed XML.
pub fn parse_feed(xml: &str) -> Result<Vec<Document>> {
    let mut reader = Reader::from_str(xml);
    let mut docs = Vec::new();
    let mut entry: Option<EntryFields> = None;
    let mut field: Option<Field> = None;
    let mut in_author = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                if entry.is_none() {
                    if e.local_name().as_ref() == b"entry" {
                        entry = Some(EntryFields::default());
                    }
                    continue;
                }
                let Some(fields) = entry.as_mut() else {
                    continue;
                };
                field = match e.local_name().as_ref() {
                    b"id" => Some(Field::Id),
                    b"title" => Some(Field::Title),
                    b"summary" => Some(Field::Summary),
                    b"published" => Some(Field::Published),
                    b"name" if in_author => {
                        fields.authors.push(String::new());
                        Some(Field::AuthorName)
                    }
                    b"author" => {
                        in_author = true;
                        None
                    }
                    b"link" => {
                        fields.read_link(&e);
                        None
                    }
                    _ => None,
                };
            }
            Ok(Event::Empty(e)) => {
                if let Some(fields) = entry.as_mut() {
                    if e.local_name().as_ref() == b"link" {
                        fields.read_link(&e);
                    }
                }
            }
            Ok(Event::Text(text)) => {
                if let (Some(fields), Some(current)) = (entry.as_mut(), field) {
                    let text = text.unescape().map_err(|e| {
                        ScholarError::Retrieval(format!("malformed arXiv feed: {}", e))
                    })?;
                    fields.push_text(current, &text);
                }
            }
            Ok(Event::CData(data)) => {
                if let (Some(fields), Some(current)) = (entry.as_mut(), field) {
                    fields.push_text(current, &String::from_utf8_lossy(&data.into_inner()));
                }
            }
            Ok(Event::End(e)) => {
                field = None;
                match e.local_name().as_ref() {
                    b"author" => in_author = false,
                    b"entry" => {
                        if let Some(doc) = entry.take().and_then(EntryFields::into_document) {
                            docs.push(doc);
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(ScholarError::Retrieval(format!(
                    "malformed arXiv feed at byte {}: {}",
                    reader.buffer_position(),
                    e
                )));
            }
            Ok(_) => {}
        }
    }

    Ok(docs)
}

/// Render documents the way the paper tool reports them to the agent
pub fn format_documents(docs: &[Document], max_chars: usize) -> String {
    if docs.is_empty() {
        return NO_RESULTS.to_string();
    }

    let rendered = docs
        .iter()
        .map(|doc| {
            let published = doc
                .metadata
                .published
                .map(|d| d.to_string())
                .unwrap_or_else(|| "unknown".to_string());
            format!(
                "Published: {}\nTitle: {}\nAuthors: {}\nSummary: {}",
                published,
                doc.metadata.title,
                doc.metadata.authors.join(", "),
                doc.metadata.summary
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    truncate_chars(&rendered, max_chars)
}

/// Client for the arXiv query API
pub struct ArxivClient {
    client: reqwest::Client,
    base_url: String,
    load_full_text: bool,
    max_document_chars: usize,
    policy: CallPolicy,
}

impl ArxivClient {
    pub fn new(config: &ArxivConfig, policy: CallPolicy) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.clone(),
            load_full_text: config.load_full_text,
            max_document_chars: config.max_document_chars,
            policy,
        }
    }

    async fn fetch_pdf_once(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ScholarError::Retrieval(format!("PDF request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScholarError::Retrieval(format!(
                "PDF download returned status {}",
                status
            )));
        }

        response
            .bytes()
            .await
            .map(|bytes| bytes.to_vec())
            .map_err(|e| ScholarError::Retrieval(format!("failed to read PDF: {}", e)))
    }

    /// Extracted text of one paper, or `None` when it cannot be had
    async fn fetch_full_text(&self, url: &str) -> Option<String> {
        let bytes = match self
            .policy
            .run(ErrorKind::RetrievalError, move || self.fetch_pdf_once(url))
            .await
        {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "PDF download failed, indexing abstract");
                return None;
            }
        };

        let extracted = tokio::task::spawn_blocking(move || {
            pdf_extract::extract_text_from_mem(&bytes).map_err(|e| e.to_string())
        })
        .await;
        match extracted {
            Ok(Ok(text)) if !text.trim().is_empty() => {
                Some(truncate_chars(text.trim(), self.max_document_chars))
            }
            Ok(Ok(_)) => {
                tracing::warn!(url = %url, "PDF has no extractable text, indexing abstract");
                None
            }
            Ok(Err(e)) => {
                tracing::warn!(url = %url, error = %e, "PDF extraction failed, indexing abstract");
                None
            }
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "PDF extraction aborted, indexing abstract");
                None
            }
        }
    }

    async fn fetch_once(&self, query: &str, max_results: usize) -> Result<String> {
        let search_query = format!("all:{}", query);
        let max_results = max_results.to_string();

        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("search_query", search_query.as_str()),
                ("start", "0"),
                ("max_results", max_results.as_str()),
            ])
            .send()
            .await
            .map_err(|e| ScholarError::Retrieval(format!("arXiv request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScholarError::Retrieval(format!(
                "arXiv returned status {}",
                status
            )));
        }

        response
            .text()
            .await
            .map_err(|e| ScholarError::Retrieval(format!("failed to read arXiv response: {}", e)))
    }
}

#[async_trait]
impl PaperSource for ArxivClient {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<Document>> {
        let query = truncate_chars(query.trim(), MAX_QUERY_CHARS);
        let query = query.as_str();

        let xml = self
            .policy
            .run(ErrorKind::RetrievalError, move || {
                self.fetch_once(query, max_results)
            })
            .await?;

        let mut docs = parse_feed(&xml)?;
        docs.truncate(max_results);

        tracing::info!(
            source = "arxiv",
            query = %query,
            documents = docs.len(),
            "Paper search complete"
        );

        Ok(docs)
    }

    /// Search, then swap each abstract for the paper's full text where the
    /// PDF can be downloaded and read.
    async fn load(&self, query: &str, max_results: usize) -> Result<Vec<Document>> {
        let docs = self.search(query, max_results).await?;
        if !self.load_full_text {
            return Ok(docs);
        }

        let loaded = futures::future::join_all(docs.into_iter().map(|doc| async move {
            let Some(url) = doc.metadata.pdf_url.clone() else {
                return (doc, false);
            };
            match self.fetch_full_text(&url).await {
                Some(text) => (doc.with_full_text(&text), true),
                None => (doc, false),
            }
        }))
        .await;

        let full_text = loaded.iter().filter(|(_, full)| *full).count();
        tracing::info!(
            source = "arxiv",
            documents = loaded.len(),
            full_text = full_text,
            "Papers loaded for indexing"
        );

        Ok(loaded.into_iter().map(|(doc, _)| doc).collect())
    }

    fn name(&self) -> &str {
        "arxiv"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title type="html">ArXiv Query: search_query=all:transformer attention</title>
  <entry>
    <id>http://arxiv.org/abs/1706.03762v7</id>
    <published>2017-06-12T17:57:34Z</published>
    <title>Attention Is All
      You Need</title>
    <link href="http://arxiv.org/abs/1706.03762v7" rel="alternate" type="text/html"/>
    <link title="pdf" href="http://arxiv.org/pdf/1706.03762v7" rel="related" type="application/pdf"/>
    <summary>  The dominant sequence transduction models are based on complex
      recurrent or convolutional neural networks &amp; attention.
    </summary>
    <author>
      <name>Ashish Vaswani</name>
    </author>
    <author>
      <name>Noam Shazeer</name>
    </author>
  </entry>
  <entry>
    <id>http://arxiv.org/abs/2009.06732v3</id>
    <published>2020-09-14T20:38:11Z</published>
    <title>Efficient Transformers: A Survey</title>
    <summary>Transformer model architectures have garnered immense interest.</summary>
    <author><name>Yi Tay</name></author>
  </entry>
</feed>"#;

    fn config(base_url: String) -> ArxivConfig {
        ArxivConfig {
            base_url,
            ..Default::default()
        }
    }

    const PAPER_PDF: &str = "%PDF-1.4\n\
1 0 obj\n\
<< /Type /Catalog /Pages 2 0 R >>\n\
endobj\n\
2 0 obj\n\
<< /Type /Pages /Kids [3 0 R] /Count 1 >>\n\
endobj\n\
3 0 obj\n\
<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Resources << /Font << /F1 5 0 R >> >> /Contents 4 0 R >>\n\
endobj\n\
4 0 obj\n\
<< /Length 59 >>\n\
stream\n\
BT /F1 18 Tf 72 700 Td (Scaled dot-product attention) Tj ET\n\
endstream\n\
endobj\n\
5 0 obj\n\
<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>\n\
endobj\n\
xref\n\
0 6\n\
0000000000 65535 f \n\
0000000009 00000 n \n\
0000000058 00000 n \n\
0000000115 00000 n \n\
0000000241 00000 n \n\
0000000350 00000 n \n\
trailer\n\
<< /Size 6 /Root 1 0 R >>\n\
startxref\n\
447\n\
%%EOF\n";

    /// One-entry feed whose PDF link points at `pdf_url`
    fn feed_with_pdf(pdf_url: &str) -> String {
        format!(
            r#"<feed xmlns="http://www.w3.org/2005/Atom">
  <entry>
    <id>http://arxiv.org/abs/1706.03762v7</id>
    <title>Attention Is All You Need</title>
    <summary>We propose the Transformer.</summary>
    <link title="pdf" href="{}" rel="related" type="application/pdf"/>
    <author><name>Ashish Vaswani</name></author>
  </entry>
</feed>"#,
            pdf_url
        )
    }

    async fn full_text_client(
        server: &mut mockito::ServerGuard,
        load_full_text: bool,
    ) -> ArxivClient {
        let pdf_url = format!("{}/pdf/1706.03762v7", server.url());
        server
            .mock("GET", "/api/query")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(feed_with_pdf(&pdf_url))
            .create_async()
            .await;

        ArxivClient::new(
            &ArxivConfig {
                base_url: format!("{}/api/query", server.url()),
                load_full_text,
                ..Default::default()
            },
            CallPolicy::once(Duration::from_secs(5)),
        )
    }

    #[test]
    fn test_parse_feed() {
        let docs = parse_feed(FEED).unwrap();
        assert_eq!(docs.len(), 2);

        let first = &docs[0].metadata;
        assert_eq!(first.entry_id, "http://arxiv.org/abs/1706.03762v7");
        assert_eq!(first.title, "Attention Is All You Need");
        assert_eq!(first.authors, vec!["Ashish Vaswani", "Noam Shazeer"]);
        assert_eq!(first.published, NaiveDate::from_ymd_opt(2017, 6, 12));
        assert!(first.summary.contains("networks & attention."));
        assert!(!first.summary.contains('\n'));
        assert_eq!(
            first.pdf_url.as_deref(),
            Some("http://arxiv.org/pdf/1706.03762v7")
        );
        assert_eq!(docs[1].metadata.pdf_url, None);
    }

    #[test]
    fn test_parse_feed_decodes_references_and_cdata() {
        let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom">
  <entry>
    <id>http://arxiv.org/abs/2304.00001v1</id>
    <title>Schr&#246;dinger bridges &#x26; diffusion</title>
    <summary><![CDATA[We show that x < y & z > w.]]></summary>
    <author><name>Val&#233;rie Author</name></author>
  </entry>
</feed>"#;
        let docs = parse_feed(xml).unwrap();

        let meta = &docs[0].metadata;
        assert_eq!(meta.title, "Schr\u{f6}dinger bridges & diffusion");
        assert_eq!(meta.summary, "We show that x < y & z > w.");
        assert_eq!(meta.authors, vec!["Val\u{e9}rie Author"]);
    }

    #[test]
    fn test_parse_feed_skips_error_entry() {
        let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom">
  <entry>
    <id>http://arxiv.org/api/errors#incorrect_id_format_for_1234</id>
    <title>Error</title>
    <summary>incorrect id format for 1234</summary>
  </entry>
</feed>"#;
        assert!(parse_feed(xml).unwrap().is_empty());
    }

    #[test]
    fn test_malformed_feed_is_retrieval_error() {
        let err = parse_feed("<feed><entry><id>x</id></feed>").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RetrievalError);
    }

    #[test]
    fn test_parse_empty_feed() {
        let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom"><title>ArXiv Query</title></feed>"#;
        assert!(parse_feed(xml).unwrap().is_empty());
    }

    #[test]
    fn test_format_documents() {
        let docs = parse_feed(FEED).unwrap();
        let text = format_documents(&docs, 4000);
        assert!(text.starts_with("Published: 2017-06-12\nTitle: Attention Is All You Need"));
        assert!(text.contains("Authors: Ashish Vaswani, Noam Shazeer"));

        let truncated = format_documents(&docs, 20);
        assert_eq!(truncated.chars().count(), 20);

        assert_eq!(format_documents(&[], 4000), NO_RESULTS);
    }

    #[tokio::test]
    async fn test_search_queries_api() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/query")
            .match_query(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded(
                    "search_query".into(),
                    "all:transformer attention".into(),
                ),
                mockito::Matcher::UrlEncoded("max_results".into(), "1".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/atom+xml")
            .with_body(FEED)
            .create_async()
            .await;

        let client = ArxivClient::new(
            &config(format!("{}/api/query", server.url())),
            CallPolicy::once(Duration::from_secs(5)),
        );
        let docs = client.search("transformer attention", 1).await.unwrap();

        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].metadata.title, "Attention Is All You Need");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_search_failure_is_retrieval_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/query")
            .match_query(mockito::Matcher::Any)
            .with_status(503)
            .create_async()
            .await;

        let client = ArxivClient::new(
            &config(format!("{}/api/query", server.url())),
            CallPolicy::once(Duration::from_secs(5)),
        );
        let err = client.search("anything", 3).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RetrievalError);
    }

    #[tokio::test]
    async fn test_load_indexes_full_text() {
        let mut server = mockito::Server::new_async().await;
        let client = full_text_client(&mut server, true).await;
        let pdf = server
            .mock("GET", "/pdf/1706.03762v7")
            .with_status(200)
            .with_header("content-type", "application/pdf")
            .with_body(PAPER_PDF)
            .create_async()
            .await;

        let docs = client.load("transformer attention", 5).await.unwrap();

        assert_eq!(docs.len(), 1);
        assert!(docs[0].content.starts_with("Attention Is All You Need\n\n"));
        assert!(docs[0].content.contains("dot-product attention"));
        assert!(!docs[0].content.contains("We propose the Transformer."));
        pdf.assert_async().await;
    }

    #[tokio::test]
    async fn test_load_falls_back_to_abstract() {
        let mut server = mockito::Server::new_async().await;
        let client = full_text_client(&mut server, true).await;
        server
            .mock("GET", "/pdf/1706.03762v7")
            .with_status(200)
            .with_body("this is not a pdf")
            .create_async()
            .await;

        let docs = client.load("transformer attention", 5).await.unwrap();

        assert_eq!(
            docs[0].content,
            "Attention Is All You Need\n\nWe propose the Transformer."
        );
    }

    #[tokio::test]
    async fn test_load_survives_missing_pdf() {
        let mut server = mockito::Server::new_async().await;
        let client = full_text_client(&mut server, true).await;
        server
            .mock("GET", "/pdf/1706.03762v7")
            .with_status(404)
            .create_async()
            .await;

        let docs = client.load("transformer attention", 5).await.unwrap();
        assert!(docs[0].content.ends_with("We propose the Transformer."));
    }

    #[tokio::test]
    async fn test_load_without_full_text_skips_download() {
        let mut server = mockito::Server::new_async().await;
        let client = full_text_client(&mut server, false).await;
        let pdf = server
            .mock("GET", "/pdf/1706.03762v7")
            .expect(0)
            .create_async()
            .await;

        let docs = client.load("transformer attention", 5).await.unwrap();

        assert!(docs[0].content.ends_with("We propose the Transformer."));
        pdf.assert_async().await;
    }
}
