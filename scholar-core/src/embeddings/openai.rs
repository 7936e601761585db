//! OpenAI embeddings provider using the `/v1/embeddings` endpoint.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::EmbeddingsConfig;
use crate::embeddings::EmbeddingProvider;
use crate::error::{ErrorKind, Result, ScholarError};
use crate::retry::CallPolicy;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

pub struct OpenAIEmbeddings {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    dims: usize,
    batch_size: usize,
    policy: CallPolicy,
}

fn normalize_base_url(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

fn has_version_suffix(base_url: &str) -> bool {
    let Some(last_segment) = base_url.rsplit('/').next() else {
        return false;
    };
    let Some(rest) = last_segment.strip_prefix('v') else {
        return false;
    };
    !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit())
}

fn embeddings_endpoint(base_url: &str) -> String {
    let normalized = normalize_base_url(base_url);
    if normalized.ends_with("/embeddings") {
        return normalized;
    }
    if has_version_suffix(&normalized) {
        return format!("{normalized}/embeddings");
    }
    format!("{normalized}/v1/embeddings")
}

/// Known output widths; anything else is assumed to match ada-002.
fn default_dimensions(model: &str) -> usize {
    match model {
        "text-embedding-3-large" => 3072,
        _ => 1536,
    }
}

impl OpenAIEmbeddings {
    pub fn new(api_key: impl Into<String>) -> Self {
        let model = "text-embedding-ada-002".to_string();
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            dims: default_dimensions(&model),
            model,
            batch_size: 64,
            policy: CallPolicy::default(),
        }
    }

    /// Create from configuration, falling back to `OPENAI_API_KEY` / `OPENAI_BASE_URL`.
    pub fn from_config(config: &EmbeddingsConfig, policy: CallPolicy) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                ScholarError::Configuration(
                    "OPENAI_API_KEY environment variable not set and embeddings.api_key is empty"
                        .to_string(),
                )
            })?;
        let base_url = config
            .base_url
            .clone()
            .or_else(|| std::env::var("OPENAI_BASE_URL").ok())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        Ok(Self::new(api_key)
            .with_model(config.model.clone())
            .with_base_url(base_url)
            .with_batch_size(config.batch_size)
            .with_policy(policy))
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self.dims = default_dimensions(&self.model);
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = normalize_base_url(&url.into());
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_policy(mut self, policy: CallPolicy) -> Self {
        self.policy = policy;
        self
    }

    async fn request_once(&self, body: &EmbeddingRequest<'_>) -> Result<Vec<Vec<f32>>> {
        let response = self
            .client
            .post(embeddings_endpoint(&self.base_url))
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| ScholarError::Embedding(format!("embeddings request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ScholarError::Embedding(format!(
                "embeddings API error ({}): {}",
                status, text
            )));
        }

        let mut parsed: EmbeddingResponse = response.json().await.map_err(|e| {
            ScholarError::Embedding(format!("failed to parse embeddings response: {}", e))
        })?;

        if parsed.data.len() != body.input.len() {
            return Err(ScholarError::Embedding(format!(
                "expected {} embeddings, got {}",
                body.input.len(),
                parsed.data.len()
            )));
        }

        parsed.data.sort_by_key(|d| d.index);
        Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

#[async_trait]
impl EmbeddingProvider for OpenAIEmbeddings {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text])
            .await?
            .pop()
            .ok_or_else(|| ScholarError::Embedding("empty embedding response".to_string()))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        // Batches go out concurrently; try_join_all keeps their order.
        let batches = texts.chunks(self.batch_size).map(|batch| async move {
            let body = EmbeddingRequest {
                model: &self.model,
                input: batch,
            };
            let body = &body;
            self.policy
                .run(ErrorKind::EmbeddingError, move || self.request_once(body))
                .await
        });
        let vectors: Vec<Vec<f32>> = futures::future::try_join_all(batches)
            .await?
            .into_iter()
            .flatten()
            .collect();

        tracing::debug!(
            model = %self.model,
            count = vectors.len(),
            "Embedded texts"
        );

        Ok(vectors)
    }

    fn dimension(&self) -> usize {
        self.dims
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn endpoint_from_host_base_uses_v1_embeddings() {
        assert_eq!(
            embeddings_endpoint("https://api.openai.com"),
            "https://api.openai.com/v1/embeddings"
        );
    }

    #[test]
    fn endpoint_from_v1_base_appends_embeddings_once() {
        assert_eq!(
            embeddings_endpoint("https://api.openai.com/v1/"),
            "https://api.openai.com/v1/embeddings"
        );
    }

    #[test]
    fn endpoint_preserves_explicit_embeddings_url() {
        assert_eq!(
            embeddings_endpoint("https://api.example.com/v1/embeddings"),
            "https://api.example.com/v1/embeddings"
        );
    }

    #[test]
    fn dimensions_follow_model() {
        let embeddings = OpenAIEmbeddings::new("k").with_model("text-embedding-3-large");
        assert_eq!(embeddings.dimension(), 3072);
        assert_eq!(embeddings.model_name(), "text-embedding-3-large");
    }

    #[tokio::test]
    async fn batches_are_split_and_reordered() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/embeddings")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"data":[{"index":1,"embedding":[0.0,1.0]},{"index":0,"embedding":[1.0,0.0]}]}"#,
            )
            .expect(2)
            .create_async()
            .await;

        let embeddings = OpenAIEmbeddings::new("test-key")
            .with_base_url(server.url())
            .with_batch_size(2)
            .with_policy(CallPolicy::once(Duration::from_secs(5)));

        let vectors = embeddings
            .embed_batch(&["first", "second", "third", "fourth"])
            .await
            .unwrap();

        assert_eq!(vectors.len(), 4);
        assert_eq!(vectors[0], vec![1.0, 0.0]);
        assert_eq!(vectors[1], vec![0.0, 1.0]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn count_mismatch_is_embedding_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/embeddings")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"data":[{"index":0,"embedding":[1.0]}]}"#)
            .create_async()
            .await;

        let embeddings = OpenAIEmbeddings::new("test-key")
            .with_base_url(server.url())
            .with_policy(CallPolicy::once(Duration::from_secs(5)));

        let err = embeddings.embed_batch(&["a", "b"]).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EmbeddingError);
    }

    #[tokio::test]
    async fn server_error_is_embedding_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/embeddings")
            .with_status(500)
            .with_body("upstream down")
            .create_async()
            .await;

        let embeddings = OpenAIEmbeddings::new("test-key")
            .with_base_url(server.url())
            .with_policy(CallPolicy::once(Duration::from_secs(5)));

        let err = embeddings.embed("hello").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EmbeddingError);
        assert!(err.to_string().contains("upstream down"));
    }
}
