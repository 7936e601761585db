//! OpenAI-compatible chat completion provider

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::LLMProviderConfig;
use crate::error::{ErrorKind, Result, ScholarError};
use crate::llm::{LLMProvider, LLMRequest, LLMResponse, Message, MessageRole, ModelInfo, TokenUsage};
use crate::retry::CallPolicy;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4";

/// OpenAI chat provider (GPT-4 and compatible endpoints).
pub struct OpenAIProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    temperature: Option<f32>,
    max_tokens: Option<usize>,
    policy: CallPolicy,
}

impl OpenAIProvider {
    /// Create a new OpenAI provider.
    ///
    /// # Arguments
    ///
    /// * `api_key` - OpenAI API key
    /// * `model` - Model name (e.g., "gpt-4")
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            temperature: None,
            max_tokens: None,
            policy: CallPolicy::default(),
        }
    }

    /// Create from configuration.
    ///
    /// The API key falls back to `OPENAI_API_KEY`, the model to `OPENAI_MODEL`
    /// and the base URL to `OPENAI_BASE_URL` when the config leaves them unset.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if no API key is available.
    pub fn from_config(config: &LLMProviderConfig, policy: CallPolicy) -> Result<Self> {
        let api_key = resolve_api_key(config.api_key.as_deref())?;
        let model = config
            .model
            .clone()
            .or_else(|| std::env::var("OPENAI_MODEL").ok())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let base_url = config
            .base_url
            .clone()
            .or_else(|| std::env::var("OPENAI_BASE_URL").ok())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let provider = Self::new(api_key, model)
            .with_base_url(base_url)
            .with_policy(policy);
        Ok(Self {
            temperature: Some(config.temperature),
            max_tokens: config.max_tokens,
            ..provider
        })
    }

    /// Builder: point at a compatible API
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Builder: set the call policy
    pub fn with_policy(mut self, policy: CallPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Get the model name.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn send_once(&self, body: &OpenAIRequest) -> Result<LLMResponse> {
        let url = format!("{}/chat/completions", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| {
                ScholarError::ModelInvocation(format!("Failed to send request to OpenAI: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());

            if let Ok(error) = serde_json::from_str::<OpenAIError>(&text) {
                return Err(ScholarError::ModelInvocation(format!(
                    "OpenAI API error ({}): {}",
                    error.error.error_type.unwrap_or_else(|| status.to_string()),
                    error.error.message
                )));
            }

            return Err(ScholarError::ModelInvocation(format!(
                "OpenAI API error ({}): {}",
                status, text
            )));
        }

        let openai_response: OpenAIResponse = response.json().await.map_err(|e| {
            ScholarError::ModelInvocation(format!("Failed to parse OpenAI response: {}", e))
        })?;

        let content = openai_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| {
                ScholarError::ModelInvocation("OpenAI API returned no choices".to_string())
            })?
            .message
            .content
            .unwrap_or_default();

        let usage = openai_response.usage.map(|u| TokenUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        Ok(LLMResponse { content, usage })
    }
}

fn resolve_api_key(configured: Option<&str>) -> Result<String> {
    configured
        .map(str::to_string)
        .or_else(|| std::env::var("OPENAI_API_KEY").ok())
        .filter(|key| !key.trim().is_empty())
        .ok_or_else(|| {
            ScholarError::Configuration(
                "OPENAI_API_KEY environment variable not set and llm.api_key is empty".to_string(),
            )
        })
}

#[derive(Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<Vec<String>>,
}

#[derive(Serialize)]
struct OpenAIMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
    usage: Option<OpenAIUsage>,
}

#[derive(Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessageResponse,
}

#[derive(Deserialize)]
struct OpenAIMessageResponse {
    content: Option<String>,
}

#[derive(Deserialize)]
struct OpenAIUsage {
    prompt_tokens: usize,
    completion_tokens: usize,
    total_tokens: usize,
}

#[derive(Deserialize)]
struct OpenAIError {
    error: OpenAIErrorDetail,
}

#[derive(Deserialize)]
struct OpenAIErrorDetail {
    message: String,
    #[serde(rename = "type")]
    error_type: Option<String>,
}

fn convert_messages(messages: &[Message]) -> Vec<OpenAIMessage> {
    messages
        .iter()
        .map(|m| OpenAIMessage {
            role: match m.role {
                MessageRole::System => "system",
                MessageRole::User => "user",
                MessageRole::Assistant => "assistant",
            },
            content: m.content.clone(),
        })
        .collect()
}

#[async_trait]
impl LLMProvider for OpenAIProvider {
    async fn generate_request(&self, request: &LLMRequest) -> Result<LLMResponse> {
        let body = OpenAIRequest {
            model: self.model.clone(),
            messages: convert_messages(&request.messages),
            temperature: request.temperature.or(self.temperature),
            max_tokens: request.max_tokens.or(self.max_tokens),
            stop: if request.stop_sequences.is_empty() {
                None
            } else {
                Some(request.stop_sequences.clone())
            },
        };

        tracing::debug!(
            model = %self.model,
            messages = body.messages.len(),
            "Sending chat completion request"
        );

        let body = &body;
        self.policy
            .run(ErrorKind::ModelInvocationError, move || self.send_once(body))
            .await
    }

    fn model_info(&self) -> ModelInfo {
        ModelInfo {
            provider: "openai".to_string(),
            model_name: self.model.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn test_provider(base_url: &str) -> OpenAIProvider {
        OpenAIProvider::new("test-key", "gpt-4")
            .with_base_url(base_url)
            .with_policy(CallPolicy::once(Duration::from_secs(5)))
    }

    #[test]
    fn test_openai_provider_creation() {
        let provider = OpenAIProvider::new("test-key", "gpt-4");
        assert_eq!(provider.model(), "gpt-4");
        assert_eq!(provider.base_url(), "https://api.openai.com/v1");
    }

    #[test]
    fn test_from_config_uses_configured_values() {
        let config = LLMProviderConfig {
            model: Some("gpt-4o-mini".to_string()),
            api_key: Some("sk-config".to_string()),
            base_url: Some("http://localhost:9999/v1".to_string()),
            ..Default::default()
        };

        let provider = OpenAIProvider::from_config(&config, CallPolicy::default()).unwrap();
        assert_eq!(provider.model(), "gpt-4o-mini");
        assert_eq!(provider.base_url(), "http://localhost:9999/v1");
        assert_eq!(provider.temperature, Some(0.3));
    }

    #[test]
    fn test_from_config_trims_trailing_slash() {
        let config = LLMProviderConfig {
            api_key: Some("sk-config".to_string()),
            base_url: Some("http://localhost:9999/v1/".to_string()),
            ..Default::default()
        };

        let provider = OpenAIProvider::from_config(&config, CallPolicy::default()).unwrap();
        assert_eq!(provider.base_url(), "http://localhost:9999/v1");
    }

    #[tokio::test]
    async fn test_configured_base_url_with_slash_reaches_endpoint() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices":[{"message":{"role":"assistant","content":"ok"}}]}"#)
            .create_async()
            .await;

        let config = LLMProviderConfig {
            api_key: Some("sk-config".to_string()),
            base_url: Some(format!("{}/v1/", server.url())),
            ..Default::default()
        };
        let provider =
            OpenAIProvider::from_config(&config, CallPolicy::once(Duration::from_secs(5))).unwrap();

        assert_eq!(provider.generate("ping").await.unwrap(), "ok");
        mock.assert_async().await;
    }

    #[test]
    fn test_blank_configured_key_rejected_without_env() {
        if std::env::var("OPENAI_API_KEY").is_ok() {
            return;
        }
        let result = resolve_api_key(Some("   "));
        assert!(matches!(result, Err(ScholarError::Configuration(_))));
    }

    #[test]
    fn test_convert_messages() {
        let messages = vec![
            Message::system("You are helpful"),
            Message::user("Hello"),
            Message::assistant("Hi there!"),
        ];

        let converted = convert_messages(&messages);

        assert_eq!(converted.len(), 3);
        assert_eq!(converted[0].role, "system");
        assert_eq!(converted[1].role, "user");
        assert_eq!(converted[2].role, "assistant");
    }

    #[tokio::test]
    async fn test_generate_request_parses_completion() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer test-key")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"choices":[{"message":{"role":"assistant","content":"Attention weighs tokens."}}],
                    "usage":{"prompt_tokens":12,"completion_tokens":4,"total_tokens":16}}"#,
            )
            .create_async()
            .await;

        let provider = test_provider(&server.url());
        let response = provider
            .generate_request(&LLMRequest::from_prompt("What is attention?").with_stop("\nObservation:"))
            .await
            .unwrap();

        assert_eq!(response.content, "Attention weighs tokens.");
        assert_eq!(response.usage.map(|u| u.total_tokens), Some(16));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_api_error_maps_to_model_invocation() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(429)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error":{"message":"Rate limit reached","type":"rate_limit_error"}}"#)
            .create_async()
            .await;

        let provider = test_provider(&server.url());
        let err = provider.generate("hello").await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ModelInvocationError);
        assert!(err.to_string().contains("Rate limit reached"));
    }

    #[tokio::test]
    async fn test_empty_choices_is_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices":[]}"#)
            .create_async()
            .await;

        let provider = test_provider(&server.url());
        let err = provider.generate("hello").await.unwrap_err();
        assert!(err.to_string().contains("no choices"));
    }

    #[test]
    fn test_model_info() {
        let provider = OpenAIProvider::new("test-key", "gpt-4o-mini");
        let info = provider.model_info();
        assert_eq!(info.provider, "openai");
        assert_eq!(info.model_name, "gpt-4o-mini");
    }
}
