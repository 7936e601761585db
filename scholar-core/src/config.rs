//! Configuration types for the Scholar research assistant

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{Result, ScholarError};

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ScholarConfig {
    /// HTTP front door configuration
    pub server: ServerConfig,

    /// Chat model configuration
    pub llm: LLMProviderConfig,

    /// Embeddings provider configuration
    pub embeddings: EmbeddingsConfig,

    /// Transient index configuration
    pub retrieval: RetrievalConfig,

    /// External search sources
    pub sources: SourcesConfig,

    /// Agent loop configuration
    pub agent: AgentConfig,

    /// Conversation memory configuration
    pub conversation: ConversationConfig,

    /// Timeout and retry policy for external calls
    pub resilience: ResilienceConfig,

    /// Response composition configuration
    pub composer: ComposerConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to bind
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8000".to_string(),
        }
    }
}

/// Chat model provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LLMProviderConfig {
    /// Model name (falls back to OPENAI_MODEL, then gpt-4)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Sampling temperature (0.0-2.0)
    pub temperature: f32,

    /// Maximum tokens to generate (provider default when unset)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<usize>,

    /// API key (prefer OPENAI_API_KEY)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL for OpenAI-compatible endpoints
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl Default for LLMProviderConfig {
    fn default() -> Self {
        Self {
            model: None,
            temperature: 0.3,
            max_tokens: None,
            api_key: None,
            base_url: None,
        }
    }
}

/// Embeddings configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingsConfig {
    /// Model name
    pub model: String,

    /// API key (prefer OPENAI_API_KEY)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL for OpenAI-compatible endpoints
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Number of chunks sent per embeddings request
    pub batch_size: usize,
}

impl Default for EmbeddingsConfig {
    fn default() -> Self {
        Self {
            model: "text-embedding-ada-002".to_string(),
            api_key: None,
            base_url: None,
            batch_size: 64,
        }
    }
}

/// Transient retrieval index configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Maximum papers fetched per query
    pub max_documents: usize,

    /// Maximum chunk length in characters
    pub chunk_size: usize,

    /// Characters shared by consecutive chunks
    pub chunk_overlap: usize,

    /// Chunks returned by the retriever
    pub top_k: usize,

    /// Opt-in index cache
    pub cache: IndexCacheConfig,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            max_documents: 10,
            chunk_size: 1000,
            chunk_overlap: 200,
            top_k: 4,
            cache: IndexCacheConfig::default(),
        }
    }
}

/// Index cache configuration. Disabled unless explicitly enabled.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexCacheConfig {
    /// Reuse indexes across requests with the same normalized query
    pub enabled: bool,

    /// Time an index stays valid
    #[serde(with = "humantime_serde")]
    pub ttl: Duration,

    /// Maximum cached indexes
    pub capacity: usize,
}

impl Default for IndexCacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            ttl: Duration::from_secs(600),
            capacity: 32,
        }
    }
}

/// External search sources
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SourcesConfig {
    pub arxiv: ArxivConfig,
    pub web: WebSearchConfig,
}

/// arXiv API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArxivConfig {
    /// Atom API endpoint
    pub base_url: String,

    /// Papers summarized by the agent's paper search tool
    pub top_k_results: usize,

    /// Character cap on the tool's summarized output
    pub max_content_chars: usize,

    /// Download each paper's PDF and index its text instead of the abstract
    pub load_full_text: bool,

    /// Character cap on a paper's extracted full text
    pub max_document_chars: usize,
}

impl Default for ArxivConfig {
    fn default() -> Self {
        Self {
            base_url: "https://export.arxiv.org/api/query".to_string(),
            top_k_results: 3,
            max_content_chars: 4000,
            load_full_text: true,
            max_document_chars: 4000,
        }
    }
}

/// Web search configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebSearchConfig {
    /// DuckDuckGo HTML endpoint
    pub base_url: String,

    /// Results kept per search
    pub max_results: usize,

    /// User agent sent with search requests
    pub user_agent: String,
}

impl Default for WebSearchConfig {
    fn default() -> Self {
        Self {
            base_url: "https://html.duckduckgo.com/html/".to_string(),
            max_results: 5,
            user_agent: "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36".to_string(),
        }
    }
}

/// Agent loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Reasoning iterations before giving up
    pub max_iterations: usize,

    /// Tool output is truncated to this many characters
    pub max_observation_chars: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: 15,
            max_observation_chars: 4000,
        }
    }
}

/// Conversation memory configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversationConfig {
    /// Turns kept per session (oldest evicted first)
    pub max_turns: usize,

    /// Sessions kept in memory (least recently used evicted first)
    pub max_sessions: usize,

    /// Idle time after which a session is dropped
    #[serde(with = "humantime_serde")]
    pub session_ttl: Duration,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            max_turns: 20,
            max_sessions: 1024,
            session_ttl: Duration::from_secs(3600),
        }
    }
}

/// Timeout and retry policy applied to every external call
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResilienceConfig {
    /// Per-attempt timeout
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,

    /// Total attempts (1 = no retry)
    pub max_attempts: usize,

    /// Delay before the retry
    #[serde(with = "humantime_serde")]
    pub initial_backoff: Duration,
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            max_attempts: 2,
            initial_backoff: Duration::from_millis(500),
        }
    }
}

/// What to do when one sub-flow fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Return what succeeded, with error markers for what did not
    #[default]
    Partial,

    /// Fail the whole request if either sub-flow fails
    Strict,
}

/// Response composition configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ComposerConfig {
    pub failure_policy: FailurePolicy,
}

impl ScholarConfig {
    /// Load configuration from file and environment variables.
    ///
    /// Loads in this order:
    /// 1. Default configuration
    /// 2. Configuration file (scholar.toml or path from SCHOLAR_CONFIG_PATH)
    /// 3. Environment variable overrides (`SCHOLAR_RETRIEVAL__CHUNK_SIZE=800`)
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file is invalid or fails validation.
    pub fn load() -> Result<Self> {
        use figment::{
            Figment,
            providers::{Env, Format, Serialized, Toml},
        };

        let mut figment = Figment::from(Serialized::defaults(ScholarConfig::default()))
            .merge(Toml::file("scholar.toml"));

        // Check for custom config path
        if let Ok(path) = std::env::var("SCHOLAR_CONFIG_PATH") {
            figment = figment.merge(Toml::file(path));
        }

        let config: ScholarConfig = figment
            .merge(Env::prefixed("SCHOLAR_").split("__"))
            .extract()
            .map_err(|e| {
                ScholarError::Configuration(format!("Failed to load configuration: {}", e))
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        use figment::{
            Figment,
            providers::{Format, Serialized, Toml},
        };

        let config: ScholarConfig = Figment::from(Serialized::defaults(ScholarConfig::default()))
            .merge(Toml::file(path))
            .extract()
            .map_err(|e| {
                ScholarError::Configuration(format!("Failed to load configuration file: {}", e))
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error describing the first invalid setting.
    pub fn validate(&self) -> Result<()> {
        let retrieval = &self.retrieval;
        if retrieval.chunk_size == 0 {
            return Err(ScholarError::Configuration(
                "retrieval.chunk_size must be greater than zero".to_string(),
            ));
        }
        if retrieval.chunk_overlap >= retrieval.chunk_size {
            return Err(ScholarError::Configuration(format!(
                "retrieval.chunk_overlap ({}) must be less than retrieval.chunk_size ({})",
                retrieval.chunk_overlap, retrieval.chunk_size
            )));
        }
        if retrieval.top_k == 0 {
            return Err(ScholarError::Configuration(
                "retrieval.top_k must be greater than zero".to_string(),
            ));
        }
        if retrieval.max_documents == 0 {
            return Err(ScholarError::Configuration(
                "retrieval.max_documents must be greater than zero".to_string(),
            ));
        }
        if self.embeddings.batch_size == 0 {
            return Err(ScholarError::Configuration(
                "embeddings.batch_size must be greater than zero".to_string(),
            ));
        }
        if self.agent.max_iterations == 0 {
            return Err(ScholarError::Configuration(
                "agent.max_iterations must be greater than zero".to_string(),
            ));
        }
        if self.resilience.max_attempts == 0 {
            return Err(ScholarError::Configuration(
                "resilience.max_attempts must be greater than zero".to_string(),
            ));
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(ScholarError::Configuration(format!(
                "llm.temperature ({}) must be within 0.0..=2.0",
                self.llm.temperature
            )));
        }
        if self.conversation.max_sessions == 0 {
            return Err(ScholarError::Configuration(
                "conversation.max_sessions must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
