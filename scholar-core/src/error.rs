//! Error types for Scholar operations

use serde::{Deserialize, Serialize};

/// Result type for Scholar operations
pub type Result<T> = std::result::Result<T, ScholarError>;

/// Error types for the research assistant
#[derive(Debug, thiserror::Error)]
pub enum ScholarError {
    /// Paper search failed or returned no documents
    #[error("Retrieval error: {0}")]
    Retrieval(String),

    /// Embedding provider call failed or returned malformed data
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Hosted language model call failed, timed out, or returned malformed output
    #[error("Model invocation error: {0}")]
    ModelInvocation(String),

    /// A tool call inside the agent loop failed
    #[error("Tool '{tool}' failed: {message}")]
    ToolInvocation { tool: String, message: String },

    /// Agent loop reached its iteration bound without a final answer
    #[error("Agent stopped after {iterations} iterations without a final answer")]
    AgentExhausted { iterations: usize },

    /// Query was empty or otherwise unusable
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl ScholarError {
    /// Machine-readable kind of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            ScholarError::Retrieval(_) => ErrorKind::RetrievalError,
            ScholarError::Embedding(_) => ErrorKind::EmbeddingError,
            ScholarError::ModelInvocation(_) => ErrorKind::ModelInvocationError,
            ScholarError::ToolInvocation { .. } => ErrorKind::ToolInvocationError,
            ScholarError::AgentExhausted { .. } => ErrorKind::AgentExhaustedError,
            ScholarError::InvalidQuery(_) => ErrorKind::InvalidQuery,
            ScholarError::Configuration(_) => ErrorKind::ConfigurationError,
            ScholarError::Serialization(_) | ScholarError::Io(_) | ScholarError::Other(_) => {
                ErrorKind::InternalError
            }
        }
    }

    /// Human-readable marker placed in a response field when a sub-flow fails.
    ///
    /// Format: `[<KindName>] <message>`
    pub fn marker(&self) -> String {
        format!("[{}] {}", self.kind().name(), self.detail())
    }

    /// Message without the kind prefix that `Display` adds
    pub fn detail(&self) -> String {
        match self {
            ScholarError::Retrieval(msg)
            | ScholarError::Embedding(msg)
            | ScholarError::ModelInvocation(msg)
            | ScholarError::InvalidQuery(msg)
            | ScholarError::Configuration(msg)
            | ScholarError::Other(msg) => msg.clone(),
            other => other.to_string(),
        }
    }

    /// Re-tag a timeout or transport failure with the kind of the call that produced it.
    pub(crate) fn retag(self, as_kind: ErrorKind) -> Self {
        if self.kind() == as_kind {
            return self;
        }
        let message = self.to_string();
        match as_kind {
            ErrorKind::RetrievalError => ScholarError::Retrieval(message),
            ErrorKind::EmbeddingError => ScholarError::Embedding(message),
            ErrorKind::ModelInvocationError => ScholarError::ModelInvocation(message),
            _ => self,
        }
    }
}

/// Machine-readable error kind, exposed on the HTTP boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    RetrievalError,
    EmbeddingError,
    ModelInvocationError,
    ToolInvocationError,
    AgentExhaustedError,
    InvalidQuery,
    ConfigurationError,
    InternalError,
}

impl ErrorKind {
    /// Display name used in error markers
    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::RetrievalError => "RetrievalError",
            ErrorKind::EmbeddingError => "EmbeddingError",
            ErrorKind::ModelInvocationError => "ModelInvocationError",
            ErrorKind::ToolInvocationError => "ToolInvocationError",
            ErrorKind::AgentExhaustedError => "AgentExhaustedError",
            ErrorKind::InvalidQuery => "InvalidQuery",
            ErrorKind::ConfigurationError => "ConfigurationError",
            ErrorKind::InternalError => "InternalError",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl From<String> for ScholarError {
    fn from(s: String) -> Self {
        ScholarError::Other(s)
    }
}

impl From<&str> for ScholarError {
    fn from(s: &str) -> Self {
        ScholarError::Other(s.to_string())
    }
}

impl From<anyhow::Error> for ScholarError {
    fn from(err: anyhow::Error) -> Self {
        ScholarError::Other(err.to_string())
    }
}
