//! Structured tool errors

use serde::{Deserialize, Serialize};

use crate::error::{ErrorKind, ScholarError};

/// Error kind taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolErrorKind {
    /// Input was unusable (not retryable - fix input)
    Validation,

    /// Call timed out (retryable)
    Timeout,

    /// Transient network/service error (retryable)
    Transient,

    /// Invalid response from external system (may be retryable)
    InvalidResponse,

    /// Internal tool error (not retryable - bug)
    Internal,
}

impl ToolErrorKind {
    /// Check if this error kind is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ToolErrorKind::Timeout | ToolErrorKind::Transient | ToolErrorKind::InvalidResponse
        )
    }
}

/// Failure of a single tool call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolError {
    /// Error kind (determines retryability)
    pub kind: ToolErrorKind,

    /// Human-readable error message
    pub message: String,
}

impl ToolError {
    /// Create a new tool error
    pub fn new(kind: ToolErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::Validation, message)
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::Internal, message)
    }

    /// Attach the tool name and lift into the crate error
    pub fn into_scholar(self, tool: impl Into<String>) -> ScholarError {
        ScholarError::ToolInvocation {
            tool: tool.into(),
            message: self.message,
        }
    }
}

impl From<ScholarError> for ToolError {
    fn from(err: ScholarError) -> Self {
        let kind = match err.kind() {
            ErrorKind::RetrievalError | ErrorKind::EmbeddingError => {
                if err.to_string().contains("timed out") {
                    ToolErrorKind::Timeout
                } else {
                    ToolErrorKind::Transient
                }
            }
            ErrorKind::ModelInvocationError => ToolErrorKind::InvalidResponse,
            ErrorKind::InvalidQuery => ToolErrorKind::Validation,
            _ => ToolErrorKind::Internal,
        };
        Self::new(kind, err.to_string())
    }
}

impl std::fmt::Display for ToolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.kind, self.message)
    }
}

impl std::error::Error for ToolError {}
