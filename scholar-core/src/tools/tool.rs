//! Tool trait and metadata definitions
//!
//! Tools are how the agent reaches the outside world. Each tool takes the raw
//! `Action Input` text the model produced and returns an observation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::error::ToolError;

/// Tool metadata shown to the model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolMetadata {
    /// Tool name (unique identifier, what the model writes after `Action:`)
    pub name: String,

    /// Natural-language description
    pub description: String,
}

impl ToolMetadata {
    /// Create new metadata with required fields
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

/// Core tool trait
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get tool metadata
    fn metadata(&self) -> &ToolMetadata;

    /// Get tool name (convenience method)
    fn name(&self) -> &str {
        &self.metadata().name
    }

    /// Get tool description (convenience method)
    fn description(&self) -> &str {
        &self.metadata().description
    }

    /// Run the tool on free-text input and return the observation text
    async fn call(&self, input: &str) -> Result<String, ToolError>;
}

/// Type alias for shared tools
pub type BoxedTool = Arc<dyn Tool>;
