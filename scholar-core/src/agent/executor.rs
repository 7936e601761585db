//! Bounded think/act/observe loop

use std::sync::Arc;

use super::policy::{ReasoningContext, ReasoningPolicy};
use super::{AgentDecision, AgentOutcome, AgentStep, ToolCall};
use crate::config::AgentConfig;
use crate::conversation::ConversationMemory;
use crate::error::{Result, ScholarError};
use crate::sources::truncate_chars;
use crate::tools::ToolRegistry;

/// Appended to observations of failures that may clear on their own
const RETRY_HINT: &str = "The failure may be temporary; retrying the same action could work.";

/// Runs a reasoning policy against the tool registry
pub struct AgentExecutor {
    policy: Arc<dyn ReasoningPolicy>,
    tools: ToolRegistry,
    max_iterations: usize,
    max_observation_chars: usize,
}

impl AgentExecutor {
    pub fn new(policy: Arc<dyn ReasoningPolicy>, tools: ToolRegistry, config: &AgentConfig) -> Self {
        Self {
            policy,
            tools,
            max_iterations: config.max_iterations.max(1),
            max_observation_chars: config.max_observation_chars,
        }
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    /// Answer `query` using the tools, reading and extending `memory`.
    ///
    /// Memory is only extended when the run produces a final answer.
    ///
    /// # Errors
    ///
    /// `AgentExhaustedError` when no final answer is produced within
    /// `max_iterations` policy calls; `ModelInvocationError` when the policy's
    /// model call fails.
    pub async fn run(&self, query: &str, memory: &mut ConversationMemory) -> Result<AgentOutcome> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ScholarError::InvalidQuery("query must not be empty".to_string()));
        }

        let mut steps: Vec<AgentStep> = Vec::new();

        for iteration in 1..=self.max_iterations {
            let decision = self
                .policy
                .decide(&ReasoningContext {
                    query,
                    history: &*memory,
                    tools: &self.tools,
                    steps: &steps,
                })
                .await?;

            match decision {
                AgentDecision::Finish { answer, .. } => {
                    tracing::info!(
                        iterations = iteration,
                        tool_calls = steps.iter().filter(|s| s.action.is_some()).count(),
                        "Agent finished"
                    );
                    memory.record(query, answer.clone());
                    return Ok(AgentOutcome {
                        answer,
                        steps,
                        iterations: iteration,
                    });
                }
                AgentDecision::UseTool {
                    tool,
                    input,
                    thought,
                } => {
                    let observation = self.observe(&tool, &input, iteration).await;
                    steps.push(AgentStep {
                        thought,
                        action: Some(ToolCall { tool, input }),
                        observation,
                    });
                }
                AgentDecision::Malformed {
                    output,
                    observation,
                } => {
                    tracing::warn!(iteration = iteration, "Agent produced malformed output");
                    steps.push(AgentStep {
                        thought: output,
                        action: None,
                        observation,
                    });
                }
            }
        }

        tracing::warn!(
            max_iterations = self.max_iterations,
            "Agent stopped without a final answer"
        );
        Err(ScholarError::AgentExhausted {
            iterations: self.max_iterations,
        })
    }

    /// Run one tool; failures and unknown names become observations
    async fn observe(&self, tool_name: &str, input: &str, iteration: usize) -> String {
        let Some(tool) = self.tools.get(tool_name) else {
            tracing::debug!(tool = %tool_name, "Agent asked for an unknown tool");
            return format!(
                "{} is not a valid tool, try one of [{}].",
                tool_name,
                self.tools.names().join(", ")
            );
        };

        tracing::debug!(iteration = iteration, tool = %tool_name, input = %input, "Calling tool");
        let observation = match tool.call(input).await {
            Ok(output) => output,
            Err(e) => {
                let retryable = e.kind.is_retryable();
                tracing::warn!(
                    tool = %tool_name,
                    kind = ?e.kind,
                    retryable = retryable,
                    error = %e.message,
                    "Tool call failed"
                );
                let failure = e.into_scholar(tool_name).to_string();
                if retryable {
                    format!("{} {}", failure, RETRY_HINT)
                } else {
                    failure
                }
            }
        };

        truncate_chars(&observation, self.max_observation_chars)
    }
}
