//! Tool-using research agent
//!
//! The agent alternates between thinking and acting: a [`ReasoningPolicy`]
//! decides what to do next from the query, the conversation so far and the
//! scratchpad of earlier steps, and the [`AgentExecutor`] runs the chosen tool
//! and feeds its output back as an observation.
//!
//! ```text
//! THINK ──► UseTool ──► ACT ──► OBSERVE ──┐
//!   ▲                                     │
//!   └─────────────────────────────────────┘
//! THINK ──► Finish ──► answer
//! ```
//!
//! The loop is bounded by `agent.max_iterations`.

mod executor;
mod policy;

pub use executor::AgentExecutor;
pub use policy::{ReActPolicy, ReasoningContext, ReasoningPolicy};

use serde::{Deserialize, Serialize};

/// What the reasoning policy wants to do next
#[derive(Debug, Clone, PartialEq)]
pub enum AgentDecision {
    /// Call a tool and observe its output
    UseTool {
        tool: String,
        input: String,
        thought: String,
    },

    /// Stop with an answer for the user
    Finish { answer: String, thought: String },

    /// The model's output could not be understood; `observation` tells it how
    /// to answer instead. Still counts as an iteration.
    Malformed { output: String, observation: String },
}

/// A tool call requested by the policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub tool: String,
    pub input: String,
}

/// One completed iteration of the loop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentStep {
    /// Reasoning text (the raw output for malformed turns)
    pub thought: String,

    /// Tool call, absent for malformed turns
    pub action: Option<ToolCall>,

    /// Tool output or correction fed back to the policy
    pub observation: String,
}

/// Successful agent run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentOutcome {
    pub answer: String,
    pub steps: Vec<AgentStep>,
    /// Policy calls made, including the one that finished
    pub iterations: usize,
}
