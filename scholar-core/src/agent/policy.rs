//! Reasoning policies

use async_trait::async_trait;
use std::sync::Arc;

use super::{AgentDecision, AgentStep};
use crate::conversation::ConversationMemory;
use crate::error::Result;
use crate::llm::{LLMProvider, LLMRequest};
use crate::parsing::{ReActOutput, ReActParser};
use crate::tools::ToolRegistry;

/// Stop sequence that keeps the model from inventing tool output
pub const OBSERVATION_STOP: &str = "\nObservation:";

const FORMAT_REMINDER: &str = "Reply with 'Action:' and 'Action Input:' lines to use a tool, \
or with 'Final Answer:' when you know the answer.";

/// Everything a policy sees when choosing the next step
pub struct ReasoningContext<'a> {
    pub query: &'a str,
    pub history: &'a ConversationMemory,
    pub tools: &'a ToolRegistry,
    pub steps: &'a [AgentStep],
}

/// Chooses the agent's next step
#[async_trait]
pub trait ReasoningPolicy: Send + Sync {
    /// Decide what to do next.
    ///
    /// # Errors
    ///
    /// `ModelInvocationError` when the underlying model call fails.
    async fn decide(&self, context: &ReasoningContext<'_>) -> Result<AgentDecision>;
}

/// Zero-shot ReAct prompting over a chat model
pub struct ReActPolicy {
    llm: Arc<dyn LLMProvider>,
    parser: ReActParser,
}

impl ReActPolicy {
    pub fn new(llm: Arc<dyn LLMProvider>) -> Self {
        Self {
            llm,
            parser: ReActParser::new(),
        }
    }

    /// Full prompt for the next model turn
    pub fn build_prompt(&self, context: &ReasoningContext<'_>) -> String {
        let mut prompt = format!(
            "Answer the following questions as best you can. You have access to the following tools:\n\n\
             {tools}\n\n\
             Use the following format:\n\n\
             Question: the input question you must answer\n\
             Thought: you should always think about what to do\n\
             Action: the action to take, should be one of [{names}]\n\
             Action Input: the input to the action\n\
             Observation: the result of the action\n\
             ... (this Thought/Action/Action Input/Observation can repeat N times)\n\
             Thought: I now know the final answer\n\
             Final Answer: the final answer to the original input question\n\n\
             Begin!\n\n",
            tools = context.tools.describe(),
            names = context.tools.names().join(", "),
        );

        if !context.history.is_empty() {
            prompt.push_str("Previous conversation:\n");
            prompt.push_str(&context.history.render());
            prompt.push_str("\n\n");
        }

        prompt.push_str(&format!("Question: {}\nThought:", context.query));
        prompt.push_str(&render_scratchpad(context.steps));
        prompt
    }
}

fn render_scratchpad(steps: &[AgentStep]) -> String {
    let mut scratchpad = String::new();
    for step in steps {
        scratchpad.push(' ');
        scratchpad.push_str(step.thought.trim());
        if let Some(action) = &step.action {
            scratchpad.push_str(&format!(
                "\nAction: {}\nAction Input: {}",
                action.tool, action.input
            ));
        }
        scratchpad.push_str(&format!("\nObservation: {}\nThought:", step.observation));
    }
    scratchpad
}

#[async_trait]
impl ReasoningPolicy for ReActPolicy {
    async fn decide(&self, context: &ReasoningContext<'_>) -> Result<AgentDecision> {
        let request = LLMRequest::from_prompt(self.build_prompt(context)).with_stop(OBSERVATION_STOP);
        let output = self.llm.generate_request(&request).await?.content;

        match self.parser.decide(&output) {
            Ok(ReActOutput::Action {
                tool,
                input,
                thought,
            }) => Ok(AgentDecision::UseTool {
                tool,
                input,
                thought,
            }),
            Ok(ReActOutput::Finish { answer, thought }) => {
                Ok(AgentDecision::Finish { answer, thought })
            }
            Err(e) => {
                tracing::debug!(error = %e, "Model output did not follow the ReAct format");
                Ok(AgentDecision::Malformed {
                    output,
                    observation: format!("{}. {}", e, FORMAT_REMINDER),
                })
            }
        }
    }
}
