//! ReAct format parser
//!
//! Parses the ReAct (Reasoning + Acting) format the agent prompt asks for.
//!
//! Format:
//! ```text
//! Thought: I should look for recent papers
//! Action: ArxivSearch
//! Action Input: transformer attention mechanisms
//! ```
//! or, once the model is done:
//! ```text
//! Thought: I now know the final answer
//! Final Answer: Attention lets each token weigh every other token.
//! ```

use regex::Regex;
use std::sync::LazyLock;

use super::parser::{OutputParser, ParseError, ParseResult};

static STEP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(Thought|Action|Action\s*Input|Observation|Final\s*Answer)\s*:\s*(.*)$")
        .expect("Invalid ReAct step regex")
});

/// Type of ReAct step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReActStepType {
    /// Reasoning step
    Thought,
    /// Tool to call
    Action,
    /// Input for the tool
    ActionInput,
    /// Result of a tool call
    Observation,
    /// Final answer
    FinalAnswer,
}

impl ReActStepType {
    /// Check if this is a terminal step
    pub fn is_terminal(&self) -> bool {
        matches!(self, ReActStepType::FinalAnswer)
    }
}

/// A single step in a ReAct trace
#[derive(Debug, Clone, PartialEq)]
pub struct ReActStep {
    /// Step type
    pub step_type: ReActStepType,
    /// Step content
    pub content: String,
}

impl ReActStep {
    /// Create a new ReAct step
    pub fn new(step_type: ReActStepType, content: impl Into<String>) -> Self {
        Self {
            step_type,
            content: content.into(),
        }
    }
}

/// What one model turn asked for
#[derive(Debug, Clone, PartialEq)]
pub enum ReActOutput {
    /// Call `tool` with `input`
    Action {
        tool: String,
        input: String,
        thought: String,
    },
    /// Stop with `answer`
    Finish { answer: String, thought: String },
}

/// ReAct format parser
#[derive(Debug, Default)]
pub struct ReActParser;

impl ReActParser {
    /// Create a new ReAct parser
    pub fn new() -> Self {
        Self
    }

    /// Turn one model turn into an action or a final answer.
    ///
    /// Anything after the first `Observation:` is ignored since the model
    /// must not invent tool output. A turn carrying both a final answer and an
    /// action is rejected.
    pub fn decide(&self, raw: &str) -> ParseResult<ReActOutput> {
        let steps = self.parse(raw)?;
        let turn: Vec<&ReActStep> = steps
            .iter()
            .take_while(|s| s.step_type != ReActStepType::Observation)
            .collect();

        let thought = turn
            .iter()
            .filter(|s| s.step_type == ReActStepType::Thought)
            .map(|s| s.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        let final_answer = turn
            .iter()
            .find(|s| s.step_type.is_terminal())
            .map(|s| s.content.clone());

        let action = turn
            .iter()
            .rposition(|s| s.step_type == ReActStepType::Action)
            .map(|idx| {
                let tool = turn[idx].content.trim().to_string();
                let input = turn[idx + 1..]
                    .iter()
                    .find(|s| s.step_type == ReActStepType::ActionInput)
                    .map(|s| clean_action_input(&s.content));
                (tool, input)
            });

        match (final_answer, action) {
            (Some(_), Some(_)) => Err(ParseError::InvalidFormat(
                "Output contains both a final answer and an action".to_string(),
            )),
            (Some(answer), None) => {
                if answer.trim().is_empty() {
                    return Err(ParseError::MissingField("Final Answer".to_string()));
                }
                Ok(ReActOutput::Finish { answer, thought })
            }
            (None, Some((tool, input))) => {
                if tool.is_empty() {
                    return Err(ParseError::MissingField("Action".to_string()));
                }
                let input = input.ok_or_else(|| ParseError::MissingField("Action Input".to_string()))?;
                Ok(ReActOutput::Action {
                    tool,
                    input,
                    thought,
                })
            }
            (None, None) => Err(ParseError::InvalidFormat(
                "Missing 'Action:' after 'Thought:' and no 'Final Answer:' found".to_string(),
            )),
        }
    }
}

/// Strip whitespace and one layer of surrounding quotes
fn clean_action_input(raw: &str) -> String {
    let trimmed = raw.trim();
    let unquoted = trimmed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(trimmed);
    unquoted.trim().to_string()
}

impl OutputParser for ReActParser {
    type Output = Vec<ReActStep>;

    fn parse(&self, raw: &str) -> ParseResult<Self::Output> {
        if raw.trim().is_empty() {
            return Err(ParseError::EmptyInput);
        }

        let mut steps = Vec::new();
        let mut current_type: Option<ReActStepType> = None;
        let mut current_content = String::new();

        for line in raw.lines() {
            if let Some(caps) = STEP_RE.captures(line) {
                // Save previous step
                if let Some(step_type) = current_type.take() {
                    steps.push(ReActStep::new(step_type, current_content.trim()));
                    current_content.clear();
                }

                let label = caps
                    .get(1)
                    .map(|m| m.as_str().to_lowercase())
                    .unwrap_or_default();
                let content = caps.get(2).map(|m| m.as_str()).unwrap_or_default();

                let step_type = match label.as_str() {
                    "thought" => ReActStepType::Thought,
                    "action" => ReActStepType::Action,
                    s if s.contains("input") => ReActStepType::ActionInput,
                    "observation" => ReActStepType::Observation,
                    s if s.contains("answer") => ReActStepType::FinalAnswer,
                    _ => continue,
                };

                current_type = Some(step_type);
                current_content = content.to_string();
            } else if current_type.is_some() {
                // Continuation of previous step
                current_content.push('\n');
                current_content.push_str(line);
            } else if !line.trim().is_empty() {
                // Leading text before any label is an implicit thought
                current_type = Some(ReActStepType::Thought);
                current_content = line.to_string();
            }
        }

        if let Some(step_type) = current_type {
            steps.push(ReActStep::new(step_type, current_content.trim()));
        }

        if !steps.iter().any(|s| s.step_type != ReActStepType::Thought) {
            return Err(ParseError::InvalidFormat(
                "No ReAct action or final answer found".to_string(),
            ));
        }

        Ok(steps)
    }

    fn can_parse(&self, raw: &str) -> bool {
        let lower = raw.to_lowercase();
        lower.contains("action:") || lower.contains("final answer:")
    }

    fn name(&self) -> &'static str {
        "react"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_steps() {
        let parser = ReActParser::new();
        let input = r#"Thought: I should look for papers
Action: ArxivSearch
Action Input: transformer attention"#;

        let steps = parser.parse(input).unwrap();
        assert_eq!(steps.len(), 3);
        assert_eq!(steps[0].step_type, ReActStepType::Thought);
        assert_eq!(steps[1].content, "ArxivSearch");
        assert_eq!(steps[2].step_type, ReActStepType::ActionInput);
    }

    #[test]
    fn test_decide_action() {
        let parser = ReActParser::new();
        let input = "Thought: I should look for papers\nAction: ArxivSearch\nAction Input: \"transformer attention\"";

        let decision = parser.decide(input).unwrap();
        assert_eq!(
            decision,
            ReActOutput::Action {
                tool: "ArxivSearch".to_string(),
                input: "transformer attention".to_string(),
                thought: "I should look for papers".to_string(),
            }
        );
    }

    #[test]
    fn test_decide_final_answer_multiline() {
        let parser = ReActParser::new();
        let input = "Thought: I now know the final answer\nFinal Answer: Attention weighs tokens.\nIt is parallelisable.";

        match parser.decide(input).unwrap() {
            ReActOutput::Finish { answer, thought } => {
                assert_eq!(answer, "Attention weighs tokens.\nIt is parallelisable.");
                assert_eq!(thought, "I now know the final answer");
            }
            other => panic!("expected finish, got {:?}", other),
        }
    }

    #[test]
    fn test_ignores_invented_observation() {
        let parser = ReActParser::new();
        let input = "Thought: search\nAction: WebSearch\nAction Input: rope embeddings\nObservation: made up\nFinal Answer: made up";

        let decision = parser.decide(input).unwrap();
        assert!(matches!(decision, ReActOutput::Action { ref tool, .. } if tool == "WebSearch"));
    }

    #[test]
    fn test_rejects_action_and_answer() {
        let parser = ReActParser::new();
        let input = "Action: WebSearch\nAction Input: x\nFinal Answer: y";
        assert!(matches!(parser.decide(input), Err(ParseError::InvalidFormat(_))));
    }

    #[test]
    fn test_missing_action_input() {
        let parser = ReActParser::new();
        let input = "Thought: hmm\nAction: WebSearch";
        assert_eq!(
            parser.decide(input),
            Err(ParseError::MissingField("Action Input".to_string()))
        );
    }

    #[test]
    fn test_plain_text_is_invalid() {
        let parser = ReActParser::new();
        assert!(matches!(
            parser.decide("Transformers use attention."),
            Err(ParseError::InvalidFormat(_))
        ));
        assert_eq!(parser.decide("   "), Err(ParseError::EmptyInput));
    }

    #[test]
    fn test_case_insensitive() {
        let parser = ReActParser::new();
        let input = "THOUGHT: caps\nACTION: WebSearch\nACTION INPUT: data";

        let steps = parser.parse(input).unwrap();
        assert_eq!(steps.len(), 3);
    }

    #[test]
    fn test_can_parse() {
        let parser = ReActParser::new();
        assert!(parser.can_parse("Action: do"));
        assert!(parser.can_parse("Final Answer: done"));
        assert!(!parser.can_parse("Just regular text"));
        assert_eq!(parser.name(), "react");
    }
}
