//! Parsing of model output
//!
//! The agent's reasoning policy asks the model for ReAct-formatted text and
//! turns it into a decision with [`ReActParser::decide`].

mod parser;
mod react;

pub use parser::{OutputParser, ParseError, ParseResult};
pub use react::{ReActOutput, ReActParser, ReActStep, ReActStepType};
