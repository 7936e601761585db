//! Bounded conversation history

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::llm::Message;

/// A completed exchange (user question + assistant answer)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    /// User message
    pub user_message: String,
    /// Assistant response
    pub assistant_message: String,
    /// When the exchange completed
    pub completed_at: DateTime<Utc>,
}

impl Turn {
    /// Create a completed turn
    pub fn new(user_message: impl Into<String>, assistant_message: impl Into<String>) -> Self {
        Self {
            user_message: user_message.into(),
            assistant_message: assistant_message.into(),
            completed_at: Utc::now(),
        }
    }

    /// Convert to LLM messages
    pub fn to_messages(&self) -> Vec<Message> {
        vec![
            Message::user(self.user_message.clone()),
            Message::assistant(self.assistant_message.clone()),
        ]
    }
}

/// Ordered history of prior turns, oldest evicted first
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationMemory {
    turns: VecDeque<Turn>,
    max_turns: usize,
}

impl ConversationMemory {
    /// Create an empty memory holding at most `max_turns` turns
    pub fn new(max_turns: usize) -> Self {
        Self {
            turns: VecDeque::new(),
            max_turns: max_turns.max(1),
        }
    }

    /// Append a completed exchange
    pub fn record(&mut self, user_message: impl Into<String>, assistant_message: impl Into<String>) {
        self.turns
            .push_back(Turn::new(user_message, assistant_message));
        while self.turns.len() > self.max_turns {
            self.turns.pop_front();
        }
    }

    /// Turns, oldest first
    pub fn turns(&self) -> impl Iterator<Item = &Turn> {
        self.turns.iter()
    }

    /// Get turn count
    pub fn turn_count(&self) -> usize {
        self.turns.len()
    }

    pub fn max_turns(&self) -> usize {
        self.max_turns
    }

    /// Convert to LLM messages
    pub fn to_messages(&self) -> Vec<Message> {
        self.turns.iter().flat_map(|t| t.to_messages()).collect()
    }

    /// Transcript for prompt templates
    pub fn render(&self) -> String {
        self.turns
            .iter()
            .map(|t| format!("Human: {}\nAI: {}", t.user_message, t.assistant_message))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Clear all history
    pub fn clear(&mut self) {
        self.turns.clear();
    }

    /// Check if history is empty
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

impl Default for ConversationMemory {
    fn default() -> Self {
        Self::new(20)
    }
}
