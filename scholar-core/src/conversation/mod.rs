//! Conversation memory for the agent
//!
//! Each session keeps a bounded history of completed (question, answer)
//! exchanges that the agent sees as context. Sessions live in a
//! [`SessionStore`] owned by the assistant and are passed into each run.
//!
//! # Example
//!
//! ```rust,ignore
//! use scholar_core::conversation::SessionStore;
//!
//! let store = SessionStore::new(&config.conversation);
//! let memory = store.session("user-42").await;
//! memory.lock().await.record("What is RoPE?", "Rotary position embeddings ...");
//! ```

mod memory;
mod store;

pub use memory::{ConversationMemory, Turn};
pub use store::SessionStore;
