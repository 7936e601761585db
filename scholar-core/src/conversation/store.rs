//! Per-session memory store

use moka::future::Cache;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::config::ConversationConfig;

use super::memory::ConversationMemory;

/// Session id → conversation memory, bounded by count and idle time.
///
/// A session's memory is behind its own mutex: the agent holds it for a whole
/// run, so requests on one session serialize while other sessions proceed.
pub struct SessionStore {
    sessions: Cache<String, Arc<Mutex<ConversationMemory>>>,
    max_turns: usize,
}

impl SessionStore {
    pub fn new(config: &ConversationConfig) -> Self {
        Self {
            sessions: Cache::builder()
                .time_to_idle(config.session_ttl)
                .max_capacity(config.max_sessions.max(1) as u64)
                .build(),
            max_turns: config.max_turns,
        }
    }

    /// Memory not tied to any session, dropped after use
    pub fn ephemeral(&self) -> Arc<Mutex<ConversationMemory>> {
        Arc::new(Mutex::new(ConversationMemory::new(self.max_turns)))
    }

    /// Memory for `session_id`, created on first use
    pub async fn session(&self, session_id: &str) -> Arc<Mutex<ConversationMemory>> {
        let max_turns = self.max_turns;
        let entry = self
            .sessions
            .entry(session_id.to_string())
            .or_insert_with(async move { Arc::new(Mutex::new(ConversationMemory::new(max_turns))) })
            .await;

        if entry.is_fresh() {
            tracing::debug!(session_id = %session_id, "Started session");
        }
        entry.into_value()
    }

    /// Memory for an optional session id
    pub async fn resolve(&self, session_id: Option<&str>) -> Arc<Mutex<ConversationMemory>> {
        match session_id {
            Some(id) => self.session(id).await,
            None => self.ephemeral(),
        }
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.sessions.contains_key(session_id)
    }

    pub async fn remove(&self, session_id: &str) -> bool {
        self.sessions.remove(session_id).await.is_some()
    }

    /// Live sessions after pending evictions are applied
    pub async fn len(&self) -> usize {
        self.sessions.run_pending_tasks().await;
        self.sessions.entry_count() as usize
    }
}
