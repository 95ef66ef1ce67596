//! Session-keyed conversation state
//!
//! Each A2A context id maps to one session holding the chat history and the
//! verdict of its latest invocation. The store is shared by `Arc` and passed
//! explicitly to whatever needs it.
//!
//! Invocations on one session are serialized through [`SessionStore::lock`],
//! so every turn is appended to the history its predecessor left behind.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use llm_core::{ChatMessage, Role};
use parking_lot::{Mutex, RwLock};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{debug, info};

use crate::reconcile::StructuredVerdict;

/// State of one conversation
#[derive(Debug, Clone)]
pub struct SessionState {
    /// Conversation messages, system prompt first
    pub messages: Vec<ChatMessage>,
    /// Verdict of the latest completed invocation
    pub verdict: Option<StructuredVerdict>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SessionState {
    fn new() -> Self {
        let now = Utc::now();
        Self {
            messages: Vec::new(),
            verdict: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Get message count (excluding system messages)
    pub fn message_count(&self) -> usize {
        self.messages
            .iter()
            .filter(|m| m.role != Role::System)
            .count()
    }
}

/// Held for the whole of one invocation on a session
pub type SessionGuard = OwnedMutexGuard<()>;

/// In-memory session store
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, SessionState>>,
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty session. Returns false if it already exists.
    pub fn create(&self, session_id: &str) -> bool {
        let mut sessions = self.sessions.write();
        if sessions.contains_key(session_id) {
            return false;
        }
        sessions.insert(session_id.to_string(), SessionState::new());
        debug!(session_id, "Created session");
        true
    }

    /// Snapshot of a session
    pub fn get(&self, session_id: &str) -> Option<SessionState> {
        self.sessions.read().get(session_id).cloned()
    }

    /// Mutate a session in place. Returns false if it does not exist.
    pub fn update<F>(&self, session_id: &str, f: F) -> bool
    where
        F: FnOnce(&mut SessionState),
    {
        let mut sessions = self.sessions.write();
        match sessions.get_mut(session_id) {
            Some(state) => {
                f(state);
                state.updated_at = Utc::now();
                true
            }
            None => false,
        }
    }

    /// Start an invocation: create the session if needed, drop the previous
    /// verdict, and hand back the history to continue from.
    pub fn begin_invocation(&self, session_id: &str) -> Vec<ChatMessage> {
        let mut sessions = self.sessions.write();
        let state = sessions
            .entry(session_id.to_string())
            .or_insert_with(SessionState::new);
        state.verdict = None;
        state.updated_at = Utc::now();
        state.messages.clone()
    }

    /// Checkpoint the outcome of an invocation
    pub fn finish_invocation(
        &self,
        session_id: &str,
        messages: Vec<ChatMessage>,
        verdict: Option<StructuredVerdict>,
    ) {
        let mut sessions = self.sessions.write();
        let state = sessions
            .entry(session_id.to_string())
            .or_insert_with(SessionState::new);
        state.messages = messages;
        state.verdict = verdict;
        state.updated_at = Utc::now();
    }

    /// Verdict of the session's latest invocation
    pub fn verdict(&self, session_id: &str) -> Option<StructuredVerdict> {
        self.sessions
            .read()
            .get(session_id)
            .and_then(|s| s.verdict.clone())
    }

    /// Wait until no other invocation runs on the session, then hold it
    pub async fn lock(&self, session_id: &str) -> SessionGuard {
        let lock = Arc::clone(
            self.locks
                .lock()
                .entry(session_id.to_string())
                .or_default(),
        );
        lock.lock_owned().await
    }

    fn is_busy(&self, session_id: &str) -> bool {
        self.locks
            .lock()
            .get(session_id)
            .is_some_and(|l| l.try_lock().is_err())
    }

    /// Drop a session
    pub fn evict(&self, session_id: &str) -> Option<SessionState> {
        let evicted = self.sessions.write().remove(session_id);
        self.locks.lock().remove(session_id);
        if evicted.is_some() {
            debug!(session_id, "Evicted session");
        }
        evicted
    }

    /// Drop sessions untouched for longer than `max_age`. Sessions with an
    /// invocation in flight are kept. Returns the evicted ids.
    pub fn evict_idle(&self, max_age: Duration) -> Vec<String> {
        let max_age = chrono::Duration::from_std(max_age)
            .unwrap_or_else(|_| chrono::Duration::days(365 * 100));
        let cutoff = Utc::now() - max_age;

        let idle: Vec<String> = self
            .sessions
            .read()
            .iter()
            .filter(|(_, state)| state.updated_at < cutoff)
            .map(|(id, _)| id.clone())
            .collect();

        let evicted: Vec<String> = idle
            .into_iter()
            .filter(|id| !self.is_busy(id))
            .filter(|id| self.evict(id).is_some())
            .collect();

        if !evicted.is_empty() {
            info!(count = evicted.len(), remaining = self.len(), "Evicted idle sessions");
        }
        evicted
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}
