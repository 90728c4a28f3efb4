// Session store
//
// Sharded map of sessions. Each session guards its state with a plain mutex
// that is never held across an await; a separate async "turn gate" lets the
// dispatcher serialize whole chat turns per session without blocking
// context updates.

use dashmap::DashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

use super::history::{ConversationHistory, Turn};
use crate::context::ConversationContext;
use crate::error::{RelayError, Result};

/// Read-only copy of a session's state
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub context: ConversationContext,
    pub history: Vec<Turn>,
}

struct SessionState {
    context: ConversationContext,
    history: ConversationHistory,
    last_active: Instant,
}

impl SessionState {
    fn touch(&mut self) {
        self.last_active = Instant::now();
    }
}

struct SessionEntry {
    state: Mutex<SessionState>,
    turn_gate: tokio::sync::Mutex<()>,
}

impl SessionEntry {
    fn new(context: ConversationContext, history_limit: usize) -> Self {
        Self {
            state: Mutex::new(SessionState {
                context,
                history: ConversationHistory::new(history_limit),
                last_active: Instant::now(),
            }),
            turn_gate: tokio::sync::Mutex::new(()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        // state is plain data; a panic mid-update can't leave it half-written
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// One live session, pinned for the length of a chat turn.
///
/// Reads and writes through a handle reach the session it was taken from,
/// never a later session that reuses the same id.
#[derive(Clone)]
pub struct SessionHandle {
    id: String,
    entry: Arc<SessionEntry>,
}

impl SessionHandle {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Wait for any other chat turn on this session to finish
    pub async fn begin_turn(&self) -> tokio::sync::MutexGuard<'_, ()> {
        self.entry.turn_gate.lock().await
    }

    /// Snapshot of context and history
    pub fn snapshot(&self) -> SessionSnapshot {
        let mut state = self.entry.lock();
        state.touch();
        SessionSnapshot {
            context: state.context.clone(),
            history: state.history.to_vec(),
        }
    }
}

/// Per-session context and bounded history
pub struct SessionStore {
    sessions: DashMap<String, Arc<SessionEntry>>,
    history_limit: usize,
    max_sessions: usize,
}

impl SessionStore {
    /// `history_limit` is in user+model pairs; `max_sessions` caps live sessions
    pub fn new(history_limit: usize, max_sessions: usize) -> Self {
        Self {
            sessions: DashMap::new(),
            history_limit,
            max_sessions: max_sessions.max(1),
        }
    }

    fn entry(&self, session_id: &str) -> Option<Arc<SessionEntry>> {
        self.sessions.get(session_id).map(|e| Arc::clone(e.value()))
    }

    /// Replace the session's context, creating the session if needed.
    ///
    /// History is left untouched. Returns true when a new session was created.
    pub fn set_context(&self, session_id: &str, context: ConversationContext) -> bool {
        if let Some(entry) = self.entry(session_id) {
            let mut state = entry.lock();
            state.context = context;
            state.touch();
            return false;
        }

        let mut created = false;
        let entry = self
            .sessions
            .entry(session_id.to_string())
            .or_insert_with(|| {
                created = true;
                Arc::new(SessionEntry::new(context.clone(), self.history_limit))
            })
            .clone();

        if created {
            tracing::debug!(session_id, sessions = self.sessions.len(), "session created");
            self.enforce_cap(session_id);
        } else {
            // lost a creation race; apply our context on top
            let mut state = entry.lock();
            state.context = context;
            state.touch();
        }
        created
    }

    /// Append one turn, trimming the oldest turns past the bound
    pub fn append_turn(&self, session_id: &str, turn: Turn) -> Result<()> {
        let entry = self.require(session_id)?;
        let mut state = entry.lock();
        state.history.push(turn);
        state.touch();
        Ok(())
    }

    /// Append a user turn and its reply under one lock so the pair stays adjacent
    pub fn append_exchange(&self, session_id: &str, user: Turn, model: Turn) -> Result<()> {
        let entry = self.require(session_id)?;
        let mut state = entry.lock();
        state.history.push(user);
        state.history.push(model);
        state.touch();
        Ok(())
    }

    /// Snapshot of context and history
    pub fn get_state(&self, session_id: &str) -> Result<SessionSnapshot> {
        self.session(session_id)
            .map(|handle| handle.snapshot())
            .ok_or_else(|| RelayError::SessionNotFound(session_id.to_string()))
    }

    /// Pin the session currently stored under `session_id`, if any
    pub fn session(&self, session_id: &str) -> Option<SessionHandle> {
        self.entry(session_id).map(|entry| SessionHandle {
            id: session_id.to_string(),
            entry,
        })
    }

    /// Append an exchange to the session `handle` was taken from.
    ///
    /// Returns false and drops the turns when that session has been evicted
    /// since, even if a new one now lives under the same id.
    pub fn record_exchange(&self, handle: &SessionHandle, user: Turn, model: Turn) -> bool {
        let current = self
            .sessions
            .get(&handle.id)
            .is_some_and(|e| Arc::ptr_eq(e.value(), &handle.entry));
        if !current {
            return false;
        }

        let mut state = handle.entry.lock();
        state.history.push(user);
        state.history.push(model);
        state.touch();
        true
    }

    /// Remove a session. Returns true if it existed.
    pub fn evict(&self, session_id: &str) -> bool {
        let removed = self.sessions.remove(session_id).is_some();
        if removed {
            tracing::debug!(session_id, "session evicted");
        }
        removed
    }

    /// Remove sessions idle for at least `max_idle`. Returns how many went.
    pub fn evict_idle(&self, max_idle: Duration) -> usize {
        let before = self.sessions.len();
        self.sessions
            .retain(|_, entry| entry.lock().last_active.elapsed() < max_idle);
        let evicted = before.saturating_sub(self.sessions.len());
        if evicted > 0 {
            tracing::info!(evicted, remaining = self.sessions.len(), "evicted idle sessions");
        }
        evicted
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.sessions.contains_key(session_id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn require(&self, session_id: &str) -> Result<Arc<SessionEntry>> {
        self.entry(session_id)
            .ok_or_else(|| RelayError::SessionNotFound(session_id.to_string()))
    }

    /// Evict least recently active sessions, sparing `keep`, until back under
    /// the cap. Runs after every insert, so racing creators can't overshoot;
    /// they may each evict one, leaving the store briefly below the cap.
    fn enforce_cap(&self, keep: &str) {
        while self.sessions.len() > self.max_sessions {
            let oldest = self
                .sessions
                .iter()
                .filter(|e| e.key() != keep)
                .map(|e| (e.key().clone(), e.value().lock().last_active))
                .min_by_key(|(_, last_active)| *last_active)
                .map(|(id, _)| id);

            let Some(id) = oldest else { break };
            tracing::info!(session_id = %id, max_sessions = self.max_sessions, "session cap reached, evicting least recently active");
            self.sessions.remove(&id);
        }
    }
}
