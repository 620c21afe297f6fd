//! Conversation store
//!
//! Maps session identifiers to bounded, ordered turn histories.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use talkback_core::Turn;

/// Bounded turn history for one session.
///
/// Capacity is fixed when the history is created; appending past it evicts
/// the oldest turn. The mutex serializes same-session operations so turns are
/// recorded in arrival order.
struct SessionHistory {
    turns: Mutex<VecDeque<Turn>>,
    capacity: usize,
}

impl SessionHistory {
    fn new(capacity: usize) -> Self {
        Self {
            turns: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    fn append(&self, turn: Turn) {
        let mut turns = self.turns.lock();
        if turns.len() == self.capacity {
            turns.pop_front();
        }
        turns.push_back(turn);
    }

    fn recent(&self, max_turns: usize) -> Vec<Turn> {
        let turns = self.turns.lock();
        let skip = turns.len().saturating_sub(max_turns);
        turns.iter().skip(skip).cloned().collect()
    }

    fn len(&self) -> usize {
        self.turns.lock().len()
    }
}

/// Process-wide table of session histories.
///
/// Operations on different sessions only contend on the brief map lock;
/// operations on the same session serialize on that session's own lock.
pub struct ConversationStore {
    sessions: RwLock<HashMap<String, Arc<SessionHistory>>>,
}

impl ConversationStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Read the most recent `min(max_turns, stored)` turns for a session,
    /// oldest-first. Unseen sessions yield an empty history. Never fails.
    pub fn read(&self, session_id: &str, max_turns: usize) -> Vec<Turn> {
        let history = self.sessions.read().get(session_id).cloned();
        match history {
            Some(history) => history.recent(max_turns),
            None => Vec::new(),
        }
    }

    /// Append one completed turn to a session, creating the history lazily
    /// with capacity `max_turns` and evicting the oldest turn past the bound.
    pub fn append(
        &self,
        session_id: &str,
        user_text: impl Into<String>,
        assistant_text: impl Into<String>,
        max_turns: usize,
    ) {
        let history = self.history_for(session_id, max_turns);
        history.append(Turn::new(user_text, assistant_text));
    }

    /// Number of turns currently stored for a session.
    pub fn turn_count(&self, session_id: &str) -> usize {
        self.sessions
            .read()
            .get(session_id)
            .map(|h| h.len())
            .unwrap_or(0)
    }

    /// Number of sessions seen so far.
    pub fn session_count(&self) -> usize {
        self.sessions.read().len()
    }

    fn history_for(&self, session_id: &str, max_turns: usize) -> Arc<SessionHistory> {
        if let Some(history) = self.sessions.read().get(session_id) {
            return history.clone();
        }

        let mut sessions = self.sessions.write();
        // A racing request may have created the session between the locks.
        sessions
            .entry(session_id.to_string())
            .or_insert_with(|| {
                tracing::debug!(session_id, capacity = max_turns, "created session history");
                Arc::new(SessionHistory::new(max_turns.max(1)))
            })
            .clone()
    }
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new()
    }
}
