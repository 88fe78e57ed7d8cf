//! Per-browser conversation state.
//!
//! A [`Session`] owns the ordered list of turns for one visitor. Sessions
//! live only in memory: a restart or an explicit clear discards them.
//! [`SessionStore`] hands out one lock per session so that interactions
//! within a session run one at a time.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::models::Turn;

#[derive(Debug, Default, Clone)]
pub struct Session {
    turns: Vec<Turn>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn turn(&self, index: usize) -> Option<&Turn> {
        self.turns.get(index)
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

pub type SessionHandle = Arc<tokio::sync::Mutex<Session>>;

struct Entry {
    handle: SessionHandle,
    last_seen: Instant,
}

/// Live sessions keyed by cookie id.
///
/// Only [`SessionStore::get_or_create`] adds entries. Sessions idle for
/// longer than `idle_timeout` are dropped, and when `max_sessions` is
/// reached the least recently used one makes room for the new one.
pub struct SessionStore {
    sessions: Mutex<HashMap<String, Entry>>,
    idle_timeout: Duration,
    max_sessions: usize,
}

impl SessionStore {
    pub fn new(idle_timeout: Duration, max_sessions: usize) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            idle_timeout,
            max_sessions: max_sessions.max(1),
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Return the live session for `id` without creating one.
    pub fn get(&self, id: &str) -> Option<SessionHandle> {
        let now = Instant::now();
        let mut sessions = self.entries();

        let expired = match sessions.get_mut(id) {
            Some(entry) if now.duration_since(entry.last_seen) <= self.idle_timeout => {
                entry.last_seen = now;
                return Some(entry.handle.clone());
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            sessions.remove(id);
        }
        None
    }

    /// Return the session for `id`, creating it when `id` is absent,
    /// unknown or expired. The returned id is the one the caller must use
    /// from now on.
    pub fn get_or_create(&self, id: Option<&str>) -> (String, SessionHandle) {
        if let Some(id) = id {
            if let Some(handle) = self.get(id) {
                return (id.to_string(), handle);
            }
        }

        let now = Instant::now();
        let mut sessions = self.entries();
        self.evict(&mut sessions, now);

        let id = Uuid::new_v4().to_string();
        let handle: SessionHandle = Arc::new(tokio::sync::Mutex::new(Session::new()));
        sessions.insert(
            id.clone(),
            Entry {
                handle: handle.clone(),
                last_seen: now,
            },
        );
        (id, handle)
    }

    fn evict(&self, sessions: &mut HashMap<String, Entry>, now: Instant) {
        let before = sessions.len();
        sessions.retain(|_, entry| now.duration_since(entry.last_seen) <= self.idle_timeout);

        while sessions.len() >= self.max_sessions {
            let oldest = sessions
                .iter()
                .min_by_key(|(_, entry)| entry.last_seen)
                .map(|(id, _)| id.clone());
            match oldest {
                Some(id) => sessions.remove(&id),
                None => break,
            };
        }

        let evicted = before - sessions.len();
        if evicted > 0 {
            tracing::debug!(evicted, remaining = sessions.len(), "evicted sessions");
        }
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
