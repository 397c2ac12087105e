//! Per-session conversations for the web backend.
//!
//! Each session id maps to its own [`Conversation`] behind an async mutex.
//! A handler holds that lock across the whole daemon round trip, so two
//! requests on one session are serialized while different sessions proceed
//! independently.
//!
//! The registry is bounded. Sessions that never completed an exchange are
//! dropped by [`SessionStore::discard_if_unused`], and once
//! [`MAX_SESSIONS`] is reached the least recently used idle session is
//! evicted to make room.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use tracing::debug;
use uuid::Uuid;

use crate::core::conversation::Conversation;

pub type SharedConversation = Arc<tokio::sync::Mutex<Conversation>>;

pub const MAX_SESSIONS: usize = 1024;

struct SessionEntry {
    conversation: SharedConversation,
    last_used: Instant,
}

impl SessionEntry {
    /// Only the registry holds the handle.
    fn is_idle(&self) -> bool {
        Arc::strong_count(&self.conversation) == 1
    }
}

pub struct SessionStore {
    sessions: Mutex<HashMap<String, SessionEntry>>,
    capacity: usize,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_capacity(MAX_SESSIONS)
    }
}

pub fn new_session_id() -> String {
    Uuid::new_v4().to_string()
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, SessionEntry>> {
        self.sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Returns the conversation for `session_id`, creating an empty one on
    /// first use.
    pub fn get_or_create(&self, session_id: &str) -> SharedConversation {
        let mut sessions = self.lock();
        if let Some(entry) = sessions.get_mut(session_id) {
            entry.last_used = Instant::now();
            return Arc::clone(&entry.conversation);
        }

        if sessions.len() >= self.capacity {
            evict_least_recent(&mut sessions);
        }
        debug!(session_id, "Creating session");
        let conversation = Arc::new(tokio::sync::Mutex::new(Conversation::new()));
        sessions.insert(
            session_id.to_string(),
            SessionEntry {
                conversation: Arc::clone(&conversation),
                last_used: Instant::now(),
            },
        );
        conversation
    }

    /// Forgets `session_id` when it holds no turns and `handle` is the only
    /// handle outside the registry. Callers must release their lock on the
    /// conversation first.
    pub fn discard_if_unused(&self, session_id: &str, handle: SharedConversation) {
        let mut sessions = self.lock();
        let unused = sessions.get(session_id).is_some_and(|entry| {
            Arc::ptr_eq(&entry.conversation, &handle)
                && Arc::strong_count(&handle) == 2
                && handle
                    .try_lock()
                    .is_ok_and(|conversation| conversation.is_empty())
        });
        if unused {
            debug!(session_id, "Discarding unused session");
            sessions.remove(session_id);
        }
    }

    /// Drops every session, e.g. after the active model changes.
    pub fn clear(&self) {
        let mut sessions = self.lock();
        debug!(count = sessions.len(), "Clearing sessions");
        sessions.clear();
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.lock().contains_key(session_id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Sessions with a request in flight are never evicted, so the map may
/// briefly exceed its capacity under load.
fn evict_least_recent(sessions: &mut HashMap<String, SessionEntry>) {
    let oldest = sessions
        .iter()
        .filter(|(_, entry)| entry.is_idle())
        .min_by_key(|(_, entry)| entry.last_used)
        .map(|(id, _)| id.clone());
    if let Some(id) = oldest {
        debug!(session_id = %id, "Evicting least recently used session");
        sessions.remove(&id);
    }
}
