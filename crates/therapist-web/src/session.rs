//! Browser sessions: one transcript per visitor, held in memory only.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use therapist_core::Transcript;
use tokio::sync::OwnedMutexGuard;
use uuid::Uuid;

/// One browser session. Dropped with its transcript when the store forgets it.
#[derive(Debug)]
pub struct Session {
    pub id: Uuid,
    pub transcript: Transcript,
    pub last_active: Instant,
}

impl Session {
    fn new(id: Uuid) -> Self {
        Self {
            id,
            transcript: Transcript::new(),
            last_active: Instant::now(),
        }
    }

    pub fn touch(&mut self) {
        self.last_active = Instant::now();
    }
}

/// Shared handle to a session. Holding the lock for a whole turn keeps the
/// turns of one session strictly one after another.
pub type SessionHandle = Arc<tokio::sync::Mutex<Session>>;

#[derive(Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<Uuid, SessionHandle>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self) -> Uuid {
        let id = Uuid::new_v4();
        let session = Arc::new(tokio::sync::Mutex::new(Session::new(id)));
        self.sessions.lock().unwrap().insert(id, session);
        tracing::info!(session = %id, "session created");
        id
    }

    pub fn get(&self, id: &Uuid) -> Option<SessionHandle> {
        self.sessions.lock().unwrap().get(id).cloned()
    }

    /// Wait for the session's lock. Returns `None` if the session was ended or
    /// swept while this call waited, so a turn never runs on a forgotten session.
    pub async fn lock(&self, id: &Uuid) -> Option<OwnedMutexGuard<Session>> {
        let handle = self.get(id)?;
        let guard = Arc::clone(&handle).lock_owned().await;
        let current = self.get(id)?;
        Arc::ptr_eq(&handle, &current).then_some(guard)
    }

    pub fn remove(&self, id: &Uuid) -> Option<SessionHandle> {
        self.sessions.lock().unwrap().remove(id)
    }

    /// Forget sessions idle for longer than `max_idle`. Sessions in the middle
    /// of a turn are kept.
    pub fn cleanup_idle(&self, max_idle: Duration) -> usize {
        let mut sessions = self.sessions.lock().unwrap();
        let before = sessions.len();
        sessions.retain(|_, session| match session.try_lock() {
            Ok(session) => session.last_active.elapsed() <= max_idle,
            Err(_) => true,
        });
        let removed = before - sessions.len();
        if removed > 0 {
            tracing::info!(removed, remaining = sessions.len(), "expired idle sessions");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.lock().unwrap().is_empty()
    }
}
