//! In-process registry of live sessions.

use examiner_session::SessionController;
use examiner_types::SessionId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// One live session. The mutex serialises the driver's calls.
pub type SharedSession = Arc<Mutex<SessionController>>;

/// Maps session ids to their controllers.
///
/// Lock order: a session's own mutex may be held while the registry is
/// locked, never the other way round.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<Mutex<HashMap<SessionId, SharedSession>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<SessionId, SharedSession>> {
        match self.sessions.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::error!("session registry mutex was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    pub fn insert(&self, controller: SessionController) -> SharedSession {
        let session_id = controller.session_id();
        let shared = Arc::new(Mutex::new(controller));
        self.sessions().insert(session_id, Arc::clone(&shared));
        shared
    }

    pub fn get(&self, session_id: SessionId) -> Option<SharedSession> {
        self.sessions().get(&session_id).cloned()
    }

    pub fn remove(&self, session_id: SessionId) -> Option<SharedSession> {
        self.sessions().remove(&session_id)
    }

    /// Clones out every entry so callers can inspect sessions without
    /// holding the registry lock.
    pub fn snapshot(&self) -> Vec<(SessionId, SharedSession)> {
        self.sessions()
            .iter()
            .map(|(id, session)| (*id, Arc::clone(session)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.sessions().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Locks one session, recovering from a poisoned mutex.
pub fn lock_session(session: &SharedSession) -> MutexGuard<'_, SessionController> {
    session.lock().unwrap_or_else(|e| e.into_inner())
}
