use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use once_cell::sync::Lazy;
use serde::Serialize;
use tokio::sync::RwLock;

use crate::session::{Session, SessionSummary};

static GLOBAL: Lazy<SessionRegistry> = Lazy::new(SessionRegistry::new);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SessionId(u64);

impl SessionId {
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// Live confirmation sessions, keyed by id.
///
/// A session is inserted when its token has been issued and removed by its
/// driver once the outcome is terminal. Only the controller and the driver
/// mutate entries; everything else gets read-only access.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<SessionId, Arc<Session>>>>,
    next_id: Arc<AtomicU64>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide registry, used by controllers built with
    /// [`SessionController::new`](crate::controller::SessionController::new).
    pub fn global() -> Self {
        GLOBAL.clone()
    }

    pub(crate) fn allocate_id(&self) -> SessionId {
        SessionId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1)
    }

    /// True for every id this registry handed out, finished sessions included.
    pub fn was_allocated(&self, id: SessionId) -> bool {
        id.0 != 0 && id.0 <= self.next_id.load(Ordering::Relaxed)
    }

    pub(crate) async fn insert(&self, session: Arc<Session>) {
        self.sessions.write().await.insert(session.id(), session);
    }

    pub(crate) async fn remove(&self, id: SessionId) -> Option<Arc<Session>> {
        self.sessions.write().await.remove(&id)
    }

    pub async fn get(&self, id: SessionId) -> Option<Arc<Session>> {
        self.sessions.read().await.get(&id).cloned()
    }

    pub async fn contains(&self, id: SessionId) -> bool {
        self.sessions.read().await.contains_key(&id)
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    pub async fn summaries(&self) -> Vec<SessionSummary> {
        let sessions = self.sessions.read().await;
        let mut summaries: Vec<_> = sessions.values().map(|s| s.summary()).collect();
        summaries.sort_by_key(|s| s.session_id);
        summaries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique_and_increasing() {
        let registry = SessionRegistry::new();
        let first = registry.allocate_id();
        let second = registry.allocate_id();
        assert!(second > first);
        assert_eq!(first.to_string(), "session-1");
    }

    #[test]
    fn test_clones_share_state() {
        let registry = SessionRegistry::new();
        let clone = registry.clone();
        registry.allocate_id();
        assert_eq!(clone.allocate_id().as_u64(), 2);
    }

    #[test]
    fn test_was_allocated() {
        let registry = SessionRegistry::new();
        let id = registry.allocate_id();
        assert!(registry.was_allocated(id));
        assert!(!SessionRegistry::new().was_allocated(id));
    }
}
