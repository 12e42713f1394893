//! In-memory store of live tutoring sessions.
//!
//! Sessions idle for longer than the configured timeout are dropped, and the
//! least recently used session makes room when the store is full.

use mathtutor_core::session::{Session, SessionRegistry};
use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);
pub const DEFAULT_MAX_SESSIONS: usize = 10_000;

/// A session shared between requests; the lock serializes its turns.
pub type SharedSession = Arc<Mutex<Session>>;

struct Entry {
    session: SharedSession,
    last_used: Instant,
}

pub struct SessionStore {
    registry: Arc<dyn SessionRegistry>,
    sessions: Mutex<HashMap<Uuid, Entry>>,
    idle_timeout: Duration,
    max_sessions: usize,
}

impl SessionStore {
    pub fn new(registry: Arc<dyn SessionRegistry>) -> Self {
        Self::with_limits(registry, DEFAULT_IDLE_TIMEOUT, DEFAULT_MAX_SESSIONS)
    }

    pub fn with_limits(
        registry: Arc<dyn SessionRegistry>,
        idle_timeout: Duration,
        max_sessions: usize,
    ) -> Self {
        Self {
            registry,
            sessions: Mutex::new(HashMap::new()),
            idle_timeout,
            max_sessions: max_sessions.max(1),
        }
    }

    /// Starts a fresh session and registers it under a new id.
    pub async fn create(&self) -> anyhow::Result<(Uuid, SharedSession)> {
        let session = Session::start(self.registry.as_ref()).await?;
        let id = Uuid::new_v4();
        let shared = Arc::new(Mutex::new(session));

        let mut sessions = self.sessions.lock().await;
        let now = Instant::now();
        self.evict_idle(&mut sessions, now);
        while sessions.len() >= self.max_sessions {
            let Some(oldest) = sessions
                .iter()
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(id, _)| *id)
            else {
                break;
            };
            sessions.remove(&oldest);
            info!(session_id = %oldest, "Session evicted to make room");
        }
        sessions.insert(
            id,
            Entry {
                session: shared.clone(),
                last_used: now,
            },
        );
        info!(session_id = %id, "Session created");
        Ok((id, shared))
    }

    /// Returns a live session and marks it as used.
    pub async fn get(&self, id: Uuid) -> Option<SharedSession> {
        let mut sessions = self.sessions.lock().await;
        let now = Instant::now();
        self.evict_idle(&mut sessions, now);
        sessions.get_mut(&id).map(|entry| {
            entry.last_used = now;
            entry.session.clone()
        })
    }

    /// Looks up the session named by a client-supplied id, creating a new one
    /// when the id is absent, malformed, unknown or expired.
    pub async fn get_or_create(&self, raw_id: Option<&str>) -> anyhow::Result<(Uuid, SharedSession)> {
        if let Some(id) = raw_id.and_then(|raw| Uuid::parse_str(raw.trim()).ok()) {
            if let Some(session) = self.get(id).await {
                return Ok((id, session));
            }
            debug!(session_id = %id, "Unknown session id; starting a new session");
        }
        self.create().await
    }

    pub async fn remove(&self, id: Uuid) -> bool {
        let removed = self.sessions.lock().await.remove(&id).is_some();
        if removed {
            info!(session_id = %id, "Session removed");
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    fn evict_idle(&self, sessions: &mut HashMap<Uuid, Entry>, now: Instant) {
        let before = sessions.len();
        sessions.retain(|_, entry| now.duration_since(entry.last_used) < self.idle_timeout);
        let evicted = before - sessions.len();
        if evicted > 0 {
            debug!(evicted, "Idle sessions evicted");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mathtutor_core::session::LocalSessionRegistry;

    fn store() -> SessionStore {
        SessionStore::new(Arc::new(LocalSessionRegistry))
    }

    #[tokio::test]
    async fn test_missing_or_malformed_id_creates_session() {
        let store = store();

        let (first, _) = store.get_or_create(None).await.unwrap();
        let (second, _) = store.get_or_create(Some("not-a-uuid")).await.unwrap();

        assert_ne!(first, second);
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_known_id_returns_same_session() {
        let store = store();
        let (id, created) = store.create().await.unwrap();

        let (found_id, found) = store
            .get_or_create(Some(&id.to_string()))
            .await
            .unwrap();

        assert_eq!(found_id, id);
        assert!(Arc::ptr_eq(&created, &found));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_unknown_id_creates_new_session() {
        let store = store();
        let stale = Uuid::new_v4();

        let (id, _) = store
            .get_or_create(Some(&stale.to_string()))
            .await
            .unwrap();

        assert_ne!(id, stale);
    }

    #[tokio::test]
    async fn test_remove() {
        let store = store();
        let (id, _) = store.create().await.unwrap();

        assert!(store.remove(id).await);
        assert!(!store.remove(id).await);
        assert!(store.get(id).await.is_none());
    }

    #[tokio::test]
    async fn test_idle_sessions_expire() {
        let store = SessionStore::with_limits(
            Arc::new(LocalSessionRegistry),
            Duration::from_millis(50),
            DEFAULT_MAX_SESSIONS,
        );
        let (idle, _) = store.create().await.unwrap();

        tokio::time::sleep(Duration::from_millis(120)).await;
        let (fresh, _) = store.create().await.unwrap();

        assert!(store.get(idle).await.is_none());
        assert!(store.get(fresh).await.is_some());
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_full_store_evicts_least_recently_used() {
        let store = SessionStore::with_limits(
            Arc::new(LocalSessionRegistry),
            DEFAULT_IDLE_TIMEOUT,
            2,
        );
        let (first, _) = store.create().await.unwrap();
        let (second, _) = store.create().await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        // Touch the first so the second becomes the eviction candidate.
        assert!(store.get(first).await.is_some());

        let (third, _) = store.create().await.unwrap();

        assert_eq!(store.len().await, 2);
        assert!(store.get(second).await.is_none());
        assert!(store.get(first).await.is_some());
        assert!(store.get(third).await.is_some());
    }
}
