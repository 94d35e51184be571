//! Process-wide mapping from session key to [`Session`] (§4.1).

use dashmap::DashMap;
use std::sync::Arc;

use super::Session;

/// Safe under arbitrary concurrent access; a session removed mid-sweep while
/// a request still holds its `Arc<Session>` is fine — that request finishes
/// against the detached object (§5 "Sweeper").
#[derive(Default)]
pub struct SessionStore {
    sessions: DashMap<String, Arc<Session>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    /// Atomic: concurrent callers with the same key observe the same
    /// `Session` instance.
    pub fn get_or_create(&self, key: &str) -> Arc<Session> {
        self.sessions
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Session::new(key.to_string())))
            .clone()
    }

    pub fn get(&self, key: &str) -> Option<Arc<Session>> {
        self.sessions.get(key).map(|entry| entry.clone())
    }

    pub fn remove(&self, key: &str) {
        self.sessions.remove(key);
    }

    pub fn active_keys(&self) -> Vec<String> {
        self.sessions.iter().map(|e| e.key().clone()).collect()
    }

    /// Removes every session whose `expiry` has passed, relative to `now`.
    /// Takes a snapshot of keys first so this never blocks a concurrent
    /// `get_or_create`.
    pub fn sweep(&self, now: chrono::DateTime<chrono::Utc>) -> usize {
        let keys = self.active_keys();
        let mut removed = 0;
        for key in keys {
            let expired = self
                .sessions
                .get(&key)
                .map(|s| s.is_expired(now))
                .unwrap_or(false);
            if expired {
                self.sessions.remove(&key);
                removed += 1;
            }
        }
        removed
    }
}

/// Spawns the periodic sweep task described in §5.
pub fn spawn_sweeper(
    store: Arc<SessionStore>,
    interval: std::time::Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let removed = store.sweep(chrono::Utc::now());
            if removed > 0 {
                tracing::info!(removed, "session sweep removed expired sessions");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn get_or_create_returns_same_instance_for_same_key() {
        let store = SessionStore::new();
        let a = store.get_or_create("k1");
        let b = store.get_or_create("k1");
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn get_never_creates() {
        let store = SessionStore::new();
        assert!(store.get("missing").is_none());
        assert!(store.active_keys().is_empty());
    }

    #[test]
    fn remove_is_idempotent() {
        let store = SessionStore::new();
        store.get_or_create("k1");
        store.remove("k1");
        store.remove("k1");
        assert!(store.get("k1").is_none());
    }

    #[test]
    fn sweep_removes_only_expired_sessions() {
        let store = SessionStore::new();
        let expired = store.get_or_create("expired");
        expired.set_expiry(Some(Utc::now().timestamp() - 10));
        let live = store.get_or_create("live");
        live.set_expiry(Some(Utc::now().timestamp() + 10_000));
        store.get_or_create("no-expiry");

        let removed = store.sweep(Utc::now());
        assert_eq!(removed, 1);

        let keys: std::collections::HashSet<_> = store.active_keys().into_iter().collect();
        assert!(!keys.contains("expired"));
        assert!(keys.contains("live"));
        assert!(keys.contains("no-expiry"));
    }

    #[test]
    fn in_flight_reference_survives_sweep() {
        let store = SessionStore::new();
        let session = store.get_or_create("k1");
        session.set_expiry(Some(Utc::now().timestamp() - 10));

        store.sweep(Utc::now());
        assert!(store.get("k1").is_none());
        // The caller's own reference is still usable.
        assert_eq!(session.session_key(), "k1");
    }
}
