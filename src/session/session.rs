//! One user's isolated, mutable world (§3, §4.2).

use chrono::{DateTime, Utc};
use dashmap::{DashMap, DashSet};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use tokio::sync::OnceCell;

/// Resource kind + id — the key every per-(type, id) lock is keyed on (§5:
/// "writes on the same (type, id) must be serialized internally").
type ResourceKey = (String, String);

pub struct Session {
    session_key: String,
    created_at: DateTime<Utc>,
    /// Seconds since epoch, or `i64::MIN` as the "unset" sentinel — an
    /// `AtomicI64` gives lock-free reads from every request that merely
    /// checks expiry.
    expiry: AtomicI64,
    hydrated: AtomicBool,
    /// Guards the hydration callback so two concurrent first-use requests
    /// for a brand-new session run it exactly once (§9 open question 2).
    hydration_latch: OnceCell<()>,
    versions: DashMap<ResourceKey, Mutex<BTreeMap<u32, Value>>>,
    tombstones: DashSet<ResourceKey>,
    next_ids: DashMap<String, AtomicU64>,
}

const NO_EXPIRY: i64 = i64::MIN;

impl Session {
    pub fn new(session_key: String) -> Self {
        Self {
            session_key,
            created_at: Utc::now(),
            expiry: AtomicI64::new(NO_EXPIRY),
            hydrated: AtomicBool::new(false),
            hydration_latch: OnceCell::new(),
            versions: DashMap::new(),
            tombstones: DashSet::new(),
            next_ids: DashMap::new(),
        }
    }

    pub fn session_key(&self) -> &str {
        &self.session_key
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn set_expiry(&self, expiry: Option<i64>) {
        self.expiry.store(expiry.unwrap_or(NO_EXPIRY), Ordering::SeqCst);
    }

    pub fn expiry(&self) -> Option<i64> {
        match self.expiry.load(Ordering::SeqCst) {
            NO_EXPIRY => None,
            t => Some(t),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expiry() {
            Some(exp) => now.timestamp() > exp,
            None => false,
        }
    }

    pub fn hydrated(&self) -> bool {
        self.hydrated.load(Ordering::SeqCst)
    }

    pub fn set_hydrated(&self, value: bool) {
        self.hydrated.store(value, Ordering::SeqCst);
    }

    /// Runs `hydrate` exactly once for this session's lifetime, even if
    /// called concurrently from multiple in-flight first-use requests.
    pub async fn hydrate_once<F, Fut>(&self, hydrate: F)
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = ()>,
    {
        let _ = self
            .hydration_latch
            .get_or_init(|| async {
                hydrate().await;
                self.set_hydrated(true);
            })
            .await;
    }

    /// Inserts a version, clearing any tombstone on the id (§4.2: "delete
    /// then store undeletes").
    pub fn store(&self, resource_type: &str, id: &str, version: u32, resource: Value) {
        let key = (resource_type.to_string(), id.to_string());
        self.tombstones.remove(&key);
        let entry = self
            .versions
            .entry(key)
            .or_insert_with(|| Mutex::new(BTreeMap::new()));
        entry.lock().insert(version, resource);
    }

    /// Returns the stored resource at `version`, or the highest version if
    /// `version` is `None`. Does not consider tombstone state — callers
    /// combine this with [`Session::is_deleted`] per §4.2's read semantics.
    pub fn get(&self, resource_type: &str, id: &str, version: Option<u32>) -> Option<Value> {
        let key = (resource_type.to_string(), id.to_string());
        let entry = self.versions.get(&key)?;
        let history = entry.lock();
        match version {
            Some(v) => history.get(&v).cloned(),
            None => history.values().next_back().cloned(),
        }
    }

    pub fn latest_version_number(&self, resource_type: &str, id: &str) -> Option<u32> {
        let key = (resource_type.to_string(), id.to_string());
        let entry = self.versions.get(&key)?;
        let history = entry.lock();
        history.keys().next_back().copied()
    }

    /// All non-tombstoned latest versions for `resource_type` (§4.2).
    pub fn get_all(&self, resource_type: &str) -> Vec<Value> {
        self.versions
            .iter()
            .filter(|entry| entry.key().0 == resource_type)
            .filter(|entry| !self.tombstones.contains(entry.key()))
            .filter_map(|entry| entry.value().lock().values().next_back().cloned())
            .collect()
    }

    pub fn delete(&self, resource_type: &str, id: &str) {
        let key = (resource_type.to_string(), id.to_string());
        self.tombstones.insert(key);
    }

    pub fn is_deleted(&self, resource_type: &str, id: &str) -> bool {
        let key = (resource_type.to_string(), id.to_string());
        self.tombstones.contains(&key)
    }

    /// Stored AND not tombstoned (§4.2).
    pub fn exists(&self, resource_type: &str, id: &str) -> bool {
        let key = (resource_type.to_string(), id.to_string());
        self.versions.contains_key(&key) && !self.tombstones.contains(&key)
    }

    /// Atomic increment starting at 1, independent per resource type (§3
    /// invariant 5).
    pub fn next_id(&self, resource_type: &str) -> u64 {
        let counter = self
            .next_ids
            .entry(resource_type.to_string())
            .or_insert_with(|| AtomicU64::new(0));
        counter.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn clear(&self) {
        self.versions.clear();
        self.tombstones.clear();
        self.next_ids.clear();
        self.set_hydrated(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn store_then_read_highest_version() {
        let session = Session::new("k1".to_string());
        session.store("Patient", "1", 1, json!({"v": 1}));
        session.store("Patient", "1", 2, json!({"v": 2}));
        assert_eq!(session.get("Patient", "1", None), Some(json!({"v": 2})));
        assert_eq!(session.get("Patient", "1", Some(1)), Some(json!({"v": 1})));
        assert_eq!(session.get("Patient", "1", Some(99)), None);
    }

    #[test]
    fn delete_then_store_undeletes() {
        let session = Session::new("k1".to_string());
        session.store("Patient", "1", 1, json!({"v": 1}));
        session.delete("Patient", "1");
        assert!(session.is_deleted("Patient", "1"));
        assert!(!session.exists("Patient", "1"));

        session.store("Patient", "1", 2, json!({"v": 2}));
        assert!(!session.is_deleted("Patient", "1"));
        assert!(session.exists("Patient", "1"));
        assert_eq!(session.get("Patient", "1", None), Some(json!({"v": 2})));
    }

    #[test]
    fn tombstoned_id_excluded_from_get_all() {
        let session = Session::new("k1".to_string());
        session.store("Patient", "1", 1, json!({"id": "1"}));
        session.store("Patient", "2", 1, json!({"id": "2"}));
        session.delete("Patient", "2");

        let all = session.get_all("Patient");
        assert_eq!(all.len(), 1);
        assert_eq!(all[0]["id"], "1");
    }

    #[test]
    fn next_id_is_monotonic_and_independent_per_type() {
        let session = Session::new("k1".to_string());
        assert_eq!(session.next_id("Patient"), 1);
        assert_eq!(session.next_id("Patient"), 2);
        assert_eq!(session.next_id("Observation"), 1);
        assert_eq!(session.next_id("Patient"), 3);
    }

    #[test]
    fn expiry_round_trips_and_unset_is_never_expired() {
        let session = Session::new("k1".to_string());
        assert_eq!(session.expiry(), None);
        assert!(!session.is_expired(Utc::now()));

        let past = Utc::now().timestamp() - 10;
        session.set_expiry(Some(past));
        assert!(session.is_expired(Utc::now()));
    }

    #[tokio::test]
    async fn hydrate_once_runs_a_single_time_under_concurrency() {
        use std::sync::atomic::AtomicUsize;
        use std::sync::Arc;

        let session = Arc::new(Session::new("k1".to_string()));
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let session = session.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                session
                    .hydrate_once(|| async {
                        calls.fetch_add(1, Ordering::SeqCst);
                    })
                    .await;
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(session.hydrated());
    }
}
