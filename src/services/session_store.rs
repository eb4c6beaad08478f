use moka::sync::Cache;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

use crate::models::Session;

/// In-memory home of live sessions.
///
/// Entries untouched for `time_to_idle` are evicted. A session that is evicted
/// while peers are still connected stays alive for them through the hub, it
/// just can no longer be looked up by new requests.
pub struct SessionStore {
    cache: Cache<Uuid, Arc<Session>>,
}

impl SessionStore {
    pub fn new(max_capacity: u64, time_to_idle: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_idle(time_to_idle)
            .build();
        info!("Session store initialized (capacity {}, idle {:?})", max_capacity, time_to_idle);
        Self { cache }
    }

    pub fn insert(&self, session: Arc<Session>) {
        self.cache.insert(session.id(), session);
    }

    pub fn get(&self, id: &Uuid) -> Option<Arc<Session>> {
        self.cache.get(id)
    }

    pub fn list(&self) -> Vec<Arc<Session>> {
        self.cache.iter().map(|(_, session)| session).collect()
    }

    pub fn len(&self) -> u64 {
        self.cache.run_pending_tasks();
        self.cache.entry_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_get_and_list() {
        let store = SessionStore::new(100, Duration::from_secs(60));
        let session = Arc::new(Session::create("the quick brown fox").unwrap());
        store.insert(session.clone());

        let found = store.get(&session.id()).unwrap();
        assert!(Arc::ptr_eq(&found, &session));
        assert!(store.get(&Uuid::new_v4()).is_none());
        assert_eq!(store.list().len(), 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn idle_sessions_are_evicted() {
        let store = SessionStore::new(100, Duration::from_millis(50));
        let session = Arc::new(Session::create("text").unwrap());
        let id = session.id();
        store.insert(session);

        std::thread::sleep(Duration::from_millis(150));
        assert!(store.get(&id).is_none());
    }
}
